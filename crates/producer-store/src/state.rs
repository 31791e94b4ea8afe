//! Typed codec for the persisted extension state
//!
//! Each field lives under its own key so a partial write (the minute timer
//! commit, a block-count bump) touches only what changed. Missing keys
//! decode to defaults. A key holding malformed JSON is logged and defaulted
//! on its own; the remaining keys still load.

use producer_api::{ExtensionState, RuleSet};
use producer_util::EpochMillis;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use tracing::warn;

use crate::{Store, StoreResult};

pub const KEY_RULES: &str = "rules";
pub const KEY_IS_ACTIVE: &str = "isActive";
pub const KEY_SESSION_BLOCKS: &str = "sessionBlocks";
pub const KEY_SESSION_START_TIME: &str = "sessionStartTime";
pub const KEY_FOCUSED_TIME: &str = "focusedTime";

/// Every key the extension state occupies
pub const STATE_KEYS: [&str; 5] = [
    KEY_RULES,
    KEY_IS_ACTIVE,
    KEY_SESSION_BLOCKS,
    KEY_SESSION_START_TIME,
    KEY_FOCUSED_TIME,
];

/// Load the full extension state
pub fn load_state(store: &dyn Store) -> StoreResult<ExtensionState> {
    let values = store.get_many(&STATE_KEYS)?;

    Ok(ExtensionState {
        rules: decode_or_default::<RuleSet>(&values, KEY_RULES),
        is_active: decode_or_default(&values, KEY_IS_ACTIVE),
        session_blocks: decode_or_default(&values, KEY_SESSION_BLOCKS),
        session_start_time: decode_or_default::<Option<EpochMillis>>(
            &values,
            KEY_SESSION_START_TIME,
        ),
        focused_time: decode_or_default(&values, KEY_FOCUSED_TIME),
    })
}

fn decode_or_default<T: DeserializeOwned + Default>(
    values: &HashMap<String, String>,
    key: &str,
) -> T {
    let Some(raw) = values.get(key) else {
        return T::default();
    };

    match serde_json::from_str(raw) {
        Ok(value) => value,
        Err(e) => {
            warn!(key, error = %e, "Malformed persisted value, using default");
            T::default()
        }
    }
}

/// A batch of state keys to write together
#[derive(Debug, Default)]
pub struct StateUpdate {
    entries: Vec<(&'static str, String)>,
    encode_error: Option<serde_json::Error>,
}

impl StateUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    fn put<T: Serialize + ?Sized>(mut self, key: &'static str, value: &T) -> Self {
        match serde_json::to_string(value) {
            Ok(json) => self.entries.push((key, json)),
            Err(e) => {
                self.encode_error.get_or_insert(e);
            }
        }
        self
    }

    pub fn rules(self, rules: &RuleSet) -> Self {
        self.put(KEY_RULES, rules)
    }

    pub fn is_active(self, active: bool) -> Self {
        self.put(KEY_IS_ACTIVE, &active)
    }

    pub fn session_blocks(self, count: u32) -> Self {
        self.put(KEY_SESSION_BLOCKS, &count)
    }

    pub fn session_start_time(self, started_at: Option<EpochMillis>) -> Self {
        self.put(KEY_SESSION_START_TIME, &started_at)
    }

    pub fn focused_time(self, secs: u64) -> Self {
        self.put(KEY_FOCUSED_TIME, &secs)
    }

    pub fn keys(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.iter().map(|(k, _)| *k)
    }

    /// Write the batch atomically
    pub fn apply(self, store: &dyn Store) -> StoreResult<()> {
        if let Some(e) = self.encode_error {
            return Err(e.into());
        }
        if self.entries.is_empty() {
            return Ok(());
        }

        let entries: Vec<(&str, String)> = self.entries.into_iter().collect();
        store.set_many(&entries)
    }
}
