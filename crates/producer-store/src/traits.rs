//! Store trait definitions

use std::collections::HashMap;

use crate::StoreResult;

/// Opaque key-value store. Values are JSON documents kept as text.
pub trait Store: Send + Sync {
    /// Read one key
    fn get(&self, key: &str) -> StoreResult<Option<String>>;

    /// Read several keys at once; absent keys are missing from the map
    fn get_many(&self, keys: &[&str]) -> StoreResult<HashMap<String, String>>;

    /// Write several keys atomically
    fn set_many(&self, entries: &[(&str, String)]) -> StoreResult<()>;

    /// Write one key
    fn set(&self, key: &str, value_json: String) -> StoreResult<()> {
        self.set_many(&[(key, value_json)])
    }

    /// Check if store is healthy
    fn is_healthy(&self) -> bool;
}
