//! Panel edits and how they are saved
//!
//! Every edit replaces the controller's rule set and activation flag
//! wholesale. Tabs are re-evaluated when blocking is on or was just toggled,
//! and never after clear-info.

use anyhow::{Context, Result, bail};
use producer_api::{ImportSummary, Rule, RuleDraft, RuleSet};
use producer_util::{EpochMillis, RuleId};
use std::path::Path;
use std::time::Instant;
use tracing::info;

use crate::client::PanelClient;
use crate::state::PanelState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveAction {
    EditRules,
    ToggleProducing,
    ClearInfo,
}

impl SaveAction {
    pub fn reloads_tabs(self, is_active_after: bool) -> bool {
        (is_active_after || self == SaveAction::ToggleProducing) && self != SaveAction::ClearInfo
    }
}

/// Configuration before and after an edit
#[derive(Debug, Clone)]
pub struct Edit {
    pub rules_before: RuleSet,
    pub is_active_before: bool,
    pub rules_after: RuleSet,
    pub is_active_after: bool,
}

impl Edit {
    /// Start an edit from the controller's current configuration
    pub fn from_current(rules: RuleSet, is_active: bool) -> Self {
        Self {
            rules_before: rules.clone(),
            is_active_before: is_active,
            rules_after: rules,
            is_active_after: is_active,
        }
    }
}

/// Push an edit to the controller. Returns the reload count when tabs were
/// re-evaluated.
pub async fn save(client: &mut PanelClient, edit: &Edit, action: SaveAction) -> Result<Option<usize>> {
    client
        .update_rules(&edit.rules_after, edit.is_active_after)
        .await?;

    if !action.reloads_tabs(edit.is_active_after) {
        return Ok(None);
    }

    let count = client
        .reload_affected_tabs(
            &edit.rules_before,
            &edit.rules_after,
            edit.is_active_before,
            edit.is_active_after,
        )
        .await?;
    info!(count, ?action, "Tabs reloaded");
    Ok(Some(count))
}

async fn current(client: &mut PanelClient) -> Result<Edit> {
    let view = client.state().await?;
    Ok(Edit::from_current(view.rules, view.is_active))
}

/// Switch blocking on or off, starting or stopping the session timer.
/// `None` flips the current flag.
pub async fn set_producing(client: &mut PanelClient, target: Option<bool>) -> Result<bool> {
    let mut edit = current(client).await?;
    let active = target.unwrap_or(!edit.is_active_before);
    edit.is_active_after = active;

    if active {
        client.start_timer().await?;
    } else {
        client.stop_timer().await?;
    }

    save(client, &edit, SaveAction::ToggleProducing).await?;
    Ok(active)
}

pub async fn add_rule(client: &mut PanelClient, draft: RuleDraft) -> Result<Rule> {
    let mut edit = current(client).await?;
    let rule = edit.rules_after.add(draft, EpochMillis::now())?;
    save(client, &edit, SaveAction::EditRules).await?;
    Ok(rule)
}

pub async fn remove_rule(client: &mut PanelClient, id: RuleId) -> Result<Rule> {
    let mut edit = current(client).await?;
    let Some(rule) = edit.rules_after.remove(id) else {
        bail!("No rule with id {}", id);
    };
    save(client, &edit, SaveAction::EditRules).await?;
    Ok(rule)
}

pub async fn clear_rules(client: &mut PanelClient) -> Result<usize> {
    let mut edit = current(client).await?;
    if edit.rules_after.is_empty() {
        bail!("No rules to clear");
    }
    let count = edit.rules_after.len();
    edit.rules_after.clear();
    save(client, &edit, SaveAction::EditRules).await?;
    Ok(count)
}

/// Reset timers and the block counter. Refused when there is nothing to
/// reset.
pub async fn clear_info(client: &mut PanelClient) -> Result<()> {
    let state = PanelState::from_view(client.state().await?, Instant::now());
    if state.info_is_clear() {
        bail!("No info to clear");
    }

    client.clear_timers().await?;
    client.reset_session_blocks().await?;

    let edit = Edit::from_current(state.rules, state.is_active);
    save(client, &edit, SaveAction::ClearInfo).await?;
    Ok(())
}

/// Parse an export file
pub fn read_rules_file(path: &Path) -> Result<Vec<Rule>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {:?}", path))?;
    serde_json::from_str(&content).with_context(|| format!("{:?} is not a rule export", path))
}

pub async fn import_rules(client: &mut PanelClient, rules: Vec<Rule>) -> Result<ImportSummary> {
    let mut edit = current(client).await?;
    let summary = edit.rules_after.import(rules, EpochMillis::now());
    if summary.added > 0 {
        save(client, &edit, SaveAction::EditRules).await?;
    }
    Ok(summary)
}

pub fn export_json(rules: &RuleSet) -> Result<String> {
    serde_json::to_string_pretty(rules).context("Failed to encode rules")
}

#[cfg(test)]
mod tests {
    use super::*;
    use producer_api::{RuleKind, RuleKindTag};

    #[test]
    fn reload_policy() {
        assert!(SaveAction::EditRules.reloads_tabs(true));
        assert!(!SaveAction::EditRules.reloads_tabs(false));

        // Toggling off still re-evaluates tabs
        assert!(SaveAction::ToggleProducing.reloads_tabs(false));
        assert!(SaveAction::ToggleProducing.reloads_tabs(true));

        assert!(!SaveAction::ClearInfo.reloads_tabs(true));
        assert!(!SaveAction::ClearInfo.reloads_tabs(false));
    }

    #[test]
    fn edit_starts_unchanged() {
        let edit = Edit::from_current(RuleSet::new(), true);
        assert_eq!(edit.rules_before, edit.rules_after);
        assert!(edit.is_active_before && edit.is_active_after);
    }

    #[test]
    fn export_then_read_file() {
        let mut rules = RuleSet::new();
        rules
            .add(
                RuleDraft::pattern(RuleKindTag::Allow, "a.com/docs"),
                EpochMillis::from_millis(1_000),
            )
            .unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rules.json");
        std::fs::write(&path, export_json(&rules).unwrap()).unwrap();

        let read = read_rules_file(&path).unwrap();
        assert_eq!(read.len(), 1);
        assert_eq!(
            read[0].kind,
            RuleKind::Allow {
                url: "a.com/docs".into()
            }
        );
    }

    #[test]
    fn non_export_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rules.json");
        std::fs::write(&path, r#"{"rules": []}"#).unwrap();
        assert!(read_rules_file(&path).is_err());
    }
}
