//! Blocking rules and the ordered rule set

use chrono::{DateTime, Utc};
use producer_util::{EpochMillis, RuleId};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;
use thiserror::Error;

/// Host-and-path shape accepted for url-bearing rules
static PATTERN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^[a-zA-Z0-9][a-zA-Z0-9._-]*[a-zA-Z0-9](\.[a-zA-Z]{2,})?([/A-Za-z0-9_\-._~:?#\[\]@!$&'()*+,;=]*)?$",
    )
    .expect("rule pattern regex is valid")
});

/// A single access-control entry.
///
/// Serializes to the export shape
/// `{id, type, url?, paramKey?, paramValue?, created}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    pub id: RuleId,
    #[serde(flatten)]
    pub kind: RuleKind,
    /// Creation time, informational only
    #[serde(default)]
    pub created: DateTime<Utc>,
}

impl Rule {
    pub fn new(id: RuleId, kind: RuleKind, created: DateTime<Utc>) -> Self {
        Self { id, kind, created }
    }

    pub fn tag(&self) -> RuleKindTag {
        self.kind.tag()
    }

    /// Whether two rules would duplicate each other within the same kind
    pub fn is_equivalent(&self, other: &RuleKind) -> bool {
        self.kind == *other
    }
}

/// Rule kind with its kind-specific payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum RuleKind {
    /// Block a domain and every subdomain
    #[serde(rename = "domain")]
    Domain { url: String },

    /// Block one exact URL; a bare-domain pattern only covers the root page
    #[serde(rename = "url")]
    ExactUrl { url: String },

    /// Exempt a URL and everything under it
    #[serde(rename = "allow")]
    Allow { url: String },

    /// Exempt a blocked URL when it carries a query parameter.
    /// An empty `param_value` accepts any value.
    #[serde(rename = "allowParam")]
    AllowByParam {
        #[serde(rename = "paramKey")]
        param_key: String,
        #[serde(rename = "paramValue", default)]
        param_value: String,
    },
}

impl RuleKind {
    pub fn tag(&self) -> RuleKindTag {
        match self {
            RuleKind::Domain { .. } => RuleKindTag::Domain,
            RuleKind::ExactUrl { .. } => RuleKindTag::ExactUrl,
            RuleKind::Allow { .. } => RuleKindTag::Allow,
            RuleKind::AllowByParam { .. } => RuleKindTag::AllowByParam,
        }
    }

    /// The url/domain pattern, absent for parameter rules
    pub fn pattern(&self) -> Option<&str> {
        match self {
            RuleKind::Domain { url } | RuleKind::ExactUrl { url } | RuleKind::Allow { url } => {
                Some(url)
            }
            RuleKind::AllowByParam { .. } => None,
        }
    }

    /// Short human description used by the panel listing
    pub fn describe(&self) -> String {
        match self {
            RuleKind::AllowByParam {
                param_key,
                param_value,
            } => {
                let value = if param_value.is_empty() {
                    "any"
                } else {
                    param_value
                };
                format!("?{}={}", param_key, value)
            }
            other => other.pattern().unwrap_or_default().to_string(),
        }
    }
}

/// Rule kind tag, the closed set of rule types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RuleKindTag {
    #[serde(rename = "domain")]
    Domain,
    #[serde(rename = "url")]
    ExactUrl,
    #[serde(rename = "allow")]
    Allow,
    #[serde(rename = "allowParam")]
    AllowByParam,
}

impl RuleKindTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            RuleKindTag::Domain => "domain",
            RuleKindTag::ExactUrl => "url",
            RuleKindTag::Allow => "allow",
            RuleKindTag::AllowByParam => "allowParam",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            RuleKindTag::Domain => "Block Domain",
            RuleKindTag::ExactUrl => "Block URL",
            RuleKindTag::Allow => "Allow URL",
            RuleKindTag::AllowByParam => "Allow with Parameter",
        }
    }
}

impl fmt::Display for RuleKindTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RuleKindTag {
    type Err = RuleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "domain" => Ok(RuleKindTag::Domain),
            "url" => Ok(RuleKindTag::ExactUrl),
            "allow" => Ok(RuleKindTag::Allow),
            "allowParam" | "allow-param" => Ok(RuleKindTag::AllowByParam),
            other => Err(RuleError::UnknownKind(other.to_string())),
        }
    }
}

/// Rule authoring errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuleError {
    #[error("Unknown rule type: {0}")]
    UnknownKind(String),

    #[error("Please enter a valid URL or domain: {0:?}")]
    InvalidPattern(String),

    #[error("Please enter a parameter key")]
    MissingParamKey,

    #[error("This rule already exists")]
    Duplicate,
}

/// Unvalidated rule input as typed by the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleDraft {
    pub tag: RuleKindTag,
    pub url: String,
    pub param_key: String,
    pub param_value: String,
}

impl RuleDraft {
    pub fn pattern(tag: RuleKindTag, url: impl Into<String>) -> Self {
        Self {
            tag,
            url: url.into(),
            param_key: String::new(),
            param_value: String::new(),
        }
    }

    pub fn param(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            tag: RuleKindTag::AllowByParam,
            url: String::new(),
            param_key: key.into(),
            param_value: value.into(),
        }
    }

    /// Clean and validate the draft into a rule kind
    pub fn into_kind(self) -> Result<RuleKind, RuleError> {
        match self.tag {
            RuleKindTag::AllowByParam => {
                let param_key = self.param_key.trim().to_string();
                if param_key.is_empty() {
                    return Err(RuleError::MissingParamKey);
                }
                Ok(RuleKind::AllowByParam {
                    param_key,
                    param_value: self.param_value.trim().to_string(),
                })
            }
            tag => {
                let url = clean_pattern(&self.url);
                if url.is_empty() || !is_valid_pattern(&url) {
                    return Err(RuleError::InvalidPattern(self.url));
                }
                Ok(match tag {
                    RuleKindTag::Domain => RuleKind::Domain { url },
                    RuleKindTag::ExactUrl => RuleKind::ExactUrl { url },
                    _ => RuleKind::Allow { url },
                })
            }
        }
    }
}

/// Strip a leading `http://`/`https://` and `www.` from user input
pub fn clean_pattern(input: &str) -> String {
    let trimmed = input.trim();
    let without_scheme = trimmed
        .strip_prefix("https://")
        .or_else(|| trimmed.strip_prefix("http://"))
        .unwrap_or(trimmed);
    without_scheme
        .strip_prefix("www.")
        .unwrap_or(without_scheme)
        .to_string()
}

/// Whether a cleaned pattern looks like a host with an optional path
pub fn is_valid_pattern(pattern: &str) -> bool {
    PATTERN_RE.is_match(pattern)
}

/// Ordered sequence of rules.
///
/// Order is preserved for display only; evaluation precedence is by kind.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RuleSet(Vec<Rule>);

impl RuleSet {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Adopt a rule list as-is. Used for full replacements, which are
    /// last-writer-wins and bypass duplicate checks.
    pub fn from_rules(rules: Vec<Rule>) -> Self {
        Self(rules)
    }

    pub fn rules(&self) -> &[Rule] {
        &self.0
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Rule> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, id: RuleId) -> Option<&Rule> {
        self.0.iter().find(|r| r.id == id)
    }

    /// Rules of one kind, in insertion order
    pub fn of_kind(&self, tag: RuleKindTag) -> impl Iterator<Item = &Rule> {
        self.0.iter().filter(move |r| r.tag() == tag)
    }

    pub fn contains_equivalent(&self, kind: &RuleKind) -> bool {
        self.0.iter().any(|r| r.is_equivalent(kind))
    }

    /// Id for a rule created at `now`, kept unique when several rules are
    /// created within the same millisecond.
    pub fn next_id(&self, now: EpochMillis) -> RuleId {
        let candidate = RuleId::from_created(now);
        match self.0.iter().map(|r| r.id).max() {
            Some(max) if max >= candidate => RuleId::new(max.as_i64() + 1),
            _ => candidate,
        }
    }

    /// Insert a rule, rejecting a duplicate of the same kind
    pub fn insert(&mut self, rule: Rule) -> Result<(), RuleError> {
        if self.contains_equivalent(&rule.kind) {
            return Err(RuleError::Duplicate);
        }
        self.0.push(rule);
        Ok(())
    }

    /// Validate a draft and append it as a new rule created at `now`
    pub fn add(&mut self, draft: RuleDraft, now: EpochMillis) -> Result<Rule, RuleError> {
        let kind = draft.into_kind()?;
        let rule = Rule::new(self.next_id(now), kind, now.to_datetime());
        self.insert(rule.clone())?;
        Ok(rule)
    }

    /// Merge rules from an export file. Invalid and duplicate rules are
    /// skipped; colliding ids are reassigned.
    pub fn import(&mut self, rules: Vec<Rule>, now: EpochMillis) -> ImportSummary {
        let mut summary = ImportSummary::default();

        for mut rule in rules {
            let valid = match &rule.kind {
                RuleKind::AllowByParam { param_key, .. } => !param_key.trim().is_empty(),
                kind => kind.pattern().is_some_and(is_valid_pattern),
            };
            if !valid {
                summary.invalid += 1;
                continue;
            }
            if self.get(rule.id).is_some() {
                rule.id = self.next_id(now);
            }
            match self.insert(rule) {
                Ok(()) => summary.added += 1,
                Err(_) => summary.duplicates += 1,
            }
        }

        summary
    }

    pub fn remove(&mut self, id: RuleId) -> Option<Rule> {
        let pos = self.0.iter().position(|r| r.id == id)?;
        Some(self.0.remove(pos))
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }
}

impl<'a> IntoIterator for &'a RuleSet {
    type Item = &'a Rule;
    type IntoIter = std::slice::Iter<'a, Rule>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Outcome of a rule import
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub added: usize,
    pub duplicates: usize,
    pub invalid: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(ms: i64) -> EpochMillis {
        EpochMillis::from_millis(ms)
    }

    #[test]
    fn rule_json_matches_export_shape() {
        let rule = Rule::new(
            RuleId::new(1_700_000_000_000),
            RuleKind::Domain {
                url: "example.com".into(),
            },
            at(1_700_000_000_000).to_datetime(),
        );

        let value = serde_json::to_value(&rule).unwrap();
        assert_eq!(value["id"], 1_700_000_000_000i64);
        assert_eq!(value["type"], "domain");
        assert_eq!(value["url"], "example.com");
        assert!(value["created"].as_str().unwrap().starts_with("2023-11-14T"));
    }

    #[test]
    fn param_rule_parses_from_export() {
        let json = r#"{"id": 5, "type": "allowParam", "paramKey": "ok", "paramValue": "1", "created": "2024-01-01T00:00:00.000Z"}"#;
        let rule: Rule = serde_json::from_str(json).unwrap();

        assert_eq!(rule.id, RuleId::new(5));
        assert_eq!(
            rule.kind,
            RuleKind::AllowByParam {
                param_key: "ok".into(),
                param_value: "1".into()
            }
        );
    }

    #[test]
    fn param_value_defaults_to_any() {
        let json = r#"{"id": 6, "type": "allowParam", "paramKey": "ok", "created": "2024-01-01T00:00:00Z"}"#;
        let rule: Rule = serde_json::from_str(json).unwrap();
        assert!(matches!(rule.kind, RuleKind::AllowByParam { ref param_value, .. } if param_value.is_empty()));
    }

    #[test]
    fn url_kind_uses_url_type_name() {
        let json = r#"{"id": 7, "type": "url", "url": "example.com/page", "created": "2024-01-01T00:00:00Z"}"#;
        let rule: Rule = serde_json::from_str(json).unwrap();
        assert_eq!(rule.tag(), RuleKindTag::ExactUrl);
    }

    #[test]
    fn draft_cleans_scheme_and_www() {
        let kind = RuleDraft::pattern(RuleKindTag::Domain, "  https://www.example.com  ")
            .into_kind()
            .unwrap();
        assert_eq!(
            kind,
            RuleKind::Domain {
                url: "example.com".into()
            }
        );
    }

    #[test]
    fn draft_rejects_invalid_pattern() {
        assert!(matches!(
            RuleDraft::pattern(RuleKindTag::Domain, "not a url").into_kind(),
            Err(RuleError::InvalidPattern(_))
        ));
        assert!(matches!(
            RuleDraft::pattern(RuleKindTag::Allow, "").into_kind(),
            Err(RuleError::InvalidPattern(_))
        ));
    }

    #[test]
    fn draft_requires_param_key() {
        assert_eq!(
            RuleDraft::param("  ", "1").into_kind(),
            Err(RuleError::MissingParamKey)
        );
    }

    #[test]
    fn valid_patterns() {
        assert!(is_valid_pattern("example.com"));
        assert!(is_valid_pattern("sub.example.co.uk/path/to?x=1"));
        assert!(is_valid_pattern("localhost"));
        assert!(!is_valid_pattern("-bad.com"));
        assert!(!is_valid_pattern("has space.com"));
    }

    #[test]
    fn non_ascii_path_rejected() {
        assert!(is_valid_pattern("a.com/cafe_1"));
        assert!(!is_valid_pattern("a.com/café"));
        assert!(!is_valid_pattern("a.com/путь"));
    }

    #[test]
    fn duplicate_rejected_per_kind_only() {
        let mut rules = RuleSet::new();
        rules
            .add(RuleDraft::pattern(RuleKindTag::Domain, "a.com"), at(1))
            .unwrap();

        assert_eq!(
            rules.add(RuleDraft::pattern(RuleKindTag::Domain, "https://a.com"), at(2)),
            Err(RuleError::Duplicate)
        );

        // Same pattern under another kind is fine
        rules
            .add(RuleDraft::pattern(RuleKindTag::Allow, "a.com"), at(3))
            .unwrap();

        rules.add(RuleDraft::param("ok", ""), at(4)).unwrap();
        assert_eq!(
            rules.add(RuleDraft::param("ok", ""), at(5)),
            Err(RuleError::Duplicate)
        );
        rules.add(RuleDraft::param("ok", "1"), at(6)).unwrap();

        assert_eq!(rules.len(), 3 + 1);
    }

    #[test]
    fn ids_stay_unique_within_one_millisecond() {
        let mut rules = RuleSet::new();
        let first = rules
            .add(RuleDraft::pattern(RuleKindTag::Domain, "a.com"), at(100))
            .unwrap();
        let second = rules
            .add(RuleDraft::pattern(RuleKindTag::Domain, "b.com"), at(100))
            .unwrap();

        assert_eq!(first.id, RuleId::new(100));
        assert_eq!(second.id, RuleId::new(101));
    }

    #[test]
    fn remove_preserves_order() {
        let mut rules = RuleSet::new();
        let a = rules
            .add(RuleDraft::pattern(RuleKindTag::Domain, "a.com"), at(1))
            .unwrap();
        rules
            .add(RuleDraft::pattern(RuleKindTag::Domain, "b.com"), at(2))
            .unwrap();
        rules
            .add(RuleDraft::pattern(RuleKindTag::Domain, "c.com"), at(3))
            .unwrap();

        assert!(rules.remove(a.id).is_some());
        assert!(rules.remove(a.id).is_none());

        let patterns: Vec<_> = rules.iter().filter_map(|r| r.kind.pattern()).collect();
        assert_eq!(patterns, vec!["b.com", "c.com"]);
    }

    #[test]
    fn import_skips_invalid_and_duplicates() {
        let mut rules = RuleSet::new();
        rules
            .add(RuleDraft::pattern(RuleKindTag::Domain, "a.com"), at(10))
            .unwrap();

        let incoming = vec![
            Rule::new(RuleId::new(10), RuleKind::Domain { url: "b.com".into() }, Default::default()),
            Rule::new(RuleId::new(11), RuleKind::Domain { url: "a.com".into() }, Default::default()),
            Rule::new(RuleId::new(12), RuleKind::Allow { url: "bad url".into() }, Default::default()),
        ];

        let summary = rules.import(incoming, at(50));
        assert_eq!(
            summary,
            ImportSummary {
                added: 1,
                duplicates: 1,
                invalid: 1
            }
        );
        // Colliding id was reassigned
        assert!(rules.get(RuleId::new(50)).is_some());
    }

    #[test]
    fn kind_tag_round_trips_through_str() {
        for tag in [
            RuleKindTag::Domain,
            RuleKindTag::ExactUrl,
            RuleKindTag::Allow,
            RuleKindTag::AllowByParam,
        ] {
            assert_eq!(tag.as_str().parse::<RuleKindTag>().unwrap(), tag);
        }
        assert!("regex".parse::<RuleKindTag>().is_err());
    }

    #[test]
    fn describe_param_rule() {
        let kind = RuleKind::AllowByParam {
            param_key: "ok".into(),
            param_value: String::new(),
        };
        assert_eq!(kind.describe(), "?ok=any");
    }
}
