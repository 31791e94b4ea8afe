//! Block decision
//!
//! Precedence is by rule kind, never by position in the rule set:
//! explicit allow > domain/url block > parameter exemption > default allow.
//! Any internal failure resolves to allow.

use producer_api::{RuleKindTag, RuleSet};
use producer_util::RuleId;

use crate::matcher::{matches, Candidate};

/// Outcome of evaluating one navigation target, with the deciding rule
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Blocking is switched off
    Inactive,
    /// Nothing to evaluate
    EmptyUrl,
    /// An allow rule matched; block rules were not consulted
    ExplicitAllow { rule: RuleId },
    /// No domain or url rule matched
    Unmatched,
    /// A block rule matched but a parameter rule exempted the URL
    ParamExempt { blocked_by: RuleId, exempted_by: RuleId },
    Blocked { rule: RuleId },
}

impl Verdict {
    pub fn should_block(&self) -> bool {
        matches!(self, Verdict::Blocked { .. })
    }
}

/// Evaluate `url` against an explicit rule set and activation flag.
///
/// Touches no shared state, so diffing two configurations is just two calls.
pub fn evaluate(rules: &RuleSet, active: bool, url: &str) -> Verdict {
    if !active {
        return Verdict::Inactive;
    }
    if url.is_empty() {
        return Verdict::EmptyUrl;
    }

    let candidate = Candidate::new(url);

    if let Some(rule) = rules
        .of_kind(RuleKindTag::Allow)
        .find(|r| matches(&candidate, r))
    {
        return Verdict::ExplicitAllow { rule: rule.id };
    }

    let Some(blocked_by) = rules
        .iter()
        .filter(|r| matches!(r.tag(), RuleKindTag::Domain | RuleKindTag::ExactUrl))
        .find(|r| matches(&candidate, r))
        .map(|r| r.id)
    else {
        return Verdict::Unmatched;
    };

    if let Some(rule) = rules
        .of_kind(RuleKindTag::AllowByParam)
        .find(|r| matches(&candidate, r))
    {
        return Verdict::ParamExempt {
            blocked_by,
            exempted_by: rule.id,
        };
    }

    Verdict::Blocked { rule: blocked_by }
}

/// Boolean verdict for an explicit configuration
pub fn should_block_with(rules: &RuleSet, active: bool, url: &str) -> bool {
    evaluate(rules, active, url).should_block()
}

/// A rule configuration to compare against another
#[derive(Debug, Clone, Copy)]
pub struct Configuration<'a> {
    pub rules: &'a RuleSet,
    pub active: bool,
}

impl<'a> Configuration<'a> {
    pub fn new(rules: &'a RuleSet, active: bool) -> Self {
        Self { rules, active }
    }

    pub fn should_block(&self, url: &str) -> bool {
        should_block_with(self.rules, self.active, url)
    }
}

/// Whether the verdict for `url` differs between two configurations
pub fn verdict_flips(before: Configuration<'_>, after: Configuration<'_>, url: &str) -> bool {
    before.should_block(url) != after.should_block(url)
}

/// Whether a tab URL lives on a scheme that must never be reloaded
pub fn is_privileged(url: &str, privileged_schemes: &[String]) -> bool {
    privileged_schemes
        .iter()
        .any(|scheme| url.starts_with(scheme.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use producer_api::{Rule, RuleKind};

    fn rule(id: i64, kind: RuleKind) -> Rule {
        Rule::new(RuleId::new(id), kind, Default::default())
    }

    fn domain(id: i64, url: &str) -> Rule {
        rule(id, RuleKind::Domain { url: url.into() })
    }

    fn exact(id: i64, url: &str) -> Rule {
        rule(id, RuleKind::ExactUrl { url: url.into() })
    }

    fn allow(id: i64, url: &str) -> Rule {
        rule(id, RuleKind::Allow { url: url.into() })
    }

    fn param(id: i64, key: &str, value: &str) -> Rule {
        rule(
            id,
            RuleKind::AllowByParam {
                param_key: key.into(),
                param_value: value.into(),
            },
        )
    }

    fn set(rules: Vec<Rule>) -> RuleSet {
        RuleSet::from_rules(rules)
    }

    #[test]
    fn inactive_never_blocks() {
        let rules = set(vec![domain(1, "example.com")]);
        assert_eq!(evaluate(&rules, false, "https://example.com"), Verdict::Inactive);
    }

    #[test]
    fn empty_url_never_blocks() {
        let rules = set(vec![domain(1, "example.com")]);
        assert_eq!(evaluate(&rules, true, ""), Verdict::EmptyUrl);
    }

    #[test]
    fn domain_rule_scenario() {
        let rules = set(vec![domain(1, "example.com")]);
        assert!(should_block_with(&rules, true, "https://sub.example.com/x"));
        assert!(should_block_with(&rules, true, "https://example.com"));
        assert!(should_block_with(&rules, true, "https://www.example.com"));
        assert!(!should_block_with(&rules, true, "https://notexample.com"));
    }

    #[test]
    fn param_exemption_scenario() {
        let rules = set(vec![domain(1, "a.com"), param(2, "ok", "1")]);
        assert_eq!(
            evaluate(&rules, true, "https://a.com/p?ok=1"),
            Verdict::ParamExempt {
                blocked_by: RuleId::new(1),
                exempted_by: RuleId::new(2)
            }
        );
        assert!(should_block_with(&rules, true, "https://a.com/p?ok=2"));
        assert!(should_block_with(&rules, true, "https://a.com/p"));
    }

    #[test]
    fn exact_bare_domain_blocks_only_root() {
        let rules = set(vec![exact(1, "example.com")]);
        assert!(should_block_with(&rules, true, "https://example.com"));
        assert!(should_block_with(&rules, true, "https://example.com/"));
        assert!(!should_block_with(&rules, true, "https://example.com/page"));
    }

    #[test]
    fn allow_wins_regardless_of_order() {
        let block_first = set(vec![domain(1, "a.com"), allow(2, "a.com/docs")]);
        let allow_first = set(vec![allow(2, "a.com/docs"), domain(1, "a.com")]);

        for rules in [&block_first, &allow_first] {
            assert_eq!(
                evaluate(rules, true, "https://a.com/docs/intro"),
                Verdict::ExplicitAllow { rule: RuleId::new(2) }
            );
            assert!(should_block_with(rules, true, "https://a.com/blog"));
        }
    }

    #[test]
    fn param_rule_alone_never_decides() {
        let rules = set(vec![param(1, "ok", "")]);
        assert_eq!(
            evaluate(&rules, true, "https://a.com/?ok=1"),
            Verdict::Unmatched
        );
    }

    #[test]
    fn allow_checked_before_param() {
        let rules = set(vec![domain(1, "a.com"), allow(2, "a.com/x"), param(3, "ok", "")]);
        assert_eq!(
            evaluate(&rules, true, "https://a.com/x?ok=1"),
            Verdict::ExplicitAllow { rule: RuleId::new(2) }
        );
    }

    #[test]
    fn evaluation_is_deterministic() {
        let rules = set(vec![domain(1, "a.com"), param(2, "ok", "1"), allow(3, "a.com/free")]);
        for url in ["https://a.com/p?ok=1", "https://a.com/p", "https://a.com/free", "b.com"] {
            let first = evaluate(&rules, true, url);
            for _ in 0..5 {
                assert_eq!(evaluate(&rules, true, url), first);
            }
        }
    }

    #[test]
    fn flips_between_configurations() {
        let before = set(vec![]);
        let after = set(vec![domain(1, "a.com")]);

        assert!(verdict_flips(
            Configuration::new(&before, true),
            Configuration::new(&after, true),
            "https://a.com/x"
        ));
        assert!(!verdict_flips(
            Configuration::new(&before, true),
            Configuration::new(&after, true),
            "https://b.com/x"
        ));
        // Turning blocking off flips every blocked URL
        assert!(verdict_flips(
            Configuration::new(&after, true),
            Configuration::new(&after, false),
            "https://a.com/x"
        ));
    }

    #[test]
    fn privileged_schemes() {
        let schemes = vec!["chrome://".to_string(), "chrome-extension://".to_string()];
        assert!(is_privileged("chrome://settings", &schemes));
        assert!(is_privileged("chrome-extension://abc/popup.html", &schemes));
        assert!(!is_privileged("https://a.com", &schemes));
    }
}
