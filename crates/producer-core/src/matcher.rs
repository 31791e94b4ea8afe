//! Per-kind rule matching
//!
//! Pure functions. Parse failures never escape: a pattern or candidate that
//! does not parse either falls back to string equality (exact-url rules) or
//! simply does not match.

use producer_api::{Rule, RuleKind};
use url::Url;

use crate::normalizer::{normalize, parse_schemeless, strip_www};
use crate::NormalizedUrl;

/// A navigation target in both forms the matchers need
#[derive(Debug, Clone)]
pub struct Candidate<'a> {
    /// As received; parameter rules read its query string
    pub original: &'a str,
    pub normalized: NormalizedUrl,
}

impl<'a> Candidate<'a> {
    pub fn new(original: &'a str) -> Self {
        Self {
            original,
            normalized: normalize(original),
        }
    }
}

/// Whether `rule` matches the candidate
pub fn matches(candidate: &Candidate<'_>, rule: &Rule) -> bool {
    match &rule.kind {
        RuleKind::Domain { url } => matches_domain(&candidate.normalized, url),
        RuleKind::ExactUrl { url } => matches_exact(&candidate.normalized, url),
        RuleKind::Allow { url } => matches_allow(&candidate.normalized, url),
        RuleKind::AllowByParam {
            param_key,
            param_value,
        } => matches_param(candidate.original, param_key, param_value),
    }
}

/// Domain and every subdomain
pub fn matches_domain(candidate: &NormalizedUrl, pattern: &str) -> bool {
    let Some(parsed) = parse_schemeless(candidate.as_str()) else {
        return false;
    };
    let Some(host) = parsed.host_str() else {
        return false;
    };

    let host = strip_www(host);
    let pattern = pattern.to_lowercase();

    host == pattern
        || host
            .strip_suffix(pattern.as_str())
            .is_some_and(|prefix| prefix.ends_with('.'))
}

/// One exact URL. A bare-domain pattern only covers the root page.
pub fn matches_exact(candidate: &NormalizedUrl, pattern: &str) -> bool {
    let pattern = pattern.to_lowercase();
    let check = candidate.as_str();

    match (parse_schemeless(check), parse_schemeless(&pattern)) {
        (Some(cand), Some(rule)) if is_root_path(rule.path()) => {
            cand.host_str() == rule.host_str() && is_root_path(cand.path())
        }
        _ => check == pattern,
    }
}

/// The pattern and everything under it
pub fn matches_allow(candidate: &NormalizedUrl, pattern: &str) -> bool {
    candidate.as_str().starts_with(&pattern.to_lowercase())
}

/// Query parameter exemption, read from the un-normalized URL
pub fn matches_param(original: &str, key: &str, expected: &str) -> bool {
    let Ok(parsed) = Url::parse(original) else {
        return false;
    };

    let Some(value) = parsed
        .query_pairs()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v)
    else {
        return false;
    };

    expected.is_empty() || value == expected
}

fn is_root_path(path: &str) -> bool {
    path.is_empty() || path == "/"
}

#[cfg(test)]
mod tests {
    use super::*;

    fn norm(s: &str) -> NormalizedUrl {
        normalize(s)
    }

    #[test]
    fn domain_covers_subdomains() {
        for url in [
            "https://example.com",
            "https://www.example.com/",
            "https://a.example.com/x",
            "https://a.b.example.com/?q=1",
        ] {
            assert!(matches_domain(&norm(url), "example.com"), "{}", url);
        }
    }

    #[test]
    fn domain_rejects_lookalikes() {
        assert!(!matches_domain(&norm("https://notexample.com"), "example.com"));
        assert!(!matches_domain(&norm("https://example.com.evil.io"), "example.com"));
    }

    #[test]
    fn domain_pattern_case_insensitive() {
        assert!(matches_domain(&norm("https://Sub.Example.COM"), "EXAMPLE.com"));
    }

    #[test]
    fn domain_unparseable_candidate_does_not_match() {
        assert!(!matches_domain(&norm("not a url at all"), "example.com"));
    }

    #[test]
    fn exact_bare_domain_only_covers_root() {
        assert!(matches_exact(&norm("https://example.com"), "example.com"));
        assert!(matches_exact(&norm("https://example.com/"), "example.com"));
        assert!(matches_exact(&norm("https://www.example.com/"), "example.com/"));
        assert!(!matches_exact(&norm("https://example.com/page"), "example.com"));
        assert!(!matches_exact(&norm("https://sub.example.com/"), "example.com"));
    }

    #[test]
    fn exact_with_path_requires_equality() {
        assert!(matches_exact(&norm("https://a.com/Page"), "a.com/page"));
        assert!(!matches_exact(&norm("https://a.com/page/more"), "a.com/page"));
        assert!(!matches_exact(&norm("https://a.com/page?x=1"), "a.com/page"));
    }

    #[test]
    fn exact_unparseable_pattern_falls_back_to_equality() {
        let candidate = norm("weird value");
        assert!(matches_exact(&candidate, "weird value"));
        assert!(!matches_exact(&candidate, "other value"));
    }

    #[test]
    fn allow_is_prefix() {
        assert!(matches_allow(&norm("https://a.com/docs"), "a.com/docs"));
        assert!(matches_allow(&norm("https://a.com/docs/page"), "a.com/docs"));
        assert!(!matches_allow(&norm("https://a.com/blog"), "a.com/docs"));
    }

    #[test]
    fn param_requires_key() {
        assert!(!matches_param("https://a.com/p", "ok", ""));
        assert!(matches_param("https://a.com/p?ok", "ok", ""));
        assert!(matches_param("https://a.com/p?ok=anything", "ok", ""));
    }

    #[test]
    fn param_value_exact() {
        assert!(matches_param("https://a.com/p?x=2&ok=1", "ok", "1"));
        assert!(!matches_param("https://a.com/p?ok=2", "ok", "1"));
        assert!(!matches_param("https://a.com/p?ok=10", "ok", "1"));
    }

    #[test]
    fn param_uses_first_occurrence() {
        assert!(matches_param("https://a.com/?ok=1&ok=2", "ok", "1"));
        assert!(!matches_param("https://a.com/?ok=2&ok=1", "ok", "1"));
    }

    #[test]
    fn param_value_is_decoded() {
        assert!(matches_param("https://a.com/?tag=a%20b", "tag", "a b"));
    }

    #[test]
    fn param_unparseable_url_does_not_match() {
        assert!(!matches_param("a.com/p?ok=1", "ok", "1"));
    }

    #[test]
    fn dispatch_by_kind() {
        use producer_util::RuleId;

        let rule = Rule::new(
            RuleId::new(1),
            RuleKind::AllowByParam {
                param_key: "ok".into(),
                param_value: "1".into(),
            },
            Default::default(),
        );
        assert!(matches(&Candidate::new("https://a.com/?ok=1"), &rule));
        assert!(!matches(&Candidate::new("https://a.com/?ok=2"), &rule));
    }
}
