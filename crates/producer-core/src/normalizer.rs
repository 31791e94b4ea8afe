//! URL normalization
//!
//! Matching works on `hostname + path + query` with a leading `www.`
//! removed and everything lowercased. Parsing never fails outward: input
//! that is not a URL degrades to a string strip of the scheme and `www.`.

use std::fmt;
use url::Url;

/// Lowercased `host + path + query` form of a navigation target
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NormalizedUrl(String);

impl NormalizedUrl {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for NormalizedUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for NormalizedUrl {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Normalize a navigation target for rule matching
pub fn normalize(raw: &str) -> NormalizedUrl {
    let cleaned = match Url::parse(raw) {
        Ok(parsed) => {
            let mut out = String::with_capacity(raw.len());
            out.push_str(parsed.host_str().unwrap_or_default());
            out.push_str(parsed.path());
            if let Some(query) = parsed.query().filter(|q| !q.is_empty()) {
                out.push('?');
                out.push_str(query);
            }
            strip_www(&out).to_string()
        }
        Err(_) => strip_www(strip_scheme(raw)).to_string(),
    };

    NormalizedUrl(cleaned.to_lowercase())
}

/// Parse a scheme-less `host/path` string as an https URL
pub(crate) fn parse_schemeless(s: &str) -> Option<Url> {
    Url::parse(&format!("https://{}", s)).ok()
}

fn strip_scheme(s: &str) -> &str {
    s.strip_prefix("https://")
        .or_else(|| s.strip_prefix("http://"))
        .unwrap_or(s)
}

pub(crate) fn strip_www(s: &str) -> &str {
    s.strip_prefix("www.").unwrap_or(s)
}
