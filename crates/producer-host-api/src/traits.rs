//! Collaborator traits

use async_trait::async_trait;
use producer_util::TabId;
use thiserror::Error;
use tracing::warn;

/// Errors from collaborator operations
#[derive(Debug, Error)]
pub enum HostError {
    #[error("Tab not found: {0}")]
    TabNotFound(TabId),

    /// The other end is gone; expected when a tab closes mid-operation
    #[error("Channel unavailable: {0}")]
    Unavailable(String),

    #[error("Fetch failed: {0}")]
    Fetch(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type HostResult<T> = Result<T, HostError>;

/// An open tab as the controller sees it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TabInfo {
    pub id: TabId,
    /// Current URL; may be empty before the first navigation
    pub url: String,
}

impl TabInfo {
    pub fn new(id: TabId, url: impl Into<String>) -> Self {
        Self {
            id,
            url: url.into(),
        }
    }
}

/// The set of open tabs
#[async_trait]
pub trait TabHost: Send + Sync {
    async fn list_tabs(&self) -> Vec<TabInfo>;

    /// Force a tab to navigate to its current URL again
    async fn reload(&self, tab: &TabId) -> HostResult<()>;
}

/// Motivational quote lookup
#[async_trait]
pub trait QuoteSource: Send + Sync {
    async fn fetch_quote(&self) -> HostResult<String>;
}

/// Fetch a quote, substituting `fallback` on any failure
pub async fn quote_or_fallback(source: &dyn QuoteSource, fallback: &str) -> String {
    match source.fetch_quote().await {
        Ok(quote) if !quote.trim().is_empty() => quote,
        Ok(_) => fallback.to_string(),
        Err(e) => {
            warn!(error = %e, "Quote lookup failed, using fallback");
            fallback.to_string()
        }
    }
}
