//! Mock collaborators for testing

use async_trait::async_trait;
use producer_util::TabId;
use std::sync::Mutex;

use crate::{HostError, HostResult, QuoteSource, TabHost, TabInfo};

/// In-memory tab set that records reloads
#[derive(Default)]
pub struct MockTabHost {
    tabs: Mutex<Vec<TabInfo>>,
    reloaded: Mutex<Vec<TabId>>,
}

impl MockTabHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tabs(tabs: Vec<TabInfo>) -> Self {
        Self {
            tabs: Mutex::new(tabs),
            reloaded: Mutex::new(Vec::new()),
        }
    }

    pub fn open(&self, tab: TabInfo) {
        self.tabs.lock().unwrap().push(tab);
    }

    pub fn close(&self, id: &TabId) {
        self.tabs.lock().unwrap().retain(|t| &t.id != id);
    }

    /// Tabs reloaded so far, in order
    pub fn reloaded(&self) -> Vec<TabId> {
        self.reloaded.lock().unwrap().clone()
    }
}

#[async_trait]
impl TabHost for MockTabHost {
    async fn list_tabs(&self) -> Vec<TabInfo> {
        self.tabs.lock().unwrap().clone()
    }

    async fn reload(&self, tab: &TabId) -> HostResult<()> {
        let known = self.tabs.lock().unwrap().iter().any(|t| &t.id == tab);
        if !known {
            return Err(HostError::TabNotFound(tab.clone()));
        }
        self.reloaded.lock().unwrap().push(tab.clone());
        Ok(())
    }
}

/// Quote source returning a fixed answer
pub struct MockQuoteSource {
    quote: Option<String>,
}

impl MockQuoteSource {
    pub fn returning(quote: impl Into<String>) -> Self {
        Self {
            quote: Some(quote.into()),
        }
    }

    pub fn failing() -> Self {
        Self { quote: None }
    }
}

#[async_trait]
impl QuoteSource for MockQuoteSource {
    async fn fetch_quote(&self) -> HostResult<String> {
        self.quote
            .clone()
            .ok_or_else(|| HostError::Fetch("Mock fetch failure".into()))
    }
}
