//! Tabs attached over IPC
//!
//! A navigation client announces itself with `attachTab` and is detached when
//! its connection drops. Reloading a tab is a `reloadTab` push to that one
//! connection.

use async_trait::async_trait;
use producer_api::{Event, EventPayload};
use producer_host_api::{HostError, HostResult, TabHost, TabInfo};
use producer_ipc::IpcServer;
use producer_util::{ClientId, TabId};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

#[derive(Debug, Clone)]
struct AttachedTab {
    client_id: ClientId,
    url: String,
}

/// Open tabs keyed by the tab id derived from their connection
#[derive(Debug, Default)]
pub struct TabRegistry {
    tabs: RwLock<HashMap<TabId, AttachedTab>>,
}

impl TabRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tab or update its URL
    pub async fn attach(&self, client_id: &ClientId, url: impl Into<String>) -> TabId {
        let id = TabId::from(client_id);
        let url = url.into();
        debug!(tab = %id, url = %url, "Tab attached");

        self.tabs.write().await.insert(
            id.clone(),
            AttachedTab {
                client_id: client_id.clone(),
                url,
            },
        );
        id
    }

    /// Returns whether the client was a tab
    pub async fn detach(&self, client_id: &ClientId) -> bool {
        self.tabs
            .write()
            .await
            .remove(&TabId::from(client_id))
            .is_some()
    }

    pub async fn len(&self) -> usize {
        self.tabs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.tabs.read().await.is_empty()
    }

    pub async fn list(&self) -> Vec<TabInfo> {
        self.tabs
            .read()
            .await
            .iter()
            .map(|(id, tab)| TabInfo::new(id.clone(), tab.url.clone()))
            .collect()
    }

    async fn lookup(&self, id: &TabId) -> Option<AttachedTab> {
        self.tabs.read().await.get(id).cloned()
    }
}

/// `TabHost` over attached IPC clients
pub struct IpcTabHost {
    ipc: Arc<IpcServer>,
    registry: Arc<TabRegistry>,
}

impl IpcTabHost {
    pub fn new(ipc: Arc<IpcServer>, registry: Arc<TabRegistry>) -> Self {
        Self { ipc, registry }
    }
}

#[async_trait]
impl TabHost for IpcTabHost {
    async fn list_tabs(&self) -> Vec<TabInfo> {
        self.registry.list().await
    }

    async fn reload(&self, tab: &TabId) -> HostResult<()> {
        let attached = self
            .registry
            .lookup(tab)
            .await
            .ok_or_else(|| HostError::TabNotFound(tab.clone()))?;

        let event = Event::new(EventPayload::ReloadTab {
            url: attached.url.clone(),
        });

        self.ipc
            .send_event(&attached.client_id, event)
            .await
            .map_err(|e| HostError::Unavailable(e.to_string()))?;

        info!(tab = %tab, url = %attached.url, "Tab reload requested");
        Ok(())
    }
}
