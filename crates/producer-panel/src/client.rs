//! Typed request helpers over the producerd socket

use anyhow::{Context, Result, bail};
use producer_api::{Command, HealthStatus, ResponsePayload, RuleSet, StateView, TimerSnapshot};
use producer_ipc::IpcClient;
use std::path::Path;
use tracing::debug;

pub struct PanelClient {
    inner: IpcClient,
}

impl PanelClient {
    pub async fn connect(socket_path: impl AsRef<Path>) -> Result<Self> {
        let socket_path = socket_path.as_ref();
        let inner = IpcClient::connect(socket_path)
            .await
            .with_context(|| format!("Failed to connect to producerd at {:?}", socket_path))?;
        Ok(Self { inner })
    }

    async fn call(&mut self, command: Command) -> Result<ResponsePayload> {
        debug!(?command, "Sending");
        self.inner
            .call(command)
            .await
            .context("Request to producerd failed")
    }

    async fn ack(&mut self, command: Command) -> Result<()> {
        match self.call(command).await? {
            ResponsePayload::Ack { success: true } => Ok(()),
            ResponsePayload::Ack { success: false } => bail!("producerd rejected the request"),
            other => bail!("Unexpected response: {:?}", other),
        }
    }

    pub async fn state(&mut self) -> Result<StateView> {
        match self.call(Command::GetState).await? {
            ResponsePayload::State(view) => Ok(view),
            other => bail!("Unexpected response: {:?}", other),
        }
    }

    pub async fn timer_state(&mut self) -> Result<TimerSnapshot> {
        match self.call(Command::GetTimerState).await? {
            ResponsePayload::TimerState(snapshot) => Ok(snapshot),
            other => bail!("Unexpected response: {:?}", other),
        }
    }

    pub async fn update_rules(&mut self, rules: &RuleSet, is_active: bool) -> Result<()> {
        self.ack(Command::UpdateRules {
            rules: rules.clone(),
            is_active,
        })
        .await
    }

    pub async fn reload_affected_tabs(
        &mut self,
        rules_before: &RuleSet,
        rules_after: &RuleSet,
        is_active_before: bool,
        is_active_after: bool,
    ) -> Result<usize> {
        let command = Command::ReloadAffectedTabs {
            rules_before: rules_before.clone(),
            rules_after: rules_after.clone(),
            is_active_before,
            is_active_after,
        };
        match self.call(command).await? {
            ResponsePayload::TabsReloaded { count } => Ok(count),
            other => bail!("Unexpected response: {:?}", other),
        }
    }

    pub async fn start_timer(&mut self) -> Result<()> {
        self.ack(Command::StartTimer).await
    }

    pub async fn stop_timer(&mut self) -> Result<()> {
        self.ack(Command::StopTimer).await
    }

    pub async fn ensure_timer_running(&mut self) -> Result<()> {
        self.ack(Command::EnsureTimerRunning).await
    }

    pub async fn clear_timers(&mut self) -> Result<()> {
        self.ack(Command::ClearTimers).await
    }

    pub async fn reset_session_blocks(&mut self) -> Result<()> {
        self.ack(Command::ResetSessionBlocks).await
    }

    pub async fn report_block(&mut self, url: &str) -> Result<()> {
        self.ack(Command::ReportBlock { url: url.into() }).await
    }

    pub async fn check_block(&mut self, url: &str) -> Result<bool> {
        match self.call(Command::CheckBlock { url: url.into() }).await? {
            ResponsePayload::BlockVerdict { should_block } => Ok(should_block),
            other => bail!("Unexpected response: {:?}", other),
        }
    }

    pub async fn quote(&mut self) -> Result<String> {
        match self.call(Command::GetMotivationalQuote).await? {
            ResponsePayload::Quote { quote, .. } => Ok(quote),
            other => bail!("Unexpected response: {:?}", other),
        }
    }

    pub async fn health(&mut self) -> Result<HealthStatus> {
        match self.call(Command::GetHealth).await? {
            ResponsePayload::Health(health) => Ok(health),
            other => bail!("Unexpected response: {:?}", other),
        }
    }

    pub fn into_inner(self) -> IpcClient {
        self.inner
    }
}
