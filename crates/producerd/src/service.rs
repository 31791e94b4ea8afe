//! The controller service loop
//!
//! One task owns the `Controller`. Requests, ticks and shutdown are handled
//! one at a time in a `select!` loop, so no handler ever interleaves with
//! another. Only the quote lookup leaves the loop, on its own task.

use anyhow::{Context, Result};
use producer_api::{
    API_VERSION, Command, ErrorCode, ErrorInfo, Event, EventPayload, HealthStatus, Response,
    ResponsePayload, RuleSet,
};
use producer_config::Settings;
use producer_core::{Configuration, Controller, ControllerConfig, CoreEvent};
use producer_host_api::{QuoteSource, TabHost, quote_or_fallback};
use producer_ipc::{IpcServer, ServerMessage};
use producer_store::Store;
use producer_util::{ClientId, EpochMillis};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::tabs::{IpcTabHost, TabRegistry};

/// Everything the service needs, already constructed
pub struct ServiceParts {
    pub settings: Settings,
    pub store: Arc<dyn Store>,
    /// Started (bound) but not yet accepting
    pub ipc: IpcServer,
    pub quotes: Arc<dyn QuoteSource>,
}

pub struct Service {
    controller: Controller,
    ipc: Arc<IpcServer>,
    registry: Arc<TabRegistry>,
    tab_host: Arc<dyn TabHost>,
    quotes: Arc<dyn QuoteSource>,
    quote_fallback: String,
    tick_interval: Duration,
    /// Present exactly while the controller's timer is ticking
    ticker: Option<Interval>,
}

impl Service {
    /// Load state and run the startup hook. State is in memory before the
    /// first request is accepted.
    pub fn new(parts: ServiceParts) -> Self {
        let ServiceParts {
            settings,
            store,
            ipc,
            quotes,
        } = parts;

        let mut controller = Controller::load(store, ControllerConfig::from_settings(&settings));
        let startup_events = controller.on_startup(EpochMillis::now());

        let ipc = Arc::new(ipc);
        let registry = Arc::new(TabRegistry::new());
        let tab_host: Arc<dyn TabHost> = Arc::new(IpcTabHost::new(ipc.clone(), registry.clone()));

        let mut service = Self {
            controller,
            ipc,
            registry,
            tab_host,
            quotes,
            quote_fallback: settings.quotes.fallback.clone(),
            tick_interval: settings.timer.tick_interval,
            ticker: None,
        };

        service.publish(startup_events);
        service.sync_ticker();
        service
    }

    /// Swap the tab host, for driving reloads without live connections
    pub fn with_tab_host(mut self, tab_host: Arc<dyn TabHost>) -> Self {
        self.tab_host = tab_host;
        self
    }

    pub fn controller(&self) -> &Controller {
        &self.controller
    }

    pub fn ipc(&self) -> &Arc<IpcServer> {
        &self.ipc
    }

    /// Serve until `shutdown` resolves, then commit and tear down
    pub async fn run(mut self, shutdown: impl Future<Output = ()>) -> Result<()> {
        let mut ipc_messages = self
            .ipc
            .take_message_receiver()
            .await
            .context("IPC message receiver already taken")?;

        let ipc_accept = self.ipc.clone();
        let accept_handle = tokio::spawn(async move {
            if let Err(e) = ipc_accept.run().await {
                error!(error = %e, "IPC server error");
            }
        });

        tokio::pin!(shutdown);

        info!("Service running");

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Shutdown requested");
                    break;
                }

                _ = next_tick(&mut self.ticker) => {
                    let events = self.controller.tick(EpochMillis::now());
                    self.publish(events);
                }

                msg = ipc_messages.recv() => {
                    let Some(msg) = msg else {
                        warn!("IPC message channel closed");
                        break;
                    };
                    self.handle_ipc_message(msg).await;
                }
            }
        }

        self.shutdown();
        accept_handle.abort();

        info!("Shutdown complete");
        Ok(())
    }

    fn shutdown(&mut self) {
        // The suspension commit is the last write
        self.controller.suspend(EpochMillis::now());
        self.ticker = None;
        self.ipc.broadcast_event(Event::new(EventPayload::Shutdown));
        self.ipc.shutdown();
    }

    async fn handle_ipc_message(&mut self, msg: ServerMessage) {
        match msg {
            ServerMessage::Request { client_id, request } => {
                if request.api_version != API_VERSION {
                    let response = Response::error(
                        request.request_id,
                        ErrorInfo::new(
                            ErrorCode::UnsupportedVersion,
                            format!(
                                "API version {} not supported (expected {})",
                                request.api_version, API_VERSION
                            ),
                        ),
                    );
                    self.respond(&client_id, response).await;
                    return;
                }

                if let Some(response) = self
                    .handle_command(&client_id, request.request_id, request.command)
                    .await
                {
                    self.respond(&client_id, response).await;
                }
                self.sync_ticker();
            }

            ServerMessage::ClientConnected { client_id, info } => {
                debug!(client_id = %client_id, uid = ?info.uid, "Client registered");
            }

            ServerMessage::ClientDisconnected { client_id } => {
                if self.registry.detach(&client_id).await {
                    debug!(client_id = %client_id, "Tab detached");
                } else {
                    debug!(client_id = %client_id, "Client disconnected");
                }
            }
        }
    }

    /// Serve one command. `None` when the response is sent from elsewhere.
    pub async fn handle_command(
        &mut self,
        client_id: &ClientId,
        request_id: u64,
        command: Command,
    ) -> Option<Response> {
        let now = EpochMillis::now();
        let ack = || Response::success(request_id, ResponsePayload::Ack { success: true });

        let response = match command {
            Command::CheckBlock { url } => Response::success(
                request_id,
                ResponsePayload::BlockVerdict {
                    should_block: self.controller.should_block(&url),
                },
            ),

            Command::UpdateRules { rules, is_active } => {
                let events = self.controller.update_rules(rules, is_active);
                self.publish(events);
                ack()
            }

            Command::ReloadAffectedTabs {
                rules_before,
                rules_after,
                is_active_before,
                is_active_after,
            } => {
                let count = self
                    .reload_affected_tabs(
                        &rules_before,
                        &rules_after,
                        is_active_before,
                        is_active_after,
                    )
                    .await;
                Response::success(request_id, ResponsePayload::TabsReloaded { count })
            }

            Command::StartTimer => {
                self.controller.start_timer(now);
                ack()
            }

            Command::StopTimer => {
                self.controller.stop_timer(now);
                ack()
            }

            Command::EnsureTimerRunning => {
                self.controller.ensure_timer_running(now);
                ack()
            }

            Command::GetTimerState => Response::success(
                request_id,
                ResponsePayload::TimerState(self.controller.timer_state(now)),
            ),

            Command::ClearTimers => {
                let events = self.controller.clear_timers(now);
                self.publish(events);
                ack()
            }

            Command::ResetSessionBlocks => {
                let events = self.controller.reset_session_blocks();
                self.publish(events);
                ack()
            }

            Command::ReportBlock { url } => {
                let events = self.controller.report_block(&url);
                self.publish(events);
                ack()
            }

            Command::GetState => Response::success(
                request_id,
                ResponsePayload::State(self.controller.state_view(now)),
            ),

            Command::GetMotivationalQuote => {
                self.spawn_quote_lookup(client_id.clone(), request_id);
                return None;
            }

            Command::AttachTab { url } => {
                self.registry.attach(client_id, url).await;
                ack()
            }

            Command::SubscribeEvents => Response::success(
                request_id,
                ResponsePayload::Subscribed {
                    client_id: client_id.clone(),
                },
            ),

            Command::UnsubscribeEvents => {
                Response::success(request_id, ResponsePayload::Unsubscribed)
            }

            Command::GetHealth => {
                let health = HealthStatus {
                    live: true,
                    ready: true,
                    store_ok: self.controller.store_healthy(),
                    rule_count: self.controller.rules().len(),
                    attached_tabs: self.registry.len().await,
                };
                Response::success(request_id, ResponsePayload::Health(health))
            }

            Command::Ping => Response::success(request_id, ResponsePayload::Pong),
        };

        Some(response)
    }

    /// Reload the tabs whose verdict differs between the two configurations
    async fn reload_affected_tabs(
        &self,
        rules_before: &RuleSet,
        rules_after: &RuleSet,
        is_active_before: bool,
        is_active_after: bool,
    ) -> usize {
        let tabs = self.tab_host.list_tabs().await;
        let affected = self.controller.tabs_to_reload(
            tabs.iter().map(|t| (&t.id, t.url.as_str())),
            Configuration::new(rules_before, is_active_before),
            Configuration::new(rules_after, is_active_after),
        );

        let mut reloaded = 0;
        for tab in &affected {
            match self.tab_host.reload(tab).await {
                Ok(()) => reloaded += 1,
                // The tab may have closed in the meantime
                Err(e) => debug!(tab = %tab, error = %e, "Tab reload skipped"),
            }
        }

        info!(
            open_tabs = tabs.len(),
            affected = affected.len(),
            reloaded,
            "Affected tabs reloaded"
        );
        reloaded
    }

    fn spawn_quote_lookup(&self, client_id: ClientId, request_id: u64) {
        let quotes = self.quotes.clone();
        let fallback = self.quote_fallback.clone();
        let ipc = self.ipc.clone();

        tokio::spawn(async move {
            let quote = quote_or_fallback(quotes.as_ref(), &fallback).await;
            let response = Response::success(
                request_id,
                ResponsePayload::Quote {
                    success: true,
                    quote,
                },
            );
            if let Err(e) = ipc.send_response(&client_id, response).await {
                debug!(client_id = %client_id, error = %e, "Quote response undeliverable");
            }
        });
    }

    async fn respond(&self, client_id: &ClientId, response: Response) {
        if let Err(e) = self.ipc.send_response(client_id, response).await {
            debug!(client_id = %client_id, error = %e, "Response undeliverable");
        }
    }

    /// Push controller events to subscribers; nobody listening is fine
    fn publish(&self, events: Vec<CoreEvent>) {
        for event in events {
            self.ipc.broadcast_event(Event::new(to_payload(event)));
        }
    }

    /// Schedule or cancel the tick to follow the controller's timer
    fn sync_ticker(&mut self) {
        match (self.controller.is_ticking(), self.ticker.is_some()) {
            (true, false) => {
                let mut interval =
                    tokio::time::interval_at(Instant::now() + self.tick_interval, self.tick_interval);
                interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
                self.ticker = Some(interval);
                debug!(interval_ms = self.tick_interval.as_millis() as u64, "Tick scheduled");
            }
            (false, true) => {
                self.ticker = None;
                debug!("Tick cancelled");
            }
            _ => {}
        }
    }
}

pub fn to_payload(event: CoreEvent) -> EventPayload {
    match event {
        CoreEvent::TimerUpdate(snapshot) => EventPayload::TimerUpdate(snapshot),
        CoreEvent::BlockCountChanged { count } => EventPayload::UpdateBlockCount { count },
        CoreEvent::RulesUpdated {
            rule_count,
            is_active,
        } => EventPayload::RulesChanged {
            rule_count,
            is_active,
        },
    }
}

async fn next_tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending().await,
    }
}
