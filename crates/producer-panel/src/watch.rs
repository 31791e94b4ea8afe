//! Live panel: an independent poll loop plus a push listener
//!
//! Polling is the reliable channel; pushes only lower latency. When readings
//! stop arriving for too long while blocking is on, the panel asks the
//! controller to repair its timer.

use anyhow::Result;
use producer_config::PanelConfig;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, timeout};
use tracing::{debug, info, warn};

use crate::client::PanelClient;
use crate::state::{PanelState, SharedState};

pub async fn run(socket_path: &Path, mut client: PanelClient, config: &PanelConfig) -> Result<()> {
    let view = client.state().await?;
    let shared = SharedState::new(PanelState::from_view(view, Instant::now()));

    // Opening the panel repairs a controller that lost its clock
    if shared.get().is_active {
        client.ensure_timer_running().await?;
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let listener = spawn_push_listener(socket_path.to_path_buf(), shared.clone());
    let poller = spawn_poll_loop(
        socket_path.to_path_buf(),
        client,
        shared.clone(),
        config.clone(),
        shutdown_rx,
    );

    let mut changes = shared.subscribe();
    render(&changes.borrow_and_update());

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                debug!("Interrupted");
                break;
            }
            changed = changes.changed() => {
                if changed.is_err() {
                    break;
                }
                let state = changes.borrow_and_update().clone();
                render(&state);
            }
        }
    }

    // Teardown: nothing keeps running past the panel
    let _ = shutdown_tx.send(true);
    listener.abort();
    if let Err(e) = poller.await {
        debug!(error = %e, "Poll task ended abnormally");
    }
    Ok(())
}

fn render(state: &PanelState) {
    if std::io::stdout().is_terminal() {
        print!("\x1b[2J\x1b[H");
    } else {
        println!();
    }
    for line in state.status_lines() {
        println!("{}", line);
    }
}

fn spawn_push_listener(socket_path: PathBuf, shared: SharedState) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut events = match PanelClient::connect(&socket_path).await {
            Ok(client) => match client.into_inner().subscribe().await {
                Ok(events) => events,
                Err(e) => {
                    warn!(error = %e, "Push subscription failed, relying on polls");
                    return;
                }
            },
            Err(e) => {
                warn!(error = %e, "Push connection failed, relying on polls");
                return;
            }
        };

        loop {
            match events.next().await {
                Ok(event) => {
                    debug!(payload = ?event.payload, "Push received");
                    shared.update(|s| s.apply_event(&event.payload, Instant::now()));
                }
                Err(e) => {
                    debug!(error = %e, "Push stream ended");
                    return;
                }
            }
        }
    })
}

fn spawn_poll_loop(
    socket_path: PathBuf,
    client: PanelClient,
    shared: SharedState,
    config: PanelConfig,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut poller = Poller {
            socket_path,
            client: Some(client),
            request_timeout: config.poll_interval,
        };
        let stale_after = config.stale_after();

        let mut interval = tokio::time::interval(config.poll_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown.changed() => {
                    debug!("Poll loop stopped");
                    return;
                }
                _ = interval.tick() => {
                    poller.poll(&shared).await;

                    if shared.get().is_stale(Instant::now(), stale_after) {
                        warn!(
                            stale_after_ms = stale_after.as_millis() as u64,
                            "Timer updates stopped, asking producerd to restart the timer"
                        );
                        poller.repair().await;
                    }
                }
            }
        }
    })
}

struct Poller {
    socket_path: PathBuf,
    client: Option<PanelClient>,
    request_timeout: Duration,
}

impl Poller {
    async fn client(&mut self) -> Option<&mut PanelClient> {
        if self.client.is_none() {
            match PanelClient::connect(&self.socket_path).await {
                Ok(client) => {
                    info!("Reconnected to producerd");
                    self.client = Some(client);
                }
                Err(e) => {
                    debug!(error = %e, "Reconnect failed");
                    return None;
                }
            }
        }
        self.client.as_mut()
    }

    async fn poll(&mut self, shared: &SharedState) {
        let request_timeout = self.request_timeout;
        let Some(client) = self.client().await else {
            shared.update(|s| std::mem::replace(&mut s.connected, false));
            return;
        };

        let result = timeout(request_timeout, client.timer_state()).await;
        match result {
            Ok(Ok(snapshot)) => {
                shared.update(|s| {
                    s.connected = true;
                    s.apply_timer(snapshot, Instant::now());
                    true
                });
            }
            Ok(Err(e)) => {
                debug!(error = %e, "Poll failed");
                self.client = None;
                shared.update(|s| std::mem::replace(&mut s.connected, false));

                // The controller may have lost its clock; do not wait out the stale window
                if shared.get().is_active {
                    self.repair().await;
                }
            }
            // A late reply would desynchronize the connection
            Err(_) => {
                debug!("Poll timed out");
                self.client = None;
            }
        }
    }

    async fn repair(&mut self) {
        let request_timeout = self.request_timeout;
        let Some(client) = self.client().await else {
            return;
        };
        let result = timeout(request_timeout, client.ensure_timer_running()).await;
        match result {
            Ok(Ok(())) => debug!("Timer repair requested"),
            Ok(Err(e)) => {
                debug!(error = %e, "Timer repair failed");
                self.client = None;
            }
            Err(_) => {
                debug!("Timer repair timed out");
                self.client = None;
            }
        }
    }
}
