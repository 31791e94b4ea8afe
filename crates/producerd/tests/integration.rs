//! Integration tests for producerd
//!
//! The controller is driven on a virtual clock (explicit timestamps); the
//! service is driven over a real socket in a temporary directory.

use producer_api::{
    Command, EventPayload, Request, ResponsePayload, ResponseResult, Rule, RuleDraft, RuleKind,
    RuleKindTag, RuleSet, TimerSnapshot,
};
use producer_config::Settings;
use producer_core::{Controller, ControllerConfig, EnsureOutcome};
use producer_host_api::MockQuoteSource;
use producer_ipc::{IpcClient, IpcServer};
use producer_store::{SqliteStore, Store, load_state};
use producer_util::{EpochMillis, RuleId};
use producerd::{Service, ServiceParts};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::UnixStream;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

fn t(secs: i64) -> EpochMillis {
    EpochMillis::from_secs(1_700_000_000 + secs)
}

fn rule(id: i64, kind: RuleKind) -> Rule {
    Rule::new(RuleId::new(id), kind, Default::default())
}

#[test]
fn scenario_domain_rule() {
    let store = Arc::new(SqliteStore::in_memory().unwrap());
    let mut controller = Controller::load(store, ControllerConfig::default());
    controller.update_rules(
        RuleSet::from_rules(vec![rule(
            1,
            RuleKind::Domain {
                url: "example.com".into(),
            },
        )]),
        true,
    );

    assert!(controller.should_block("https://sub.example.com/x"));
    assert!(!controller.should_block("https://notexample.com"));
}

#[test]
fn scenario_param_exemption() {
    let store = Arc::new(SqliteStore::in_memory().unwrap());
    let mut controller = Controller::load(store, ControllerConfig::default());
    controller.update_rules(
        RuleSet::from_rules(vec![
            rule(1, RuleKind::Domain { url: "a.com".into() }),
            rule(
                2,
                RuleKind::AllowByParam {
                    param_key: "ok".into(),
                    param_value: "1".into(),
                },
            ),
        ]),
        true,
    );

    assert!(!controller.should_block("https://a.com/p?ok=1"));
    assert!(controller.should_block("https://a.com/p?ok=2"));
    assert!(controller.should_block("https://a.com/p"));
}

#[test]
fn scenario_restart_mid_session() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("producer.db");

    {
        let store = Arc::new(SqliteStore::open(&db_path).unwrap());
        let mut controller = Controller::load(store, ControllerConfig::default());
        controller.update_rules(RuleSet::new(), true);
        controller.start_timer(t(0));
        for s in 1..=60 {
            controller.tick(t(s));
        }
        // Killed without a suspension commit
    }

    let store = Arc::new(SqliteStore::open(&db_path).unwrap());
    let state = load_state(store.as_ref()).unwrap();
    assert_eq!(state.session_start_time, Some(t(0)));
    assert_eq!(state.focused_time, 60);

    let mut controller = Controller::load(store, ControllerConfig::default());
    assert_eq!(controller.ensure_timer_running(t(61)), EnsureOutcome::Started);
    assert_eq!(controller.timer_state(t(90)), TimerSnapshot::new(90, 150));
}

#[test]
fn suspension_commit_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("producer.db");

    {
        let store = Arc::new(SqliteStore::open(&db_path).unwrap());
        let mut controller = Controller::load(store, ControllerConfig::default());
        controller.update_rules(RuleSet::new(), true);
        controller.start_timer(t(0));
        for s in 1..=75 {
            controller.tick(t(s));
        }
        controller.suspend(t(75));
    }

    let store = Arc::new(SqliteStore::open(&db_path).unwrap());
    assert_eq!(load_state(store.as_ref()).unwrap().focused_time, 75);
}

#[test]
fn rules_authored_in_panel_reach_controller() {
    let mut rules = RuleSet::new();
    rules
        .add(RuleDraft::pattern(RuleKindTag::Domain, "https://www.a.com"), t(0))
        .unwrap();
    rules
        .add(RuleDraft::param("ok", ""), t(0))
        .unwrap();

    let store = Arc::new(SqliteStore::in_memory().unwrap());
    let mut controller = Controller::load(store, ControllerConfig::default());
    controller.update_rules(rules, true);

    assert!(controller.should_block("https://a.com/x"));
    assert!(!controller.should_block("https://a.com/x?ok=yes"));
}

// Service over a socket

struct Running {
    _dir: tempfile::TempDir,
    socket_path: PathBuf,
    store: Arc<SqliteStore>,
    stop: oneshot::Sender<()>,
    handle: JoinHandle<anyhow::Result<()>>,
}

async fn start_service() -> Running {
    let dir = tempfile::tempdir().unwrap();
    let socket_path = dir.path().join("producerd.sock");
    let store = Arc::new(SqliteStore::open(dir.path().join("producer.db")).unwrap());

    let mut ipc = IpcServer::new(&socket_path);
    ipc.start().await.unwrap();

    let service = Service::new(ServiceParts {
        settings: Settings::default(),
        store: store.clone(),
        ipc,
        quotes: Arc::new(MockQuoteSource::failing()),
    });

    let (stop, stopped) = oneshot::channel::<()>();
    let handle = tokio::spawn(service.run(async move {
        let _ = stopped.await;
    }));

    Running {
        _dir: dir,
        socket_path,
        store,
        stop,
        handle,
    }
}

async fn call(client: &mut IpcClient, command: Command) -> ResponsePayload {
    tokio::time::timeout(Duration::from_secs(5), client.call(command))
        .await
        .expect("response timed out")
        .unwrap()
}

async fn connect(path: &Path) -> IpcClient {
    IpcClient::connect(path).await.unwrap()
}

#[tokio::test]
async fn ipc_round_trip() {
    let running = start_service().await;
    let mut client = connect(&running.socket_path).await;

    assert_eq!(call(&mut client, Command::Ping).await, ResponsePayload::Pong);

    let rules = RuleSet::from_rules(vec![rule(1, RuleKind::Domain { url: "a.com".into() })]);
    call(
        &mut client,
        Command::UpdateRules {
            rules,
            is_active: true,
        },
    )
    .await;

    assert_eq!(
        call(
            &mut client,
            Command::CheckBlock {
                url: "https://www.a.com/feed".into()
            }
        )
        .await,
        ResponsePayload::BlockVerdict { should_block: true }
    );

    call(
        &mut client,
        Command::ReportBlock {
            url: "https://a.com".into(),
        },
    )
    .await;

    let ResponsePayload::State(state) = call(&mut client, Command::GetState).await else {
        panic!("expected state");
    };
    assert!(state.is_active);
    assert_eq!(state.session_blocks, 1);

    running.stop.send(()).unwrap();
    running.handle.await.unwrap().unwrap();

    let persisted = load_state(running.store.as_ref()).unwrap();
    assert!(persisted.is_active);
    assert_eq!(persisted.rules.len(), 1);
    assert!(!running.socket_path.exists());
}

#[tokio::test]
async fn quote_falls_back_on_fetch_failure() {
    let running = start_service().await;
    let mut client = connect(&running.socket_path).await;

    let payload = call(&mut client, Command::GetMotivationalQuote).await;
    assert_eq!(
        payload,
        ResponsePayload::Quote {
            success: true,
            quote: Settings::default().quotes.fallback,
        }
    );
}

#[tokio::test]
async fn reset_pushes_zeroed_counters_to_subscribers() {
    let running = start_service().await;
    let mut events = connect(&running.socket_path)
        .await
        .subscribe()
        .await
        .unwrap();
    let mut client = connect(&running.socket_path).await;

    call(&mut client, Command::ResetSessionBlocks).await;
    call(&mut client, Command::ClearTimers).await;

    let mut seen = Vec::new();
    while seen.len() < 2 {
        let event = tokio::time::timeout(Duration::from_secs(5), events.next())
            .await
            .expect("push timed out")
            .unwrap();
        seen.push(event.payload);
    }

    assert_eq!(
        seen,
        vec![
            EventPayload::UpdateBlockCount { count: 0 },
            EventPayload::TimerUpdate(TimerSnapshot::zero()),
        ]
    );
}

#[tokio::test]
async fn only_flipped_tabs_receive_reload() {
    let running = start_service().await;

    let mut blocked_tab = connect(&running.socket_path).await;
    call(
        &mut blocked_tab,
        Command::AttachTab {
            url: "https://a.com/x".into(),
        },
    )
    .await;

    let mut other_tab = connect(&running.socket_path).await;
    call(
        &mut other_tab,
        Command::AttachTab {
            url: "https://b.com/".into(),
        },
    )
    .await;

    let mut panel = connect(&running.socket_path).await;
    let after = RuleSet::from_rules(vec![rule(1, RuleKind::Domain { url: "a.com".into() })]);
    let payload = call(
        &mut panel,
        Command::ReloadAffectedTabs {
            rules_before: RuleSet::new(),
            rules_after: after,
            is_active_before: true,
            is_active_after: true,
        },
    )
    .await;
    assert_eq!(payload, ResponsePayload::TabsReloaded { count: 1 });

    let mut pushes = blocked_tab.into_events();
    let event = tokio::time::timeout(Duration::from_secs(5), pushes.next())
        .await
        .expect("reload push timed out")
        .unwrap();
    assert_eq!(
        event.payload,
        EventPayload::ReloadTab {
            url: "https://a.com/x".into()
        }
    );

    // The untouched tab sees nothing but its own responses
    assert_eq!(call(&mut other_tab, Command::Ping).await, ResponsePayload::Pong);
}

#[tokio::test]
async fn wire_format_is_camel_case_ndjson() {
    let running = start_service().await;
    let stream = UnixStream::connect(&running.socket_path).await.unwrap();
    let (read_half, mut write_half) = stream.into_split();
    let mut reader = BufReader::new(read_half);

    let mut line = serde_json::to_string(&Request::new(9, Command::GetTimerState)).unwrap();
    assert!(line.contains(r#""action":"getTimerState""#));
    line.push('\n');
    write_half.write_all(line.as_bytes()).await.unwrap();

    let mut reply = String::new();
    tokio::time::timeout(Duration::from_secs(5), reader.read_line(&mut reply))
        .await
        .unwrap()
        .unwrap();

    let value: serde_json::Value = serde_json::from_str(reply.trim()).unwrap();
    assert_eq!(value["request_id"], 9);
    assert_eq!(value["result"]["ok"]["sessionTime"], 0);
    assert_eq!(value["result"]["ok"]["focusedTime"], 0);
}

#[tokio::test]
async fn unsupported_version_is_rejected() {
    let running = start_service().await;
    let stream = UnixStream::connect(&running.socket_path).await.unwrap();
    let (read_half, mut write_half) = stream.into_split();
    let mut reader = BufReader::new(read_half);

    let mut request = Request::new(1, Command::Ping);
    request.api_version = 99;
    let mut line = serde_json::to_string(&request).unwrap();
    line.push('\n');
    write_half.write_all(line.as_bytes()).await.unwrap();

    let mut reply = String::new();
    tokio::time::timeout(Duration::from_secs(5), reader.read_line(&mut reply))
        .await
        .unwrap()
        .unwrap();

    let response: producer_api::Response = serde_json::from_str(reply.trim()).unwrap();
    let ResponseResult::Err(error) = response.result else {
        panic!("expected error");
    };
    assert_eq!(error.code, producer_api::ErrorCode::UnsupportedVersion);
}

#[tokio::test]
async fn store_is_healthy_while_serving() {
    let running = start_service().await;
    let mut client = connect(&running.socket_path).await;
    let ResponsePayload::Health(health) = call(&mut client, Command::GetHealth).await else {
        panic!("expected health");
    };
    assert!(health.store_ok);
    assert!(running.store.is_healthy());
}
