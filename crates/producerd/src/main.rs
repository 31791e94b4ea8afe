//! producerd - the producer background controller
//!
//! Loads configuration, opens the state store, binds the IPC socket and hands
//! everything to the service loop. SIGTERM, SIGINT and SIGHUP commit the
//! running focus total before exit.

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use producer_config::load_config_or_default;
use producer_host_net::HttpQuoteSource;
use producer_ipc::IpcServer;
use producer_store::{SqliteStore, Store};
use producer_util::{PRODUCER_DATA_DIR_ENV, PRODUCER_SOCKET_ENV, default_config_path};
use producerd::{Service, ServiceParts};
use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tokio::signal::unix::{SignalKind, signal};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// producerd - Site blocking and focus timer controller
#[derive(Parser, Debug)]
#[command(name = "producerd")]
#[command(about = "Site blocking and focus timer controller", long_about = None)]
struct Args {
    /// Configuration file path (default: ~/.config/producer/config.toml)
    #[arg(short, long, default_value_os_t = default_config_path())]
    config: PathBuf,

    /// Socket path override
    #[arg(short, long, env = PRODUCER_SOCKET_ENV)]
    socket: Option<PathBuf>,

    /// Data directory override
    #[arg(short, long, env = PRODUCER_DATA_DIR_ENV)]
    data_dir: Option<PathBuf>,

    /// Log level
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Log line format
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    /// Append logs to producerd.log in the configured log directory
    #[arg(long)]
    log_to_file: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

fn init_logging(args: &Args, log_dir: &std::path::Path) -> Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    if args.log_to_file {
        std::fs::create_dir_all(log_dir)
            .with_context(|| format!("Failed to create log directory {:?}", log_dir))?;
        let path = log_dir.join("producerd.log");
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("Failed to open log file {:?}", path))?;
        let builder = builder.with_ansi(false).with_writer(Mutex::new(file));

        match args.log_format {
            LogFormat::Text => builder.init(),
            LogFormat::Json => builder.json().init(),
        }
    } else {
        match args.log_format {
            LogFormat::Text => builder.init(),
            LogFormat::Json => builder.json().init(),
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let settings = load_config_or_default(&args.config)
        .with_context(|| format!("Failed to load config from {:?}", args.config))?;

    init_logging(&args, &settings.daemon.log_dir)?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        config_path = %args.config.display(),
        "producerd starting"
    );

    let socket_path = args
        .socket
        .clone()
        .unwrap_or_else(|| settings.daemon.socket_path.clone());
    let data_dir = args
        .data_dir
        .clone()
        .unwrap_or_else(|| settings.daemon.data_dir.clone());

    let db_path = data_dir.join("producer.db");
    let store: Arc<dyn Store> = Arc::new(
        SqliteStore::open(&db_path)
            .with_context(|| format!("Failed to open database {:?}", db_path))?,
    );
    info!(db_path = %db_path.display(), "Store initialized");

    let quotes = Arc::new(
        HttpQuoteSource::from_config(&settings.quotes)
            .context("Failed to build quote client")?,
    );

    let mut ipc = IpcServer::new(&socket_path);
    ipc.start()
        .await
        .with_context(|| format!("Failed to bind {:?}", socket_path))?;

    let service = Service::new(ServiceParts {
        settings,
        store,
        ipc,
        quotes,
    });

    // Installed before serving so no signal is missed
    let mut sigterm =
        signal(SignalKind::terminate()).context("Failed to create SIGTERM handler")?;
    let mut sigint =
        signal(SignalKind::interrupt()).context("Failed to create SIGINT handler")?;
    let mut sighup = signal(SignalKind::hangup()).context("Failed to create SIGHUP handler")?;

    service
        .run(async move {
            tokio::select! {
                _ = sigterm.recv() => info!("Received SIGTERM, shutting down gracefully"),
                _ = sigint.recv() => info!("Received SIGINT, shutting down gracefully"),
                _ = sighup.recv() => info!("Received SIGHUP, shutting down gracefully"),
            }
        })
        .await
}
