//! producer-panel - status and control surface for producerd
//!
//! Short-lived: each invocation connects, does its work and exits. `watch`
//! stays up with its own poll loop until interrupted.

mod actions;
mod client;
mod state;
mod watch;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use producer_api::{RuleDraft, RuleKindTag, RuleSet};
use producer_config::load_config_or_default;
use producer_util::{PRODUCER_SOCKET_ENV, RuleId, default_config_path};
use std::path::PathBuf;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

use crate::client::PanelClient;
use crate::state::{PanelState, overlay_line};

/// producer-panel - Control site blocking and view focus time
#[derive(Parser, Debug)]
#[command(name = "producer-panel")]
#[command(about = "Control site blocking and view focus time", long_about = None)]
struct Args {
    /// Configuration file path (default: ~/.config/producer/config.toml)
    #[arg(short, long, default_value_os_t = default_config_path())]
    config: PathBuf,

    /// Socket path for producerd connection
    #[arg(short, long, env = PRODUCER_SOCKET_ENV)]
    socket: Option<PathBuf>,

    /// Log level
    #[arg(short, long, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Option<PanelCommand>,
}

#[derive(Subcommand, Debug)]
enum PanelCommand {
    /// Show session status (default)
    Status,
    /// Live status until interrupted
    Watch,
    /// Flip blocking on or off
    Toggle,
    /// Turn blocking on and start the session timer
    Start,
    /// Turn blocking off and stop the session timer
    Stop,
    /// Add a domain, url or allow rule
    Add {
        /// domain, url or allow
        kind: RuleKindTag,
        /// Host with optional path; scheme and www. are stripped
        pattern: String,
    },
    /// Exempt blocked pages carrying a query parameter
    AddParam {
        key: String,
        /// Required value; any value when omitted
        value: Option<String>,
    },
    /// Remove a rule by id
    Remove { id: i64 },
    /// List rules
    List,
    /// Remove every rule
    ClearRules,
    /// Reset focus timers and the blocked counter
    ClearInfo,
    /// Merge rules from an export file
    Import { file: PathBuf },
    /// Write rules as JSON (stdout when no file is given)
    Export { file: Option<PathBuf> },
    /// Ask whether a URL would be blocked
    Check {
        url: String,
        /// Count it as a blocked navigation
        #[arg(long)]
        report: bool,
    },
    /// Print a motivational quote
    Quote,
    /// Show controller health
    Health,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let settings = load_config_or_default(&args.config)
        .with_context(|| format!("Failed to load config from {:?}", args.config))?;
    let socket_path = args
        .socket
        .clone()
        .unwrap_or_else(|| settings.daemon.socket_path.clone());

    let command = args.command.unwrap_or(PanelCommand::Status);
    let mut client = PanelClient::connect(&socket_path).await?;

    match command {
        PanelCommand::Status => {
            let state = PanelState::from_view(client.state().await?, Instant::now());
            for line in state.status_lines() {
                println!("{}", line);
            }
        }

        PanelCommand::Watch => watch::run(&socket_path, client, &settings.panel).await?,

        PanelCommand::Toggle => report_producing(actions::set_producing(&mut client, None).await?),
        PanelCommand::Start => {
            report_producing(actions::set_producing(&mut client, Some(true)).await?)
        }
        PanelCommand::Stop => {
            report_producing(actions::set_producing(&mut client, Some(false)).await?)
        }

        PanelCommand::Add { kind, pattern } => {
            let draft = if kind == RuleKindTag::AllowByParam {
                RuleDraft::param(pattern, "")
            } else {
                RuleDraft::pattern(kind, pattern)
            };
            let rule = actions::add_rule(&mut client, draft).await?;
            println!("Rule added: {} {}", rule.tag().label(), rule.kind.describe());
        }

        PanelCommand::AddParam { key, value } => {
            let draft = RuleDraft::param(key, value.unwrap_or_default());
            let rule = actions::add_rule(&mut client, draft).await?;
            println!("Rule added: {} {}", rule.tag().label(), rule.kind.describe());
        }

        PanelCommand::Remove { id } => {
            let rule = actions::remove_rule(&mut client, RuleId::new(id)).await?;
            println!("Rule removed: {}", rule.kind.describe());
        }

        PanelCommand::List => print_rules(&client.state().await?.rules),

        PanelCommand::ClearRules => {
            let count = actions::clear_rules(&mut client).await?;
            println!("All rules cleared ({})", count);
        }

        PanelCommand::ClearInfo => {
            actions::clear_info(&mut client).await?;
            println!("Timers and session blocks cleared");
        }

        PanelCommand::Import { file } => {
            let rules = actions::read_rules_file(&file)?;
            let summary = actions::import_rules(&mut client, rules).await?;
            println!(
                "Imported {} rules ({} duplicates, {} invalid skipped)",
                summary.added, summary.duplicates, summary.invalid
            );
        }

        PanelCommand::Export { file } => {
            let json = actions::export_json(&client.state().await?.rules)?;
            match file {
                Some(path) => {
                    std::fs::write(&path, json)
                        .with_context(|| format!("Failed to write {:?}", path))?;
                    println!("Rules exported to {}", path.display());
                }
                None => println!("{}", json),
            }
        }

        PanelCommand::Check { url, report } => {
            if client.check_block(&url).await? {
                println!("Blocked: {}", url);
                println!("{}", overlay_line(&client.timer_state().await?));
                println!("{}", client.quote().await?);
                if report {
                    client.report_block(&url).await?;
                }
            } else {
                println!("Allowed: {}", url);
            }
        }

        PanelCommand::Quote => println!("{}", client.quote().await?),

        PanelCommand::Health => {
            let health = client.health().await?;
            println!("Live:  {}", health.live);
            println!("Ready:  {}", health.ready);
            println!("Store:  {}", if health.store_ok { "ok" } else { "failing" });
            println!("Rules:  {}", health.rule_count);
            println!("Attached tabs:  {}", health.attached_tabs);
        }
    }

    Ok(())
}

fn report_producing(active: bool) {
    if active {
        println!("Focus mode activated!");
    } else {
        println!("Focus mode deactivated");
    }
}

fn print_rules(rules: &RuleSet) {
    if rules.is_empty() {
        println!("No rules yet. Add or import some rules to get started!");
        return;
    }
    for rule in rules {
        println!(
            "{:>15}  {:<22}  {}",
            rule.id.to_string(),
            rule.tag().label(),
            rule.kind.describe()
        );
    }
}
