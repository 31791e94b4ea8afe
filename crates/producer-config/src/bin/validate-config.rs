//! Config validation CLI tool
//!
//! Validates a producerd configuration file and reports any errors.

use producer_util::default_config_path;
use std::path::PathBuf;
use std::process::ExitCode;

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().collect();

    let config_path = match args.get(1) {
        Some(path) => PathBuf::from(path),
        None => {
            let default_path = default_config_path();
            eprintln!("Usage: validate-config [config-file]");
            eprintln!();
            eprintln!("Validates a producerd configuration file.");
            eprintln!();
            eprintln!("If no path is provided, uses: {}", default_path.display());
            return ExitCode::from(2);
        }
    };

    if !config_path.exists() {
        eprintln!("Error: Configuration file not found: {}", config_path.display());
        return ExitCode::from(1);
    }

    match producer_config::load_config(&config_path) {
        Ok(settings) => {
            println!("✓ Configuration is valid");
            println!();
            println!("Summary:");
            println!("  Config version: {}", producer_config::CURRENT_CONFIG_VERSION);
            println!("  Socket: {}", settings.daemon.socket_path.display());
            println!("  Data dir: {}", settings.daemon.data_dir.display());
            println!(
                "  Timer: tick {:?}, commit every {}s",
                settings.timer.tick_interval, settings.timer.commit_every_seconds
            );
            println!(
                "  Panel: poll {:?}, stale after {:?}",
                settings.panel.poll_interval,
                settings.panel.stale_after()
            );
            println!(
                "  Privileged schemes: {}",
                settings.tabs.privileged_schemes.join(", ")
            );
            println!("  Quotes: {} (timeout {:?})", settings.quotes.url, settings.quotes.timeout);

            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("✗ Configuration validation failed");
            eprintln!();
            match &e {
                producer_config::ConfigError::ReadError(io_err) => {
                    eprintln!("Failed to read file: {}", io_err);
                }
                producer_config::ConfigError::ParseError(parse_err) => {
                    eprintln!("TOML parse error:");
                    eprintln!("  {}", parse_err);
                }
                producer_config::ConfigError::ValidationFailed { errors } => {
                    eprintln!("Validation errors ({}):", errors.len());
                    for err in errors {
                        eprintln!("  - {}", err);
                    }
                }
                producer_config::ConfigError::UnsupportedVersion(ver) => {
                    eprintln!(
                        "Unsupported config version: {} (expected {})",
                        ver,
                        producer_config::CURRENT_CONFIG_VERSION
                    );
                }
            }
            ExitCode::from(1)
        }
    }
}
