//! Configuration validation

use crate::schema::RawConfig;
use thiserror::Error;

/// Validation error
#[derive(Debug, Clone, Error)]
pub enum ValidationError {
    #[error("[{section}] {field}: {message}")]
    FieldError {
        section: &'static str,
        field: &'static str,
        message: String,
    },

    #[error("Commit interval {commit_every_seconds}s is not a whole number of {tick_ms}ms ticks")]
    CommitNotTickAligned { commit_every_seconds: u64, tick_ms: u64 },
}

impl ValidationError {
    fn field(section: &'static str, field: &'static str, message: impl Into<String>) -> Self {
        Self::FieldError {
            section,
            field,
            message: message.into(),
        }
    }
}

/// Validate a raw configuration, collecting every problem
pub fn validate_config(config: &RawConfig) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    let tick_ms = config.timer.tick_interval_ms;
    if tick_ms == Some(0) {
        errors.push(ValidationError::field(
            "timer",
            "tick_interval_ms",
            "must be greater than zero",
        ));
    }

    match config.timer.commit_every_seconds {
        Some(0) => errors.push(ValidationError::field(
            "timer",
            "commit_every_seconds",
            "must be greater than zero",
        )),
        Some(secs) => {
            if let Some(tick) = tick_ms.filter(|t| *t > 0) {
                if (secs * 1000) % tick != 0 {
                    errors.push(ValidationError::CommitNotTickAligned {
                        commit_every_seconds: secs,
                        tick_ms: tick,
                    });
                }
            }
        }
        None => {}
    }

    if config.panel.poll_interval_ms == Some(0) {
        errors.push(ValidationError::field(
            "panel",
            "poll_interval_ms",
            "must be greater than zero",
        ));
    }

    if config.panel.stale_after_polls == Some(0) {
        errors.push(ValidationError::field(
            "panel",
            "stale_after_polls",
            "must be greater than zero",
        ));
    }

    if let Some(schemes) = &config.tabs.privileged_schemes {
        if schemes.iter().any(|s| s.trim().is_empty()) {
            errors.push(ValidationError::field(
                "tabs",
                "privileged_schemes",
                "entries cannot be empty",
            ));
        }
    }

    if let Some(url) = &config.quotes.url {
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            errors.push(ValidationError::field(
                "quotes",
                "url",
                format!("'{}' is not an http(s) URL", url),
            ));
        }
    }

    if config.quotes.timeout_seconds == Some(0) {
        errors.push(ValidationError::field(
            "quotes",
            "timeout_seconds",
            "must be greater than zero",
        ));
    }

    if let Some(fallback) = &config.quotes.fallback {
        if fallback.trim().is_empty() {
            errors.push(ValidationError::field(
                "quotes",
                "fallback",
                "cannot be empty",
            ));
        }
    }

    errors
}
