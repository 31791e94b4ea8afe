//! Shared utilities for producer
//!
//! This crate provides:
//! - ID types (RuleId, ClientId, TabId)
//! - Wall-clock time in epoch milliseconds, with mock time for development
//! - Duration formatting for the panel and the block overlay
//! - Default paths for socket, config, data, and log directories

mod ids;
mod paths;
mod time;

pub use ids::*;
pub use paths::*;
pub use time::*;
