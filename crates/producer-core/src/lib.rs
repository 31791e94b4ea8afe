//! Block decision engine and session timer for producerd
//!
//! This crate is the heart of producerd, containing:
//! - URL normalization and per-kind rule matching
//! - The block decision (allow > domain/url block > parameter exemption > default allow)
//! - Session timer state machine (Idle <-> Running) with amortized commits
//! - The controller owning all mutable extension state

mod controller;
mod decision;
mod events;
mod matcher;
mod normalizer;
mod timer;

pub use controller::*;
pub use decision::*;
pub use events::*;
pub use matcher::*;
pub use normalizer::*;
pub use timer::*;
