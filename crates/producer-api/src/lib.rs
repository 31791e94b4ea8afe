//! Protocol types for producer
//!
//! This crate defines the stable contract between the controller (`producerd`)
//! and its clients (panels and navigation-interception tabs):
//! - The rule data model and its JSON export shape
//! - Commands (requests from clients) and responses
//! - Events (controller -> clients pushes)
//! - Versioning

mod commands;
mod events;
mod rules;
mod types;

pub use commands::*;
pub use events::*;
pub use rules::*;
pub use types::*;

/// Current API version
pub const API_VERSION: u32 = 1;
