//! producerd - the long-lived controller
//!
//! Wires the controller to its collaborators:
//! - Store-backed state, loaded before the first request
//! - The IPC server panels and navigation clients talk to
//! - Attached tabs (reload targets)
//! - The motivational quote source
//! - The periodic timer tick

pub mod service;
pub mod tabs;

pub use service::{Service, ServiceParts};
pub use tabs::{IpcTabHost, TabRegistry};
