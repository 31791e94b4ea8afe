//! Collaborator trait interfaces for producerd
//!
//! This crate defines the interface between the controller and the things it
//! drives but does not own: the set of open tabs it may force to reload, and
//! the external motivational quote lookup. It contains no transport or
//! network code itself.

mod mock;
mod traits;

pub use mock::*;
pub use traits::*;
