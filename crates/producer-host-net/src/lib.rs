//! Network collaborators for producerd
//!
//! - [`HttpQuoteSource`]: motivational quote lookup over HTTP

mod quotes;

pub use quotes::*;
