// cardsession/src/lib.rs

//! cardsession
//!
//! Card-session protocol engine for smartcard readers: selection, secure
//! sessions backed by a SAM, batched record and counter commands, verified
//! closing with rollback, and reader event dispatch.

pub mod card;
pub mod config;
pub mod constants;
pub mod error;
pub mod event_sink;
#[cfg(feature = "async")]
pub mod plugin;
pub mod prelude;
pub mod protocol;
pub mod reader;
pub mod sam;
pub mod selection;
pub mod session;
pub mod test_support;
pub mod transport;
pub mod types;
pub mod utils;

// Re-export common types at crate root so `crate::Error`, `crate::Result`,
// and the newtypes in `types` are available everywhere.
pub use crate::error::*;
pub use crate::types::*;

pub use prelude::*;
