// cardsession/src/protocol/mod.rs

pub mod apdu;
pub mod commands;
pub mod parser;
pub mod responses;

pub use apdu::{ApduCommand, ApduResponse};
pub use commands::*;
pub use responses::*;
