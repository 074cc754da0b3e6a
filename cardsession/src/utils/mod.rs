//! Small helpers shared across the crate: hex rendering for APDU traces and
//! the deadlines used while bringing the reader hardware up.

pub mod hex;
pub mod timeout;

pub use hex::*;
pub use timeout::*;
