// Shared helpers for the integration test crates. Every aggregator pulls
// this in on its own, so not every helper is used everywhere.
#![allow(dead_code)]

pub mod fixtures;

pub use fixtures::*;
