//! Shared building blocks for `reachr`.
//!
//! * [`config`]: run configuration and the fixed probe target.
//! * [`network`]: address ranges, netblock loading and the round-robin walk.

pub mod config;
pub mod network;
