//! Relay server
//!
//! Binds the ingest and browse endpoints and spawns one session task per
//! accepted connection.

pub mod config;
pub mod listener;

pub use config::RelayConfig;
pub use listener::RelayServer;
