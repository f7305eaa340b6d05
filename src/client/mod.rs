//! Load generator
//!
//! Simulates a bus fleet against the relay's ingest endpoint:
//! - Routes are loaded from a directory of JSON files
//! - Every bus is a [`Producer`] walking its route
//! - Producers share a fixed pool of connections through the [`ChannelMultiplexer`]

pub mod config;
pub mod multiplexer;
pub mod producer;
pub mod route;
pub mod sender;

pub use config::EmulatorConfig;
pub use multiplexer::ChannelMultiplexer;
pub use producer::{start_offset, Producer, RouteWalk};
pub use route::{load_routes, Route, Waypoint};
pub use sender::SenderTask;
