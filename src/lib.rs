//! Live bus position relay
//!
//! Producers ("buses") push their latest position over a websocket ingest
//! endpoint; subscribers ("browsers") connect to a browse endpoint, announce a
//! bounding box and receive the buses inside it once per publish interval.
//!
//! The crate also ships the load generator used to drive the relay: many
//! simulated buses multiplexed over a small fixed pool of outbound
//! connections, with bounded queues providing backpressure.
//!
//! # Architecture
//!
//! ```text
//!   fake-bus                                 bus-relay
//!  ┌──────────────────────────┐        ┌─────────────────────────────────┐
//!  │ Producer ─┐              │        │                                 │
//!  │ Producer ─┼─► lane 0 ─► Sender ──►│ IngestSession ──► PositionStore │
//!  │ Producer ─┘   (bounded)  │  ws    │                       │         │
//!  │ Producer ───► lane 1 ─► Sender ──►│ IngestSession ──►     │         │
//!  └──────────────────────────┘        │                       ▼         │
//!                                      │ BrowseSession { listen, publish}│──► browser
//!                                      └─────────────────────────────────┘
//! ```

pub mod client;
pub mod error;
pub mod positions;
pub mod protocol;
pub mod server;
pub mod session;
pub mod stats;

pub use client::{ChannelMultiplexer, EmulatorConfig, Route};
pub use error::{Error, Result};
pub use positions::{Position, PositionStore, RetentionPolicy, StoreConfig};
pub use server::{RelayConfig, RelayServer};
pub use session::Viewport;
