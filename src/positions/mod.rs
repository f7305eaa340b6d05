//! Latest-position store shared by every relay session
//!
//! Ingest sessions write, browse sessions read. Each bus id maps to exactly
//! one [`Position`]; a newer update replaces the older one wholesale.
//!
//! # Architecture
//!
//! ```text
//!                          Arc<PositionStore>
//!                     ┌─────────────────────────┐
//!                     │ entries: HashMap<BusId, │
//!                     │   StoredPosition {      │
//!                     │     position,           │
//!                     │     updated_at,         │
//!                     │   }                     │
//!                     │ >                       │
//!                     └───────────┬─────────────┘
//!                                 │
//!         ┌───────────────────────┼───────────────────────┐
//!         │                       │                       │
//!         ▼                       ▼                       ▼
//!   [IngestSession]         [BrowseSession]         [BrowseSession]
//!   store.upsert()          store.snapshot()        store.snapshot()
//! ```
//!
//! # Retention
//!
//! By default entries live for the lifetime of the process, even after the
//! bus that produced them disconnects. [`RetentionPolicy::ExpireAfter`]
//! enables a background sweep that drops entries not refreshed in time.

pub mod config;
pub mod position;
pub mod store;

pub use config::{RetentionPolicy, StoreConfig};
pub use position::Position;
pub use store::PositionStore;
