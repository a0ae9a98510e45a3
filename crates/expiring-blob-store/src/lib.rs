//! In-memory blob store with TTL sweeping
//!
//! Holds uploaded artifacts under a `<name>-<code><ext>` key, supports lookup
//! by the full key or by the 6-digit short code, and reclaims records once
//! they outlive their time-to-live. A [`Sweeper`] drives eviction on a fixed
//! interval.

mod code;
mod store;
mod sweeper;
mod types;

pub use code::{compose_key, ShortCode};
pub use store::ExpiringBlobStore;
pub use sweeper::{SweepSchedule, Sweeper, MIN_SWEEP_INTERVAL};
pub use types::{BlobRecord, StoreStats};

/// Monotonic timestamp used for record ages.
pub use tokio::time::Instant;
