//! Store types

use crate::code::ShortCode;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::Instant;

/// One uploaded artifact.
///
/// Records are handed out as `Arc<BlobRecord>` and never change after
/// insertion.
#[derive(Debug)]
pub struct BlobRecord {
    pub key: String,
    pub code: ShortCode,
    pub payload: Bytes,
    /// Monotonic insertion time; the only input to expiry
    pub created_at: Instant,
    /// Wall-clock insertion time, reported in logs and stats
    pub uploaded_at: DateTime<Utc>,
    pub(crate) sequence: u64,
}

impl BlobRecord {
    pub fn size(&self) -> usize {
        self.payload.len()
    }

    /// Age of the record as seen at `now`
    pub fn age(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.created_at)
    }

    pub fn is_expired(&self, now: Instant, ttl: Duration) -> bool {
        self.age(now) > ttl
    }
}

/// Statistics about the store
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreStats {
    pub entries: usize,
    pub total_size: u64,
    pub hits: u64,
    pub misses: u64,
    pub evicted: u64,
    /// Upload time of the oldest live record
    pub oldest_upload: Option<DateTime<Utc>>,
}
