//! Expiring in-memory blob store

use crate::code::{compose_key, ShortCode};
use crate::types::{BlobRecord, StoreStats};
use bytes::Bytes;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info};

/// State guarded by the store lock
#[derive(Default)]
struct Records {
    by_key: HashMap<String, Arc<BlobRecord>>,
    total_size: u64,
    next_sequence: u64,
}

/// Uploaded artifacts keyed by `<name>-<code><ext>`, reclaimed after a TTL.
///
/// A single mutex serializes every read and write of the mapping. The lock
/// is held only for in-memory work, so callers can stream request and
/// response bodies without blocking each other.
pub struct ExpiringBlobStore {
    records: Mutex<Records>,
    hits: AtomicU64,
    misses: AtomicU64,
    evicted: AtomicU64,
}

impl ExpiringBlobStore {
    pub fn new() -> Self {
        Self {
            records: Mutex::new(Records::default()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evicted: AtomicU64::new(0),
        }
    }

    /// Store a payload under a freshly generated code and return its key.
    ///
    /// An existing record with the same key is replaced.
    pub async fn put(
        &self,
        name: &str,
        ext: &str,
        payload: impl Into<Bytes>,
        now: Instant,
    ) -> String {
        self.put_with_code(name, ext, ShortCode::generate(), payload, now)
            .await
    }

    /// Same as [`put`](Self::put) with a caller-chosen code
    pub async fn put_with_code(
        &self,
        name: &str,
        ext: &str,
        code: ShortCode,
        payload: impl Into<Bytes>,
        now: Instant,
    ) -> String {
        let key = compose_key(name, code, ext);
        let payload = payload.into();
        let size = payload.len() as u64;

        let mut records = self.records.lock().await;
        let sequence = records.next_sequence;
        records.next_sequence += 1;

        let record = Arc::new(BlobRecord {
            key: key.clone(),
            code,
            payload,
            created_at: now,
            uploaded_at: Utc::now(),
            sequence,
        });

        if let Some(previous) = records.by_key.insert(key.clone(), record) {
            records.total_size -= previous.size() as u64;
            debug!(key = %key, "Replaced existing record with the same key");
        }
        records.total_size += size;
        drop(records);

        debug!(key = %key, size, "Stored blob");
        key
    }

    /// Exact-key lookup. Reading never refreshes a record's age.
    pub async fn get(&self, key: &str) -> Option<Arc<BlobRecord>> {
        let found = {
            let records = self.records.lock().await;
            records.by_key.get(key).cloned()
        };
        self.count_lookup(found.is_some());
        found
    }

    /// Look a record up by its short code.
    ///
    /// Scans every live record. When several records share the code, the
    /// most recently inserted one wins.
    pub async fn get_by_code(&self, code: &str) -> Option<Arc<BlobRecord>> {
        let found = match ShortCode::parse(code) {
            Some(code) => {
                let records = self.records.lock().await;
                records
                    .by_key
                    .values()
                    .filter(|record| record.code == code)
                    .max_by_key(|record| record.sequence)
                    .cloned()
            }
            None => None,
        };
        self.count_lookup(found.is_some());
        found
    }

    /// Remove every record older than `ttl` at `now` and return how many
    /// were removed. Running it again with the same `now` removes nothing.
    pub async fn evict_expired(&self, now: Instant, ttl: Duration) -> usize {
        let mut records = self.records.lock().await;
        let before = records.by_key.len();

        let mut freed = 0u64;
        records.by_key.retain(|key, record| {
            if record.is_expired(now, ttl) {
                debug!(
                    key = %key,
                    age_secs = record.age(now).as_secs(),
                    uploaded_at = %record.uploaded_at,
                    "Evicting expired blob"
                );
                freed += record.size() as u64;
                false
            } else {
                true
            }
        });
        records.total_size -= freed;

        let removed = before - records.by_key.len();
        let remaining = records.by_key.len();
        drop(records);

        self.evicted.fetch_add(removed as u64, Ordering::Relaxed);
        if removed > 0 {
            info!(removed, remaining, freed_bytes = freed, "Evicted expired blobs");
        }
        removed
    }

    pub async fn len(&self) -> usize {
        self.records.lock().await.by_key.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Get current store statistics
    pub async fn stats(&self) -> StoreStats {
        let records = self.records.lock().await;
        StoreStats {
            entries: records.by_key.len(),
            total_size: records.total_size,
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evicted: self.evicted.load(Ordering::Relaxed),
            oldest_upload: records.by_key.values().map(|r| r.uploaded_at).min(),
        }
    }

    fn count_lookup(&self, hit: bool) {
        if hit {
            self.hits.fetch_add(1, Ordering::Relaxed);
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
        }
    }
}

impl Default for ExpiringBlobStore {
    fn default() -> Self {
        Self::new()
    }
}
