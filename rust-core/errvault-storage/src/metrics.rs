// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Metrics-collecting wrapper for errvault capped stores.
//
// Wraps any `CappedStore` and transparently collects operation counts,
// latency sums, and byte transfer totals.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::backend::{CappedOptions, CappedStore};
use crate::error::StorageError;

/// Accumulated statistics for a capped store.
///
/// All counters are monotonically increasing for the lifetime of the
/// [`MetricsStore`] that owns them, until [`MetricsStore::reset_stats`].
#[derive(Debug, Clone, Default)]
pub struct StoreStats {
    /// Number of `insert_one` operations performed.
    pub insert_count: u64,
    /// Number of `find_by_id` operations performed.
    pub find_count: u64,
    /// Number of `find_natural_desc` operations performed.
    pub scan_count: u64,
    /// Number of `count` operations performed.
    pub count_count: u64,
    /// Number of `create_capped` operations performed.
    pub create_count: u64,
    /// Cumulative wall-clock latency of all `insert_one` calls, in milliseconds.
    pub insert_latency_sum_ms: f64,
    /// Cumulative wall-clock latency of all reads, in milliseconds.
    pub read_latency_sum_ms: f64,
    /// Total document bytes returned by reads.
    pub total_bytes_read: u64,
    /// Total document bytes accepted by inserts.
    pub total_bytes_written: u64,
}

/// A capped store wrapper that collects operation metrics.
///
/// # Example
///
/// ```rust
/// use errvault_storage::backend::{CappedOptions, CappedStore};
/// use errvault_storage::memory::InMemoryCappedStore;
/// use errvault_storage::metrics::MetricsStore;
///
/// # tokio_test::block_on(async {
/// let metered = MetricsStore::new(InMemoryCappedStore::new());
/// metered.create_capped("errs", CappedOptions::default()).await.unwrap();
/// metered.insert_one("errs", "a", b"doc").await.unwrap();
///
/// let stats = metered.stats().await;
/// assert_eq!(stats.insert_count, 1);
/// assert_eq!(stats.total_bytes_written, 3);
/// # });
/// ```
pub struct MetricsStore<S: CappedStore> {
    inner: S,
    stats: Arc<RwLock<StoreStats>>,
}

impl<S: CappedStore> MetricsStore<S> {
    /// Wrap `inner` with metrics collection.
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            stats: Arc::new(RwLock::new(StoreStats::default())),
        }
    }

    /// Return a snapshot of the current statistics.
    pub async fn stats(&self) -> StoreStats {
        self.stats.read().await.clone()
    }

    /// Reset all statistics to zero.
    pub async fn reset_stats(&self) {
        let mut s = self.stats.write().await;
        *s = StoreStats::default();
    }

    /// Return a reference to the inner store.
    pub fn inner(&self) -> &S {
        &self.inner
    }
}

#[async_trait]
impl<S: CappedStore> CappedStore for MetricsStore<S> {
    async fn list_collections(&self, name: Option<&str>) -> Result<Vec<String>, StorageError> {
        self.inner.list_collections(name).await
    }

    async fn create_capped(&self, name: &str, options: CappedOptions) -> Result<(), StorageError> {
        let mut s = self.stats.write().await;
        s.create_count += 1;
        drop(s);
        self.inner.create_capped(name, options).await
    }

    async fn collection_options(&self, name: &str) -> Result<Option<CappedOptions>, StorageError> {
        self.inner.collection_options(name).await
    }

    async fn insert_one(
        &self,
        collection: &str,
        id: &str,
        document: &[u8],
    ) -> Result<(), StorageError> {
        let start = Instant::now();
        let result = self.inner.insert_one(collection, id, document).await;
        let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;

        let mut s = self.stats.write().await;
        s.insert_count += 1;
        s.insert_latency_sum_ms += elapsed_ms;
        if result.is_ok() {
            s.total_bytes_written += document.len() as u64;
        }

        result
    }

    async fn find_by_id(
        &self,
        collection: &str,
        id: &str,
    ) -> Result<Option<Vec<u8>>, StorageError> {
        let start = Instant::now();
        let result = self.inner.find_by_id(collection, id).await;
        let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;

        let mut s = self.stats.write().await;
        s.find_count += 1;
        s.read_latency_sum_ms += elapsed_ms;
        if let Ok(Some(ref doc)) = result {
            s.total_bytes_read += doc.len() as u64;
        }

        result
    }

    async fn find_natural_desc(
        &self,
        collection: &str,
        skip: usize,
        limit: usize,
    ) -> Result<Vec<(String, Vec<u8>)>, StorageError> {
        let start = Instant::now();
        let result = self.inner.find_natural_desc(collection, skip, limit).await;
        let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;

        let mut s = self.stats.write().await;
        s.scan_count += 1;
        s.read_latency_sum_ms += elapsed_ms;
        if let Ok(ref docs) = result {
            s.total_bytes_read += docs.iter().map(|(_, d)| d.len() as u64).sum::<u64>();
        }

        result
    }

    async fn count(&self, collection: &str) -> Result<u64, StorageError> {
        let mut s = self.stats.write().await;
        s.count_count += 1;
        drop(s);
        self.inner.count(collection).await
    }

    fn name(&self) -> &str {
        self.inner.name()
    }
}
