// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core capped-collection trait for errvault.
//
// A `CappedStore` is a database holding named collections. Each collection
// is bounded by a byte size and optionally a document count; inserts past
// either bound evict the oldest documents first. Documents are opaque byte
// payloads keyed by a caller-supplied string identifier, and every
// collection remembers its insertion ("natural") order.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::StorageError;

/// Default byte bound for a new capped collection (100 MiB).
pub const DEFAULT_MAX_BYTES: u64 = 100 * 1024 * 1024;

/// Default document bound for a new capped collection.
pub const DEFAULT_MAX_DOCUMENTS: u64 = i32::MAX as u64;

/// Capacity bounds fixed when a collection is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CappedOptions {
    /// Maximum total size of stored documents, in bytes.
    pub max_bytes: u64,
    /// Maximum number of stored documents, if bounded.
    pub max_documents: Option<u64>,
}

impl CappedOptions {
    /// Bounds with the given byte size and no document limit.
    pub fn with_max_bytes(max_bytes: u64) -> Self {
        Self {
            max_bytes,
            max_documents: None,
        }
    }

    /// Reject bounds no document could ever fit into.
    pub fn validate(&self) -> Result<(), StorageError> {
        if self.max_bytes == 0 {
            return Err(StorageError::InvalidOptions(
                "max_bytes must be greater than zero".to_string(),
            ));
        }
        if self.max_documents == Some(0) {
            return Err(StorageError::InvalidOptions(
                "max_documents must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// True if a collection holding `count` documents totalling `bytes`
    /// exceeds these bounds.
    pub fn exceeded_by(&self, count: u64, bytes: u64) -> bool {
        bytes > self.max_bytes || self.max_documents.is_some_and(|max| count > max)
    }
}

impl Default for CappedOptions {
    fn default() -> Self {
        Self {
            max_bytes: DEFAULT_MAX_BYTES,
            max_documents: Some(DEFAULT_MAX_DOCUMENTS),
        }
    }
}

/// A database of capped, insertion-ordered collections.
///
/// Implementations must be safe to share across threads and tokio tasks.
/// Each insert and each read is atomic per document; no multi-document
/// transactions are offered.
#[async_trait]
pub trait CappedStore: Send + Sync {
    /// List collection names, optionally restricted to an exact name.
    async fn list_collections(&self, name: Option<&str>) -> Result<Vec<String>, StorageError>;

    /// Create a capped collection.
    ///
    /// Fails with [`StorageError::CollectionExists`] if the name is taken;
    /// the existing collection's bounds are never changed.
    async fn create_capped(&self, name: &str, options: CappedOptions) -> Result<(), StorageError>;

    /// Return the bounds of an existing collection, or `None` if absent.
    async fn collection_options(&self, name: &str) -> Result<Option<CappedOptions>, StorageError>;

    /// Append a document, evicting the oldest documents while the
    /// collection's bounds are exceeded.
    async fn insert_one(
        &self,
        collection: &str,
        id: &str,
        document: &[u8],
    ) -> Result<(), StorageError>;

    /// Look up a document by exact identifier.
    ///
    /// Returns `Ok(None)` if no document matches, rather than an error.
    async fn find_by_id(&self, collection: &str, id: &str)
        -> Result<Option<Vec<u8>>, StorageError>;

    /// Scan in natural order, newest first, skipping `skip` documents and
    /// returning up to `limit` (id, document) pairs.
    async fn find_natural_desc(
        &self,
        collection: &str,
        skip: usize,
        limit: usize,
    ) -> Result<Vec<(String, Vec<u8>)>, StorageError>;

    /// Number of documents currently held by the collection.
    async fn count(&self, collection: &str) -> Result<u64, StorageError>;

    /// A human-readable name for this backend, used in logging and metrics.
    fn name(&self) -> &str;
}
