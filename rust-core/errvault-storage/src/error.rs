// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Storage error types for the errvault capped-collection abstraction.
//
// Every failure a backend can report surfaces through `StorageError`. The
// error log layer propagates these unchanged: no retries, no suppression.

use thiserror::Error;

/// Errors that can occur when interacting with a capped-collection store.
#[derive(Debug, Error)]
pub enum StorageError {
    /// An I/O error occurred in the underlying storage layer.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The named collection does not exist.
    #[error("collection not found: {0}")]
    CollectionNotFound(String),

    /// A collection with this name already exists.
    #[error("collection already exists: {0}")]
    CollectionExists(String),

    /// A document with this identifier is already stored in the collection.
    #[error("duplicate document id '{id}' in collection '{collection}'")]
    DuplicateId {
        /// Collection the insert targeted.
        collection: String,
        /// The conflicting identifier.
        id: String,
    },

    /// The capped options are not usable (e.g. a zero byte bound).
    #[error("invalid capped options: {0}")]
    InvalidOptions(String),

    /// The stored data is corrupted or in an unexpected format.
    #[error("corrupted data: {0}")]
    CorruptedData(String),

    /// The storage backend is not available (e.g., connection lost).
    #[error("backend unavailable: {0}")]
    BackendUnavailable(String),

    /// The connection string names a scheme no backend understands.
    #[error("unsupported connection string scheme: {0}")]
    UnsupportedScheme(String),

    /// The document exceeds the collection's byte bound on its own.
    #[error("document too large: {size} bytes (max: {max})")]
    ValueTooLarge {
        /// Actual document size in bytes.
        size: usize,
        /// Maximum allowed size in bytes.
        max: u64,
    },
}
