// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// errvault Capped Store Abstraction
//
// This crate provides the capped-collection interface errvault persists
// error logs into. The `CappedStore` trait is the contract every backend
// implements: named collections bounded by byte size (and optionally
// document count), insertion-ordered, with FIFO eviction on insert.
//
// # Modules
//
// - [`backend`] -- The `CappedStore` trait and `CappedOptions` bounds.
// - [`error`] -- The `StorageError` enum covering all backend failure modes.
// - [`memory`] -- An in-memory backend for tests and ephemeral use.
// - [`metrics`] -- A transparent wrapper that collects operation statistics.
// - [`connect`] -- Resolves connection strings to shared backends.
//
// # Example
//
// ```rust
// use errvault_storage::backend::{CappedOptions, CappedStore};
// use errvault_storage::memory::InMemoryCappedStore;
// use errvault_storage::metrics::MetricsStore;
//
// # tokio_test::block_on(async {
// let store = MetricsStore::new(InMemoryCappedStore::new());
// store.create_capped("errvault", CappedOptions::default()).await.unwrap();
// store.insert_one("errvault", "first", b"{}").await.unwrap();
// store.insert_one("errvault", "second", b"{}").await.unwrap();
//
// let newest = store.find_natural_desc("errvault", 0, 1).await.unwrap();
// assert_eq!(newest[0].0, "second");
// # });
// ```

pub mod backend;
pub mod connect;
pub mod error;
pub mod memory;
pub mod metrics;

// Optional persistent backends, feature-gated to keep the default build lean.
#[cfg(feature = "redb-backend")]
pub mod redb_backend;

pub use backend::{CappedOptions, CappedStore, DEFAULT_MAX_BYTES, DEFAULT_MAX_DOCUMENTS};
pub use connect::{open_database, ConnectionTarget};
pub use error::StorageError;
pub use memory::InMemoryCappedStore;
pub use metrics::{MetricsStore, StoreStats};

#[cfg(feature = "redb-backend")]
pub use redb_backend::RedbCappedStore;
