// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <j.d.a.jewell@open.ac.uk>
//
// redb-backed persistent capped-collection store for errvault.
//
// # Design
//
// - One redb `Database` file holds every collection.
// - A `collections` table maps collection name to JSON metadata (bounds,
//   next insertion sequence, document count, byte total).
// - Each collection owns two tables: `docs:<name>` (sequence -> (id,
//   document)) and `ids:<name>` (id -> sequence).
// - An insert, its evictions and the metadata update share one write
//   transaction, so a crash never leaves a half-applied insert behind.
// - Blocking redb calls run on `spawn_blocking`.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::backend::{CappedOptions, CappedStore};
use crate::error::StorageError;

const COLLECTIONS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("collections");

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CollectionMeta {
    options: CappedOptions,
    next_seq: u64,
    count: u64,
    total_bytes: u64,
}

fn docs_table_name(collection: &str) -> String {
    format!("docs:{collection}")
}

fn ids_table_name(collection: &str) -> String {
    format!("ids:{collection}")
}

fn unavailable(context: &'static str) -> impl Fn(redb::Error) -> StorageError {
    move |e| StorageError::BackendUnavailable(format!("{context}: {e}"))
}

fn corrupted(context: &'static str) -> impl Fn(redb::Error) -> StorageError {
    move |e| StorageError::CorruptedData(format!("{context}: {e}"))
}

/// Map a failure to open a collection's table. Only a missing table means a
/// missing collection.
fn open_failed(collection: &str) -> impl Fn(redb::TableError) -> StorageError + '_ {
    move |e| match e {
        redb::TableError::TableDoesNotExist(_) => {
            StorageError::CollectionNotFound(collection.to_string())
        }
        redb::TableError::TableTypeMismatch { .. } => {
            StorageError::CorruptedData(format!("table for {collection}: {e}"))
        }
        other => StorageError::BackendUnavailable(format!("open table for {collection}: {other}")),
    }
}

fn decode_meta(bytes: &[u8]) -> Result<CollectionMeta, StorageError> {
    serde_json::from_slice(bytes)
        .map_err(|e| StorageError::CorruptedData(format!("collection metadata: {e}")))
}

fn encode_meta(meta: &CollectionMeta) -> Result<Vec<u8>, StorageError> {
    serde_json::to_vec(meta)
        .map_err(|e| StorageError::CorruptedData(format!("collection metadata: {e}")))
}

/// A persistent capped-collection store powered by redb.
///
/// # Example
///
/// ```rust,no_run
/// use errvault_storage::backend::{CappedOptions, CappedStore};
/// use errvault_storage::redb_backend::RedbCappedStore;
///
/// # tokio_test::block_on(async {
/// let store = RedbCappedStore::open("/tmp/errvault.redb").unwrap();
/// store.create_capped("errvault", CappedOptions::default()).await.unwrap();
/// store.insert_one("errvault", "id1", b"{}").await.unwrap();
/// # });
/// ```
pub struct RedbCappedStore {
    db: Arc<Database>,
    path: PathBuf,
}

impl RedbCappedStore {
    /// Open or create a redb database at the given path.
    ///
    /// Creates parent directories if they don't exist.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(StorageError::Io)?;
        }

        let db = Database::create(&path).map_err(|e| {
            StorageError::BackendUnavailable(format!(
                "failed to open redb at {}: {}",
                path.display(),
                e
            ))
        })?;

        debug!(path = %path.display(), "opened redb capped store");

        Ok(Self {
            db: Arc::new(db),
            path,
        })
    }

    /// Return the filesystem path of the database file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_meta(&self, name: &str) -> Result<Option<CollectionMeta>, StorageError> {
        let db = Arc::clone(&self.db);
        let name = name.to_string();

        tokio::task::spawn_blocking(move || -> Result<Option<CollectionMeta>, StorageError> {
            let txn = db
                .begin_read()
                .map_err(|e| unavailable("read txn")(e.into()))?;
            let table = match txn.open_table(COLLECTIONS_TABLE) {
                Ok(t) => t,
                // Nothing has been created yet.
                Err(redb::TableError::TableDoesNotExist(_)) => return Ok(None),
                Err(e) => return Err(unavailable("open collections")(e.into())),
            };
            match table.get(name.as_str()) {
                Ok(Some(bytes)) => decode_meta(bytes.value()).map(Some),
                Ok(None) => Ok(None),
                Err(e) => Err(corrupted("get metadata")(e.into())),
            }
        })
        .await
        .map_err(|e| StorageError::BackendUnavailable(format!("task join: {e}")))?
    }
}

impl std::fmt::Debug for RedbCappedStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedbCappedStore")
            .field("path", &self.path)
            .finish()
    }
}

#[async_trait]
impl CappedStore for RedbCappedStore {
    async fn list_collections(&self, name: Option<&str>) -> Result<Vec<String>, StorageError> {
        let db = Arc::clone(&self.db);
        let filter = name.map(str::to_string);

        tokio::task::spawn_blocking(move || -> Result<Vec<String>, StorageError> {
            let txn = db
                .begin_read()
                .map_err(|e| unavailable("read txn")(e.into()))?;
            let table = match txn.open_table(COLLECTIONS_TABLE) {
                Ok(t) => t,
                Err(redb::TableError::TableDoesNotExist(_)) => return Ok(Vec::new()),
                Err(e) => return Err(unavailable("open collections")(e.into())),
            };

            let mut names = Vec::new();
            for entry in table.iter().map_err(|e| corrupted("list")(e.into()))? {
                let (key, _) = entry.map_err(|e| corrupted("list entry")(e.into()))?;
                let key = key.value().to_string();
                if filter.as_deref().map_or(true, |f| f == key) {
                    names.push(key);
                }
            }
            Ok(names)
        })
        .await
        .map_err(|e| StorageError::BackendUnavailable(format!("task join: {e}")))?
    }

    async fn create_capped(&self, name: &str, options: CappedOptions) -> Result<(), StorageError> {
        options.validate()?;
        let db = Arc::clone(&self.db);
        let name = name.to_string();

        tokio::task::spawn_blocking(move || -> Result<(), StorageError> {
            let txn = db
                .begin_write()
                .map_err(|e| unavailable("write txn")(e.into()))?;
            {
                let mut meta_table = txn
                    .open_table(COLLECTIONS_TABLE)
                    .map_err(|e| unavailable("open collections")(e.into()))?;
                let exists = meta_table
                    .get(name.as_str())
                    .map_err(|e| corrupted("get metadata")(e.into()))?
                    .is_some();
                if exists {
                    return Err(StorageError::CollectionExists(name));
                }

                let meta = CollectionMeta {
                    options,
                    next_seq: 0,
                    count: 0,
                    total_bytes: 0,
                };
                meta_table
                    .insert(name.as_str(), encode_meta(&meta)?.as_slice())
                    .map_err(|e| corrupted("insert metadata")(e.into()))?;

                // Materialise the collection's tables so reads find them.
                let docs_name = docs_table_name(&name);
                let ids_name = ids_table_name(&name);
                txn.open_table(TableDefinition::<u64, (&str, &[u8])>::new(&docs_name))
                    .map_err(|e| unavailable("create docs table")(e.into()))?;
                txn.open_table(TableDefinition::<&str, u64>::new(&ids_name))
                    .map_err(|e| unavailable("create ids table")(e.into()))?;
            }
            txn.commit()
                .map_err(|e| corrupted("commit")(e.into()))?;
            Ok(())
        })
        .await
        .map_err(|e| StorageError::BackendUnavailable(format!("task join: {e}")))?
    }

    async fn collection_options(&self, name: &str) -> Result<Option<CappedOptions>, StorageError> {
        Ok(self.read_meta(name).await?.map(|m| m.options))
    }

    async fn insert_one(
        &self,
        collection: &str,
        id: &str,
        document: &[u8],
    ) -> Result<(), StorageError> {
        let db = Arc::clone(&self.db);
        let collection = collection.to_string();
        let id = id.to_string();
        let document = document.to_vec();

        tokio::task::spawn_blocking(move || -> Result<(), StorageError> {
            let docs_name = docs_table_name(&collection);
            let ids_name = ids_table_name(&collection);

            let txn = db
                .begin_write()
                .map_err(|e| unavailable("write txn")(e.into()))?;
            let evicted;
            {
                let mut meta_table = txn
                    .open_table(COLLECTIONS_TABLE)
                    .map_err(|e| unavailable("open collections")(e.into()))?;
                let raw_meta = meta_table
                    .get(collection.as_str())
                    .map_err(|e| corrupted("get metadata")(e.into()))?
                    .map(|guard| guard.value().to_vec());
                let mut meta = match raw_meta {
                    Some(bytes) => decode_meta(&bytes)?,
                    None => return Err(StorageError::CollectionNotFound(collection)),
                };

                if document.len() as u64 > meta.options.max_bytes {
                    return Err(StorageError::ValueTooLarge {
                        size: document.len(),
                        max: meta.options.max_bytes,
                    });
                }

                let mut docs = txn
                    .open_table(TableDefinition::<u64, (&str, &[u8])>::new(&docs_name))
                    .map_err(|e| unavailable("open docs table")(e.into()))?;
                let mut ids = txn
                    .open_table(TableDefinition::<&str, u64>::new(&ids_name))
                    .map_err(|e| unavailable("open ids table")(e.into()))?;

                let duplicate = ids
                    .get(id.as_str())
                    .map_err(|e| corrupted("get id")(e.into()))?
                    .is_some();
                if duplicate {
                    return Err(StorageError::DuplicateId { collection, id });
                }

                let seq = meta.next_seq;
                docs.insert(seq, (id.as_str(), document.as_slice()))
                    .map_err(|e| corrupted("insert document")(e.into()))?;
                ids.insert(id.as_str(), seq)
                    .map_err(|e| corrupted("insert id")(e.into()))?;
                meta.next_seq += 1;
                meta.count += 1;
                meta.total_bytes += document.len() as u64;

                let mut n = 0usize;
                while meta.options.exceeded_by(meta.count, meta.total_bytes) {
                    let oldest = docs
                        .pop_first()
                        .map_err(|e| corrupted("evict")(e.into()))?
                        .map(|(_, value)| {
                            let (old_id, old_doc) = value.value();
                            (old_id.to_string(), old_doc.len() as u64)
                        });
                    let Some((old_id, old_len)) = oldest else {
                        break;
                    };
                    ids.remove(old_id.as_str())
                        .map_err(|e| corrupted("evict id")(e.into()))?;
                    meta.count -= 1;
                    meta.total_bytes -= old_len;
                    n += 1;
                }
                evicted = n;

                meta_table
                    .insert(collection.as_str(), encode_meta(&meta)?.as_slice())
                    .map_err(|e| corrupted("update metadata")(e.into()))?;
            }
            txn.commit()
                .map_err(|e| corrupted("commit")(e.into()))?;

            if evicted > 0 {
                debug!(collection = %collection, evicted, "evicted oldest documents");
            }
            Ok(())
        })
        .await
        .map_err(|e| StorageError::BackendUnavailable(format!("task join: {e}")))?
    }

    async fn find_by_id(
        &self,
        collection: &str,
        id: &str,
    ) -> Result<Option<Vec<u8>>, StorageError> {
        let db = Arc::clone(&self.db);
        let collection = collection.to_string();
        let id = id.to_string();

        tokio::task::spawn_blocking(move || -> Result<Option<Vec<u8>>, StorageError> {
            let docs_name = docs_table_name(&collection);
            let ids_name = ids_table_name(&collection);

            let txn = db
                .begin_read()
                .map_err(|e| unavailable("read txn")(e.into()))?;
            let ids = txn
                .open_table(TableDefinition::<&str, u64>::new(&ids_name))
                .map_err(open_failed(&collection))?;
            let seq = match ids
                .get(id.as_str())
                .map_err(|e| corrupted("get id")(e.into()))?
            {
                Some(guard) => guard.value(),
                None => return Ok(None),
            };

            let docs = txn
                .open_table(TableDefinition::<u64, (&str, &[u8])>::new(&docs_name))
                .map_err(open_failed(&collection))?;
            let doc = docs
                .get(seq)
                .map_err(|e| corrupted("get document")(e.into()))?
                .map(|guard| guard.value().1.to_vec());
            Ok(doc)
        })
        .await
        .map_err(|e| StorageError::BackendUnavailable(format!("task join: {e}")))?
    }

    async fn find_natural_desc(
        &self,
        collection: &str,
        skip: usize,
        limit: usize,
    ) -> Result<Vec<(String, Vec<u8>)>, StorageError> {
        let db = Arc::clone(&self.db);
        let collection = collection.to_string();

        tokio::task::spawn_blocking(move || -> Result<Vec<(String, Vec<u8>)>, StorageError> {
            let docs_name = docs_table_name(&collection);
            let txn = db
                .begin_read()
                .map_err(|e| unavailable("read txn")(e.into()))?;
            let docs = txn
                .open_table(TableDefinition::<u64, (&str, &[u8])>::new(&docs_name))
                .map_err(open_failed(&collection))?;

            let mut results = Vec::new();
            let iter = docs.iter().map_err(|e| corrupted("scan")(e.into()))?;
            for entry in iter.rev().skip(skip).take(limit) {
                let (_, value) = entry.map_err(|e| corrupted("scan entry")(e.into()))?;
                let (id, doc) = value.value();
                results.push((id.to_string(), doc.to_vec()));
            }
            Ok(results)
        })
        .await
        .map_err(|e| StorageError::BackendUnavailable(format!("task join: {e}")))?
    }

    async fn count(&self, collection: &str) -> Result<u64, StorageError> {
        self.read_meta(collection)
            .await?
            .map(|m| m.count)
            .ok_or_else(|| StorageError::CollectionNotFound(collection.to_string()))
    }

    fn name(&self) -> &str {
        "redb"
    }
}
