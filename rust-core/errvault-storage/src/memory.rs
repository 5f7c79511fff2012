// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// In-memory capped-collection backend for errvault.
//
// Each collection keeps its documents in a `BTreeMap` keyed by a monotonic
// insertion sequence, so natural order is key order and eviction is
// `pop_first`. A side index maps document ids to sequences. The whole
// database sits behind a tokio `RwLock`; clones share state.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use crate::backend::{CappedOptions, CappedStore};
use crate::error::StorageError;

#[derive(Debug)]
struct Collection {
    options: CappedOptions,
    next_seq: u64,
    total_bytes: u64,
    /// Insertion sequence -> (id, document).
    documents: BTreeMap<u64, (String, Vec<u8>)>,
    /// Document id -> insertion sequence.
    index: HashMap<String, u64>,
}

impl Collection {
    fn new(options: CappedOptions) -> Self {
        Self {
            options,
            next_seq: 0,
            total_bytes: 0,
            documents: BTreeMap::new(),
            index: HashMap::new(),
        }
    }

    fn evict_oldest(&mut self) -> bool {
        match self.documents.pop_first() {
            Some((_, (id, doc))) => {
                self.index.remove(&id);
                self.total_bytes -= doc.len() as u64;
                true
            }
            None => false,
        }
    }
}

/// An in-memory database of capped collections.
///
/// All data lives in process memory and is lost when the last clone is
/// dropped. Thread-safe via `Arc<RwLock<...>>`.
///
/// # Example
///
/// ```rust
/// use errvault_storage::backend::{CappedOptions, CappedStore};
/// use errvault_storage::memory::InMemoryCappedStore;
///
/// # tokio_test::block_on(async {
/// let store = InMemoryCappedStore::new();
/// store.create_capped("errors", CappedOptions::default()).await.unwrap();
/// store.insert_one("errors", "a", b"{}").await.unwrap();
/// assert_eq!(store.count("errors").await.unwrap(), 1);
/// # });
/// ```
#[derive(Debug, Clone, Default)]
pub struct InMemoryCappedStore {
    collections: Arc<RwLock<HashMap<String, Collection>>>,
}

impl InMemoryCappedStore {
    /// Create a new, empty in-memory database.
    pub fn new() -> Self {
        Self::default()
    }

    /// Total bytes currently held by `collection`.
    pub async fn collection_bytes(&self, collection: &str) -> Result<u64, StorageError> {
        let map = self.collections.read().await;
        map.get(collection)
            .map(|c| c.total_bytes)
            .ok_or_else(|| StorageError::CollectionNotFound(collection.to_string()))
    }
}

#[async_trait]
impl CappedStore for InMemoryCappedStore {
    async fn list_collections(&self, name: Option<&str>) -> Result<Vec<String>, StorageError> {
        let map = self.collections.read().await;
        let mut names: Vec<String> = map
            .keys()
            .filter(|k| name.map_or(true, |n| n == k.as_str()))
            .cloned()
            .collect();
        names.sort();
        Ok(names)
    }

    async fn create_capped(&self, name: &str, options: CappedOptions) -> Result<(), StorageError> {
        options.validate()?;
        let mut map = self.collections.write().await;
        if map.contains_key(name) {
            return Err(StorageError::CollectionExists(name.to_string()));
        }
        map.insert(name.to_string(), Collection::new(options));
        Ok(())
    }

    async fn collection_options(&self, name: &str) -> Result<Option<CappedOptions>, StorageError> {
        let map = self.collections.read().await;
        Ok(map.get(name).map(|c| c.options))
    }

    async fn insert_one(
        &self,
        collection: &str,
        id: &str,
        document: &[u8],
    ) -> Result<(), StorageError> {
        let mut map = self.collections.write().await;
        let coll = map
            .get_mut(collection)
            .ok_or_else(|| StorageError::CollectionNotFound(collection.to_string()))?;

        if document.len() as u64 > coll.options.max_bytes {
            return Err(StorageError::ValueTooLarge {
                size: document.len(),
                max: coll.options.max_bytes,
            });
        }
        if coll.index.contains_key(id) {
            return Err(StorageError::DuplicateId {
                collection: collection.to_string(),
                id: id.to_string(),
            });
        }

        let seq = coll.next_seq;
        coll.next_seq += 1;
        coll.total_bytes += document.len() as u64;
        coll.documents.insert(seq, (id.to_string(), document.to_vec()));
        coll.index.insert(id.to_string(), seq);

        let mut evicted = 0usize;
        while coll
            .options
            .exceeded_by(coll.documents.len() as u64, coll.total_bytes)
            && coll.evict_oldest()
        {
            evicted += 1;
        }
        if evicted > 0 {
            debug!(collection, evicted, "evicted oldest documents");
        }
        Ok(())
    }

    async fn find_by_id(
        &self,
        collection: &str,
        id: &str,
    ) -> Result<Option<Vec<u8>>, StorageError> {
        let map = self.collections.read().await;
        let coll = map
            .get(collection)
            .ok_or_else(|| StorageError::CollectionNotFound(collection.to_string()))?;
        Ok(coll
            .index
            .get(id)
            .and_then(|seq| coll.documents.get(seq))
            .map(|(_, doc)| doc.clone()))
    }

    async fn find_natural_desc(
        &self,
        collection: &str,
        skip: usize,
        limit: usize,
    ) -> Result<Vec<(String, Vec<u8>)>, StorageError> {
        let map = self.collections.read().await;
        let coll = map
            .get(collection)
            .ok_or_else(|| StorageError::CollectionNotFound(collection.to_string()))?;
        Ok(coll
            .documents
            .values()
            .rev()
            .skip(skip)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn count(&self, collection: &str) -> Result<u64, StorageError> {
        let map = self.collections.read().await;
        map.get(collection)
            .map(|c| c.documents.len() as u64)
            .ok_or_else(|| StorageError::CollectionNotFound(collection.to_string()))
    }

    fn name(&self) -> &str {
        "in-memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn store_with(name: &str, options: CappedOptions) -> InMemoryCappedStore {
        let store = InMemoryCappedStore::new();
        store.create_capped(name, options).await.unwrap();
        store
    }

    #[tokio::test]
    async fn test_create_and_list() {
        let store = InMemoryCappedStore::new();
        assert!(store.list_collections(None).await.unwrap().is_empty());

        store.create_capped("b", CappedOptions::default()).await.unwrap();
        store.create_capped("a", CappedOptions::default()).await.unwrap();

        assert_eq!(store.list_collections(None).await.unwrap(), vec!["a", "b"]);
        assert_eq!(store.list_collections(Some("b")).await.unwrap(), vec!["b"]);
        assert!(store.list_collections(Some("c")).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_create_existing_keeps_bounds() {
        let store = store_with("errs", CappedOptions::with_max_bytes(1024)).await;

        let err = store
            .create_capped("errs", CappedOptions::with_max_bytes(2048))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::CollectionExists(_)));
        assert_eq!(
            store.collection_options("errs").await.unwrap(),
            Some(CappedOptions::with_max_bytes(1024))
        );
    }

    #[tokio::test]
    async fn test_insert_find_and_count() {
        let store = store_with("errs", CappedOptions::default()).await;

        store.insert_one("errs", "id1", b"one").await.unwrap();
        store.insert_one("errs", "id2", b"two").await.unwrap();

        assert_eq!(store.count("errs").await.unwrap(), 2);
        assert_eq!(
            store.find_by_id("errs", "id2").await.unwrap(),
            Some(b"two".to_vec())
        );
        assert_eq!(store.find_by_id("errs", "nope").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_duplicate_id_rejected() {
        let store = store_with("errs", CappedOptions::default()).await;
        store.insert_one("errs", "id1", b"one").await.unwrap();
        let err = store.insert_one("errs", "id1", b"again").await.unwrap_err();
        assert!(matches!(err, StorageError::DuplicateId { .. }));
        assert_eq!(store.count("errs").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_natural_desc_window() {
        let store = store_with("errs", CappedOptions::default()).await;
        for i in 1..=5 {
            store
                .insert_one("errs", &format!("id{i}"), format!("doc{i}").as_bytes())
                .await
                .unwrap();
        }

        let page = store.find_natural_desc("errs", 1, 2).await.unwrap();
        let ids: Vec<&str> = page.iter().map(|(id, _)| id.as_str()).collect();
        assert_eq!(ids, vec!["id4", "id3"]);

        let past_end = store.find_natural_desc("errs", 10, 2).await.unwrap();
        assert!(past_end.is_empty());
    }

    #[tokio::test]
    async fn test_document_bound_evicts_oldest() {
        let options = CappedOptions {
            max_bytes: 1024,
            max_documents: Some(3),
        };
        let store = store_with("errs", options).await;
        for i in 1..=5 {
            store.insert_one("errs", &format!("id{i}"), b"x").await.unwrap();
        }

        assert_eq!(store.count("errs").await.unwrap(), 3);
        assert_eq!(store.find_by_id("errs", "id1").await.unwrap(), None);
        assert_eq!(store.find_by_id("errs", "id2").await.unwrap(), None);
        let ids: Vec<String> = store
            .find_natural_desc("errs", 0, 10)
            .await
            .unwrap()
            .into_iter()
            .map(|(id, _)| id)
            .collect();
        assert_eq!(ids, vec!["id5", "id4", "id3"]);
    }

    #[tokio::test]
    async fn test_byte_bound_evicts_oldest() {
        let store = store_with("errs", CappedOptions::with_max_bytes(10)).await;
        store.insert_one("errs", "a", b"1234").await.unwrap();
        store.insert_one("errs", "b", b"1234").await.unwrap();
        store.insert_one("errs", "c", b"1234").await.unwrap();

        assert_eq!(store.count("errs").await.unwrap(), 2);
        assert_eq!(store.collection_bytes("errs").await.unwrap(), 8);
        assert_eq!(store.find_by_id("errs", "a").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_oversized_document_rejected() {
        let store = store_with("errs", CappedOptions::with_max_bytes(4)).await;
        let err = store.insert_one("errs", "a", b"12345").await.unwrap_err();
        assert!(matches!(err, StorageError::ValueTooLarge { size: 5, max: 4 }));
        assert_eq!(store.count("errs").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_missing_collection() {
        let store = InMemoryCappedStore::new();
        assert!(matches!(
            store.count("ghost").await.unwrap_err(),
            StorageError::CollectionNotFound(_)
        ));
        assert!(matches!(
            store.insert_one("ghost", "a", b"x").await.unwrap_err(),
            StorageError::CollectionNotFound(_)
        ));
        assert_eq!(store.collection_options("ghost").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_clone_shares_state() {
        let store = store_with("errs", CappedOptions::default()).await;
        let clone = store.clone();
        store.insert_one("errs", "shared", b"data").await.unwrap();
        assert_eq!(
            clone.find_by_id("errs", "shared").await.unwrap(),
            Some(b"data".to_vec())
        );
    }

    #[tokio::test]
    async fn test_name() {
        assert_eq!(InMemoryCappedStore::new().name(), "in-memory");
    }
}
