// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Capped-collection error log.
//
// One capped collection per application name, all applications sharing a
// backing database. Collection creation is check-then-create under a
// process-wide lock; everything else runs concurrently and relies on the
// store's per-document atomicity.

use std::sync::Arc;

use async_trait::async_trait;
use errvault_storage::{open_database, CappedOptions, CappedStore};
use tokio::sync::Mutex;
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::{ConfigSource, ErrorLogConfig};
use crate::contract::ErrorLog;
use crate::error::{ErrorLogError, ErrorLogResult};
use crate::record::{ErrorLogEntry, ErrorRecord};

/// Longest accepted application name, in characters.
pub const MAX_APPLICATION_NAME_LENGTH: usize = 60;

/// Collection used when the application name is empty.
pub const DEFAULT_COLLECTION_NAME: &str = "errvault";

/// Serializes collection creation across every log in the process.
static INIT_LOCK: Mutex<()> = Mutex::const_new(());

/// Error log persisting into a capped collection.
pub struct CappedErrorLog {
    store: Arc<dyn CappedStore>,
    connection_string: Option<String>,
    application_name: String,
    collection_name: String,
}

impl std::fmt::Debug for CappedErrorLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CappedErrorLog")
            .field("backend", &self.store.name())
            .field("application_name", &self.application_name)
            .field("collection_name", &self.collection_name)
            .finish()
    }
}

impl CappedErrorLog {
    /// Build a log from settings, resolving the connection target through
    /// `source`.
    ///
    /// The application name is checked before any connection is made, so a
    /// rejected name never creates a collection.
    pub async fn from_config(
        config: &ErrorLogConfig,
        source: &dyn ConfigSource,
    ) -> ErrorLogResult<Self> {
        let application_name = config.application_name.clone().unwrap_or_default();
        validate_application_name(&application_name)?;
        let limits = config.limits()?;
        let connection_string = config.resolve_connection_string(source)?;

        let store = open_database(&connection_string)?;
        let mut log = Self::with_store(store, application_name, limits).await?;
        log.connection_string = Some(connection_string);
        Ok(log)
    }

    /// Build a log for the default (unnamed) application with default
    /// limits.
    pub async fn with_connection_string(connection_string: &str) -> ErrorLogResult<Self> {
        if connection_string.is_empty() {
            return Err(ErrorLogError::Argument(
                "connection string must not be empty".to_string(),
            ));
        }
        let store = open_database(connection_string)?;
        let mut log = Self::with_store(store, "", CappedOptions::default()).await?;
        log.connection_string = Some(connection_string.to_string());
        Ok(log)
    }

    /// Build a log over an already opened store.
    ///
    /// Creates the application's collection with `limits` if it does not
    /// exist yet; an existing collection is used as is.
    pub async fn with_store(
        store: Arc<dyn CappedStore>,
        application_name: impl Into<String>,
        limits: CappedOptions,
    ) -> ErrorLogResult<Self> {
        let application_name = application_name.into();
        validate_application_name(&application_name)?;
        limits
            .validate()
            .map_err(|e| ErrorLogError::Configuration(e.to_string()))?;

        let collection_name = collection_name_for(&application_name);
        initialize(store.as_ref(), &collection_name, limits).await?;

        Ok(Self {
            store,
            connection_string: None,
            application_name,
            collection_name,
        })
    }

    /// Display name of this implementation.
    pub fn name(&self) -> &str {
        "Capped Collection Error Log"
    }

    /// The connection string this log was opened with, if any.
    pub fn connection_string(&self) -> Option<&str> {
        self.connection_string.as_deref()
    }

    pub fn application_name(&self) -> &str {
        &self.application_name
    }

    pub fn collection_name(&self) -> &str {
        &self.collection_name
    }

    /// Persist a copy of `error` under a fresh identifier.
    ///
    /// The stored copy carries this log's application name, whatever the
    /// caller set.
    pub async fn log(&self, error: &ErrorRecord) -> ErrorLogResult<String> {
        let mut record = error.clone();
        record.application_name = self.application_name.clone();

        let id = Uuid::now_v7().to_string();
        let document = record.to_document(&id)?;
        self.store
            .insert_one(&self.collection_name, &id, &document)
            .await?;

        debug!(collection = %self.collection_name, id = %id, "logged error");
        Ok(id)
    }

    /// Fetch one error by identifier, with its time in the local zone.
    pub async fn get_error(&self, id: &str) -> ErrorLogResult<Option<ErrorLogEntry>> {
        if id.is_empty() {
            return Err(ErrorLogError::Argument("id must not be empty".to_string()));
        }
        let parsed = Uuid::parse_str(id)
            .map_err(|e| ErrorLogError::Format(format!("invalid error id '{id}': {e}")))?;

        let document = self
            .store
            .find_by_id(&self.collection_name, &parsed.to_string())
            .await?;
        document
            .map(|bytes| ErrorRecord::from_document(&bytes).map(ErrorLogEntry::into_local_time))
            .transpose()
    }

    /// Append page `page_index` (of `page_size` entries, newest first) to
    /// `entries` and return the collection's total document count.
    ///
    /// The count comes from a separate query and may not match the page
    /// under concurrent writes.
    pub async fn get_errors(
        &self,
        page_index: i64,
        page_size: i64,
        entries: &mut Vec<ErrorLogEntry>,
    ) -> ErrorLogResult<u64> {
        if page_index < 0 {
            return Err(ErrorLogError::OutOfRange {
                name: "page_index",
                value: page_index,
            });
        }
        if page_size < 0 {
            return Err(ErrorLogError::OutOfRange {
                name: "page_size",
                value: page_size,
            });
        }

        let skip = (page_index as u64).saturating_mul(page_size as u64);
        let skip = usize::try_from(skip).unwrap_or(usize::MAX);
        let limit = usize::try_from(page_size).unwrap_or(usize::MAX);

        let documents = self
            .store
            .find_natural_desc(&self.collection_name, skip, limit)
            .await?;
        let page = documents
            .iter()
            .map(|(_, bytes)| {
                ErrorRecord::from_document(bytes).map(ErrorLogEntry::into_local_time)
            })
            .collect::<ErrorLogResult<Vec<_>>>()?;
        let total = self.store.count(&self.collection_name).await?;

        entries.extend(page);
        Ok(total)
    }
}

#[async_trait]
impl ErrorLog for CappedErrorLog {
    fn name(&self) -> &str {
        CappedErrorLog::name(self)
    }

    async fn log(&self, error: &ErrorRecord) -> ErrorLogResult<String> {
        CappedErrorLog::log(self, error).await
    }

    async fn get_error(&self, id: &str) -> ErrorLogResult<Option<ErrorLogEntry>> {
        CappedErrorLog::get_error(self, id).await
    }

    async fn get_errors(
        &self,
        page_index: i64,
        page_size: i64,
        entries: &mut Vec<ErrorLogEntry>,
    ) -> ErrorLogResult<u64> {
        CappedErrorLog::get_errors(self, page_index, page_size, entries).await
    }
}

/// Collection name for an application: the default collection when the
/// name is empty, `errvault-<name>` otherwise.
pub fn collection_name_for(application_name: &str) -> String {
    if application_name.is_empty() {
        DEFAULT_COLLECTION_NAME.to_string()
    } else {
        format!("{DEFAULT_COLLECTION_NAME}-{application_name}")
    }
}

fn validate_application_name(application_name: &str) -> ErrorLogResult<()> {
    if application_name.chars().count() > MAX_APPLICATION_NAME_LENGTH {
        return Err(ErrorLogError::Configuration(format!(
            "application name is too long; maximum length allowed is {MAX_APPLICATION_NAME_LENGTH} characters"
        )));
    }
    Ok(())
}

async fn initialize(
    store: &dyn CappedStore,
    collection: &str,
    limits: CappedOptions,
) -> ErrorLogResult<()> {
    let _guard = INIT_LOCK.lock().await;

    let existing = store.list_collections(Some(collection)).await?;
    if existing.iter().any(|name| name == collection) {
        debug!(collection, backend = store.name(), "using existing capped collection");
        return Ok(());
    }

    store.create_capped(collection, limits).await?;
    info!(
        collection,
        backend = store.name(),
        max_bytes = limits.max_bytes,
        max_documents = ?limits.max_documents,
        "created capped collection"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use errvault_storage::{InMemoryCappedStore, MetricsStore};

    async fn memory_log(application_name: &str) -> (CappedErrorLog, Arc<InMemoryCappedStore>) {
        let store = Arc::new(InMemoryCappedStore::new());
        let log = CappedErrorLog::with_store(store.clone(), application_name, CappedOptions::default())
            .await
            .unwrap();
        (log, store)
    }

    #[test]
    fn test_collection_names() {
        assert_eq!(collection_name_for(""), "errvault");
        assert_eq!(collection_name_for("shop"), "errvault-shop");
    }

    #[tokio::test]
    async fn test_creates_collection_once() {
        let (log, store) = memory_log("shop").await;
        assert_eq!(log.collection_name(), "errvault-shop");
        assert_eq!(
            store.list_collections(None).await.unwrap(),
            vec!["errvault-shop"]
        );

        // A second log over the same collection keeps the original bounds.
        CappedErrorLog::with_store(store.clone(), "shop", CappedOptions::with_max_bytes(512))
            .await
            .unwrap();
        assert_eq!(
            store.collection_options("errvault-shop").await.unwrap(),
            Some(CappedOptions::default())
        );
    }

    #[tokio::test]
    async fn test_name_length_limit() {
        let store = Arc::new(InMemoryCappedStore::new());
        let sixty = "a".repeat(60);
        assert!(CappedErrorLog::with_store(store.clone(), sixty, CappedOptions::default())
            .await
            .is_ok());

        let err = CappedErrorLog::with_store(store.clone(), "b".repeat(61), CappedOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ErrorLogError::Configuration(_)));
        assert_eq!(store.list_collections(None).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_log_overwrites_application_name() {
        let (log, _store) = memory_log("shop").await;
        let mut record = ErrorRecord::new("Oops", "bad");
        record.application_name = "someone-else".to_string();

        let id = log.log(&record).await.unwrap();
        let entry = log.get_error(&id).await.unwrap().unwrap();
        assert_eq!(entry.id, id);
        assert_eq!(entry.error.application_name, "shop");
        assert_eq!(record.application_name, "someone-else");
    }

    #[tokio::test]
    async fn test_get_error_argument_checks() {
        let (log, _store) = memory_log("").await;
        assert!(matches!(
            log.get_error("").await.unwrap_err(),
            ErrorLogError::Argument(_)
        ));
        assert!(matches!(
            log.get_error("not-an-id").await.unwrap_err(),
            ErrorLogError::Format(_)
        ));
        let unknown = Uuid::now_v7().to_string();
        assert!(log.get_error(&unknown).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_negative_paging_rejected() {
        let (log, _store) = memory_log("").await;
        let mut entries = Vec::new();
        assert!(matches!(
            log.get_errors(-1, 10, &mut entries).await.unwrap_err(),
            ErrorLogError::OutOfRange { name: "page_index", value: -1 }
        ));
        assert!(matches!(
            log.get_errors(0, -5, &mut entries).await.unwrap_err(),
            ErrorLogError::OutOfRange { name: "page_size", value: -5 }
        ));
        assert!(entries.is_empty());
    }

    #[tokio::test]
    async fn test_get_errors_appends_to_caller_list() {
        let (log, _store) = memory_log("").await;
        log.log(&ErrorRecord::new("A", "first")).await.unwrap();
        log.log(&ErrorRecord::new("B", "second")).await.unwrap();

        let mut entries = Vec::new();
        let total = log.get_errors(0, 1, &mut entries).await.unwrap();
        assert_eq!(total, 2);
        let total = log.get_errors(1, 1, &mut entries).await.unwrap();
        assert_eq!(total, 2);

        let messages: Vec<&str> = entries.iter().map(|e| e.error.message.as_str()).collect();
        assert_eq!(messages, vec!["second", "first"]);
    }

    #[tokio::test]
    async fn test_unreadable_page_leaves_list_untouched() {
        let (log, store) = memory_log("").await;
        store
            .insert_one("errvault", "broken", br#"{"_id":"broken","error":{"form":{"a":"b"}}}"#)
            .await
            .unwrap();
        log.log(&ErrorRecord::new("A", "readable")).await.unwrap();

        let mut entries = Vec::new();
        assert!(matches!(
            log.get_errors(0, 10, &mut entries).await.unwrap_err(),
            ErrorLogError::Format(_)
        ));
        assert!(entries.is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_construction_creates_once() {
        let store = Arc::new(MetricsStore::new(InMemoryCappedStore::new()));

        let mut handles = Vec::new();
        for _ in 0..32 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                CappedErrorLog::with_store(store, "race", CappedOptions::default()).await
            }));
        }
        for handle in handles {
            let log = handle.await.unwrap().unwrap();
            assert_eq!(log.collection_name(), "errvault-race");
        }

        assert_eq!(store.stats().await.create_count, 1);
        assert_eq!(
            store.list_collections(None).await.unwrap(),
            vec!["errvault-race"]
        );
    }

    #[tokio::test]
    async fn test_zero_page_size() {
        let (log, _store) = memory_log("").await;
        log.log(&ErrorRecord::new("A", "only")).await.unwrap();
        let mut entries = Vec::new();
        assert_eq!(log.get_errors(3, 0, &mut entries).await.unwrap(), 1);
        assert!(entries.is_empty());
    }

    #[tokio::test]
    async fn test_contract_name() {
        let (log, _store) = memory_log("").await;
        let contract: &dyn ErrorLog = &log;
        assert_eq!(contract.name(), "Capped Collection Error Log");
    }
}
