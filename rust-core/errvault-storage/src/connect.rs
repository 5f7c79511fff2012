// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Connection-string resolution for errvault capped stores.
//
// Supported forms:
//
// - `memory://<database>`: a named in-memory database shared by every
//   connection in the process that uses the same name.
// - `redb://<path>`: a redb file (requires the `redb-backend` feature).
//   Connections to the same path share one open database.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, OnceLock};

use tracing::debug;

use crate::backend::CappedStore;
use crate::error::StorageError;
use crate::memory::InMemoryCappedStore;

type Registry = Mutex<HashMap<String, Arc<dyn CappedStore>>>;

// Entries are never removed: a name maps to the same data for the lifetime
// of the process.
static OPEN_DATABASES: OnceLock<Registry> = OnceLock::new();

fn registry() -> &'static Registry {
    OPEN_DATABASES.get_or_init(|| Mutex::new(HashMap::new()))
}

/// A parsed connection string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionTarget {
    /// Named process-local in-memory database.
    Memory { database: String },
    /// redb database file.
    Redb { path: String },
}

impl ConnectionTarget {
    /// Parse `scheme://rest`.
    pub fn parse(connection_string: &str) -> Result<Self, StorageError> {
        let (scheme, rest) = connection_string
            .split_once("://")
            .ok_or_else(|| StorageError::UnsupportedScheme(connection_string.to_string()))?;

        match scheme.to_ascii_lowercase().as_str() {
            "memory" => Ok(Self::Memory {
                database: rest.trim_end_matches('/').to_string(),
            }),
            "redb" if !rest.is_empty() => Ok(Self::Redb {
                path: rest.to_string(),
            }),
            _ => Err(StorageError::UnsupportedScheme(scheme.to_string())),
        }
    }

    fn registry_key(&self) -> String {
        match self {
            Self::Memory { database } => format!("memory://{database}"),
            Self::Redb { path } => format!("redb://{path}"),
        }
    }
}

/// Open (or reuse) the database a connection string points at.
pub fn open_database(connection_string: &str) -> Result<Arc<dyn CappedStore>, StorageError> {
    let target = ConnectionTarget::parse(connection_string)?;
    let key = target.registry_key();

    let mut open = registry()
        .lock()
        .map_err(|e| StorageError::BackendUnavailable(format!("registry lock: {e}")))?;
    if let Some(store) = open.get(&key) {
        return Ok(Arc::clone(store));
    }

    let store: Arc<dyn CappedStore> = match &target {
        ConnectionTarget::Memory { .. } => Arc::new(InMemoryCappedStore::new()),
        #[cfg(feature = "redb-backend")]
        ConnectionTarget::Redb { path } => {
            Arc::new(crate::redb_backend::RedbCappedStore::open(path)?)
        }
        #[cfg(not(feature = "redb-backend"))]
        ConnectionTarget::Redb { .. } => {
            return Err(StorageError::BackendUnavailable(
                "redb support not compiled in (enable the `redb-backend` feature)".to_string(),
            ))
        }
    };

    debug!(target = %key, backend = store.name(), "opened capped store");
    open.insert(key, Arc::clone(&store));
    Ok(store)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::CappedOptions;

    #[test]
    fn test_parse_memory() {
        assert_eq!(
            ConnectionTarget::parse("memory://shop").unwrap(),
            ConnectionTarget::Memory {
                database: "shop".to_string()
            }
        );
        assert_eq!(
            ConnectionTarget::parse("MEMORY://shop/").unwrap(),
            ConnectionTarget::Memory {
                database: "shop".to_string()
            }
        );
    }

    #[test]
    fn test_parse_redb() {
        assert_eq!(
            ConnectionTarget::parse("redb:///var/lib/errvault.redb").unwrap(),
            ConnectionTarget::Redb {
                path: "/var/lib/errvault.redb".to_string()
            }
        );
        assert!(ConnectionTarget::parse("redb://").is_err());
    }

    #[test]
    fn test_parse_rejects_unknown() {
        assert!(matches!(
            ConnectionTarget::parse("mongodb://localhost/elmah").unwrap_err(),
            StorageError::UnsupportedScheme(s) if s == "mongodb"
        ));
        assert!(matches!(
            ConnectionTarget::parse("no-scheme").unwrap_err(),
            StorageError::UnsupportedScheme(_)
        ));
    }

    #[tokio::test]
    async fn test_same_name_shares_database() {
        let a = open_database("memory://connect-shared").unwrap();
        let b = open_database("memory://connect-shared").unwrap();
        let other = open_database("memory://connect-other").unwrap();

        a.create_capped("errs", CappedOptions::default()).await.unwrap();
        assert_eq!(b.list_collections(Some("errs")).await.unwrap(), vec!["errs"]);
        assert!(other.list_collections(Some("errs")).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_data_outlives_every_handle() {
        {
            let db = open_database("memory://connect-outlives").unwrap();
            db.create_capped("errs", CappedOptions::default()).await.unwrap();
            db.insert_one("errs", "kept", b"doc").await.unwrap();
        }

        let reopened = open_database("memory://connect-outlives").unwrap();
        assert_eq!(
            reopened.find_by_id("errs", "kept").await.unwrap(),
            Some(b"doc".to_vec())
        );
    }
}
