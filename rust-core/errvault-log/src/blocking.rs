// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Blocking facade over `CappedErrorLog` for callers without an async
// runtime. Each call parks the calling thread until the store answers.

use errvault_storage::StorageError;
use tokio::runtime::{Builder, Runtime};

use crate::config::{ConfigSource, ErrorLogConfig};
use crate::error::{ErrorLogError, ErrorLogResult};
use crate::log::CappedErrorLog;
use crate::record::{ErrorLogEntry, ErrorRecord};

/// A [`CappedErrorLog`] driven by its own tokio runtime.
///
/// Must not be created, used or dropped from inside another tokio runtime.
///
/// # Example
///
/// ```rust
/// use errvault_log::{BlockingErrorLog, ErrorRecord};
///
/// let log = BlockingErrorLog::with_connection_string("memory://doc-blocking").unwrap();
/// let id = log.log(&ErrorRecord::new("Timeout", "upstream took too long")).unwrap();
/// let entry = log.get_error(&id).unwrap().unwrap();
/// assert_eq!(entry.error.message, "upstream took too long");
/// ```
#[derive(Debug)]
pub struct BlockingErrorLog {
    runtime: Runtime,
    inner: CappedErrorLog,
}

fn build_runtime() -> ErrorLogResult<Runtime> {
    Builder::new_current_thread()
        .thread_name("errvault-blocking")
        .enable_all()
        .build()
        .map_err(|e| ErrorLogError::Store(StorageError::Io(e)))
}

impl BlockingErrorLog {
    /// See [`CappedErrorLog::from_config`].
    pub fn from_config(config: &ErrorLogConfig, source: &dyn ConfigSource) -> ErrorLogResult<Self> {
        let runtime = build_runtime()?;
        let inner = runtime.block_on(CappedErrorLog::from_config(config, source))?;
        Ok(Self { runtime, inner })
    }

    /// See [`CappedErrorLog::with_connection_string`].
    pub fn with_connection_string(connection_string: &str) -> ErrorLogResult<Self> {
        let runtime = build_runtime()?;
        let inner = runtime.block_on(CappedErrorLog::with_connection_string(connection_string))?;
        Ok(Self { runtime, inner })
    }

    pub fn name(&self) -> &str {
        self.inner.name()
    }

    pub fn log(&self, error: &ErrorRecord) -> ErrorLogResult<String> {
        self.runtime.block_on(self.inner.log(error))
    }

    pub fn get_error(&self, id: &str) -> ErrorLogResult<Option<ErrorLogEntry>> {
        self.runtime.block_on(self.inner.get_error(id))
    }

    pub fn get_errors(
        &self,
        page_index: i64,
        page_size: i64,
        entries: &mut Vec<ErrorLogEntry>,
    ) -> ErrorLogResult<u64> {
        self.runtime
            .block_on(self.inner.get_errors(page_index, page_size, entries))
    }

    /// The wrapped async log.
    pub fn inner(&self) -> &CappedErrorLog {
        &self.inner
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MapConfigSource;

    #[test]
    fn test_blocking_round_trip() {
        let log = BlockingErrorLog::with_connection_string("memory://blocking-round-trip").unwrap();
        assert_eq!(log.inner().collection_name(), "errvault");

        let first = log.log(&ErrorRecord::new("A", "one")).unwrap();
        let second = log.log(&ErrorRecord::new("B", "two")).unwrap();
        assert_ne!(first, second);

        let mut entries = Vec::new();
        let total = log.get_errors(0, 10, &mut entries).unwrap();
        assert_eq!(total, 2);
        assert_eq!(entries[0].id, second);
        assert_eq!(entries[1].id, first);
    }

    #[test]
    fn test_blocking_from_config() {
        let source = MapConfigSource::new().with_connection_string("main", "memory://blocking-config");
        let config = ErrorLogConfig {
            connection_string_name: Some("main".to_string()),
            application_name: Some("billing".to_string()),
            ..Default::default()
        };
        let log = BlockingErrorLog::from_config(&config, &source).unwrap();
        assert_eq!(log.name(), "Capped Collection Error Log");
        assert_eq!(log.inner().collection_name(), "errvault-billing");
        assert_eq!(log.inner().connection_string(), Some("memory://blocking-config"));
    }

    #[test]
    fn test_blocking_usable_from_plain_threads() {
        let log = std::sync::Arc::new(
            BlockingErrorLog::with_connection_string("memory://blocking-threads").unwrap(),
        );

        let handles: Vec<_> = (0..4)
            .map(|n| {
                let log = std::sync::Arc::clone(&log);
                std::thread::spawn(move || log.log(&ErrorRecord::new("T", format!("t{n}"))).unwrap())
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let mut entries = Vec::new();
        assert_eq!(log.get_errors(0, 10, &mut entries).unwrap(), 4);
        assert_eq!(entries.len(), 4);
    }

    #[test]
    fn test_blocking_empty_connection_string() {
        assert!(matches!(
            BlockingErrorLog::with_connection_string("").unwrap_err(),
            ErrorLogError::Argument(_)
        ));
    }
}
