// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// The error log contract consumed by error-capturing frameworks.

use async_trait::async_trait;

use crate::error::ErrorLogResult;
use crate::record::{ErrorLogEntry, ErrorRecord};

/// A store of application errors.
///
/// Implementations must be safe to share across threads and tokio tasks.
#[async_trait]
pub trait ErrorLog: Send + Sync {
    /// Display name of this implementation.
    fn name(&self) -> &str;

    /// Persist `error` and return its new identifier.
    async fn log(&self, error: &ErrorRecord) -> ErrorLogResult<String>;

    /// Fetch one error by identifier; `Ok(None)` if there is no such error.
    async fn get_error(&self, id: &str) -> ErrorLogResult<Option<ErrorLogEntry>>;

    /// Append one page of errors, newest first, to `entries` and return the
    /// total number of stored errors.
    async fn get_errors(
        &self,
        page_index: i64,
        page_size: i64,
        entries: &mut Vec<ErrorLogEntry>,
    ) -> ErrorLogResult<u64>;
}
