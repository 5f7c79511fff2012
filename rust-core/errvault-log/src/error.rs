// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Error types for the errvault error log.
//
// Nothing here is logged or swallowed: every failure goes straight back to
// the caller of the operation that produced it.

use errvault_storage::StorageError;
use thiserror::Error;

use crate::codec::CodecError;

/// Errors surfaced by error log construction and operations.
#[derive(Debug, Error)]
pub enum ErrorLogError {
    /// No usable connection target, or an invalid setting. The log must not
    /// be used.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A required argument was missing or empty.
    #[error("invalid argument: {0}")]
    Argument(String),

    /// A pagination argument was negative.
    #[error("{name} out of range: {value}")]
    OutOfRange {
        /// Name of the offending argument.
        name: &'static str,
        /// The rejected value.
        value: i64,
    },

    /// An identifier or stored document could not be parsed.
    #[error("format error: {0}")]
    Format(String),

    /// Failure reported by the capped store, passed through unchanged.
    #[error(transparent)]
    Store(#[from] StorageError),
}

impl From<CodecError> for ErrorLogError {
    fn from(err: CodecError) -> Self {
        Self::Format(err.to_string())
    }
}

/// Convenience type alias for error log results.
pub type ErrorLogResult<T> = Result<T, ErrorLogError>;
