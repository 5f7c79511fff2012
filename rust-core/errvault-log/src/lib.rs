// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// errvault Error Log
//
// Records application errors into a size-bounded capped collection and
// reads them back newest first. One collection per application name;
// request metadata (server variables, query string, form, cookies) is kept
// as ordered multi-maps encoded as `[key, value]` pair arrays.
//
// # Modules
//
// - [`multimap`] -- `OrderedMultiMap`, the metadata container.
// - [`codec`] -- Pair-array encoding of multi-maps, with password redaction.
// - [`record`] -- `ErrorRecord` and its stored document shape.
// - [`config`] -- `ErrorLogConfig` and connection-string resolution.
// - [`log`] -- `CappedErrorLog`, the capped-collection error log.
// - [`contract`] -- The `ErrorLog` trait.
// - [`blocking`] -- `BlockingErrorLog` for synchronous callers.
// - [`error`] -- `ErrorLogError`.
//
// # Example
//
// ```rust
// use errvault_log::{CappedErrorLog, ErrorRecord, OrderedMultiMap};
//
// # tokio_test::block_on(async {
// let log = CappedErrorLog::with_connection_string("memory://example").await.unwrap();
//
// let mut form = OrderedMultiMap::new();
// form.add("user.email", "a@example.org");
// form.add("password", "hunter2");
// let id = log
//     .log(&ErrorRecord::new("NullReference", "boom").with_form(form))
//     .await
//     .unwrap();
//
// let mut page = Vec::new();
// let total = log.get_errors(0, 20, &mut page).await.unwrap();
// assert_eq!(total, 1);
// assert_eq!(page[0].id, id);
// # });
// ```

pub mod blocking;
pub mod codec;
pub mod config;
pub mod contract;
pub mod error;
pub mod log;
pub mod multimap;
pub mod record;

pub use blocking::BlockingErrorLog;
pub use codec::CodecError;
pub use config::{ConfigSource, EnvConfigSource, ErrorLogConfig, MapConfigSource};
pub use contract::ErrorLog;
pub use error::{ErrorLogError, ErrorLogResult};
pub use log::{CappedErrorLog, DEFAULT_COLLECTION_NAME, MAX_APPLICATION_NAME_LENGTH};
pub use multimap::OrderedMultiMap;
pub use record::{ErrorLogEntry, ErrorRecord};
