// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Error record model and its stored document shape.
//
// Stored field names are pinned with `#[serde(rename)]`, so renaming a Rust
// field never changes what is on disk. A stored document looks like:
//
// ```text
// { "_id": "<id>",
//   "error": { "applicationName", "host", "type", "source", "message",
//              "detail", "user", "time", "statusCode",
//              "webHostHtmlMessage", "serverVariables", "queryString",
//              "form", "cookies" } }
// ```

use chrono::{DateTime, FixedOffset, Local, SecondsFormat, Utc};
use serde::{Deserialize, Serialize, Serializer};

use crate::error::{ErrorLogError, ErrorLogResult};
use crate::multimap::OrderedMultiMap;

/// One logged application error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorRecord {
    /// Owning application. Overwritten by the log on insert.
    #[serde(rename = "applicationName", default)]
    pub application_name: String,

    #[serde(rename = "host", default)]
    pub host_name: String,

    /// Error type name (for example the exception class).
    #[serde(rename = "type", default)]
    pub type_name: String,

    #[serde(rename = "source", default)]
    pub source: String,

    #[serde(rename = "message", default)]
    pub message: String,

    /// Full detail text, typically a stack trace.
    #[serde(rename = "detail", default)]
    pub detail: String,

    #[serde(rename = "user", default)]
    pub user: String,

    /// When the error occurred. Stored as UTC.
    #[serde(rename = "time", serialize_with = "serialize_utc")]
    pub time: DateTime<FixedOffset>,

    /// HTTP status code, 0 if none.
    #[serde(rename = "statusCode", default)]
    pub status_code: i32,

    /// Preformatted display text from the host; opaque here.
    #[serde(rename = "webHostHtmlMessage", default)]
    pub web_host_html_message: String,

    #[serde(rename = "serverVariables", with = "crate::codec", default)]
    pub server_variables: Option<OrderedMultiMap>,

    #[serde(rename = "queryString", with = "crate::codec", default)]
    pub query_string: Option<OrderedMultiMap>,

    #[serde(rename = "form", with = "crate::codec", default)]
    pub form: Option<OrderedMultiMap>,

    #[serde(rename = "cookies", with = "crate::codec", default)]
    pub cookies: Option<OrderedMultiMap>,
}

fn serialize_utc<S: Serializer>(
    time: &DateTime<FixedOffset>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(
        &time
            .with_timezone(&Utc)
            .to_rfc3339_opts(SecondsFormat::AutoSi, true),
    )
}

impl Default for ErrorRecord {
    fn default() -> Self {
        Self {
            application_name: String::new(),
            host_name: String::new(),
            type_name: String::new(),
            source: String::new(),
            message: String::new(),
            detail: String::new(),
            user: String::new(),
            time: Utc::now().fixed_offset(),
            status_code: 0,
            web_host_html_message: String::new(),
            server_variables: None,
            query_string: None,
            form: None,
            cookies: None,
        }
    }
}

impl ErrorRecord {
    /// A record of the given type and message, timestamped now.
    pub fn new(type_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            message: message.into(),
            ..Self::default()
        }
    }

    pub fn with_host(mut self, host_name: impl Into<String>) -> Self {
        self.host_name = host_name.into();
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = detail.into();
        self
    }

    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = user.into();
        self
    }

    pub fn with_time(mut self, time: DateTime<FixedOffset>) -> Self {
        self.time = time;
        self
    }

    pub fn with_status_code(mut self, status_code: i32) -> Self {
        self.status_code = status_code;
        self
    }

    pub fn with_web_host_html_message(mut self, html: impl Into<String>) -> Self {
        self.web_host_html_message = html.into();
        self
    }

    pub fn with_server_variables(mut self, map: OrderedMultiMap) -> Self {
        self.server_variables = Some(map);
        self
    }

    pub fn with_query_string(mut self, map: OrderedMultiMap) -> Self {
        self.query_string = Some(map);
        self
    }

    pub fn with_form(mut self, map: OrderedMultiMap) -> Self {
        self.form = Some(map);
        self
    }

    pub fn with_cookies(mut self, map: OrderedMultiMap) -> Self {
        self.cookies = Some(map);
        self
    }

    /// Serialize into the stored document for `id`.
    pub fn to_document(&self, id: &str) -> ErrorLogResult<Vec<u8>> {
        let doc = StoredDocumentRef { id, error: self };
        serde_json::to_vec(&doc)
            .map_err(|e| ErrorLogError::Format(format!("failed to encode error {id}: {e}")))
    }

    /// Parse a stored document back into an entry.
    pub fn from_document(bytes: &[u8]) -> ErrorLogResult<ErrorLogEntry> {
        let doc: StoredDocument = serde_json::from_slice(bytes)
            .map_err(|e| ErrorLogError::Format(format!("malformed stored error: {e}")))?;
        Ok(ErrorLogEntry {
            id: doc.id,
            error: doc.error,
        })
    }
}

#[derive(Serialize)]
struct StoredDocumentRef<'a> {
    #[serde(rename = "_id")]
    id: &'a str,
    error: &'a ErrorRecord,
}

#[derive(Deserialize)]
struct StoredDocument {
    #[serde(rename = "_id")]
    id: String,
    error: ErrorRecord,
}

/// A stored error together with its identifier.
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorLogEntry {
    pub id: String,
    pub error: ErrorRecord,
}

impl ErrorLogEntry {
    /// Shift the record's time into the local zone. The instant is unchanged.
    pub fn into_local_time(mut self) -> Self {
        self.error.time = self.error.time.with_timezone(&Local).fixed_offset();
        self
    }
}
