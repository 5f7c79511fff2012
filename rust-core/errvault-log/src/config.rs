// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Error log configuration.
//
// A connection target comes from one of three settings, tried in order:
//
// 1. `connectionString`: the connection string itself;
// 2. `connectionStringName`: a name looked up in the source's registry of
//    connection strings;
// 3. `connectionStringAppKey`: a key looked up in the source's general
//    application settings.

use std::collections::HashMap;

use errvault_storage::{CappedOptions, DEFAULT_MAX_BYTES, DEFAULT_MAX_DOCUMENTS};
use serde::Deserialize;

use crate::error::{ErrorLogError, ErrorLogResult};

/// Where named connection strings and application settings are looked up.
pub trait ConfigSource: Send + Sync {
    /// The connection string registered under `name`.
    fn connection_string(&self, name: &str) -> Option<String>;

    /// The application setting stored under `key`.
    fn app_setting(&self, key: &str) -> Option<String>;
}

/// A [`ConfigSource`] backed by two in-memory maps.
#[derive(Debug, Clone, Default)]
pub struct MapConfigSource {
    connection_strings: HashMap<String, String>,
    app_settings: HashMap<String, String>,
}

impl MapConfigSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_connection_string(mut self, name: &str, value: &str) -> Self {
        self.connection_strings
            .insert(name.to_string(), value.to_string());
        self
    }

    pub fn with_app_setting(mut self, key: &str, value: &str) -> Self {
        self.app_settings.insert(key.to_string(), value.to_string());
        self
    }
}

impl ConfigSource for MapConfigSource {
    fn connection_string(&self, name: &str) -> Option<String> {
        self.connection_strings.get(name).cloned()
    }

    fn app_setting(&self, key: &str) -> Option<String> {
        self.app_settings.get(key).cloned()
    }
}

/// A [`ConfigSource`] reading environment variables.
///
/// With the default prefix, the connection string named `main` is read from
/// `ERRVAULT_CONNSTR_MAIN` and the setting `Errors.Db` from
/// `ERRVAULT_SETTING_ERRORS_DB`. Names are upper-cased and every
/// non-alphanumeric character becomes `_`.
#[derive(Debug, Clone)]
pub struct EnvConfigSource {
    prefix: String,
}

impl EnvConfigSource {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    fn var_name(&self, kind: &str, name: &str) -> String {
        let name: String = name
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() {
                    c.to_ascii_uppercase()
                } else {
                    '_'
                }
            })
            .collect();
        format!("{}_{}_{}", self.prefix, kind, name)
    }
}

impl Default for EnvConfigSource {
    fn default() -> Self {
        Self::new("ERRVAULT")
    }
}

impl ConfigSource for EnvConfigSource {
    fn connection_string(&self, name: &str) -> Option<String> {
        std::env::var(self.var_name("CONNSTR", name)).ok()
    }

    fn app_setting(&self, key: &str) -> Option<String> {
        std::env::var(self.var_name("SETTING", key)).ok()
    }
}

/// Settings for one error log instance.
///
/// Deserializes from the camelCase keys used by settings dictionaries, e.g.
/// `{"connectionStringName": "main", "applicationName": "shop"}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ErrorLogConfig {
    pub connection_string: Option<String>,
    pub connection_string_name: Option<String>,
    pub connection_string_app_key: Option<String>,
    pub application_name: Option<String>,
    /// Byte bound for a newly created collection.
    pub max_size: Option<u64>,
    /// Document bound for a newly created collection.
    pub max_documents: Option<u64>,
}

impl ErrorLogConfig {
    /// Read a flat string settings dictionary. Limits that do not parse as
    /// integers fall back to the defaults.
    pub fn from_settings(settings: &HashMap<String, String>) -> Self {
        let text = |key: &str| settings.get(key).cloned();
        let number = |key: &str| settings.get(key).and_then(|v| v.trim().parse::<u64>().ok());
        Self {
            connection_string: text("connectionString"),
            connection_string_name: text("connectionStringName"),
            connection_string_app_key: text("connectionStringAppKey"),
            application_name: text("applicationName"),
            max_size: number("maxSize"),
            max_documents: number("maxDocuments"),
        }
    }

    /// Resolve the connection string from the first setting that is present.
    pub fn resolve_connection_string(&self, source: &dyn ConfigSource) -> ErrorLogResult<String> {
        if let Some(cs) = non_empty(&self.connection_string) {
            return Ok(cs.to_string());
        }

        if let Some(name) = non_empty(&self.connection_string_name) {
            return source
                .connection_string(name)
                .filter(|cs| !cs.is_empty())
                .ok_or_else(|| {
                    ErrorLogError::Configuration(format!(
                        "connection string '{name}' is not registered"
                    ))
                });
        }

        if let Some(key) = non_empty(&self.connection_string_app_key) {
            return source
                .app_setting(key)
                .filter(|cs| !cs.is_empty())
                .ok_or_else(|| {
                    ErrorLogError::Configuration(format!(
                        "application setting '{key}' holds no connection string"
                    ))
                });
        }

        Err(ErrorLogError::Configuration(
            "connection string is missing for the error log".to_string(),
        ))
    }

    /// Capacity bounds for a newly created collection.
    pub fn limits(&self) -> ErrorLogResult<CappedOptions> {
        let options = CappedOptions {
            max_bytes: self.max_size.unwrap_or(DEFAULT_MAX_BYTES),
            max_documents: Some(self.max_documents.unwrap_or(DEFAULT_MAX_DOCUMENTS)),
        };
        options
            .validate()
            .map_err(|e| ErrorLogError::Configuration(e.to_string()))?;
        Ok(options)
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source() -> MapConfigSource {
        MapConfigSource::new()
            .with_connection_string("main", "memory://from-registry")
            .with_app_setting("Errors.Db", "memory://from-settings")
    }

    #[test]
    fn test_explicit_connection_string_wins() {
        let config = ErrorLogConfig {
            connection_string: Some("memory://explicit".to_string()),
            connection_string_name: Some("main".to_string()),
            connection_string_app_key: Some("Errors.Db".to_string()),
            ..Default::default()
        };
        assert_eq!(
            config.resolve_connection_string(&source()).unwrap(),
            "memory://explicit"
        );
    }

    #[test]
    fn test_named_reference_before_app_setting() {
        let config = ErrorLogConfig {
            connection_string_name: Some("main".to_string()),
            connection_string_app_key: Some("Errors.Db".to_string()),
            ..Default::default()
        };
        assert_eq!(
            config.resolve_connection_string(&source()).unwrap(),
            "memory://from-registry"
        );
    }

    #[test]
    fn test_app_setting_last() {
        let config = ErrorLogConfig {
            connection_string: Some(String::new()),
            connection_string_app_key: Some("Errors.Db".to_string()),
            ..Default::default()
        };
        assert_eq!(
            config.resolve_connection_string(&source()).unwrap(),
            "memory://from-settings"
        );
    }

    #[test]
    fn test_unknown_name_is_configuration_error() {
        let config = ErrorLogConfig {
            connection_string_name: Some("missing".to_string()),
            ..Default::default()
        };
        let err = config.resolve_connection_string(&source()).unwrap_err();
        assert!(matches!(err, ErrorLogError::Configuration(ref m) if m.contains("missing")));
    }

    #[test]
    fn test_nothing_configured() {
        let err = ErrorLogConfig::default()
            .resolve_connection_string(&source())
            .unwrap_err();
        assert!(matches!(err, ErrorLogError::Configuration(_)));
    }

    #[test]
    fn test_from_settings() {
        let settings: HashMap<String, String> = [
            ("connectionStringName", "main"),
            ("applicationName", "shop"),
            ("maxSize", "4096"),
            ("maxDocuments", "lots"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        let config = ErrorLogConfig::from_settings(&settings);
        assert_eq!(config.connection_string_name.as_deref(), Some("main"));
        assert_eq!(config.application_name.as_deref(), Some("shop"));
        assert_eq!(config.max_size, Some(4096));
        assert_eq!(config.max_documents, None);

        let limits = config.limits().unwrap();
        assert_eq!(limits.max_bytes, 4096);
        assert_eq!(limits.max_documents, Some(DEFAULT_MAX_DOCUMENTS));
    }

    #[test]
    fn test_deserialize_camel_case() {
        let config: ErrorLogConfig = serde_json::from_str(
            r#"{"connectionString": "memory://x", "applicationName": "shop", "maxSize": 1024}"#,
        )
        .unwrap();
        assert_eq!(config.connection_string.as_deref(), Some("memory://x"));
        assert_eq!(config.max_size, Some(1024));
    }

    #[test]
    fn test_zero_limit_rejected() {
        let config = ErrorLogConfig {
            max_size: Some(0),
            ..Default::default()
        };
        assert!(matches!(
            config.limits().unwrap_err(),
            ErrorLogError::Configuration(_)
        ));
    }

    #[test]
    fn test_env_var_names() {
        let source = EnvConfigSource::default();
        assert_eq!(source.var_name("CONNSTR", "main"), "ERRVAULT_CONNSTR_MAIN");
        assert_eq!(
            source.var_name("SETTING", "Errors.Db"),
            "ERRVAULT_SETTING_ERRORS_DB"
        );
    }
}
