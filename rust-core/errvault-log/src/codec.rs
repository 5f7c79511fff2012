// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Structured multi-map codec.
//
// An `OrderedMultiMap` is stored as an array of `[key, value]` pairs, or as
// `null` when the map itself is absent:
//
// ```text
// null                                  -- no metadata captured
// []                                    -- metadata captured, nothing in it
// [["HTTP_HOST", "example.org"],
//  ["a.b", "1"], ["$where", "2"],       -- no escaping: keys are array data
//  ["a.b", "3"], [null, "orphan"]]      -- duplicates and null keys survive
// ```
//
// Keys never become field names, so `.`, a leading `$` and duplicates need
// no escaping. Values under any key containing "password" (any case) are
// written as "" on encode. Decode returns whatever is stored.
//
// The functions `serialize` / `deserialize` let record fields use this
// codec via `#[serde(with = "crate::codec")]`.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use thiserror::Error;

use crate::multimap::OrderedMultiMap;

/// A stored multi-map that is not in the pair-array shape.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    #[error("expected null or an array of pairs, found {0}")]
    NotAnArray(&'static str),

    #[error("entry {index} is not a two-element array")]
    MalformedPair { index: usize },

    #[error("entry {index} has a key that is neither a string nor null")]
    InvalidKey { index: usize },

    #[error("entry {index} has a value that is not a string")]
    InvalidValue { index: usize },
}

/// True if values stored under `key` must be blanked on encode.
pub fn is_redacted_key(key: &str) -> bool {
    key.to_lowercase().contains("password")
}

/// Encode a multi-map. Total over every input.
pub fn encode(map: Option<&OrderedMultiMap>) -> Value {
    let Some(map) = map else {
        return Value::Null;
    };

    let pairs = map
        .iter()
        .map(|(key, value)| {
            let value = match key {
                Some(k) if is_redacted_key(k) => "",
                _ => value,
            };
            Value::Array(vec![
                key.map_or(Value::Null, |k| Value::String(k.to_string())),
                Value::String(value.to_string()),
            ])
        })
        .collect();
    Value::Array(pairs)
}

/// Decode a stored multi-map.
pub fn decode(value: &Value) -> Result<Option<OrderedMultiMap>, CodecError> {
    let pairs = match value {
        Value::Null => return Ok(None),
        Value::Array(pairs) => pairs,
        other => return Err(CodecError::NotAnArray(json_type(other))),
    };

    let mut map = OrderedMultiMap::new();
    for (index, pair) in pairs.iter().enumerate() {
        let (key, val) = match pair.as_array().map(Vec::as_slice) {
            Some([key, val]) => (key, val),
            _ => return Err(CodecError::MalformedPair { index }),
        };
        let key = match key {
            Value::Null => None,
            Value::String(k) => Some(k.clone()),
            _ => return Err(CodecError::InvalidKey { index }),
        };
        let val = val
            .as_str()
            .ok_or(CodecError::InvalidValue { index })?
            .to_string();
        map.push(key, val);
    }
    Ok(Some(map))
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// serde adapter: write the field through [`encode`].
pub fn serialize<S: Serializer>(
    map: &Option<OrderedMultiMap>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    encode(map.as_ref()).serialize(serializer)
}

/// serde adapter: read the field through [`decode`].
pub fn deserialize<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<OrderedMultiMap>, D::Error> {
    let value = Value::deserialize(deserializer)?;
    decode(&value).map_err(D::Error::custom)
}
