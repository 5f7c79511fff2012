// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Ordered string multi-map used for request metadata (server variables,
// query string, form fields, cookies).

/// An insertion-ordered sequence of `(key, value)` pairs.
///
/// Keys may repeat and may be absent (`None`). Lookups compare keys
/// ASCII-case-insensitively, the way HTTP header and form names are
/// usually matched; iteration and equality see the keys exactly as added.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderedMultiMap {
    entries: Vec<(Option<String>, String)>,
}

impl OrderedMultiMap {
    /// Create an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a named pair.
    pub fn add(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.push((Some(key.into()), value.into()));
    }

    /// Append a pair with no key.
    pub fn add_unnamed(&mut self, value: impl Into<String>) {
        self.entries.push((None, value.into()));
    }

    /// Append a pair whose key may be absent.
    pub fn push(&mut self, key: Option<String>, value: String) {
        self.entries.push((key, value));
    }

    /// All values stored under `key`, in insertion order.
    pub fn get_all(&self, key: Option<&str>) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|(k, _)| keys_match(k.as_deref(), key))
            .map(|(_, v)| v.as_str())
            .collect()
    }

    /// The first value stored under `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| keys_match(k.as_deref(), Some(key)))
            .map(|(_, v)| v.as_str())
    }

    /// Distinct keys in first-seen order.
    pub fn keys(&self) -> Vec<Option<&str>> {
        let mut keys: Vec<Option<&str>> = Vec::new();
        for (k, _) in &self.entries {
            let k = k.as_deref();
            if !keys.iter().any(|seen| keys_match(*seen, k)) {
                keys.push(k);
            }
        }
        keys
    }

    /// Iterate pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (Option<&str>, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_deref(), v.as_str()))
    }

    /// Number of pairs (not distinct keys).
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn keys_match(a: Option<&str>, b: Option<&str>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => a.eq_ignore_ascii_case(b),
        (None, None) => true,
        _ => false,
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for OrderedMultiMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Self::new();
        for (k, v) in iter {
            map.add(k, v);
        }
        map
    }
}
