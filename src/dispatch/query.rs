//! Query-string parsing.
//!
//! # Responsibilities
//! - Parse the raw query string into a key→value map
//! - Keep the first occurrence when a key repeats (documented policy)
//! - Degrade to an empty map on absent or unusable input

use std::collections::HashMap;

/// Parsed query parameters for one request.
///
/// Keys are unique; when a key appears more than once in the query string,
/// the **first** occurrence wins. A missing or malformed query string yields
/// an empty map rather than an error, since routing never depends on it.
#[derive(Debug, Clone, Default)]
pub struct Query {
    params: HashMap<String, String>,
}

impl Query {
    /// Parse the raw query string (the part after `?`, without the `?`).
    pub fn parse(raw: Option<&str>) -> Self {
        let mut params = HashMap::new();
        if let Some(raw) = raw {
            for (key, value) in url::form_urlencoded::parse(raw.as_bytes()) {
                params.entry(key.into_owned()).or_insert_with(|| value.into_owned());
            }
        }
        Self { params }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.params.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.params.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}
