//! Key-set query descriptor

use std::fmt;

/// Characters the query adds around the key list
pub const QUERY_OVERHEAD: usize = 10;

/// Separator between keys in the serialized query
pub const KEY_SEPARATOR: &str = ", ";

/// Estimated serialized length of a query over `keys`
///
/// Sum of key lengths, plus a separator per key after the first, plus the
/// fixed overhead. An empty key list is just the overhead.
pub fn estimated_query_length<S: AsRef<str>>(keys: &[S]) -> usize {
    let key_chars: usize = keys.iter().map(|k| k.as_ref().len()).sum();
    key_chars + keys.len().saturating_sub(1) * KEY_SEPARATOR.len() + QUERY_OVERHEAD
}

/// "Issue key is one of these keys", serialized as `key in (A-1, A-2)`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyQuery {
    keys: Vec<String>,
}

impl KeyQuery {
    pub fn new(keys: Vec<String>) -> Self {
        Self { keys }
    }

    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.keys.iter().any(|k| k == key)
    }

    pub fn estimated_len(&self) -> usize {
        estimated_query_length(&self.keys)
    }
}

impl fmt::Display for KeyQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "key in ({})", self.keys.join(KEY_SEPARATOR))
    }
}
