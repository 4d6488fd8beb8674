//! Packing of keys into size- and length-bounded lookup calls

use crate::lookup::{KEY_SEPARATOR, QUERY_OVERHEAD};

/// Greedy single-pass partition of `keys` into chunks
///
/// A chunk is closed when the next key would push it past `max_batch_size`
/// keys or past `max_query_length` estimated characters. A key that alone
/// exceeds the length budget still gets a chunk of its own.
pub fn chunk_keys(keys: &[String], max_batch_size: usize, max_query_length: usize) -> Vec<Vec<String>> {
    let max_batch_size = max_batch_size.max(1);
    let mut chunks = Vec::new();
    let mut current: Vec<String> = Vec::new();
    // key characters plus separators, without the overhead
    let mut current_len = 0;

    for key in keys {
        if !current.is_empty() {
            let potential = current_len + KEY_SEPARATOR.len() + key.len();
            if current.len() >= max_batch_size || potential + QUERY_OVERHEAD > max_query_length {
                chunks.push(std::mem::take(&mut current));
                current_len = 0;
            }
        }

        if !current.is_empty() {
            current_len += KEY_SEPARATOR.len();
        }
        current_len += key.len();
        current.push(key.clone());
    }

    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}
