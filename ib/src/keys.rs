//! Issue key extraction from rendered text

use eyre::{Context, Result};
use regex::Regex;

/// Pattern of an issue key: project prefix, dash, number
pub const ISSUE_KEY_PATTERN: &str = "[A-Z][A-Z0-9_]*-[0-9]+";

/// Marker between the inline prefix and the key asking for a compact render
pub const COMPACT_MARKER: &str = "-";

/// One issue reference found in text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueRef {
    pub key: String,

    /// Reference carried the compact marker
    pub compact: bool,
}

/// Find issue references in document order, duplicates kept
///
/// With an `inline_prefix` only keys written right after the prefix count
/// (`JIRA:ABC-1`, or `JIRA:-ABC-1` for a compact reference). Without one,
/// every standalone key in the text is returned.
pub fn find_issue_refs(text: &str, inline_prefix: Option<&str>) -> Result<Vec<IssueRef>> {
    let pattern = match inline_prefix.filter(|p| !p.is_empty()) {
        Some(prefix) => format!(
            "{}({})?({ISSUE_KEY_PATTERN})\\b",
            regex::escape(prefix),
            regex::escape(COMPACT_MARKER)
        ),
        None => format!("()\\b({ISSUE_KEY_PATTERN})\\b"),
    };
    let re = Regex::new(&pattern).context("Failed to build issue key pattern")?;

    Ok(re
        .captures_iter(text)
        .filter_map(|caps| {
            caps.get(2).map(|key| IssueRef {
                key: key.as_str().to_string(),
                compact: caps.get(1).is_some_and(|m| !m.as_str().is_empty()),
            })
        })
        .collect())
}

/// Keys referenced in `text`, in document order, duplicates kept
pub fn extract_issue_keys(text: &str, inline_prefix: Option<&str>) -> Result<Vec<String>> {
    Ok(find_issue_refs(text, inline_prefix)?
        .into_iter()
        .map(|r| r.key)
        .collect())
}
