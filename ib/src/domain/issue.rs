//! The remote item resolved by key

use serde::{Deserialize, Serialize};

/// An issue as returned by the lookup service
///
/// Only the key is interpreted here; everything else travels opaquely in
/// `fields` so renderers can pick what they need.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    pub key: String,

    #[serde(default)]
    pub fields: serde_json::Value,
}

impl Issue {
    /// Create an issue with no fields
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            fields: serde_json::Value::Null,
        }
    }

    /// Attach a field map
    pub fn with_fields(mut self, fields: serde_json::Value) -> Self {
        self.fields = fields;
        self
    }

    /// The `summary` field, if present
    pub fn summary(&self) -> Option<&str> {
        self.fields.get("summary").and_then(|v| v.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_issue_summary() {
        let issue = Issue::new("ABC-1").with_fields(json!({"summary": "Fix login"}));
        assert_eq!(issue.summary(), Some("Fix login"));
        assert_eq!(Issue::new("ABC-2").summary(), None);
    }

    #[test]
    fn test_issue_deserialize_without_fields() {
        let issue: Issue = serde_json::from_str(r#"{"key": "ABC-3"}"#).unwrap();
        assert_eq!(issue.key, "ABC-3");
        assert!(issue.fields.is_null());
    }
}
