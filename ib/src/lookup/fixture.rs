//! File-backed lookup

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use async_trait::async_trait;
use eyre::{Context, Result};
use tracing::debug;

use super::query::KeyQuery;
use super::{IssueLookup, SearchOptions, SearchResults};
use crate::domain::{Issue, group_identity};
use crate::error::LookupError;

/// Lookup answering from a static map of account identity to issues
///
/// The file is YAML (or JSON) keyed by account alias, with `fallback` for
/// requests that carry no account:
///
/// ```yaml
/// fallback:
///   - key: ABC-1
///     fields: { summary: Fix login }
/// work:
///   - key: OPS-7
/// ```
///
/// Account names match case-insensitively, like account aliases do.
#[derive(Debug, Clone, Default)]
pub struct FixtureLookup {
    /// Issues by lowercased account identity
    accounts: HashMap<String, Vec<Issue>>,
}

impl FixtureLookup {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add issues served for the given account identity
    pub fn with_issues(mut self, identity: impl AsRef<str>, issues: Vec<Issue>) -> Self {
        self.accounts
            .entry(identity.as_ref().to_lowercase())
            .or_default()
            .extend(issues);
        self
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)
            .context(format!("Failed to read fixtures from {}", path.as_ref().display()))?;
        let raw: HashMap<String, Vec<Issue>> =
            serde_yaml::from_str(&content).context("Failed to parse fixtures file")?;
        let fixtures = raw
            .into_iter()
            .fold(Self::new(), |fixtures, (identity, issues)| fixtures.with_issues(identity, issues));
        debug!(accounts = fixtures.accounts.len(), "FixtureLookup::from_file: loaded");
        Ok(fixtures)
    }
}

#[async_trait]
impl IssueLookup for FixtureLookup {
    async fn search(&self, query: &KeyQuery, options: &SearchOptions) -> Result<SearchResults, LookupError> {
        let identity = group_identity(options.account.as_ref());
        debug!(%query, %identity, "FixtureLookup::search: called");

        let issues = self
            .accounts
            .get(&identity.to_lowercase())
            .ok_or_else(|| LookupError::ConfigurationGap(format!("No issues configured for account: {identity}")))?;

        let limit = if options.limit == 0 { usize::MAX } else { options.limit };
        Ok(SearchResults {
            issues: issues
                .iter()
                .filter(|issue| query.contains(&issue.key))
                .take(limit)
                .cloned()
                .collect(),
        })
    }
}
