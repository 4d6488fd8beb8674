//! issuebatch configuration types and loading

use eyre::{Context, Result, eyre};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use crate::batch::BatchConfig;
use crate::cache::CacheConfig;
use crate::domain::Account;
use crate::error::LookupError;
use crate::lookup::LookupConfig;
use crate::queue::QueueConfig;

/// Main issuebatch configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Log level used when none is given on the command line
    #[serde(rename = "log-level", skip_serializing_if = "Option::is_none")]
    pub log_level: Option<String>,

    /// Batch coordinator settings
    pub batch: BatchConfig,

    /// Dispatch queue policy for lookup calls
    pub queue: QueueConfig,

    /// Result cache settings
    pub cache: CacheConfig,

    /// Lookup client settings
    pub lookup: LookupConfig,

    /// Key extraction settings
    pub scan: ScanConfig,

    /// Known accounts
    pub accounts: Vec<Account>,
}

impl Config {
    /// Validate configuration before use
    pub fn validate(&self) -> Result<()> {
        if self.batch.max_batch_size == 0 {
            return Err(eyre!("batch.max-batch-size must be at least 1"));
        }
        if self.batch.max_query_length == 0 {
            return Err(eyre!("batch.max-query-length must be at least 1"));
        }
        if self.queue.concurrency == 0 {
            return Err(eyre!("queue.concurrency must be at least 1"));
        }

        let mut seen = HashSet::new();
        for account in &self.accounts {
            if account.alias.trim().is_empty() {
                return Err(eyre!("Account with host '{}' has an empty alias", account.host));
            }
            if !seen.insert(account.alias.to_lowercase()) {
                return Err(eyre!("Duplicate account alias: {}", account.alias));
            }
        }
        Ok(())
    }

    /// Load configuration with fallback chain
    /// Load from an explicit path, else the first config file found
    ///
    /// Search order: `.issuebatch.yml` in the working directory, then
    /// `~/.config/issuebatch/issuebatch.yml`. A file that is found but fails
    /// to parse or validate is an error rather than a silent fallback.
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        let Some(path) = config_path.cloned().or_else(Self::discover) else {
            tracing::info!("No config file found, using defaults");
            return Ok(Self::default());
        };
        Self::load_from_file(&path).context(format!("Failed to load config from {}", path.display()))
    }

    fn discover() -> Option<PathBuf> {
        let local = PathBuf::from(".issuebatch.yml");
        let user = dirs::config_dir().map(|dir| dir.join("issuebatch").join("issuebatch.yml"));
        std::iter::once(local).chain(user).find(|path| path.exists())
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;
        config.validate().context("Invalid configuration")?;

        tracing::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }

    /// Look up an account by alias, ignoring case
    ///
    /// An empty alias selects no account. An alias that matches nothing is a
    /// configuration gap.
    pub fn account_by_alias(&self, alias: &str) -> Result<Option<Account>, LookupError> {
        let alias = alias.trim();
        if alias.is_empty() {
            return Ok(None);
        }

        self.accounts
            .iter()
            .find(|account| account.alias.eq_ignore_ascii_case(alias))
            .cloned()
            .map(Some)
            .ok_or_else(|| LookupError::ConfigurationGap(format!("No accounts found with alias: {alias}")))
    }

    /// Find the account serving `host`, ignoring case and trailing slashes
    pub fn account_by_host(&self, host: &str) -> Option<&Account> {
        let wanted = normalize_host(host);
        self.accounts
            .iter()
            .find(|account| normalize_host(&account.host) == wanted)
    }
}

fn normalize_host(host: &str) -> String {
    host.trim().trim_end_matches('/').to_lowercase()
}

/// Key extraction configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Only keys written right after this prefix are extracted
    #[serde(rename = "inline-prefix", skip_serializing_if = "Option::is_none")]
    pub inline_prefix: Option<String>,
}
