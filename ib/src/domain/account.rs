//! Accounts: the credential/endpoint context a lookup runs under

use serde::{Deserialize, Serialize};

/// Identity used for requests that carry no account
pub const FALLBACK_IDENTITY: &str = "fallback";

/// A configured account on the lookup service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Short name used to select the account
    pub alias: String,

    /// Base URL of the service this account talks to
    #[serde(default)]
    pub host: String,
}

impl Account {
    pub fn new(alias: impl Into<String>, host: impl Into<String>) -> Self {
        Self {
            alias: alias.into(),
            host: host.into(),
        }
    }
}

/// Grouping identity for an optional account
///
/// Requests whose identities are equal share a lookup; an absent account or
/// one with an empty alias maps to [`FALLBACK_IDENTITY`].
pub fn group_identity(account: Option<&Account>) -> &str {
    match account {
        Some(account) if !account.alias.is_empty() => &account.alias,
        _ => FALLBACK_IDENTITY,
    }
}
