//! Domain types shared by the coordinator, the cache and the lookup client

mod account;
mod issue;

pub use account::{Account, FALLBACK_IDENTITY, group_identity};
pub use issue::Issue;
