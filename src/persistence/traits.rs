//! The store capability shared by the recorders and the evaluator.

use std::time::Duration;

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;

use super::error::PersistenceError;

/// A key-value store with per-key unordered sets and expiry.
///
/// Each operation is atomic on its own; no operation is atomic with another.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait WindowStore: Send + Sync {
    /// Adds `member` to the set at `key`. Returns `false` when it was
    /// already present.
    async fn add_member(&self, key: &str, member: &str) -> Result<bool, PersistenceError>;

    /// Returns every member of the set at `key`; empty when the key is absent.
    async fn members(&self, key: &str) -> Result<Vec<String>, PersistenceError>;

    /// (Re)sets the time-to-live of `key`.
    async fn expire(&self, key: &str, ttl: Duration) -> Result<(), PersistenceError>;

    /// Removes `key` entirely. Deleting an absent key is not an error.
    async fn delete(&self, key: &str) -> Result<(), PersistenceError>;
}
