//! An in-process [`WindowStore`] honouring set semantics and key expiry.
//!
//! Expiry is measured with `tokio::time`, so tests can drive it with a paused
//! clock.

use std::{collections::HashSet, time::Duration};

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::time::Instant;

use crate::persistence::{error::PersistenceError, traits::WindowStore};

#[derive(Debug, Default)]
struct SetEntry {
    members: HashSet<String>,
    expires_at: Option<Instant>,
}

impl SetEntry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|deadline| deadline <= now)
    }
}

/// A [`WindowStore`] held entirely in memory.
#[derive(Debug, Default)]
pub struct InMemoryWindowStore {
    sets: DashMap<String, SetEntry>,
}

impl InMemoryWindowStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `key` currently exists (is non-empty and not expired).
    pub fn contains_key(&self, key: &str) -> bool {
        self.evict_if_expired(key);
        self.sets.contains_key(key)
    }

    /// Remaining time-to-live of `key`, if it exists and has one.
    pub fn ttl(&self, key: &str) -> Option<Duration> {
        self.evict_if_expired(key);
        let entry = self.sets.get(key)?;
        entry.expires_at.map(|deadline| deadline.saturating_duration_since(Instant::now()))
    }

    /// Number of members in the set at `key`.
    pub fn cardinality(&self, key: &str) -> usize {
        self.evict_if_expired(key);
        self.sets.get(key).map_or(0, |entry| entry.members.len())
    }

    fn evict_if_expired(&self, key: &str) {
        let now = Instant::now();
        self.sets.remove_if(key, |_, entry| entry.is_expired(now));
    }
}

#[async_trait]
impl WindowStore for InMemoryWindowStore {
    async fn add_member(&self, key: &str, member: &str) -> Result<bool, PersistenceError> {
        self.evict_if_expired(key);
        let mut entry = self.sets.entry(key.to_string()).or_default();
        Ok(entry.members.insert(member.to_string()))
    }

    async fn members(&self, key: &str) -> Result<Vec<String>, PersistenceError> {
        self.evict_if_expired(key);
        Ok(self
            .sets
            .get(key)
            .map(|entry| entry.members.iter().cloned().collect())
            .unwrap_or_default())
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<(), PersistenceError> {
        self.evict_if_expired(key);
        if let Some(mut entry) = self.sets.get_mut(key) {
            entry.expires_at = Some(Instant::now() + ttl);
        }
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), PersistenceError> {
        self.sets.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_add_member_is_idempotent() {
        let store = InMemoryWindowStore::new();

        assert!(store.add_member("k", "a").await.unwrap());
        assert!(!store.add_member("k", "a").await.unwrap());
        assert!(store.add_member("k", "b").await.unwrap());

        let mut members = store.members("k").await.unwrap();
        members.sort();
        assert_eq!(members, vec!["a".to_string(), "b".to_string()]);
    }

    #[tokio::test]
    async fn test_members_of_absent_key_is_empty() {
        let store = InMemoryWindowStore::new();

        assert!(store.members("missing").await.unwrap().is_empty());
        assert!(store.delete("missing").await.is_ok());
    }

    #[tokio::test]
    async fn test_expire_on_absent_key_is_a_no_op() {
        let store = InMemoryWindowStore::new();

        store.expire("missing", Duration::from_secs(5)).await.unwrap();

        assert!(!store.contains_key("missing"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_key_expires_after_ttl() {
        let store = InMemoryWindowStore::new();
        store.add_member("k", "a").await.unwrap();
        store.expire("k", Duration::from_secs(60)).await.unwrap();

        tokio::time::advance(Duration::from_secs(59)).await;
        assert!(store.contains_key("k"));

        tokio::time::advance(Duration::from_secs(1)).await;
        assert!(!store.contains_key("k"));
        assert!(store.members("k").await.unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_expire_refreshes_deadline() {
        let store = InMemoryWindowStore::new();
        store.add_member("k", "a").await.unwrap();
        store.expire("k", Duration::from_secs(60)).await.unwrap();

        tokio::time::advance(Duration::from_secs(50)).await;
        store.expire("k", Duration::from_secs(60)).await.unwrap();
        tokio::time::advance(Duration::from_secs(50)).await;

        assert!(store.contains_key("k"));
        assert_eq!(store.ttl("k"), Some(Duration::from_secs(10)));
    }

    #[tokio::test]
    async fn test_delete_removes_key() {
        let store = InMemoryWindowStore::new();
        store.add_member("k", "a").await.unwrap();

        store.delete("k").await.unwrap();

        assert!(!store.contains_key("k"));
        assert_eq!(store.cardinality("k"), 0);
    }
}
