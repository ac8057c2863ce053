//! Redis-backed implementation of [`WindowStore`].

use std::{future::Future, time::Duration};

use async_trait::async_trait;
use redis::{AsyncCommands, RedisError, aio::ConnectionManager};

use crate::persistence::{error::PersistenceError, traits::WindowStore};

/// A [`WindowStore`] talking to Redis through a multiplexed connection.
///
/// The handle is cheap to clone; every clone issues commands independently and
/// no in-process state is shared between invocations beyond the socket.
#[derive(Clone)]
pub struct RedisWindowStore {
    connection: ConnectionManager,
    op_timeout: Duration,
}

impl RedisWindowStore {
    /// Connects to the store at `redis_url`, bounding the connect and every
    /// later command by `op_timeout`.
    #[tracing::instrument(level = "info")]
    pub async fn connect(redis_url: &str, op_timeout: Duration) -> Result<Self, PersistenceError> {
        tracing::debug!(redis_url, "Attempting to connect to the store.");
        let client = redis::Client::open(redis_url)
            .map_err(|e| PersistenceError::Unavailable(format!("Invalid store address: {e}")))?;
        let connection = tokio::time::timeout(op_timeout, ConnectionManager::new(client))
            .await
            .map_err(|_| PersistenceError::Timeout(op_timeout))?
            .map_err(|e| map_redis_error(e, op_timeout))?;
        tracing::info!(redis_url, "Successfully connected to the store.");
        Ok(Self { connection, op_timeout })
    }

    /// Runs a single command with the client-side timeout and consistent
    /// error logging.
    async fn run<T, F>(&self, operation: &str, key: &str, command: F) -> Result<T, PersistenceError>
    where
        F: Future<Output = Result<T, RedisError>>,
    {
        match tokio::time::timeout(self.op_timeout, command).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => {
                tracing::error!(error = %e, operation, key, "Store operation failed.");
                Err(map_redis_error(e, self.op_timeout))
            }
            Err(_) => {
                tracing::error!(operation, key, timeout = ?self.op_timeout, "Store operation timed out.");
                Err(PersistenceError::Timeout(self.op_timeout))
            }
        }
    }
}

fn map_redis_error(e: RedisError, op_timeout: Duration) -> PersistenceError {
    if e.is_timeout() {
        PersistenceError::Timeout(op_timeout)
    } else if e.is_io_error() || e.is_connection_refusal() || e.is_connection_dropped() {
        PersistenceError::Unavailable(e.to_string())
    } else {
        PersistenceError::OperationFailed(e.to_string())
    }
}

#[async_trait]
impl WindowStore for RedisWindowStore {
    #[tracing::instrument(skip(self, member), level = "debug")]
    async fn add_member(&self, key: &str, member: &str) -> Result<bool, PersistenceError> {
        let mut conn = self.connection.clone();
        let added: i64 = self.run("SADD", key, conn.sadd(key, member)).await?;
        Ok(added > 0)
    }

    #[tracing::instrument(skip(self), level = "debug")]
    async fn members(&self, key: &str) -> Result<Vec<String>, PersistenceError> {
        let mut conn = self.connection.clone();
        self.run("SMEMBERS", key, conn.smembers(key)).await
    }

    #[tracing::instrument(skip(self), level = "debug")]
    async fn expire(&self, key: &str, ttl: Duration) -> Result<(), PersistenceError> {
        let mut conn = self.connection.clone();
        let seconds = i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX);
        let _: bool = self.run("EXPIRE", key, conn.expire(key, seconds)).await?;
        Ok(())
    }

    #[tracing::instrument(skip(self), level = "debug")]
    async fn delete(&self, key: &str) -> Result<(), PersistenceError> {
        let mut conn = self.connection.clone();
        let _: i64 = self.run("DEL", key, conn.del(key)).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_connect_rejects_invalid_address() {
        let result = RedisWindowStore::connect("not-a-store://", Duration::from_millis(100)).await;

        assert!(matches!(result, Err(PersistenceError::Unavailable(_))));
    }

    #[test]
    fn test_map_redis_error_classifies_io_as_unavailable() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");

        let mapped = map_redis_error(RedisError::from(io), Duration::from_secs(2));

        assert!(matches!(mapped, PersistenceError::Unavailable(_)));
    }

    #[test]
    fn test_map_redis_error_classifies_timeouts_as_timeout() {
        let io = std::io::Error::new(std::io::ErrorKind::TimedOut, "timed out");

        let mapped = map_redis_error(RedisError::from(io), Duration::from_secs(2));

        assert!(matches!(mapped, PersistenceError::Timeout(t) if t == Duration::from_secs(2)));
    }

    #[test]
    fn test_map_redis_error_classifies_type_errors_as_failed_operation() {
        let e = RedisError::from((redis::ErrorKind::TypeError, "wrong type"));

        assert!(matches!(
            map_redis_error(e, Duration::from_secs(2)),
            PersistenceError::OperationFailed(_)
        ));
    }
}
