//! Ingestion of call and verification events into window state.

use std::{sync::Arc, time::Duration};

use thiserror::Error;

use crate::{
    models::{
        CallEvent, VerificationEvent,
        event::EventError,
    },
    persistence::{error::PersistenceError, traits::WindowStore},
    window::{VERIFICATION_SET_KEY, WindowKey},
};

/// Errors that can occur while recording an event.
#[derive(Debug, Error)]
pub enum RecorderError {
    /// The event failed validation; nothing was written.
    #[error("Malformed event: {0}")]
    MalformedEvent(#[from] EventError),

    /// The event could not be serialized into its stored form.
    #[error("Failed to serialize event: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A store call failed or timed out.
    #[error("Store error: {0}")]
    Store(#[from] PersistenceError),
}

/// Writes call events into their minute bucket and verified phone numbers
/// into the verification set.
///
/// Every write refreshes the key's time-to-live, so the last writer extends
/// the lifetime of a key.
pub struct Recorder<S: WindowStore> {
    store: Arc<S>,
    ttl: Duration,
}

impl<S: WindowStore> Recorder<S> {
    /// Creates a recorder writing to `store` with the given key TTL.
    pub fn new(store: Arc<S>, ttl: Duration) -> Self {
        Self { store, ttl }
    }

    /// Records a vendor call in the bucket of its own timestamp and returns
    /// that bucket.
    #[tracing::instrument(skip(self, event), fields(vendor = %event.vendor), level = "debug")]
    pub async fn record_call(&self, event: &CallEvent) -> Result<WindowKey, RecorderError> {
        event.validate()?;
        let bucket = WindowKey::from_millis(event.occurred_at_ms);
        let key = bucket.call_set_key();
        let member = event.to_member()?;

        let added = self.store.add_member(&key, &member).await?;
        self.store.expire(&key, self.ttl).await?;

        if added {
            tracing::debug!(key, "Recorded vendor call.");
        } else {
            tracing::debug!(key, "Vendor call already recorded.");
        }
        Ok(bucket)
    }

    /// Records a verified phone number.
    #[tracing::instrument(skip(self, event), level = "debug")]
    pub async fn record_verification(&self, event: &VerificationEvent) -> Result<(), RecorderError> {
        event.validate()?;

        self.store.add_member(VERIFICATION_SET_KEY, &event.phone_number).await?;
        self.store.expire(VERIFICATION_SET_KEY, self.ttl).await?;

        tracing::debug!(key = VERIFICATION_SET_KEY, "Recorded verification.");
        Ok(())
    }
}
