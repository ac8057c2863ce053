//! The fire-and-forget boundary between the event source and the recorders.
//!
//! The event source has no retry contract this service controls, so nothing
//! here returns an error: every failure is logged and classified.

use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::{
    engine::recorder::{Recorder, RecorderError},
    models::{CallEvent, EventEnvelope, EventKind, VerificationEvent},
    persistence::traits::WindowStore,
};

/// How a single inbound event was handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestOutcome {
    /// The event was written to the store.
    Recorded,
    /// The detail type is not consumed by this service.
    Ignored,
    /// The event was invalid and nothing was written.
    Malformed,
    /// The store failed; the event was dropped.
    StoreFailed,
}

/// Routes inbound envelopes to the call or verification recorder.
pub struct EventIngestor<S: WindowStore> {
    recorder: Recorder<S>,
}

impl<S: WindowStore + 'static> EventIngestor<S> {
    /// Creates an ingestor around `recorder`.
    pub fn new(recorder: Recorder<S>) -> Self {
        Self { recorder }
    }

    /// Handles one envelope to completion.
    pub async fn handle(&self, envelope: &EventEnvelope) -> IngestOutcome {
        let result = match envelope.kind() {
            EventKind::VendorCall => match CallEvent::from_detail(&envelope.detail) {
                Ok(event) => self.recorder.record_call(&event).await.map(|_| ()),
                Err(e) => Err(RecorderError::from(e)),
            },
            EventKind::Verification => match VerificationEvent::from_detail(&envelope.detail) {
                Ok(event) => self.recorder.record_verification(&event).await,
                Err(e) => Err(RecorderError::from(e)),
            },
            EventKind::Unrecognized => {
                tracing::debug!(detail_type = %envelope.detail_type, "Ignoring event.");
                return IngestOutcome::Ignored;
            }
        };

        match result {
            Ok(()) => IngestOutcome::Recorded,
            Err(e @ (RecorderError::MalformedEvent(_) | RecorderError::Serialization(_))) => {
                tracing::warn!(error = %e, detail_type = %envelope.detail_type, "Dropping malformed event.");
                IngestOutcome::Malformed
            }
            Err(e @ RecorderError::Store(_)) => {
                tracing::error!(error = %e, detail_type = %envelope.detail_type, "Error processing event.");
                IngestOutcome::StoreFailed
            }
        }
    }

    /// Parses and handles one raw JSON envelope.
    pub async fn handle_raw(&self, raw: &str) -> IngestOutcome {
        match serde_json::from_str::<EventEnvelope>(raw) {
            Ok(envelope) => self.handle(&envelope).await,
            Err(e) => {
                tracing::warn!(error = %e, "Dropping unparsable event envelope.");
                IngestOutcome::Malformed
            }
        }
    }

    /// Handles an envelope as an independent task.
    pub fn spawn(self: &Arc<Self>, envelope: EventEnvelope) -> JoinHandle<IngestOutcome> {
        let ingestor = Arc::clone(self);
        tokio::spawn(async move { ingestor.handle(&envelope).await })
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde_json::json;

    use super::*;
    use crate::{
        persistence::{
            error::PersistenceError, memory::InMemoryWindowStore, traits::MockWindowStore,
        },
        window::VERIFICATION_SET_KEY,
    };

    const TTL: Duration = Duration::from_secs(1800);

    fn ingestor(store: Arc<InMemoryWindowStore>) -> Arc<EventIngestor<InMemoryWindowStore>> {
        Arc::new(EventIngestor::new(Recorder::new(store, TTL)))
    }

    fn envelope(detail_type: &str, detail: serde_json::Value) -> EventEnvelope {
        EventEnvelope { detail_type: detail_type.to_string(), detail }
    }

    #[tokio::test]
    async fn test_handle_vendor_call() {
        let store = Arc::new(InMemoryWindowStore::new());
        let ingestor = ingestor(store.clone());

        let outcome = ingestor
            .handle(&envelope(
                "SMS Vendor Call",
                json!({ "phonenumber": "+1", "smsProvider": "Acme", "timestamp": 1704099600000_i64 }),
            ))
            .await;

        assert_eq!(outcome, IngestOutcome::Recorded);
        assert_eq!(store.cardinality("logins_202401010900"), 1);
    }

    #[tokio::test]
    async fn test_handle_verification_and_alias() {
        let store = Arc::new(InMemoryWindowStore::new());
        let ingestor = ingestor(store.clone());

        let first = ingestor
            .handle(&envelope("Verify SMS Endpoint Invoked", json!({ "phonenumber": "+1" })))
            .await;
        let second = ingestor
            .handle(&envelope("/verifySMS Endpoint Invoked", json!({ "phonenumber": "+2" })))
            .await;

        assert_eq!((first, second), (IngestOutcome::Recorded, IngestOutcome::Recorded));
        assert_eq!(store.cardinality(VERIFICATION_SET_KEY), 2);
    }

    #[tokio::test]
    async fn test_handle_malformed_detail() {
        let store = Arc::new(InMemoryWindowStore::new());
        let ingestor = ingestor(store.clone());

        let outcome = ingestor
            .handle(&envelope("SMS Vendor Call", json!({ "phonenumber": "+1", "timestamp": "soon" })))
            .await;

        assert_eq!(outcome, IngestOutcome::Malformed);
    }

    #[tokio::test]
    async fn test_handle_unrecognized_detail_type() {
        let store = Arc::new(InMemoryWindowStore::new());
        let ingestor = ingestor(store);

        let outcome = ingestor.handle(&envelope("User Signed Up", json!({}))).await;

        assert_eq!(outcome, IngestOutcome::Ignored);
    }

    #[tokio::test]
    async fn test_handle_raw_rejects_invalid_json() {
        let store = Arc::new(InMemoryWindowStore::new());
        let ingestor = ingestor(store);

        assert_eq!(ingestor.handle_raw("{ not json").await, IngestOutcome::Malformed);
        assert_eq!(
            ingestor.handle_raw(r#"{"detail-type":"Verify SMS Endpoint Invoked","detail":{"phonenumber":"+1"}}"#).await,
            IngestOutcome::Recorded
        );
    }

    #[tokio::test]
    async fn test_handle_store_failure_is_contained() {
        let mut store = MockWindowStore::new();
        store
            .expect_add_member()
            .returning(|_, _| Err(PersistenceError::Unavailable("connection refused".into())));
        let ingestor = EventIngestor::new(Recorder::new(Arc::new(store), TTL));

        let outcome =
            ingestor.handle(&envelope("Verify SMS Endpoint Invoked", json!({ "phonenumber": "+1" }))).await;

        assert_eq!(outcome, IngestOutcome::StoreFailed);
    }

    #[tokio::test]
    async fn test_spawned_invocations_are_independent() {
        let store = Arc::new(InMemoryWindowStore::new());
        let ingestor = ingestor(store.clone());

        let handles: Vec<_> = (0..20)
            .map(|i| {
                ingestor.spawn(envelope(
                    "SMS Vendor Call",
                    json!({ "phonenumber": format!("+1{i}"), "smsProvider": "Acme", "timestamp": 1704099600000_i64 + i }),
                ))
            })
            .collect();
        for handle in handles {
            assert_eq!(handle.await.unwrap(), IngestOutcome::Recorded);
        }

        assert_eq!(store.cardinality("logins_202401010900"), 20);
    }
}
