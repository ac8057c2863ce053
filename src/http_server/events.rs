//! `POST /events`: hands an event envelope to the recorders.

use axum::{
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde_json::json;

use super::{ApiError, ApiState};
use crate::{models::EventEnvelope, persistence::traits::WindowStore};

/// Accepts an envelope and records it as an independent task.
///
/// The response only acknowledges receipt; validation and store failures are
/// logged by the recorder invocation.
pub async fn submit_event<S: WindowStore + 'static>(
    State(state): State<ApiState<S>>,
    payload: Result<Json<EventEnvelope>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(envelope) = payload?;
    tracing::debug!(detail_type = %envelope.detail_type, "Event received.");
    let _ = state.ingestor.spawn(envelope);
    Ok((StatusCode::ACCEPTED, Json(json!({ "status": "accepted" }))))
}
