//! Represents the `/status` endpoint handler and response structure.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::Serialize;

use super::ApiState;
use crate::{models::EvaluationReport, persistence::traits::WindowStore};

/// Represents the response from the `/status` endpoint.
#[derive(Debug, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    /// The version of the application.
    pub version: String,
    /// The uptime of the application in seconds.
    pub uptime_secs: u64,
    /// The configured breach threshold.
    pub error_threshold_percent: u32,
    /// Evaluations that produced a report.
    pub evaluations: u64,
    /// Evaluations aborted by a store failure.
    pub failed_evaluations: u64,
    /// The most recent evaluation report.
    pub last_report: Option<EvaluationReport>,
}

/// Retrieves application status and the latest report.
pub async fn status<S: WindowStore + 'static>(
    State(state): State<ApiState<S>>,
) -> impl IntoResponse {
    let metrics = state.app_metrics.metrics.read().await;
    let response = StatusResponse {
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: metrics.start_time.elapsed().as_secs(),
        error_threshold_percent: state.config.error_threshold_percent,
        evaluations: metrics.evaluations,
        failed_evaluations: metrics.failed_evaluations,
        last_report: metrics.last_report.clone(),
    };
    (StatusCode::OK, Json(response))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CleanupStatus, Outcome};

    #[test]
    fn test_status_response_uses_one_casing_at_every_level() {
        let response = StatusResponse {
            version: "0.1.0".to_string(),
            uptime_secs: 5,
            error_threshold_percent: 10,
            evaluations: 1,
            failed_evaluations: 0,
            last_report: Some(EvaluationReport {
                target_bucket: "202401010858".to_string(),
                total_calls: 0,
                verified_calls: 0,
                unverified_calls: 0,
                error_percent: None,
                breach: false,
                vendor_ranking: None,
                outcome: Outcome::NoActivity,
                threshold_percent: 10,
                skipped_records: 0,
                cleanup: CleanupStatus::default(),
            }),
        };

        let value = serde_json::to_value(&response).unwrap();

        assert_eq!(value["uptimeSecs"], 5);
        assert_eq!(value["errorThresholdPercent"], 10);
        assert_eq!(value["failedEvaluations"], 0);
        assert_eq!(value["lastReport"]["targetBucket"], "202401010858");
        assert!(value.get("error_threshold_percent").is_none());
        assert!(value.get("last_report").is_none());
    }
}
