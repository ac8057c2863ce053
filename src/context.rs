//! Shared runtime state exposed through the status endpoint.

use std::sync::Arc;

use tokio::sync::RwLock;

use crate::models::EvaluationReport;

/// Counters and the latest evaluation result.
#[derive(Debug, Clone)]
pub struct Metrics {
    /// The time the application started.
    pub start_time: tokio::time::Instant,
    /// Evaluations that produced a report.
    pub evaluations: u64,
    /// Evaluations aborted by a store failure.
    pub failed_evaluations: u64,
    /// The most recent report.
    pub last_report: Option<EvaluationReport>,
}

impl Default for Metrics {
    fn default() -> Self {
        Self {
            start_time: tokio::time::Instant::now(),
            evaluations: 0,
            failed_evaluations: 0,
            last_report: None,
        }
    }
}

/// Shared application metrics for the HTTP server.
#[derive(Clone, Default)]
pub struct AppMetrics {
    /// Shared metrics.
    pub metrics: Arc<RwLock<Metrics>>,
}

impl AppMetrics {
    /// Records a completed evaluation.
    pub async fn record_report(&self, report: EvaluationReport) {
        let mut metrics = self.metrics.write().await;
        metrics.evaluations += 1;
        metrics.last_report = Some(report);
    }

    /// Records an aborted evaluation.
    pub async fn record_failure(&self) {
        self.metrics.write().await.failed_evaluations += 1;
    }
}
