//! Fixed-rate trigger for the window evaluator.
//!
//! The cadence is independent of the evaluator's lag: the lag picks which
//! bucket is read, the interval decides how often that happens.

use std::{sync::Arc, time::Duration};

use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::{
    context::AppMetrics,
    engine::{EvaluatorError, WindowEvaluator},
    models::EvaluationReport,
    persistence::traits::WindowStore,
};

/// Runs the evaluator on a fixed interval until cancelled.
pub struct EvaluationScheduler<S: WindowStore> {
    evaluator: Arc<WindowEvaluator<S>>,
    interval: Duration,
    app_metrics: AppMetrics,
    cancellation_token: CancellationToken,
}

impl<S: WindowStore + 'static> EvaluationScheduler<S> {
    /// Creates a new scheduler.
    pub fn new(
        evaluator: Arc<WindowEvaluator<S>>,
        interval: Duration,
        app_metrics: AppMetrics,
        cancellation_token: CancellationToken,
    ) -> Self {
        Self { evaluator, interval, app_metrics, cancellation_token }
    }

    /// Runs one evaluation against the wall clock.
    pub async fn tick(&self) -> Result<EvaluationReport, EvaluatorError> {
        let now_ms = chrono::Utc::now().timestamp_millis();
        match self.evaluator.evaluate(now_ms).await {
            Ok(report) => {
                self.app_metrics.record_report(report.clone()).await;
                Ok(report)
            }
            Err(e) => {
                self.app_metrics.record_failure().await;
                Err(e)
            }
        }
    }

    /// Ticks until the cancellation token fires. A failed tick is logged; the
    /// next tick is the retry.
    pub async fn run(&self) {
        let mut interval = tokio::time::interval(self.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tracing::info!(interval = ?self.interval, "Starting evaluation scheduler.");

        loop {
            tokio::select! {
                _ = self.cancellation_token.cancelled() => {
                    tracing::info!("Evaluation scheduler received shutdown signal.");
                    break;
                }
                _ = interval.tick() => {
                    tracing::debug!("Running evaluation tick...");
                    if let Err(e) = self.tick().await {
                        tracing::error!(error = %e, "Error processing records; skipping this tick.");
                    }
                }
            }
        }
    }
}
