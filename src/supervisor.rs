//! The Supervisor owns the long-running services of the monitor.
//!
//! It starts the evaluation scheduler and the ingestion HTTP server, listens
//! for shutdown signals (Ctrl+C or SIGTERM), and shuts every service down when
//! one of them fails, so the process never keeps running half-functional.

use std::sync::Arc;

use thiserror::Error;
use tokio::{signal, task::JoinSet};
use tokio_util::sync::CancellationToken;

use crate::{
    config::AppConfig,
    context::AppMetrics,
    engine::{EvaluatorSettings, EventIngestor, Recorder, WindowEvaluator},
    http_server::{self, ApiState},
    persistence::traits::WindowStore,
    scheduler::EvaluationScheduler,
    sink::ReportSink,
};

/// Represents the set of errors that can occur during the supervisor's
/// operation.
#[derive(Debug, Error)]
pub enum SupervisorError {
    /// An error occurred due to an invalid configuration.
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(#[from] config::ConfigError),
}

/// The primary runtime manager for the application.
pub struct Supervisor<S: WindowStore + 'static> {
    /// Shared application configuration.
    config: Arc<AppConfig>,

    /// The store shared by the recorders and the evaluator.
    store: Arc<S>,

    /// Where evaluation reports go.
    sink: Arc<dyn ReportSink>,

    /// The shared application metrics.
    app_metrics: AppMetrics,

    /// A token used to signal a graceful shutdown to all supervised tasks.
    cancellation_token: CancellationToken,

    /// A set of all spawned tasks that the supervisor is actively managing.
    join_set: JoinSet<()>,
}

impl<S: WindowStore + 'static> Supervisor<S> {
    /// Creates a new Supervisor instance.
    pub fn new(
        config: AppConfig,
        store: Arc<S>,
        sink: Arc<dyn ReportSink>,
    ) -> Result<Self, SupervisorError> {
        config.validate()?;
        Ok(Self {
            config: Arc::new(config),
            store,
            sink,
            app_metrics: AppMetrics::default(),
            cancellation_token: CancellationToken::new(),
            join_set: JoinSet::new(),
        })
    }

    /// A token that stops the supervisor when cancelled.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancellation_token.clone()
    }

    /// The metrics updated by the evaluation scheduler.
    pub fn app_metrics(&self) -> AppMetrics {
        self.app_metrics.clone()
    }

    /// Starts all services and blocks until shutdown.
    pub async fn run(mut self) -> Result<(), SupervisorError> {
        let cancellation_token = self.cancellation_token.clone();
        self.join_set.spawn(async move {
            let ctrl_c = signal::ctrl_c();
            #[cfg(unix)]
            let terminate = async {
                match signal::unix::signal(signal::unix::SignalKind::terminate()) {
                    Ok(mut sigterm) => {
                        sigterm.recv().await;
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "Failed to register SIGTERM handler.");
                        std::future::pending::<()>().await;
                    }
                }
            };
            #[cfg(not(unix))]
            let terminate = std::future::pending::<()>();

            tokio::select! {
                _ = ctrl_c => tracing::info!("SIGINT (Ctrl+C) received, initiating graceful shutdown."),
                _ = terminate => tracing::info!("SIGTERM received, initiating graceful shutdown."),
                _ = cancellation_token.cancelled() => {}
            }

            cancellation_token.cancel();
        });

        // --- Service Initialization ---

        let evaluator = Arc::new(WindowEvaluator::new(
            Arc::clone(&self.store),
            Arc::clone(&self.sink),
            EvaluatorSettings {
                lag_minutes: self.config.processing_interval_minutes,
                threshold_percent: self.config.error_threshold_percent,
            },
        ));
        let scheduler = EvaluationScheduler::new(
            evaluator,
            self.config.evaluation_interval_secs,
            self.app_metrics.clone(),
            self.cancellation_token.clone(),
        );
        self.join_set.spawn(async move {
            scheduler.run().await;
        });

        if self.config.server.enabled {
            let ingestor =
                Arc::new(EventIngestor::new(Recorder::new(Arc::clone(&self.store), self.config.ttl())));
            let state = ApiState {
                config: Arc::clone(&self.config),
                app_metrics: self.app_metrics.clone(),
                ingestor,
            };
            let http_cancellation_token = self.cancellation_token.clone();
            self.join_set.spawn(async move {
                http_server::run_server_from_config(state, http_cancellation_token).await;
            });
        }

        // --- Main Supervisor Loop ---

        loop {
            tokio::select! {
                maybe_result = self.join_set.join_next() => {
                    match maybe_result {
                        Some(Ok(())) => {
                            if !self.cancellation_token.is_cancelled() {
                                tracing::error!("A supervised task exited unexpectedly. Initiating shutdown.");
                                self.cancellation_token.cancel();
                            }
                        }
                        Some(Err(e)) => {
                            tracing::error!("A critical task failed: {:?}. Initiating shutdown.", e);
                            self.cancellation_token.cancel();
                        }
                        None => break,
                    }
                }
                _ = self.cancellation_token.cancelled() => break,
            }
        }

        // --- Graceful Shutdown ---

        let shutdown_timeout = self.config.shutdown_timeout;
        let drain = async {
            while self.join_set.join_next().await.is_some() {}
        };
        if tokio::time::timeout(shutdown_timeout, drain).await.is_err() {
            tracing::warn!(
                "Tasks did not finish within the timeout of {:?}. Aborting them.",
                shutdown_timeout
            );
            self.join_set.shutdown().await;
        }

        tracing::info!("Supervisor shutdown complete.");
        Ok(())
    }
}
