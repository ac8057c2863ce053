//! HTTP server module: event ingestion and service status.

mod error;
mod events;
mod status;

use std::{net::SocketAddr, sync::Arc};

use axum::{
    Json, Router,
    response::IntoResponse,
    routing::{get, post},
};
use serde_json::json;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

pub use error::ApiError;
pub use status::StatusResponse;

use crate::{
    config::AppConfig, context::AppMetrics, engine::EventIngestor,
    persistence::traits::WindowStore,
};

/// State shared by all handlers.
pub struct ApiState<S: WindowStore> {
    /// Shared application configuration.
    pub config: Arc<AppConfig>,
    /// Shared application metrics.
    pub app_metrics: AppMetrics,
    /// The ingestion path for submitted events.
    pub ingestor: Arc<EventIngestor<S>>,
}

impl<S: WindowStore> Clone for ApiState<S> {
    fn clone(&self) -> Self {
        Self {
            config: Arc::clone(&self.config),
            app_metrics: self.app_metrics.clone(),
            ingestor: Arc::clone(&self.ingestor),
        }
    }
}

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

/// Builds the application router.
pub fn router<S: WindowStore + 'static>(state: ApiState<S>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/status", get(status::status::<S>))
        .route("/events", post(events::submit_event::<S>))
        .with_state(state)
}

/// Serves the API on an already bound listener until `cancellation_token` fires.
pub async fn serve<S: WindowStore + 'static>(
    listener: TcpListener,
    state: ApiState<S>,
    cancellation_token: CancellationToken,
) -> std::io::Result<()> {
    let app = router(state);
    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(cancellation_token.cancelled_owned())
        .await
}

/// Runs the HTTP server based on the provided application configuration.
pub async fn run_server_from_config<S: WindowStore + 'static>(
    state: ApiState<S>,
    cancellation_token: CancellationToken,
) {
    let addr: SocketAddr = match state.config.server.listen_address.parse() {
        Ok(addr) => addr,
        Err(e) => {
            tracing::error!(error = %e, address = %state.config.server.listen_address, "Invalid server listen address.");
            return;
        }
    };
    let listener = match TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(error = %e, %addr, "Failed to bind HTTP server.");
            return;
        }
    };
    tracing::info!(%addr, "HTTP server listening.");

    if let Err(e) = serve(listener, state, cancellation_token).await {
        tracing::error!(error = %e, "HTTP server failed.");
    }
}
