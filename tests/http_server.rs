//! Integration tests for the ingestion and status HTTP surface.

use std::{net::SocketAddr, sync::Arc, time::Duration};

use reqwest::Client;
use serde_json::{Value, json};
use sms_health::{
    config::AppConfig,
    context::AppMetrics,
    engine::{EventIngestor, Recorder},
    http_server::{self, ApiState},
    persistence::InMemoryWindowStore,
    window::VERIFICATION_SET_KEY,
};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

struct TestServer {
    address: SocketAddr,
    store: Arc<InMemoryWindowStore>,
    client: Client,
    token: CancellationToken,
    handle: JoinHandle<std::io::Result<()>>,
}

impl TestServer {
    async fn new() -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("Failed to bind");
        let address = listener.local_addr().expect("Failed to get address");
        let config = Arc::new(AppConfig::default());
        let store = Arc::new(InMemoryWindowStore::new());
        let state = ApiState {
            ingestor: Arc::new(EventIngestor::new(Recorder::new(Arc::clone(&store), config.ttl()))),
            config,
            app_metrics: AppMetrics::default(),
        };
        let token = CancellationToken::new();
        let handle = tokio::spawn(http_server::serve(listener, state, token.clone()));
        Self { address, store, client: Client::new(), token, handle }
    }

    fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.address, path)
    }

    async fn shutdown(self) {
        self.token.cancel();
        self.handle.await.expect("server task panicked").expect("server failed");
    }
}

async fn wait_for(mut condition: impl FnMut() -> bool) -> bool {
    for _ in 0..100 {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    false
}

#[tokio::test]
async fn health_endpoint_returns_ok() {
    let server = TestServer::new().await;

    let resp = server.client.get(server.url("/health")).send().await.unwrap();

    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "ok");
    server.shutdown().await;
}

#[tokio::test]
async fn events_endpoint_records_vendor_call() {
    let server = TestServer::new().await;

    let resp = server
        .client
        .post(server.url("/events"))
        .json(&json!({
            "detail-type": "SMS Vendor Call",
            "detail": { "phonenumber": "+15550100", "smsProvider": "Acme", "timestamp": 1704099600000_i64 }
        }))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 202);
    let store = Arc::clone(&server.store);
    assert!(wait_for(|| store.cardinality("logins_202401010900") == 1).await);
    server.shutdown().await;
}

#[tokio::test]
async fn events_endpoint_accepts_malformed_detail_without_writing() {
    let server = TestServer::new().await;

    let resp = server
        .client
        .post(server.url("/events"))
        .json(&json!({ "detail-type": "Verify SMS Endpoint Invoked", "detail": { "phonenumber": "" } }))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 202);
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!server.store.contains_key(VERIFICATION_SET_KEY));
    server.shutdown().await;
}

#[tokio::test]
async fn events_endpoint_rejects_non_envelope_body() {
    let server = TestServer::new().await;

    let resp = server
        .client
        .post(server.url("/events"))
        .header("content-type", "application/json")
        .body(r#"{"detail": {}}"#)
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 422);
    let body: Value = resp.json().await.unwrap();
    assert!(body["error"].is_string());
    server.shutdown().await;
}

#[tokio::test]
async fn status_endpoint_reports_version_and_no_evaluations() {
    let server = TestServer::new().await;

    let resp = server.client.get(server.url("/status")).send().await.unwrap();

    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    assert_eq!(body["errorThresholdPercent"], 10);
    assert_eq!(body["evaluations"], 0);
    assert_eq!(body["failedEvaluations"], 0);
    assert!(body["lastReport"].is_null());
    server.shutdown().await;
}
