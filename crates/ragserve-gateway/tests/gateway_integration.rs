#![allow(clippy::unwrap_used, clippy::expect_used)]

use ragserve_gateway::{GatewayServer, HealthResponse, QueryResponse};
use ragserve_memory::{RagService, ServiceConfig};
use std::sync::Arc;
use tokio::net::TcpListener;

const CORPUS: &str = "The sky is blue.\nWater boils at 100°C.\n";

/// Helper: serve `service` on a random port, returning the address.
async fn spawn_server(service: Arc<RagService>) -> String {
    let app = GatewayServer::build(service);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    // Small yield to let the server task start
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;

    format!("127.0.0.1:{}", addr.port())
}

/// Helper: a service over the sky/water corpus, already initialised.
async fn start_test_server() -> (String, tempfile::TempDir) {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("knowledge.txt");
    std::fs::write(&path, CORPUS).unwrap();

    let service = Arc::new(RagService::new(ServiceConfig {
        corpus_path: path,
        ..ServiceConfig::default()
    }));
    service.pipeline().await.unwrap();

    (spawn_server(service).await, tmp)
}

#[tokio::test]
async fn test_root_endpoint() {
    let (addr, _tmp) = start_test_server().await;
    let body: serde_json::Value = reqwest::get(format!("http://{addr}/"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["service"], "ragserve");
    assert_eq!(body["health"], "/health");
}

#[tokio::test]
async fn test_health_endpoint_ready() {
    let (addr, _tmp) = start_test_server().await;
    let resp = reqwest::get(format!("http://{addr}/health")).await.unwrap();
    assert_eq!(resp.status(), 200);

    let health: HealthResponse = resp.json().await.unwrap();
    assert_eq!(health.status, "healthy");
    assert!(health.model_loaded);
    assert_eq!(health.documents_indexed, 2);
    assert!(health.timestamp > 0.0);
}

#[tokio::test]
async fn test_health_endpoint_uninitialized() {
    let tmp = tempfile::tempdir().unwrap();
    let service = Arc::new(RagService::new(ServiceConfig {
        corpus_path: tmp.path().join("missing.txt"),
        ..ServiceConfig::default()
    }));
    let addr = spawn_server(service).await;

    let health: HealthResponse = reqwest::get(format!("http://{addr}/health"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(health.status, "unhealthy");
    assert!(!health.model_loaded);
    assert_eq!(health.documents_indexed, 0);
}

#[tokio::test]
async fn test_query_returns_ranked_answer() {
    let (addr, _tmp) = start_test_server().await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("http://{addr}/query"))
        .json(&serde_json::json!({"query": "What color is the sky?", "k": 2}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.headers()["access-control-allow-origin"], "*");

    let body: QueryResponse = resp.json().await.unwrap();
    assert_eq!(body.status, "success");
    assert_eq!(body.query, "What color is the sky?");
    assert_eq!(body.retrieved_documents[0], "The sky is blue.");
    assert_eq!(body.similarity_scores.len(), 2);
    assert!(body.answer.starts_with("Based on retrieved data ("));
    assert!(body.answer.contains("Related info:\nWater boils at 100°C."));
}

#[tokio::test]
async fn test_query_default_k_caps_at_corpus_size() {
    let (addr, _tmp) = start_test_server().await;
    let body: QueryResponse = reqwest::Client::new()
        .post(format!("http://{addr}/query"))
        .json(&serde_json::json!({"query": "boiling water"}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body.retrieved_documents.len(), 2);
    assert_eq!(body.retrieved_documents[0], "Water boils at 100°C.");
}

#[tokio::test]
async fn test_query_validation_errors() {
    let (addr, _tmp) = start_test_server().await;
    let client = reqwest::Client::new();
    let url = format!("http://{addr}/query");

    for payload in [
        serde_json::json!({"query": "", "k": 3}),
        serde_json::json!({"query": "sky", "k": 0}),
        serde_json::json!({"query": "sky", "k": 11}),
        serde_json::json!({"query": "sky", "k": -1}),
        serde_json::json!({"k": 3}),
        serde_json::json!({"query": "x".repeat(1001)}),
    ] {
        let resp = client.post(&url).json(&payload).send().await.unwrap();
        assert_eq!(resp.status(), 400, "payload {payload}");
        let body: serde_json::Value = resp.json().await.unwrap();
        assert_eq!(body["error"], "ValidationError");
        assert!(body["timestamp"].as_f64().unwrap() > 0.0);
    }
}

#[tokio::test]
async fn test_query_with_missing_corpus_is_internal_error() {
    let tmp = tempfile::tempdir().unwrap();
    let service = Arc::new(RagService::new(ServiceConfig {
        corpus_path: tmp.path().join("missing.txt"),
        ..ServiceConfig::default()
    }));
    let addr = spawn_server(service).await;

    let resp = reqwest::Client::new()
        .post(format!("http://{addr}/query"))
        .json(&serde_json::json!({"query": "sky"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 500);

    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "InferenceError");
    assert_eq!(
        body["message"],
        "An error occurred while processing your query"
    );
}

#[tokio::test]
async fn test_preflight_request() {
    let (addr, _tmp) = start_test_server().await;
    let resp = reqwest::Client::new()
        .request(reqwest::Method::OPTIONS, format!("http://{addr}/query"))
        .header("origin", "http://example.com")
        .header("access-control-request-method", "POST")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 204);
    assert_eq!(resp.headers()["access-control-allow-origin"], "*");
}
