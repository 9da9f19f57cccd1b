use crate::error::ApiError;
use crate::middleware::{cors_middleware, trace_middleware};
use axum::{
    extract::{rejection::JsonRejection, State},
    middleware as axum_mw,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use ragserve_core::{InferenceResult, RagError};
use ragserve_memory::RagService;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, warn};

/// Reported in `/` and `/health`.
pub const SERVICE_NAME: &str = "ragserve";
/// Crate version, reported in `/` and `/health`.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Bounds applied to `/query` requests before they reach the pipeline.
#[derive(Debug, Clone, Copy)]
pub struct QueryLimits {
    /// `k` used when the request omits it.
    pub default_k: usize,
    /// Largest accepted `k`.
    pub max_k: usize,
    /// Longest accepted query, in characters.
    pub max_query_chars: usize,
}

impl Default for QueryLimits {
    fn default() -> Self {
        Self {
            default_k: 3,
            max_k: 10,
            max_query_chars: 1000,
        }
    }
}

/// Shared application state.
pub struct AppState {
    /// Owner of the retrieval pipeline.
    pub service: Arc<RagService>,
    /// Request bounds.
    pub limits: QueryLimits,
}

/// Body of `POST /query`.
#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    /// The user's question.
    pub query: String,
    /// Number of documents to retrieve.
    #[serde(default)]
    pub k: Option<usize>,
}

/// Response of `POST /query`.
#[derive(Debug, Serialize, Deserialize)]
pub struct QueryResponse {
    /// Synthesized answer.
    pub answer: String,
    /// The original query.
    pub query: String,
    /// Retrieved documents, best first.
    pub retrieved_documents: Vec<String>,
    /// Similarity of each retrieved document.
    pub similarity_scores: Vec<f32>,
    /// Round-trip latency, rounded to two decimals.
    pub latency_ms: f64,
    /// Always `success`.
    pub status: String,
}

impl From<InferenceResult> for QueryResponse {
    fn from(result: InferenceResult) -> Self {
        Self {
            answer: result.answer,
            query: result.query,
            retrieved_documents: result.retrieved_documents,
            similarity_scores: result.similarity_scores,
            latency_ms: round2(result.latency_ms),
            status: "success".to_string(),
        }
    }
}

/// Response of `GET /health`.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// `healthy`, `degraded` or `unhealthy`.
    pub status: String,
    /// Unix time in seconds.
    pub timestamp: f64,
    /// Service version.
    pub version: String,
    /// Whether the pipeline is indexed and non-empty.
    pub model_loaded: bool,
    /// Number of indexed documents.
    pub documents_indexed: usize,
}

/// The HTTP gateway.
pub struct GatewayServer;

impl GatewayServer {
    /// Build the router with default query limits.
    pub fn build(service: Arc<RagService>) -> Router {
        Self::build_with_limits(service, QueryLimits::default())
    }

    /// Build the router with explicit query limits.
    pub fn build_with_limits(service: Arc<RagService>, limits: QueryLimits) -> Router {
        let state = Arc::new(AppState { service, limits });

        Router::new()
            .route("/", get(root_handler))
            .route("/health", get(health_handler))
            .route("/query", post(query_handler))
            .with_state(state)
            .layer(axum_mw::from_fn(trace_middleware))
            .layer(axum_mw::from_fn(cors_middleware))
    }
}

/// Current Unix time in (fractional) seconds.
pub fn unix_timestamp() -> f64 {
    Utc::now().timestamp_micros() as f64 / 1_000_000.0
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn preview(text: &str) -> String {
    text.chars().take(50).collect()
}

async fn root_handler() -> impl IntoResponse {
    Json(serde_json::json!({
        "service": SERVICE_NAME,
        "version": VERSION,
        "health": "/health",
        "query": "/query (POST)",
    }))
}

async fn health_handler(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let (status, model_loaded, documents_indexed) = match state.service.get() {
        Some(pipeline) => {
            let ready = pipeline.is_ready().await;
            let status = if ready { "healthy" } else { "degraded" };
            (status, ready, pipeline.document_count().await)
        }
        None => ("unhealthy", false, 0),
    };

    Json(HealthResponse {
        status: status.to_string(),
        timestamp: unix_timestamp(),
        version: VERSION.to_string(),
        model_loaded,
        documents_indexed,
    })
}

impl QueryRequest {
    /// Check the request against `limits` and resolve the effective `k`.
    pub fn validate(&self, limits: &QueryLimits) -> Result<usize, ApiError> {
        if self.query.trim().is_empty() {
            return Err(ApiError::Validation("query must not be empty".to_string()));
        }
        let chars = self.query.chars().count();
        if chars > limits.max_query_chars {
            return Err(ApiError::Validation(format!(
                "query must be at most {} characters, got {chars}",
                limits.max_query_chars
            )));
        }

        let k = self.k.unwrap_or(limits.default_k);
        if k == 0 || k > limits.max_k {
            return Err(ApiError::Validation(format!(
                "k must be between 1 and {}, got {k}",
                limits.max_k
            )));
        }
        Ok(k)
    }
}

fn inference_failed(e: RagError) -> ApiError {
    error!(error = %e, "Query processing failed");
    ApiError::from(e)
}

async fn query_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<QueryRequest>, JsonRejection>,
) -> Result<Json<QueryResponse>, ApiError> {
    let Json(request) = payload.map_err(|e| {
        warn!(error = %e, "Invalid query body");
        ApiError::Validation(e.body_text())
    })?;

    let k = request.validate(&state.limits).inspect_err(|e| {
        warn!(error = %e, "Invalid query");
    })?;

    info!(query = %preview(&request.query), k, "Received query");

    let pipeline = state.service.pipeline().await.map_err(inference_failed)?;
    let result = pipeline
        .query(&request.query, k)
        .await
        .map_err(inference_failed)?;

    info!(
        query_id = %result.id,
        latency_ms = result.latency_ms,
        results = result.retrieved_documents.len(),
        "Query processed"
    );

    Ok(Json(QueryResponse::from(result)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(query: &str, k: Option<usize>) -> QueryRequest {
        QueryRequest {
            query: query.to_string(),
            k,
        }
    }

    #[test]
    fn test_validate_defaults_k() {
        let limits = QueryLimits::default();
        assert_eq!(request("hi", None).validate(&limits).ok(), Some(3));
        assert_eq!(request("hi", Some(10)).validate(&limits).ok(), Some(10));
    }

    #[test]
    fn test_validate_rejects_out_of_range() {
        let limits = QueryLimits::default();
        assert!(request("hi", Some(0)).validate(&limits).is_err());
        assert!(request("hi", Some(11)).validate(&limits).is_err());
        assert!(request("   ", None).validate(&limits).is_err());
        assert!(request(&"x".repeat(1001), None).validate(&limits).is_err());
        assert!(request(&"x".repeat(1000), None).validate(&limits).is_ok());
    }

    #[test]
    fn test_round2() {
        assert_eq!(round2(1.23456), 1.23);
        assert_eq!(round2(0.005), 0.01);
    }

    #[test]
    fn test_preview_is_char_bounded() {
        assert_eq!(preview(&"é".repeat(80)).chars().count(), 50);
    }
}
