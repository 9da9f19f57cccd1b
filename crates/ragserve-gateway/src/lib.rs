//! HTTP surface for ragserve.
//!
//! Exposes `GET /` (service info), `GET /health` (readiness and document
//! count) and `POST /query` (retrieve + synthesize) over a shared
//! [`ragserve_memory::RagService`].

/// Error responses.
pub mod error;
/// CORS and request tracing middleware.
pub mod middleware;
/// Router, handlers and wire types.
pub mod server;

pub use error::{ApiError, ErrorResponse};
pub use server::{GatewayServer, HealthResponse, QueryLimits, QueryRequest, QueryResponse};
