//! Retrieval engine for ragserve: encoders, the exact cosine similarity
//! index, answer synthesis and the retrieval pipeline that ties them together.
//!
//! # Main types
//!
//! - [`Encoder`]: Trait for turning text into fixed-width vectors.
//! - [`LocalEncoder`]: Local hashed bag-of-words encoder.
//! - [`SimilarityIndex`]: Exact top-k search under cosine similarity.
//! - [`RetrievalPipeline`]: Encoder + index with the corpus lifecycle.
//! - [`RagService`]: Once-only construction of the shared pipeline.
//! - [`synthesize`]: Templated answer from ranked results.

/// Corpus file loading.
pub mod corpus;
/// Encoder trait and local implementation.
pub mod embedding;
/// Remote encoder over HTTP.
#[cfg(feature = "http-embeddings")]
pub mod http;
/// Exact cosine similarity index.
pub mod index;
/// Retrieval pipeline.
pub mod pipeline;
/// Process-wide pipeline ownership and configuration.
pub mod service;
/// Answer synthesis.
pub mod synthesis;

pub use corpus::{load_corpus, split_documents};
pub use embedding::{Encoder, LocalEncoder};
#[cfg(feature = "http-embeddings")]
pub use http::HttpEncoder;
pub use index::{SearchHit, SimilarityIndex};
pub use pipeline::{ReindexPolicy, RetrievalPipeline};
pub use service::{build_encoder, EncoderConfig, RagService, ServiceConfig};
pub use synthesis::{synthesize, NO_INFORMATION_ANSWER};
