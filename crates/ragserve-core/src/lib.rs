//! Core types and error definitions for the ragserve retrieval service.
//!
//! This crate provides the foundational types shared across all ragserve
//! crates: the error taxonomy, the per-query result value and the confidence
//! classification applied to similarity scores.
//!
//! # Main types
//!
//! - [`RagError`]: Unified error enum for indexing, encoding and serving.
//! - [`RagResult`]: Convenience alias for `Result<T, RagError>`.
//! - [`InferenceResult`]: The outcome of a single query.
//! - [`Confidence`]: Step classification of a top similarity score.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

// --- Error types ---

/// Top-level error type for ragserve.
#[derive(Debug, thiserror::Error)]
pub enum RagError {
    /// Documents and vectors disagree in count, or a vector has the wrong width.
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// The count or width that was required.
        expected: usize,
        /// The count or width that was supplied.
        actual: usize,
    },

    /// There was nothing to index.
    #[error("Empty corpus: {0}")]
    EmptyCorpus(String),

    /// The corpus source could not be found at startup.
    #[error("Corpus source not found: {}", .0.display())]
    SourceNotFound(PathBuf),

    /// `index` was called again while the pipeline rejects re-indexing.
    #[error("Pipeline is already indexed")]
    AlreadyIndexed,

    /// The encoder failed to produce vectors.
    #[error("Encoder error: {0}")]
    Encoder(String),

    /// An error in configuration parsing or validation.
    #[error("Config error: {0}")]
    Config(String),

    /// A standard I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl RagError {
    /// Whether this error must abort service initialisation.
    ///
    /// The service cannot serve without a valid index, so the three
    /// corpus/index errors are treated as fatal when raised during startup.
    pub fn is_fatal_at_startup(&self) -> bool {
        matches!(
            self,
            RagError::DimensionMismatch { .. }
                | RagError::EmptyCorpus(_)
                | RagError::SourceNotFound(_)
        )
    }
}

/// A convenience `Result` alias using [`RagError`].
pub type RagResult<T> = Result<T, RagError>;

// --- Confidence ---

/// Scores strictly above this are [`Confidence::High`].
pub const HIGH_CONFIDENCE_THRESHOLD: f32 = 0.7;
/// Scores strictly above this (and not high) are [`Confidence::Moderate`].
pub const MODERATE_CONFIDENCE_THRESHOLD: f32 = 0.5;

/// Confidence label derived from the best similarity score of a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    /// Top score > 0.7.
    High,
    /// 0.5 < top score <= 0.7.
    Moderate,
    /// Top score <= 0.5.
    Low,
}

impl Confidence {
    /// Classify a top similarity score.
    pub fn from_score(score: f32) -> Self {
        if score > HIGH_CONFIDENCE_THRESHOLD {
            Confidence::High
        } else if score > MODERATE_CONFIDENCE_THRESHOLD {
            Confidence::Moderate
        } else {
            Confidence::Low
        }
    }

    /// Human-readable label used in synthesized answers.
    pub fn label(self) -> &'static str {
        match self {
            Confidence::High => "high confidence",
            Confidence::Moderate => "moderate confidence",
            Confidence::Low => "low confidence",
        }
    }
}

impl std::fmt::Display for Confidence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

// --- Query results ---

/// The outcome of a single query: retrieved documents, their scores, the
/// synthesized answer and how long the round trip took.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InferenceResult {
    /// Unique identifier for this query, used to correlate logs.
    pub id: Uuid,
    /// The original query text.
    pub query: String,
    /// Retrieved documents, highest similarity first.
    pub retrieved_documents: Vec<String>,
    /// Cosine similarity of each retrieved document, index-aligned.
    pub similarity_scores: Vec<f32>,
    /// Synthesized answer text.
    pub answer: String,
    /// Wall-clock time of retrieve + synthesize, in milliseconds.
    pub latency_ms: f64,
    /// UTC timestamp of when the query completed.
    pub created_at: DateTime<Utc>,
}

impl InferenceResult {
    /// Creates a new result stamped with a fresh id and the current time.
    pub fn new(
        query: impl Into<String>,
        retrieved_documents: Vec<String>,
        similarity_scores: Vec<f32>,
        answer: impl Into<String>,
        latency_ms: f64,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            query: query.into(),
            retrieved_documents,
            similarity_scores,
            answer: answer.into(),
            latency_ms,
            created_at: Utc::now(),
        }
    }

    /// Best similarity score, if anything was retrieved.
    pub fn top_score(&self) -> Option<f32> {
        self.similarity_scores.first().copied()
    }

    /// Confidence of the best match, if anything was retrieved.
    pub fn confidence(&self) -> Option<Confidence> {
        self.top_score().map(Confidence::from_score)
    }
}
