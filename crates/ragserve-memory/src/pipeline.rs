use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use ragserve_core::{InferenceResult, RagError, RagResult};
use serde::Deserialize;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::corpus::load_corpus;
use crate::embedding::Encoder;
use crate::index::SimilarityIndex;
use crate::synthesis::synthesize;

/// What a second call to [`RetrievalPipeline::index`] does.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReindexPolicy {
    /// New documents are appended after the existing ones.
    #[default]
    Append,
    /// The call fails with [`RagError::AlreadyIndexed`].
    Reject,
}

/// Encoder + similarity index, with the corpus lifecycle (empty -> indexed).
///
/// Indexing is expected once at startup; afterwards every operation is a
/// read-only search, so concurrent queries only ever share a read lock.
pub struct RetrievalPipeline {
    encoder: Arc<dyn Encoder>,
    index: RwLock<SimilarityIndex>,
    indexed: AtomicBool,
    policy: ReindexPolicy,
}

impl std::fmt::Debug for RetrievalPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetrievalPipeline")
            .field("model", &self.encoder.model_name())
            .field("indexed", &self.indexed.load(Ordering::Acquire))
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl RetrievalPipeline {
    /// Create an empty pipeline whose index matches the encoder's dimension.
    pub fn new(encoder: Arc<dyn Encoder>) -> Self {
        let dimension = encoder.dimension();
        info!(
            model = encoder.model_name(),
            dimension, "Initializing retrieval pipeline"
        );
        Self {
            encoder,
            index: RwLock::new(SimilarityIndex::new(dimension)),
            indexed: AtomicBool::new(false),
            policy: ReindexPolicy::default(),
        }
    }

    /// Set the re-index policy. Chainable builder method.
    pub fn with_policy(mut self, policy: ReindexPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// The encoder backing this pipeline.
    pub fn encoder(&self) -> &Arc<dyn Encoder> {
        &self.encoder
    }

    /// Encode all documents in one batch and add them to the index.
    ///
    /// Returns the number of documents added.
    pub async fn index(&self, documents: Vec<String>) -> RagResult<usize> {
        if documents.is_empty() {
            return Err(RagError::EmptyCorpus("no documents to index".to_string()));
        }
        if self.policy == ReindexPolicy::Reject && self.indexed.load(Ordering::Acquire) {
            return Err(RagError::AlreadyIndexed);
        }

        info!(documents = documents.len(), "Indexing documents");
        let start = Instant::now();

        let refs: Vec<&str> = documents.iter().map(String::as_str).collect();
        let vectors = self.encoder.encode_batch(&refs).await?;

        let mut index = self.index.write().await;
        // Checked under the write lock: another caller may have finished
        // indexing while we were encoding.
        self.check_reindex()?;

        let count = documents.len();
        index.add_documents(documents, vectors)?;
        self.indexed.store(true, Ordering::Release);

        info!(
            documents = count,
            total = index.len(),
            elapsed_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Indexing completed"
        );
        Ok(count)
    }

    /// Load a corpus file (one document per non-empty line) and index it.
    pub async fn index_from_file(&self, path: &Path) -> RagResult<usize> {
        info!(path = %path.display(), "Indexing knowledge file");
        let documents = load_corpus(path).await?;
        self.index(documents).await
    }

    fn check_reindex(&self) -> RagResult<()> {
        if !self.indexed.load(Ordering::Acquire) {
            return Ok(());
        }
        match self.policy {
            ReindexPolicy::Reject => Err(RagError::AlreadyIndexed),
            ReindexPolicy::Append => {
                warn!("Pipeline already indexed; appending documents");
                Ok(())
            }
        }
    }

    /// Return the top `k` documents for `query` with their scores.
    ///
    /// Before indexing this yields two empty lists rather than an error.
    pub async fn retrieve(&self, query: &str, k: usize) -> RagResult<(Vec<String>, Vec<f32>)> {
        if !self.indexed.load(Ordering::Acquire) {
            debug!("Query before indexing; returning empty result");
            return Ok((Vec::new(), Vec::new()));
        }

        let query_vector = self.encoder.encode(query).await?;
        let hits = self.index.read().await.search(&query_vector, k)?;

        Ok(hits.into_iter().map(|h| (h.document, h.score)).unzip())
    }

    /// Retrieve and synthesize an answer, timing the whole round trip.
    pub async fn query(&self, text: &str, k: usize) -> RagResult<InferenceResult> {
        let start = Instant::now();

        let (documents, scores) = self.retrieve(text, k).await?;
        let answer = synthesize(text, &documents, &scores);

        let latency_ms = start.elapsed().as_secs_f64() * 1000.0;
        Ok(InferenceResult::new(text, documents, scores, answer, latency_ms))
    }

    /// True once indexed and the index holds at least one vector.
    pub async fn is_ready(&self) -> bool {
        self.indexed.load(Ordering::Acquire) && !self.index.read().await.is_empty()
    }

    /// Number of stored documents.
    pub async fn document_count(&self) -> usize {
        self.index.read().await.len()
    }
}
