use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use ragserve_core::{RagError, RagResult};
use serde::Deserialize;
use tokio::sync::OnceCell;
use tracing::info;

use crate::embedding::{Encoder, LocalEncoder, DEFAULT_DIMENSION, DEFAULT_MODEL};
use crate::pipeline::{ReindexPolicy, RetrievalPipeline};

/// Which encoder to build.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum EncoderConfig {
    /// In-process hashed encoder.
    Local {
        /// Output width.
        #[serde(default = "default_dimension")]
        dimension: usize,
        /// Reported model name.
        #[serde(default = "default_model")]
        model: String,
    },
    /// OpenAI-compatible embeddings endpoint (needs the `http-embeddings` feature).
    Http {
        /// Full URL of the embeddings endpoint.
        endpoint: String,
        /// Model requested from the endpoint.
        #[serde(default = "default_model")]
        model: String,
        /// Expected output width.
        #[serde(default = "default_dimension")]
        dimension: usize,
        /// Optional bearer token.
        #[serde(default)]
        api_key: Option<String>,
    },
}

impl Default for EncoderConfig {
    fn default() -> Self {
        EncoderConfig::Local {
            dimension: default_dimension(),
            model: default_model(),
        }
    }
}

fn default_dimension() -> usize {
    DEFAULT_DIMENSION
}
fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

/// Everything needed to build a pipeline and load its corpus.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Corpus file, one document per non-empty line.
    pub corpus_path: PathBuf,
    /// Behaviour of repeated indexing.
    pub reindex: ReindexPolicy,
    /// Encoder selection.
    pub encoder: EncoderConfig,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            corpus_path: PathBuf::from("data/knowledge.txt"),
            reindex: ReindexPolicy::default(),
            encoder: EncoderConfig::default(),
        }
    }
}

/// Build the encoder described by `config`.
pub fn build_encoder(config: &EncoderConfig) -> RagResult<Arc<dyn Encoder>> {
    match config {
        EncoderConfig::Local { dimension, model } => {
            if *dimension == 0 {
                return Err(RagError::Config(
                    "encoder dimension must be positive".to_string(),
                ));
            }
            Ok(Arc::new(LocalEncoder::with_model(*dimension, model.clone())))
        }
        #[cfg(feature = "http-embeddings")]
        EncoderConfig::Http {
            endpoint,
            model,
            dimension,
            api_key,
        } => {
            if *dimension == 0 {
                return Err(RagError::Config(
                    "encoder dimension must be positive".to_string(),
                ));
            }
            let mut encoder =
                crate::http::HttpEncoder::new(endpoint.clone(), model.clone(), *dimension);
            if let Some(key) = api_key {
                encoder = encoder.with_api_key(key.clone());
            }
            Ok(Arc::new(encoder))
        }
        #[cfg(not(feature = "http-embeddings"))]
        EncoderConfig::Http { .. } => Err(RagError::Config(
            "http encoder requires the `http-embeddings` feature".to_string(),
        )),
    }
}

/// Owns the process-wide retrieval pipeline.
///
/// The pipeline is built and its corpus indexed on the first call to
/// [`RagService::pipeline`]. Concurrent first callers all wait on the same
/// initialisation; later callers get the shared instance. A failed
/// initialisation is returned to the caller and leaves the cell empty.
pub struct RagService {
    config: ServiceConfig,
    encoder: Option<Arc<dyn Encoder>>,
    pipeline: OnceCell<Arc<RetrievalPipeline>>,
}

impl std::fmt::Debug for RagService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RagService")
            .field("config", &self.config)
            .field("initialized", &self.pipeline.initialized())
            .finish_non_exhaustive()
    }
}

impl RagService {
    /// Create a service that builds its encoder from `config`.
    pub fn new(config: ServiceConfig) -> Self {
        Self {
            config,
            encoder: None,
            pipeline: OnceCell::new(),
        }
    }

    /// Create a service that uses an already constructed encoder.
    pub fn with_encoder(config: ServiceConfig, encoder: Arc<dyn Encoder>) -> Self {
        Self {
            config,
            encoder: Some(encoder),
            pipeline: OnceCell::new(),
        }
    }

    /// The configuration this service was created with.
    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// Get the pipeline, building it and loading the corpus on first use.
    pub async fn pipeline(&self) -> RagResult<Arc<RetrievalPipeline>> {
        self.pipeline
            .get_or_try_init(|| self.initialize())
            .await
            .cloned()
    }

    /// The pipeline if it has already been initialised.
    pub fn get(&self) -> Option<Arc<RetrievalPipeline>> {
        self.pipeline.get().cloned()
    }

    async fn initialize(&self) -> RagResult<Arc<RetrievalPipeline>> {
        info!("Creating pipeline instance");
        let start = Instant::now();

        let encoder = match &self.encoder {
            Some(encoder) => encoder.clone(),
            None => build_encoder(&self.config.encoder)?,
        };
        let pipeline = RetrievalPipeline::new(encoder).with_policy(self.config.reindex);
        pipeline.index_from_file(&self.config.corpus_path).await?;

        let documents = pipeline.document_count().await;
        info!(
            elapsed_ms = start.elapsed().as_secs_f64() * 1000.0,
            documents,
            "Pipeline initialized"
        );
        Ok(Arc::new(pipeline))
    }
}
