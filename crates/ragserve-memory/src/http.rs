//! Encoder backed by an OpenAI-compatible `/embeddings` HTTP endpoint.

use async_trait::async_trait;
use ragserve_core::{RagError, RagResult};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::embedding::Encoder;

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [&'a str],
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingDatum>,
}

#[derive(Deserialize)]
struct EmbeddingDatum {
    #[serde(default)]
    index: Option<usize>,
    embedding: Vec<f32>,
}

/// Remote encoder. The whole batch is sent in a single request.
pub struct HttpEncoder {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: Option<String>,
    dimension: usize,
}

impl HttpEncoder {
    /// Create an encoder posting to `endpoint` and expecting `dimension`-wide vectors.
    pub fn new(endpoint: impl Into<String>, model: impl Into<String>, dimension: usize) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
            model: model.into(),
            api_key: None,
            dimension,
        }
    }

    /// Send `Authorization: Bearer <key>` with every request.
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }
}

#[async_trait]
impl Encoder for HttpEncoder {
    async fn encode_batch(&self, texts: &[&str]) -> RagResult<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!(endpoint = %self.endpoint, batch = texts.len(), "Requesting embeddings");

        let mut request = self.client.post(&self.endpoint).json(&EmbeddingRequest {
            model: &self.model,
            input: texts,
        });
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| RagError::Encoder(format!("Embedding request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RagError::Encoder(format!(
                "Embedding endpoint returned {status}: {body}"
            )));
        }

        let mut parsed: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| RagError::Encoder(format!("Invalid embedding response: {e}")))?;

        if parsed.data.len() != texts.len() {
            return Err(RagError::DimensionMismatch {
                expected: texts.len(),
                actual: parsed.data.len(),
            });
        }

        parsed.data.sort_by_key(|d| d.index.unwrap_or(usize::MAX));

        let vectors: Vec<Vec<f32>> = parsed.data.into_iter().map(|d| d.embedding).collect();
        if let Some(bad) = vectors.iter().find(|v| v.len() != self.dimension) {
            return Err(RagError::DimensionMismatch {
                expected: self.dimension,
                actual: bad.len(),
            });
        }

        Ok(vectors)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
