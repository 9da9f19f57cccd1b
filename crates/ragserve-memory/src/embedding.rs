use async_trait::async_trait;
use ragserve_core::{RagError, RagResult};
use std::collections::HashMap;

use crate::index::normalize;

/// Default model name reported by [`LocalEncoder`].
pub const DEFAULT_MODEL: &str = "all-MiniLM-L6-v2";
/// Output width of the default sentence-embedding model.
pub const DEFAULT_DIMENSION: usize = 384;

/// Trait for turning text into fixed-width vectors.
///
/// Implementations must be deterministic for a given model and always return
/// vectors of [`Encoder::dimension`] width, one per input, in input order.
#[async_trait]
pub trait Encoder: Send + Sync {
    /// Encode a batch of texts.
    async fn encode_batch(&self, texts: &[&str]) -> RagResult<Vec<Vec<f32>>>;

    /// Encode a single text.
    async fn encode(&self, text: &str) -> RagResult<Vec<f32>> {
        let mut vectors = self.encode_batch(&[text]).await?;
        vectors
            .pop()
            .ok_or_else(|| RagError::Encoder("Encoder returned no vector".to_string()))
    }

    /// Width of every vector produced by this encoder.
    fn dimension(&self) -> usize;

    /// Name of the underlying model, for logs and health output.
    fn model_name(&self) -> &str;
}

/// Local hashed bag-of-words encoder (no model weights needed).
///
/// Each token is hashed to three positions of a fixed-width vector and
/// weighted by its term frequency; the result is L2-normalised. Texts that
/// share words land close together, which is enough for keyword-heavy
/// corpora and keeps the service runnable offline.
pub struct LocalEncoder {
    dimension: usize,
    model: String,
}

impl LocalEncoder {
    /// Create an encoder producing `dimension`-wide vectors.
    pub fn new(dimension: usize) -> Self {
        Self::with_model(dimension, DEFAULT_MODEL)
    }

    /// Create an encoder that reports `model` as its name.
    pub fn with_model(dimension: usize, model: impl Into<String>) -> Self {
        Self {
            dimension: dimension.max(1),
            model: model.into(),
        }
    }

    fn encode_text(&self, text: &str) -> RagResult<Vec<f32>> {
        if text.trim().is_empty() {
            return Err(RagError::Encoder("Cannot encode empty text".to_string()));
        }

        let lowered = text.to_lowercase();
        let mut counts: HashMap<&str, usize> = HashMap::new();
        for word in lowered
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| w.chars().count() > 1)
        {
            *counts.entry(word).or_default() += 1;
        }

        let mut vector = vec![0.0f32; self.dimension];
        let total: usize = counts.values().sum();
        if total == 0 {
            return Ok(vector);
        }

        for (word, count) in counts {
            let tf = count as f32 / total as f32;
            for (seed, weight) in PROBES {
                let slot = fnv1a(word.as_bytes(), seed) as usize % self.dimension;
                vector[slot] += tf * weight;
            }
        }

        normalize(&mut vector);
        Ok(vector)
    }
}

impl Default for LocalEncoder {
    fn default() -> Self {
        Self::new(DEFAULT_DIMENSION)
    }
}

#[async_trait]
impl Encoder for LocalEncoder {
    async fn encode_batch(&self, texts: &[&str]) -> RagResult<Vec<Vec<f32>>> {
        texts.iter().map(|t| self.encode_text(t)).collect()
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

/// Seed byte and weight of each slot a word is hashed into.
const PROBES: [(u8, f32); 3] = [(0, 1.0), (1, 0.7), (2, 0.5)];

/// 32-bit FNV-1a over `data` followed by `seed`.
fn fnv1a(data: &[u8], seed: u8) -> u32 {
    data.iter()
        .chain(std::iter::once(&seed))
        .fold(2166136261u32, |hash, &byte| {
            (hash ^ byte as u32).wrapping_mul(16777619)
        })
}
