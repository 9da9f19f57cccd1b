//! `ragserve.toml` configuration.
//!
//! Every section is optional; a missing file yields the defaults.

use ragserve_gateway::QueryLimits;
use ragserve_memory::{EncoderConfig, ReindexPolicy, ServiceConfig};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Full service configuration.
#[derive(Debug, Deserialize, Default)]
pub struct RagserveConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub corpus: CorpusConfig,
    #[serde(default)]
    pub encoder: EncoderConfig,
    #[serde(default)]
    pub query: QueryConfig,
}

#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CorpusConfig {
    #[serde(default = "default_corpus_path")]
    pub path: PathBuf,
    #[serde(default)]
    pub reindex: ReindexPolicy,
}

impl Default for CorpusConfig {
    fn default() -> Self {
        Self {
            path: default_corpus_path(),
            reindex: ReindexPolicy::default(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct QueryConfig {
    #[serde(default = "default_k")]
    pub default_k: usize,
    #[serde(default = "default_max_k")]
    pub max_k: usize,
    #[serde(default = "default_max_query_chars")]
    pub max_query_chars: usize,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            default_k: default_k(),
            max_k: default_max_k(),
            max_query_chars: default_max_query_chars(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8000
}
fn default_corpus_path() -> PathBuf {
    PathBuf::from("data/knowledge.txt")
}
fn default_k() -> usize {
    3
}
fn default_max_k() -> usize {
    10
}
fn default_max_query_chars() -> usize {
    1000
}

impl RagserveConfig {
    /// Read `path`, falling back to defaults when it does not exist.
    pub async fn load(path: &Path) -> anyhow::Result<Self> {
        match tokio::fs::read_to_string(path).await {
            Ok(text) => Self::parse(&text).map_err(|e| {
                anyhow::anyhow!("Failed to parse config file '{}': {e}", path.display())
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(anyhow::anyhow!(
                "Failed to read config file '{}': {e}",
                path.display()
            )),
        }
    }

    /// Parse TOML text and check the query bounds.
    pub fn parse(text: &str) -> anyhow::Result<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        let q = &self.query;
        if q.max_k == 0 || q.default_k == 0 || q.default_k > q.max_k {
            anyhow::bail!(
                "query.default_k ({}) must be between 1 and query.max_k ({})",
                q.default_k,
                q.max_k
            );
        }
        if q.max_query_chars == 0 {
            anyhow::bail!("query.max_query_chars must be positive");
        }
        Ok(())
    }

    /// Settings for building the retrieval service.
    pub fn service_config(&self) -> ServiceConfig {
        ServiceConfig {
            corpus_path: self.corpus.path.clone(),
            reindex: self.corpus.reindex,
            encoder: self.encoder.clone(),
        }
    }

    /// Bounds for `/query` requests.
    pub fn query_limits(&self) -> QueryLimits {
        QueryLimits {
            default_k: self.query.default_k,
            max_k: self.query.max_k,
            max_query_chars: self.query.max_query_chars,
        }
    }
}
