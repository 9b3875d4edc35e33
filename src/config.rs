use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::rag::retrieval::SearchParams;
use crate::streaming::{DEFAULT_EMBEDDING_MODEL, DEFAULT_MODEL, DEFAULT_OLLAMA_URL};
use crate::vector_db::{DEFAULT_COLLECTION, DEFAULT_QDRANT_URL};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub ollama: OllamaConfig,
    #[serde(default)]
    pub qdrant: QdrantConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub prefill: PrefillConfig,
    #[serde(default)]
    pub worker_pool: WorkerPoolConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OllamaConfig {
    pub base_url: String,
    pub model: String,
    pub embedding_model: String,
    pub timeout_secs: u64,
    /// Generate through the blocking client on the worker pool
    pub blocking_generation: bool,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_OLLAMA_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            embedding_model: DEFAULT_EMBEDDING_MODEL.to_string(),
            timeout_secs: 120,
            blocking_generation: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QdrantConfig {
    pub url: String,
    pub collection: String,
}

impl Default for QdrantConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_QDRANT_URL.to_string(),
            collection: DEFAULT_COLLECTION.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Excerpts retrieved for DECISION questions
    pub top_k: usize,
    /// Ceiling for any retrieval request
    pub max_top_k: usize,
    /// Excerpts retrieved per prefill field
    pub vector_search_limit: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: 5,
            max_top_k: 50,
            vector_search_limit: 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrefillConfig {
    pub max_concurrent_fields: usize,
}

impl Default for PrefillConfig {
    fn default() -> Self {
        Self { max_concurrent_fields: 4 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerPoolConfig {
    pub max_workers: usize,
    pub dispose_timeout_ms: u64,
}

impl Default for WorkerPoolConfig {
    fn default() -> Self {
        Self {
            max_workers: num_cpus::get(),
            dispose_timeout_ms: 10_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Root of the JSON-file stores (artifacts/, brds/, templates.json)
    pub data_dir: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        let data_dir = dirs::home_dir()
            .map(|home| home.join(".brdbuddy").join("data"))
            .unwrap_or_else(|| PathBuf::from(".brdbuddy/data"));
        Self { data_dir }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive used when RUST_LOG is unset
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "brdbuddy=info".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from the default location, creating it if it doesn't exist
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if !config_path.exists() {
            let config = Config::default();
            config.save_to(&config_path)?;
            return Ok(config);
        }

        Self::load_from(&config_path)
    }

    /// Load configuration from an explicit file
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        let config: Config = toml::from_str(&contents).context("Failed to parse config file")?;
        config.validate()?;

        Ok(config)
    }

    /// Save configuration to the default location
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let toml_string = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(path, toml_string).context("Failed to write config file")?;

        Ok(())
    }

    /// Get the configuration file path
    pub fn config_path() -> Result<PathBuf> {
        let home = dirs::home_dir().context("Could not determine home directory")?;

        Ok(home.join(".brdbuddy").join("config.toml"))
    }

    /// Reject settings the orchestration core cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.retrieval.top_k == 0 || self.retrieval.vector_search_limit == 0 {
            bail!("retrieval.top_k and retrieval.vector_search_limit must be at least 1");
        }
        if self.retrieval.top_k > self.retrieval.max_top_k {
            bail!(
                "retrieval.top_k ({}) exceeds retrieval.max_top_k ({})",
                self.retrieval.top_k,
                self.retrieval.max_top_k
            );
        }
        if self.retrieval.vector_search_limit > self.retrieval.max_top_k {
            bail!(
                "retrieval.vector_search_limit ({}) exceeds retrieval.max_top_k ({})",
                self.retrieval.vector_search_limit,
                self.retrieval.max_top_k
            );
        }
        if self.prefill.max_concurrent_fields == 0 {
            bail!("prefill.max_concurrent_fields must be at least 1");
        }
        Ok(())
    }

    pub fn search_params(&self) -> SearchParams {
        SearchParams {
            top_k: self.retrieval.top_k,
            max_top_k: self.retrieval.max_top_k,
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.ollama.timeout_secs)
    }

    pub fn dispose_timeout(&self) -> Duration {
        Duration::from_millis(self.worker_pool.dispose_timeout_ms)
    }
}
