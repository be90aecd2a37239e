//! Pipeline configuration.
//!
//! Settings are layered: built-in defaults, then an optional TOML file
//! (`qbank.toml` in the working directory, or an explicit `--config` path),
//! then `QBANK_*` environment variables.

use crate::error::{ConfigError, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Environment variable prefix, e.g. `QBANK_BATCH_SIZE=64`.
const ENV_PREFIX: &str = "QBANK";

/// Config file looked up in the working directory when no path is given.
const DEFAULT_CONFIG_NAME: &str = "qbank";

/// Configuration for preprocessing, indexing and search.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Raw question corpus (JSON array).
    pub raw_path: PathBuf,
    /// Flat record file written by preprocessing and read by indexing.
    pub processed_path: PathBuf,
    /// LanceDB directory holding the vector table.
    pub store_dir: PathBuf,
    /// Name of the LanceDB table.
    pub table_name: String,
    /// Embedding dimension (must match the embedding model).
    pub embedding_dim: usize,
    /// Number of records to embed per batch.
    pub batch_size: usize,
    /// Ask the embedding model for unit-length vectors.
    pub normalize_embeddings: bool,
    /// Where downloaded model files are cached.
    pub model_cache_dir: PathBuf,
    /// Default number of hits returned by `search`.
    pub search_limit: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            raw_path: PathBuf::from("data/raw/questiondetailwithtag.json"),
            processed_path: PathBuf::from("data/processed/data_processed.jsonl"),
            store_dir: PathBuf::from("vectorstore/lancedb"),
            table_name: "question_bank".into(),
            embedding_dim: 384,
            batch_size: 32,
            normalize_embeddings: true,
            model_cache_dir: default_model_cache_dir(),
            search_limit: 5,
        }
    }
}

impl Settings {
    /// Load settings from defaults, an optional config file, and the environment.
    ///
    /// An explicit `path` must exist; the implicit `qbank.toml` is optional.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let file = match path {
            Some(path) => config::File::from(path).required(true),
            None => config::File::with_name(DEFAULT_CONFIG_NAME).required(false),
        };

        let settings: Settings = config::Config::builder()
            .add_source(file)
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(ConfigError::from)?
            .try_deserialize()
            .map_err(ConfigError::from)?;

        settings.validate()?;
        Ok(settings)
    }

    /// Reject values the pipeline cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(ConfigError::Invalid("batch_size must be at least 1".into()).into());
        }
        if self.embedding_dim == 0 {
            return Err(ConfigError::Invalid("embedding_dim must be at least 1".into()).into());
        }
        if self.table_name.trim().is_empty() {
            return Err(ConfigError::Invalid("table_name is required".into()).into());
        }
        Ok(())
    }
}

fn default_model_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from(".cache"))
        .join("qbank")
        .join("models")
}
