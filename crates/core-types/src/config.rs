//! Application configuration loaded from TOML with `.env` / environment overrides.
//!
//! Paths are kept as strings so the file stays human-editable; relative
//! entries under `[paths]` resolve against `app.data_dir`.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

pub const DEFAULT_CONFIG_FILE: &str = "docindex.toml";
const ENV_PREFIX: &str = "DOCINDEX_";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub app: AppSection,
    pub paths: PathsConfig,
    pub embedding: EmbeddingConfig,
    pub indexing: IndexingConfig,
    pub search: SearchConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSection {
    pub data_dir: String,
    pub documents_dir: String,
}

impl Default for AppSection {
    fn default() -> Self {
        Self {
            data_dir: "./data".into(),
            documents_dir: "./documents".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Base path of the index snapshot; the records artifact sits next to it as `<index>.docs`.
    pub index: String,
    pub progress: String,
    pub embedding_cache: String,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            index: "vector_index.bin".into(),
            progress: "indexed_files.json".into(),
            embedding_cache: "embedding_cache".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub dimension: usize,
    pub cache_enabled: bool,
    pub batch_size: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            dimension: 384,
            cache_enabled: true,
            batch_size: 32,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexingConfig {
    /// Chunk length in characters.
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    /// Persist snapshot + progress after this many processed files.
    pub save_every: usize,
    pub extensions: Vec<String>,
    /// Files larger than this are read only up to the limit.
    pub max_file_bytes: u64,
}

impl Default for IndexingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 150,
            save_every: 1,
            extensions: ["txt", "md", "rst", "rs", "py", "toml", "json"]
                .into_iter()
                .map(String::from)
                .collect(),
            max_file_bytes: 16 * 1024 * 1024,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub top_k: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self { top_k: 5 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive; `RUST_LOG` wins when set.
    pub level: String,
    /// Optional log file; empty disables file output.
    pub file: String,
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            file: String::new(),
            json: false,
        }
    }
}

impl AppConfig {
    pub fn data_dir(&self) -> PathBuf {
        PathBuf::from(&self.app.data_dir)
    }

    fn resolve(&self, p: &str) -> PathBuf {
        let path = Path::new(p);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.data_dir().join(path)
        }
    }

    pub fn index_path(&self) -> PathBuf {
        self.resolve(&self.paths.index)
    }

    pub fn progress_path(&self) -> PathBuf {
        self.resolve(&self.paths.progress)
    }

    pub fn embedding_cache_dir(&self) -> PathBuf {
        self.resolve(&self.paths.embedding_cache)
    }

    /// Reject settings the indexer cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.embedding.dimension == 0 {
            bail!("embedding.dimension must be greater than zero");
        }
        if self.embedding.batch_size == 0 {
            bail!("embedding.batch_size must be greater than zero");
        }
        if self.search.top_k == 0 {
            bail!("search.top_k must be greater than zero");
        }
        if self.indexing.chunk_size == 0 {
            bail!("indexing.chunk_size must be greater than zero");
        }
        if self.indexing.chunk_overlap >= self.indexing.chunk_size {
            bail!(
                "indexing.chunk_overlap ({}) must be smaller than chunk_size ({})",
                self.indexing.chunk_overlap,
                self.indexing.chunk_size
            );
        }
        if self.indexing.save_every == 0 {
            bail!("indexing.save_every must be greater than zero");
        }
        if self.indexing.max_file_bytes == 0 {
            bail!("indexing.max_file_bytes must be greater than zero");
        }
        Ok(())
    }

    /// Apply `DOCINDEX_*` environment overrides on top of the file values.
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        if let Some(v) = env_var("DATA_DIR") {
            self.app.data_dir = v;
        }
        if let Some(v) = env_var("DOCUMENTS_DIR") {
            self.app.documents_dir = v;
        }
        if let Some(v) = env_var("LOG_LEVEL") {
            self.logging.level = v;
        }
        if let Some(v) = env_var("TOP_K") {
            self.search.top_k = parse_env("TOP_K", &v)?;
        }
        if let Some(v) = env_var("CHUNK_SIZE") {
            self.indexing.chunk_size = parse_env("CHUNK_SIZE", &v)?;
        }
        if let Some(v) = env_var("CHUNK_OVERLAP") {
            self.indexing.chunk_overlap = parse_env("CHUNK_OVERLAP", &v)?;
        }
        if let Some(v) = env_var("DIMENSION") {
            self.embedding.dimension = parse_env("DIMENSION", &v)?;
        }
        Ok(())
    }
}

fn env_var(suffix: &str) -> Option<String> {
    env::var(format!("{ENV_PREFIX}{suffix}"))
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_env(suffix: &str, raw: &str) -> Result<usize> {
    raw.parse()
        .with_context(|| format!("{ENV_PREFIX}{suffix} must be a non-negative integer, got {raw:?}"))
}

/// Parse a config file without touching the environment.
pub fn load_config_file(path: &Path) -> Result<AppConfig> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    toml::from_str(&text).with_context(|| format!("failed to parse config {}", path.display()))
}

/// Load the config at `path` (or `docindex.toml`), writing defaults when absent.
///
/// `.env` is read first so its values participate in the environment overrides.
pub fn load_or_create_config(path: Option<&Path>) -> Result<AppConfig> {
    let _ = dotenvy::dotenv();
    let path = path.map_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE), Path::to_path_buf);

    let mut cfg = if path.exists() {
        load_config_file(&path)?
    } else {
        let cfg = AppConfig::default();
        let text = toml::to_string_pretty(&cfg).context("failed to render default config")?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        fs::write(&path, text)
            .with_context(|| format!("failed to write default config {}", path.display()))?;
        tracing::info!(path = %path.display(), "wrote default config");
        cfg
    };

    cfg.apply_env_overrides()?;
    cfg.validate()?;
    Ok(cfg)
}
