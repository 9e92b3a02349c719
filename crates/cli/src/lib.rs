//! Shared helpers for the `docindex` binary: logging bootstrap and embedder
//! construction from config.

pub mod logging;

use anyhow::{Context, Result};
use core_types::config::AppConfig;
use semantic_index::{CachedEmbedder, Embedder, HashingEmbedder};

pub use logging::{LogGuard, init_tracing_with_config};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// The embedder configured in `cfg`, wrapped in the on-disk cache when enabled.
pub fn build_embedder(cfg: &AppConfig) -> Result<Box<dyn Embedder>> {
    let base = HashingEmbedder::new(cfg.embedding.dimension)?;
    if !cfg.embedding.cache_enabled {
        return Ok(Box::new(base));
    }
    let dir = cfg.embedding_cache_dir();
    let cached = CachedEmbedder::new(base, &dir)
        .with_context(|| format!("failed to open embedding cache {}", dir.display()))?;
    Ok(Box::new(cached))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn embedder_follows_config() {
        let dir = tempdir().unwrap();
        let mut cfg = AppConfig::default();
        cfg.app.data_dir = dir.path().to_string_lossy().into_owned();
        cfg.embedding.dimension = 16;

        let cached = build_embedder(&cfg).unwrap();
        assert_eq!(cached.dimension(), 16);
        cached.embed(&["warm the cache"]).unwrap();
        assert!(cfg.embedding_cache_dir().read_dir().unwrap().next().is_some());

        cfg.embedding.cache_enabled = false;
        assert_eq!(build_embedder(&cfg).unwrap().dimension(), 16);
    }
}
