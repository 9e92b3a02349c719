use std::fs;
use std::io;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use core_types::config::LoggingConfig;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt};

/// Keeps the background log writer alive; drop it last.
#[must_use = "dropping the guard stops file logging"]
pub struct LogGuard {
    _file: Option<WorkerGuard>,
}

/// `RUST_LOG` wins over the configured level.
fn build_filter(env: Option<&str>, level: &str) -> Result<EnvFilter> {
    let directives = env.filter(|v| !v.trim().is_empty()).unwrap_or(level);
    EnvFilter::try_new(directives).with_context(|| format!("invalid log filter {directives:?}"))
}

/// Install the global subscriber: stderr always, plus `cfg.file` when set.
///
/// stdout stays free for command output.
pub fn init_tracing_with_config(cfg: &LoggingConfig) -> Result<LogGuard> {
    let filter = build_filter(std::env::var(EnvFilter::DEFAULT_ENV).ok().as_deref(), &cfg.level)?;
    let mut layers: Vec<Box<dyn Layer<Registry> + Send + Sync>> = Vec::new();

    let stderr = fmt::layer().with_writer(io::stderr).with_target(false);
    layers.push(if cfg.json {
        stderr.json().boxed()
    } else {
        stderr.boxed()
    });

    let mut file_guard = None;
    if !cfg.file.is_empty() {
        let path = Path::new(&cfg.file);
        let dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let name = path
            .file_name()
            .with_context(|| format!("log file {:?} has no file name", cfg.file))?;
        fs::create_dir_all(dir)
            .with_context(|| format!("failed to create log dir {}", dir.display()))?;

        let (writer, guard) = tracing_appender::non_blocking(tracing_appender::rolling::never(dir, name));
        let file = fmt::layer().with_writer(writer).with_ansi(false);
        layers.push(if cfg.json {
            file.json().boxed()
        } else {
            file.boxed()
        });
        file_guard = Some(guard);
    }

    tracing_subscriber::registry()
        .with(layers)
        .with(filter)
        .try_init()
        .map_err(|e| anyhow!("failed to install tracing subscriber: {e}"))?;
    Ok(LogGuard { _file: file_guard })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_directives_override_config_level() {
        let filter = build_filter(Some("semantic_index=debug"), "warn").unwrap();
        assert!(filter.to_string().contains("semantic_index=debug"));

        let filter = build_filter(Some("  "), "warn").unwrap();
        assert_eq!(filter.to_string(), "warn");
    }

    #[test]
    fn rejects_malformed_level() {
        assert!(build_filter(None, "semantic_index=loud").is_err());
    }
}
