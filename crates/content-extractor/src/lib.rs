//! Turns files on disk into chunked [`DocumentRecord`]s ready for embedding.
//!
//! Extraction goes through the [`Extractor`] trait; [`ExtractorStack`] picks
//! the first backend that claims a file. Only plain UTF-8 text is handled
//! today.

mod chunk;
mod discover;

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use core_types::DocumentRecord;
use thiserror::Error;
use tracing::{debug, warn};

pub use chunk::{ChunkConfig, CHUNK_FIELD, chunk_text, kind_for};
pub use discover::{discover_files, file_id};

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("no extractor supports {0}")]
    Unsupported(String),
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("extraction failed: {0}")]
    Failed(String),
    #[error("invalid chunking: {0}")]
    InvalidChunking(String),
}

/// What an extractor needs to know about one file.
#[derive(Debug, Clone, Copy)]
pub struct ExtractContext<'a> {
    pub path: &'a Path,
    /// Lower-cased extension, if any.
    pub ext: Option<&'a str>,
    pub max_bytes: u64,
}

impl<'a> ExtractContext<'a> {
    pub fn new(path: &'a Path, ext: Option<&'a str>, max_bytes: u64) -> Self {
        Self {
            path,
            ext,
            max_bytes,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedContent {
    pub text: String,
    /// The file was longer than `max_bytes` and only its prefix was read.
    pub truncated: bool,
    pub bytes_processed: u64,
}

pub trait Extractor {
    fn name(&self) -> &'static str;
    fn supports(&self, ctx: &ExtractContext<'_>) -> bool;
    fn extract(&self, ctx: &ExtractContext<'_>) -> Result<ExtractedContent, ExtractError>;
}

/// Reads the file as UTF-8, replacing invalid sequences.
#[derive(Debug, Clone)]
pub struct PlainTextExtractor {
    extensions: Vec<String>,
}

impl PlainTextExtractor {
    /// Accept files whose extension is in `extensions` (case-insensitive).
    /// An empty list accepts everything.
    pub fn new<I, S>(extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            extensions: extensions
                .into_iter()
                .map(|e| normalize_ext(e.as_ref()))
                .collect(),
        }
    }
}

impl Extractor for PlainTextExtractor {
    fn name(&self) -> &'static str {
        "plain-text"
    }

    fn supports(&self, ctx: &ExtractContext<'_>) -> bool {
        if self.extensions.is_empty() {
            return true;
        }
        ctx.ext
            .is_some_and(|ext| self.extensions.iter().any(|e| e == ext))
    }

    fn extract(&self, ctx: &ExtractContext<'_>) -> Result<ExtractedContent, ExtractError> {
        let io_err = |source| ExtractError::Io {
            path: ctx.path.display().to_string(),
            source,
        };
        let file = File::open(ctx.path).map_err(io_err)?;
        let size = file.metadata().map_err(io_err)?.len();

        let mut bytes = Vec::new();
        file.take(ctx.max_bytes)
            .read_to_end(&mut bytes)
            .map_err(io_err)?;
        let truncated = size > ctx.max_bytes;
        if truncated {
            warn!(
                path = %ctx.path.display(),
                size,
                limit = ctx.max_bytes,
                "file exceeds size limit; indexing its prefix only"
            );
        }

        let bytes_processed = bytes.len() as u64;
        let text = match String::from_utf8(bytes) {
            Ok(text) => text,
            Err(err) => {
                debug!(path = %ctx.path.display(), "invalid UTF-8; decoding lossily");
                String::from_utf8_lossy(err.as_bytes()).into_owned()
            }
        };
        Ok(ExtractedContent {
            text,
            truncated,
            bytes_processed,
        })
    }
}

/// Ordered list of extractors; the first that supports a file wins.
pub struct ExtractorStack {
    backends: Vec<Box<dyn Extractor + Send + Sync>>,
    max_bytes: u64,
}

impl ExtractorStack {
    pub fn new(max_bytes: u64) -> Self {
        Self {
            backends: Vec::new(),
            max_bytes,
        }
    }

    /// Stack with a single [`PlainTextExtractor`] for `extensions`.
    pub fn with_defaults<I, S>(extensions: I, max_bytes: u64) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self::new(max_bytes).with(PlainTextExtractor::new(extensions))
    }

    #[must_use]
    pub fn with(mut self, extractor: impl Extractor + Send + Sync + 'static) -> Self {
        self.backends.push(Box::new(extractor));
        self
    }

    pub fn extract(&self, path: &Path) -> Result<ExtractedContent, ExtractError> {
        let ext = extension_of(path);
        let ctx = ExtractContext::new(path, ext.as_deref(), self.max_bytes);
        let backend = self
            .backends
            .iter()
            .find(|b| b.supports(&ctx))
            .ok_or_else(|| ExtractError::Unsupported(path.display().to_string()))?;
        debug!(path = %path.display(), backend = backend.name(), "extracting");
        backend.extract(&ctx)
    }

    /// Extract `path` and cut it into records tagged with `file_id`.
    ///
    /// A file with no text yields an empty vector.
    pub fn extract_chunks(
        &self,
        path: &Path,
        file_id: &str,
        chunking: &ChunkConfig,
    ) -> Result<Vec<DocumentRecord>, ExtractError> {
        let content = self.extract(path)?;
        let kind = kind_for(path);
        let records: Vec<DocumentRecord> = chunk_text(&content.text, chunking)
            .into_iter()
            .enumerate()
            .map(|(i, chunk)| {
                DocumentRecord::new(chunk, file_id, kind).with_field(CHUNK_FIELD, i)
            })
            .collect();
        debug!(file = file_id, chunks = records.len(), "chunked");
        Ok(records)
    }
}

impl std::fmt::Debug for ExtractorStack {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.backends.iter().map(|b| b.name()).collect();
        f.debug_struct("ExtractorStack")
            .field("backends", &names)
            .field("max_bytes", &self.max_bytes)
            .finish()
    }
}

fn normalize_ext(ext: &str) -> String {
    ext.trim().trim_start_matches('.').to_ascii_lowercase()
}

pub(crate) fn extension_of(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(normalize_ext)
}
