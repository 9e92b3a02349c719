use std::path::PathBuf;

use thiserror::Error;

use crate::embed::EmbedError;

/// Errors surfaced by the index, its persistence and the progress ledger.
///
/// A missing snapshot or ledger is not an error: loads report absence through
/// `Option` / an empty list.
#[derive(Debug, Error)]
pub enum IndexError {
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("corrupt snapshot: {0}")]
    Corruption(String),

    #[error("io error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("serialization failed: {0}")]
    Serialization(String),

    #[error(transparent)]
    Embedding(#[from] EmbedError),
}

impl IndexError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// True when on-disk state exists but cannot be trusted.
    pub const fn is_corruption(&self) -> bool {
        matches!(self, Self::Corruption(_))
    }
}
