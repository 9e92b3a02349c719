//! The embedding collaborator seen from the index: text in, fixed-length vectors out.

mod cache;
mod hashing;

pub use cache::CachedEmbedder;
pub use hashing::HashingEmbedder;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EmbedError {
    #[error("embedder returned {actual} vectors for {expected} inputs")]
    CountMismatch { expected: usize, actual: usize },

    #[error("embedding backend failed: {0}")]
    Backend(String),

    #[error("embedding cache unavailable: {0}")]
    Cache(#[from] std::io::Error),
}

/// Maps a batch of texts to one vector each, in input order.
///
/// Every returned vector must have length [`Embedder::dimension`]. Callers hand
/// over whole batches so implementations can amortise per-call overhead.
pub trait Embedder {
    fn dimension(&self) -> usize;

    fn embed(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbedError>;

    /// Convenience for single-text queries.
    fn embed_one(&self, text: &str) -> Result<Vec<f32>, EmbedError> {
        let mut out = self.embed(&[text])?;
        if out.len() != 1 {
            return Err(EmbedError::CountMismatch {
                expected: 1,
                actual: out.len(),
            });
        }
        Ok(out.swap_remove(0))
    }
}

impl<E: Embedder + ?Sized> Embedder for &E {
    fn dimension(&self) -> usize {
        (**self).dimension()
    }

    fn embed(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbedError> {
        (**self).embed(texts)
    }
}

impl<E: Embedder + ?Sized> Embedder for Box<E> {
    fn dimension(&self) -> usize {
        (**self).dimension()
    }

    fn embed(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbedError> {
        (**self).embed(texts)
    }
}
