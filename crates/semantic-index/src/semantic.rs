use std::path::Path;

use core_types::{DocumentRecord, SearchHit};
use tracing::{info, warn};

use crate::embed::{EmbedError, Embedder};
use crate::error::IndexError;
use crate::flat::{FlatIndex, IndexStats};
use crate::persist::{load_index, save_index};

/// A [`FlatIndex`] bound to the embedder that produces its vectors.
///
/// Records go in as text and queries go in as text; each `add` issues one
/// embedding call for the whole batch.
///
/// Not synchronised: share it across threads behind a single lock around the
/// whole value, since `add` grows the vectors and the records in two steps.
#[derive(Debug)]
pub struct SemanticIndex<E> {
    index: FlatIndex,
    embedder: E,
}

impl<E: Embedder> SemanticIndex<E> {
    /// Empty index sized to the embedder's output.
    pub fn new(embedder: E) -> Result<Self, IndexError> {
        let index = FlatIndex::new(embedder.dimension())?;
        Ok(Self { index, embedder })
    }

    /// Wrap an existing index; its dimension must match the embedder.
    pub fn with_index(index: FlatIndex, embedder: E) -> Result<Self, IndexError> {
        if index.dimension() != embedder.dimension() {
            return Err(IndexError::DimensionMismatch {
                expected: embedder.dimension(),
                actual: index.dimension(),
            });
        }
        Ok(Self { index, embedder })
    }

    /// Load the snapshot at `path`, or start empty when there is none.
    pub fn open(path: &Path, embedder: E) -> Result<Self, IndexError> {
        match load_index(path)? {
            Some(index) => Self::with_index(index, embedder),
            None => {
                info!(path = %path.display(), "starting with an empty index");
                Self::new(embedder)
            }
        }
    }

    pub const fn index(&self) -> &FlatIndex {
        &self.index
    }

    pub const fn embedder(&self) -> &E {
        &self.embedder
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Embed every record's `content` in one call and append the batch.
    pub fn add(&mut self, records: Vec<DocumentRecord>) -> Result<usize, IndexError> {
        self.add_batched(records, usize::MAX)
    }

    /// Like [`add`](Self::add), but embeds at most `batch_size` texts per
    /// embedder call. Nothing is appended unless every batch succeeds.
    pub fn add_batched(
        &mut self,
        records: Vec<DocumentRecord>,
        batch_size: usize,
    ) -> Result<usize, IndexError> {
        if batch_size == 0 {
            return Err(IndexError::InvalidArgument(
                "batch_size must be greater than zero".into(),
            ));
        }
        if records.is_empty() {
            return Ok(0);
        }
        let texts: Vec<&str> = records.iter().map(|r| r.content.as_str()).collect();
        let mut embeddings = Vec::with_capacity(texts.len());
        for batch in texts.chunks(batch_size) {
            let out = self.embedder.embed(batch)?;
            if out.len() != batch.len() {
                return Err(EmbedError::CountMismatch {
                    expected: batch.len(),
                    actual: out.len(),
                }
                .into());
            }
            embeddings.extend(out);
        }
        self.index.add_embedded(records, embeddings)
    }

    /// Embed `query` and return the `top_k` closest records, best first.
    pub fn search(&self, query: &str, top_k: usize) -> Result<Vec<SearchHit>, IndexError> {
        if top_k == 0 {
            return Err(IndexError::InvalidArgument(
                "top_k must be greater than zero".into(),
            ));
        }
        if self.index.is_empty() {
            warn!("search on empty index; returning no results");
            return Ok(Vec::new());
        }
        let vector = self.embedder.embed_one(query)?;
        self.index.search_vector(&vector, top_k)
    }

    pub fn clear(&mut self) {
        self.index.clear();
    }

    pub fn stats(&self) -> IndexStats {
        self.index.stats()
    }

    pub fn save(&self, path: &Path) -> Result<(), IndexError> {
        save_index(&self.index, path)
    }

    pub fn into_parts(self) -> (FlatIndex, E) {
        (self.index, self.embedder)
    }
}
