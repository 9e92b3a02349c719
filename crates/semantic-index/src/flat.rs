//! Exact (brute-force) nearest-neighbour index.
//!
//! A `FlatIndex` pairs a [`VectorBuffer`] with a [`DocumentStore`]; the i-th
//! vector belongs to the i-th record and nothing else links them. Both halves
//! only grow through [`FlatIndex::add_embedded`], which validates the whole
//! batch before touching either one.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

use core_types::{DocumentRecord, SCORE_FIELD, SearchHit};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::buffer::VectorBuffer;
use crate::error::IndexError;
use crate::store::DocumentStore;

/// Aggregate view over the stored records.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexStats {
    pub total_documents: usize,
    pub total_files: usize,
    /// Distinct `file` values, sorted.
    pub files: Vec<String>,
    /// Record count per `type` value.
    pub types: BTreeMap<String, usize>,
    pub dimension: usize,
}

/// Convert a squared distance into a similarity in `(0, 1]`.
#[inline]
pub fn distance_to_score(distance: f64) -> f32 {
    (1.0 / (1.0 + distance)) as f32
}

fn by_distance_then_position(a: &(f64, usize), b: &(f64, usize)) -> Ordering {
    a.0.total_cmp(&b.0).then(a.1.cmp(&b.1))
}

/// Keep the `k` closest entries, ordered by distance and then storage position.
pub(crate) fn select_top_k(mut scored: Vec<(f64, usize)>, k: usize) -> Vec<(f64, usize)> {
    if k == 0 {
        return Vec::new();
    }
    if k < scored.len() {
        scored.select_nth_unstable_by(k - 1, by_distance_then_position);
        scored.truncate(k);
    }
    scored.sort_unstable_by(by_distance_then_position);
    scored
}

#[derive(Debug, Clone, PartialEq)]
pub struct FlatIndex {
    vectors: VectorBuffer,
    documents: DocumentStore,
}

impl FlatIndex {
    pub fn new(dimension: usize) -> Result<Self, IndexError> {
        Ok(Self {
            vectors: VectorBuffer::new(dimension)?,
            documents: DocumentStore::new(),
        })
    }

    /// Reassemble an index from its two halves, re-checking that they line up.
    pub(crate) fn from_parts(
        vectors: VectorBuffer,
        documents: DocumentStore,
    ) -> Result<Self, IndexError> {
        if vectors.len() != documents.len() {
            return Err(IndexError::Corruption(format!(
                "{} vectors but {} records",
                vectors.len(),
                documents.len()
            )));
        }
        Ok(Self { vectors, documents })
    }

    pub const fn dimension(&self) -> usize {
        self.vectors.dimension()
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub const fn vectors(&self) -> &VectorBuffer {
        &self.vectors
    }

    pub const fn documents(&self) -> &DocumentStore {
        &self.documents
    }

    pub fn vector(&self, position: usize) -> Option<&[f32]> {
        self.vectors.get(position)
    }

    pub fn document(&self, position: usize) -> Option<DocumentRecord> {
        self.documents.get(position)
    }

    /// Append records together with their precomputed embeddings.
    ///
    /// Returns the number of records added. An empty batch is a no-op. Any
    /// validation failure rejects the whole batch and leaves the index as it was.
    pub fn add_embedded(
        &mut self,
        mut records: Vec<DocumentRecord>,
        embeddings: Vec<Vec<f32>>,
    ) -> Result<usize, IndexError> {
        if records.len() != embeddings.len() {
            return Err(IndexError::InvalidArgument(format!(
                "{} records but {} embeddings",
                records.len(),
                embeddings.len()
            )));
        }
        if records.is_empty() {
            return Ok(0);
        }
        for v in &embeddings {
            self.vectors.check_dimension(v)?;
        }

        for rec in &mut records {
            if rec.extra.shift_remove(SCORE_FIELD).is_some() {
                debug!(file = %rec.file, "dropped transient score field from record");
            }
        }

        let added = records.len();
        self.vectors.append(&embeddings)?;
        self.documents.append(records);
        debug_assert_eq!(self.vectors.len(), self.documents.len());

        info!(added, total = self.len(), "added documents to index");
        Ok(added)
    }

    /// Exact top-k search for an already embedded query.
    ///
    /// Results are copies of the stored records with a `score` attached, best
    /// first; equal distances keep insertion order.
    pub fn search_vector(&self, query: &[f32], top_k: usize) -> Result<Vec<SearchHit>, IndexError> {
        if top_k == 0 {
            return Err(IndexError::InvalidArgument(
                "top_k must be greater than zero".into(),
            ));
        }
        self.vectors.check_dimension(query)?;

        if self.is_empty() {
            warn!("search on empty index; returning no results");
            return Ok(Vec::new());
        }

        let scored = self.vectors.scan_l2(query)?;
        let hits = select_top_k(scored, top_k)
            .into_iter()
            .filter_map(|(distance, position)| {
                self.documents.get(position).map(|record| SearchHit {
                    record,
                    score: distance_to_score(distance),
                })
            })
            .collect::<Vec<_>>();

        debug!(top_k, returned = hits.len(), scanned = self.len(), "flat search done");
        Ok(hits)
    }

    /// Drop every vector and record; the dimension is kept.
    pub fn clear(&mut self) {
        let removed = self.len();
        self.vectors.clear();
        self.documents.clear();
        info!(removed, "cleared index");
    }

    pub fn stats(&self) -> IndexStats {
        let mut files = BTreeSet::new();
        let mut types: BTreeMap<String, usize> = BTreeMap::new();
        for rec in self.documents.iter() {
            files.insert(rec.file.as_str());
            *types.entry(rec.kind.clone()).or_default() += 1;
        }

        IndexStats {
            total_documents: self.len(),
            total_files: files.len(),
            files: files.into_iter().map(str::to_owned).collect(),
            types,
            dimension: self.dimension(),
        }
    }
}
