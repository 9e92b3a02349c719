//! Exact semantic search over embedded document chunks.
//!
//! The index stores one vector and one [`DocumentRecord`] per chunk, answers
//! nearest-neighbour queries by brute-force squared L2 distance, and persists
//! as a two-file snapshot. The embedding model stays outside, behind the
//! [`Embedder`] trait.
//!
//! [`DocumentRecord`]: core_types::DocumentRecord

mod buffer;
pub mod embed;
mod error;
mod flat;
pub mod persist;
pub mod progress;
mod semantic;
mod store;

pub use buffer::{VectorBuffer, squared_l2};
pub use embed::{CachedEmbedder, EmbedError, Embedder, HashingEmbedder};
pub use error::IndexError;
pub use flat::{FlatIndex, IndexStats, distance_to_score};
pub use persist::{docs_path, load_index, remove_index, save_index};
pub use progress::ProgressLedger;
pub use semantic::SemanticIndex;
pub use store::DocumentStore;
