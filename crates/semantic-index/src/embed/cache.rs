use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use super::{EmbedError, Embedder};
use crate::persist::write_atomic;

const ENTRY_EXT: &str = "bin";

/// Disk-backed embedding cache in front of another embedder.
///
/// Entries are keyed by the SHA-256 of the text and stored as bincode `Vec<f32>`.
/// Cache misses are forwarded to the inner embedder in a single call. A broken
/// entry is logged and recomputed rather than failing the batch.
#[derive(Debug)]
pub struct CachedEmbedder<E> {
    inner: E,
    dir: PathBuf,
}

impl<E: Embedder> CachedEmbedder<E> {
    pub fn new(inner: E, dir: impl Into<PathBuf>) -> Result<Self, EmbedError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        info!(dir = %dir.display(), "embedding cache ready");
        Ok(Self { inner, dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub const fn inner(&self) -> &E {
        &self.inner
    }

    fn entry_path(&self, text: &str) -> PathBuf {
        let key = format!("{:x}", Sha256::digest(text.as_bytes()));
        self.dir.join(format!("{key}.{ENTRY_EXT}"))
    }

    fn read_entry(&self, text: &str) -> Option<Vec<f32>> {
        let path = self.entry_path(text);
        let bytes = match fs::read(&path) {
            Ok(b) => b,
            Err(e) if e.kind() == ErrorKind::NotFound => return None,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to read embedding cache entry");
                return None;
            }
        };
        match bincode::deserialize::<Vec<f32>>(&bytes) {
            Ok(v) if v.len() == self.inner.dimension() => Some(v),
            Ok(v) => {
                warn!(
                    path = %path.display(),
                    len = v.len(),
                    expected = self.inner.dimension(),
                    "cached embedding has wrong dimension; recomputing"
                );
                None
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "corrupt embedding cache entry; recomputing");
                None
            }
        }
    }

    fn write_entry(&self, text: &str, vector: &[f32]) {
        let path = self.entry_path(text);
        let result = bincode::serialize(vector)
            .map_err(|e| e.to_string())
            .and_then(|bytes| write_atomic(&path, &bytes).map_err(|e| e.to_string()));
        if let Err(error) = result {
            warn!(path = %path.display(), %error, "failed to store embedding cache entry");
        }
    }

    /// Remove every cache entry; returns how many were deleted.
    pub fn clear_cache(&self) -> Result<usize, EmbedError> {
        let mut removed = 0;
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) == Some(ENTRY_EXT) {
                fs::remove_file(&path)?;
                removed += 1;
            }
        }
        info!(removed, dir = %self.dir.display(), "cleared embedding cache");
        Ok(removed)
    }
}

impl<E: Embedder> Embedder for CachedEmbedder<E> {
    fn dimension(&self) -> usize {
        self.inner.dimension()
    }

    fn embed(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbedError> {
        let mut slots: Vec<Option<Vec<f32>>> = texts.iter().map(|t| self.read_entry(t)).collect();
        let misses: Vec<usize> = slots
            .iter()
            .enumerate()
            .filter_map(|(i, s)| s.is_none().then_some(i))
            .collect();

        debug!(
            hits = texts.len() - misses.len(),
            misses = misses.len(),
            "embedding cache lookup"
        );

        if !misses.is_empty() {
            let pending: Vec<&str> = misses.iter().map(|&i| texts[i]).collect();
            let fresh = self.inner.embed(&pending)?;
            if fresh.len() != pending.len() {
                return Err(EmbedError::CountMismatch {
                    expected: pending.len(),
                    actual: fresh.len(),
                });
            }
            for (&i, vector) in misses.iter().zip(fresh) {
                self.write_entry(texts[i], &vector);
                slots[i] = Some(vector);
            }
        }

        Ok(slots.into_iter().flatten().collect())
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;
    use crate::embed::HashingEmbedder;
    use tempfile::tempdir;

    /// Records every batch it is asked to embed.
    struct Recording {
        inner: HashingEmbedder,
        calls: RefCell<Vec<Vec<String>>>,
    }

    impl Embedder for Recording {
        fn dimension(&self) -> usize {
            self.inner.dimension()
        }

        fn embed(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbedError> {
            self.calls
                .borrow_mut()
                .push(texts.iter().map(|t| (*t).to_string()).collect());
            self.inner.embed(texts)
        }
    }

    fn recording() -> Recording {
        Recording {
            inner: HashingEmbedder::new(16).unwrap(),
            calls: RefCell::new(Vec::new()),
        }
    }

    #[test]
    fn only_misses_reach_inner_embedder() {
        let dir = tempdir().unwrap();
        let cached = CachedEmbedder::new(recording(), dir.path()).unwrap();

        let first = cached.embed(&["alpha", "beta"]).unwrap();
        let second = cached.embed(&["beta", "gamma", "alpha"]).unwrap();

        assert_eq!(second[0], first[1]);
        assert_eq!(second[2], first[0]);
        let calls = cached.inner().calls.borrow();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0], ["alpha", "beta"]);
        assert_eq!(calls[1], ["gamma"]);
    }

    #[test]
    fn corrupt_entry_is_recomputed() {
        let dir = tempdir().unwrap();
        let cached = CachedEmbedder::new(recording(), dir.path()).unwrap();
        let want = cached.embed_one("delta").unwrap();

        fs::write(cached.entry_path("delta"), b"garbage").unwrap();
        let got = cached.embed_one("delta").unwrap();
        assert_eq!(got, want);
        assert_eq!(cached.inner().calls.borrow().len(), 2);
    }

    #[test]
    fn entries_land_without_temp_leftovers() {
        let dir = tempdir().unwrap();
        let cached = CachedEmbedder::new(recording(), dir.path()).unwrap();
        cached.embed(&["one", "two"]).unwrap();

        let names: Vec<String> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names.len(), 2);
        assert!(names.iter().all(|n| n.ends_with(".bin")), "{names:?}");
    }

    #[test]
    fn clear_cache_counts_entries() {
        let dir = tempdir().unwrap();
        let cached = CachedEmbedder::new(recording(), dir.path()).unwrap();
        cached.embed(&["one", "two", "three"]).unwrap();
        fs::write(dir.path().join("notes.txt"), "keep me").unwrap();

        assert_eq!(cached.clear_cache().unwrap(), 3);
        assert!(dir.path().join("notes.txt").exists());
        cached.embed_one("one").unwrap();
        assert_eq!(cached.inner().calls.borrow().len(), 2);
    }
}
