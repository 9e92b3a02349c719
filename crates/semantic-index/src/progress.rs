//! Durable list of source files already embedded, used to resume indexing runs.
//!
//! On disk this is `{"indexed_files": ["a.md", "docs/b.txt", ...]}`; other tools
//! read the file, so the field name and shape stay fixed.

use std::collections::HashSet;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::error::IndexError;
use crate::persist::write_atomic;

#[derive(Debug, Serialize, Deserialize)]
struct LedgerFile {
    indexed_files: Vec<String>,
}

#[derive(Serialize)]
struct LedgerFileRef<'a> {
    indexed_files: &'a [String],
}

fn write_ledger(files: &[String], path: &Path) -> Result<(), IndexError> {
    let bytes = serde_json::to_vec_pretty(&LedgerFileRef {
        indexed_files: files,
    })
    .map_err(|e| IndexError::Serialization(e.to_string()))?;
    write_atomic(path, &bytes)
}

fn read_ledger(path: &Path) -> Result<Vec<String>, IndexError> {
    let raw = match fs::read(path) {
        Ok(b) => b,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(IndexError::io(path, e)),
    };
    let parsed: LedgerFile = serde_json::from_slice(&raw)
        .map_err(|e| IndexError::Corruption(format!("{}: {e}", path.display())))?;
    Ok(parsed.indexed_files)
}

/// Overwrite the ledger at `path` with `files`, keeping their order.
pub fn save(files: &[String], path: &Path) -> Result<(), IndexError> {
    match write_ledger(files, path) {
        Ok(()) => {
            info!(path = %path.display(), files = files.len(), "saved progress ledger");
            Ok(())
        }
        Err(e) => {
            error!(path = %path.display(), error = %e, "failed to save progress ledger");
            Err(e)
        }
    }
}

/// Read the ledger at `path`; an absent file is an empty list.
///
/// Entries come back exactly as stored, duplicates included.
pub fn load(path: &Path) -> Result<Vec<String>, IndexError> {
    read_ledger(path).inspect_err(|e| {
        error!(path = %path.display(), error = %e, "failed to load progress ledger");
    })
}

/// Delete the ledger file; absence is not an error.
pub fn clear(path: &Path) -> Result<(), IndexError> {
    match fs::remove_file(path) {
        Ok(()) => {
            info!(path = %path.display(), "cleared progress ledger");
            Ok(())
        }
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => {
            error!(path = %path.display(), error = %e, "failed to clear progress ledger");
            Err(IndexError::io(path, e))
        }
    }
}

/// In-memory ledger bound to a file, with O(1) membership checks.
#[derive(Debug, Clone)]
pub struct ProgressLedger {
    path: PathBuf,
    files: Vec<String>,
    seen: HashSet<String>,
}

impl ProgressLedger {
    /// An empty ledger that will persist to `path`; nothing is read.
    pub fn empty(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            files: Vec::new(),
            seen: HashSet::new(),
        }
    }

    /// Load the ledger stored at `path` (empty when the file is absent).
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, IndexError> {
        let path = path.into();
        let files = load(&path)?;
        let seen = files.iter().cloned().collect();
        Ok(Self { path, files, seen })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn contains(&self, id: &str) -> bool {
        self.seen.contains(id)
    }

    /// Mark `id` as processed; returns `false` if it was already recorded.
    pub fn record(&mut self, id: impl Into<String>) -> bool {
        let id = id.into();
        if self.seen.insert(id.clone()) {
            self.files.push(id);
            true
        } else {
            false
        }
    }

    pub fn entries(&self) -> &[String] {
        &self.files
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Write the current entries to the bound file.
    pub fn flush(&self) -> Result<(), IndexError> {
        save(&self.files, &self.path)
    }

    /// Forget every entry and delete the bound file.
    pub fn reset(&mut self) -> Result<(), IndexError> {
        self.files.clear();
        self.seen.clear();
        clear(&self.path)
    }
}
