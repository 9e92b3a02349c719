//! Snapshot persistence for [`FlatIndex`].
//!
//! A snapshot is two files sharing a base path:
//!
//! - `<path>`: vectors, encoded by `core_serialization` (exact `f32`, CRC32 footer)
//! - `<path>.docs`: JSON `{vectors_sha256, count, records}`, so unknown record
//!   fields survive and the records know which vector file they belong to
//!
//! Both files are first written to `<name>.tmp`; only when both are on disk
//! are they renamed into place, records first. A crash between the two renames
//! leaves records whose digest does not match the vector file, and
//! [`load_index`] reports corruption instead of returning a misaligned index.

use std::ffi::OsString;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use core_serialization::{decode_vectors, encode_vectors};
use core_types::DocumentRecord;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{error, info};

use crate::buffer::VectorBuffer;
use crate::error::IndexError;
use crate::flat::FlatIndex;
use crate::store::DocumentStore;

pub const DOCS_SUFFIX: &str = ".docs";
const TMP_SUFFIX: &str = ".tmp";

#[derive(Serialize)]
struct RecordsOut<'a> {
    vectors_sha256: String,
    count: usize,
    records: &'a [DocumentRecord],
}

#[derive(Deserialize)]
struct RecordsIn {
    vectors_sha256: String,
    count: usize,
    records: Vec<DocumentRecord>,
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut s = OsString::from(path.as_os_str());
    s.push(suffix);
    PathBuf::from(s)
}

fn digest_hex(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

/// Location of the records artifact for the snapshot at `path`.
pub fn docs_path(path: &Path) -> PathBuf {
    with_suffix(path, DOCS_SUFFIX)
}

/// Write `bytes` to the temp sibling of `path`; returns the temp path.
fn stage(path: &Path, bytes: &[u8]) -> Result<PathBuf, IndexError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| IndexError::io(parent, e))?;
    }
    let tmp = with_suffix(path, TMP_SUFFIX);
    fs::write(&tmp, bytes).map_err(|e| IndexError::io(&tmp, e))?;
    Ok(tmp)
}

fn commit(tmp: &Path, path: &Path) -> Result<(), IndexError> {
    fs::rename(tmp, path).map_err(|e| {
        let _ = fs::remove_file(tmp);
        IndexError::io(path, e)
    })
}

/// Write `bytes` to `path` via a sibling temp file and a rename.
pub(crate) fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), IndexError> {
    let tmp = stage(path, bytes)?;
    commit(&tmp, path)
}

fn write_snapshot(index: &FlatIndex, path: &Path) -> Result<(), IndexError> {
    let vectors = encode_vectors(index.dimension(), index.vectors().as_slice())
        .map_err(|e| IndexError::Serialization(e.to_string()))?;
    let records = serde_json::to_vec(&RecordsOut {
        vectors_sha256: digest_hex(&vectors),
        count: index.len(),
        records: index.documents().as_slice(),
    })
    .map_err(|e| IndexError::Serialization(e.to_string()))?;

    let docs = docs_path(path);
    let docs_tmp = stage(&docs, &records)?;
    let vectors_tmp = match stage(path, &vectors) {
        Ok(tmp) => tmp,
        Err(e) => {
            let _ = fs::remove_file(&docs_tmp);
            return Err(e);
        }
    };
    if let Err(e) = commit(&docs_tmp, &docs) {
        let _ = fs::remove_file(&vectors_tmp);
        return Err(e);
    }
    commit(&vectors_tmp, path)
}

/// Persist `index` at `path` (plus `<path>.docs`).
///
/// Failures are logged here and returned. A failure while writing either
/// temp file leaves the previous snapshot untouched.
pub fn save_index(index: &FlatIndex, path: &Path) -> Result<(), IndexError> {
    match write_snapshot(index, path) {
        Ok(()) => {
            info!(
                path = %path.display(),
                documents = index.len(),
                dimension = index.dimension(),
                "saved index snapshot"
            );
            Ok(())
        }
        Err(e) => {
            error!(path = %path.display(), error = %e, "failed to save index snapshot");
            Err(e)
        }
    }
}

fn read_snapshot(path: &Path) -> Result<Option<FlatIndex>, IndexError> {
    let raw = match fs::read(path) {
        Ok(b) => b,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(IndexError::io(path, e)),
    };
    let decoded = decode_vectors(&raw)
        .map_err(|e| IndexError::Corruption(format!("{}: {e}", path.display())))?;

    let docs = docs_path(path);
    let docs_raw = match fs::read(&docs) {
        Ok(b) => b,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Err(IndexError::Corruption(format!(
                "records file {} is missing",
                docs.display()
            )));
        }
        Err(e) => return Err(IndexError::io(&docs, e)),
    };
    let stored: RecordsIn = serde_json::from_slice(&docs_raw)
        .map_err(|e| IndexError::Corruption(format!("{}: {e}", docs.display())))?;
    if stored.vectors_sha256 != digest_hex(&raw) {
        return Err(IndexError::Corruption(format!(
            "{} was written for a different vector file",
            docs.display()
        )));
    }
    if stored.count != stored.records.len() {
        return Err(IndexError::Corruption(format!(
            "{} declares {} records but holds {}",
            docs.display(),
            stored.count,
            stored.records.len()
        )));
    }

    let vectors = VectorBuffer::from_raw(decoded.dimension, decoded.data)?;
    FlatIndex::from_parts(vectors, DocumentStore::from_records(stored.records)).map(Some)
}

/// Load the snapshot at `path`.
///
/// `Ok(None)` when no snapshot exists. A snapshot that exists but cannot be
/// decoded, or whose vector and record counts differ, is `Corruption`; other
/// read failures are `Io`.
pub fn load_index(path: &Path) -> Result<Option<FlatIndex>, IndexError> {
    match read_snapshot(path) {
        Ok(Some(index)) => {
            info!(
                path = %path.display(),
                documents = index.len(),
                dimension = index.dimension(),
                "loaded index snapshot"
            );
            Ok(Some(index))
        }
        Ok(None) => {
            info!(path = %path.display(), "no index snapshot found");
            Ok(None)
        }
        Err(e) => {
            error!(path = %path.display(), error = %e, "failed to load index snapshot");
            Err(e)
        }
    }
}

/// Delete both snapshot files; missing files are fine.
pub fn remove_index(path: &Path) -> Result<(), IndexError> {
    for p in [path.to_path_buf(), docs_path(path)] {
        match fs::remove_file(&p) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => {
                error!(path = %p.display(), error = %e, "failed to remove index snapshot");
                return Err(IndexError::io(p, e));
            }
        }
    }
    info!(path = %path.display(), "removed index snapshot");
    Ok(())
}
