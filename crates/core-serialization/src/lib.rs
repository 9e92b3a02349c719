//! Binary encoding of the vector half of an index snapshot.
//!
//! # Layout
//!
//! ```text
//! Offset   Size    Description
//! ───────────────────────────────────────────────
//! 0x00     8       Magic: "DXVEC001"
//! 0x08     n       bincode payload { dimension: u32, count: u64, data: [f32] }
//! 8+n      4       CRC32 (BE) over the payload bytes
//! ```
//!
//! `f32` values are written bit-for-bit, so a decode reproduces the exact
//! floats that were encoded.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Magic bytes identifying a vector snapshot.
pub const MAGIC: [u8; 8] = *b"DXVEC001";

const CRC_LEN: usize = 4;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("invalid magic bytes: expected DXVEC001")]
    InvalidMagic,

    #[error("snapshot truncated: {0} bytes is too small")]
    Truncated(usize),

    #[error("checksum mismatch: stored {stored:#010x}, computed {computed:#010x}")]
    ChecksumMismatch { stored: u32, computed: u32 },

    #[error("shape mismatch: {count} vectors x {dimension} dims != {len} floats")]
    ShapeMismatch {
        count: u64,
        dimension: u32,
        len: usize,
    },

    #[error("dimension {0} does not fit the snapshot header")]
    DimensionTooLarge(usize),

    #[error("bincode error: {0}")]
    Bincode(#[from] bincode::Error),
}

#[derive(Serialize)]
struct PayloadRef<'a> {
    dimension: u32,
    count: u64,
    data: &'a [f32],
}

#[derive(Deserialize)]
struct Payload {
    dimension: u32,
    count: u64,
    data: Vec<f32>,
}

/// Vectors recovered from a snapshot, row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedVectors {
    pub dimension: usize,
    pub count: usize,
    pub data: Vec<f32>,
}

/// Encode `data` (row-major, `dimension` floats per row) into snapshot bytes.
pub fn encode_vectors(dimension: usize, data: &[f32]) -> Result<Vec<u8>, CodecError> {
    let dim = u32::try_from(dimension).map_err(|_| CodecError::DimensionTooLarge(dimension))?;
    if dimension == 0 || data.len() % dimension != 0 {
        return Err(CodecError::ShapeMismatch {
            count: 0,
            dimension: dim,
            len: data.len(),
        });
    }
    let payload = bincode::serialize(&PayloadRef {
        dimension: dim,
        count: (data.len() / dimension) as u64,
        data,
    })?;
    let crc = crc32fast::hash(&payload);

    let mut out = Vec::with_capacity(MAGIC.len() + payload.len() + CRC_LEN);
    out.extend_from_slice(&MAGIC);
    out.extend_from_slice(&payload);
    out.extend_from_slice(&crc.to_be_bytes());
    Ok(out)
}

/// Decode snapshot bytes, verifying magic, checksum and shape.
pub fn decode_vectors(bytes: &[u8]) -> Result<DecodedVectors, CodecError> {
    if bytes.len() < MAGIC.len() + CRC_LEN {
        return Err(CodecError::Truncated(bytes.len()));
    }
    if bytes[..MAGIC.len()] != MAGIC {
        return Err(CodecError::InvalidMagic);
    }

    let (body, footer) = bytes.split_at(bytes.len() - CRC_LEN);
    let payload = &body[MAGIC.len()..];
    let stored = u32::from_be_bytes([footer[0], footer[1], footer[2], footer[3]]);
    let computed = crc32fast::hash(payload);
    if stored != computed {
        return Err(CodecError::ChecksumMismatch { stored, computed });
    }

    let Payload {
        dimension,
        count,
        data,
    } = bincode::deserialize(payload)?;

    let expected = usize::try_from(count)
        .ok()
        .and_then(|c| c.checked_mul(dimension as usize));
    if dimension == 0 || expected != Some(data.len()) {
        return Err(CodecError::ShapeMismatch {
            count,
            dimension,
            len: data.len(),
        });
    }

    Ok(DecodedVectors {
        dimension: dimension as usize,
        count: data.len() / dimension as usize,
        data,
    })
}
