use sha2::{Digest, Sha256};

use super::{EmbedError, Embedder};

/// Deterministic bag-of-words embedder based on signed feature hashing.
///
/// Each lower-cased alphanumeric token is hashed with SHA-256; the first eight
/// bytes pick a bucket and the ninth picks the sign. The result is
/// L2-normalised, so texts sharing vocabulary land close together. Stable across
/// runs and platforms, which matters because vectors are persisted.
#[derive(Debug, Clone, Copy)]
pub struct HashingEmbedder {
    dimension: usize,
}

impl HashingEmbedder {
    pub fn new(dimension: usize) -> Result<Self, EmbedError> {
        if dimension == 0 {
            return Err(EmbedError::Backend(
                "hashing embedder needs a non-zero dimension".into(),
            ));
        }
        Ok(Self { dimension })
    }

    fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0.0_f32; self.dimension];
        let tokens = text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty());

        for token in tokens {
            let digest = Sha256::digest(token.to_lowercase().as_bytes());
            let mut head = [0u8; 8];
            head.copy_from_slice(&digest[..8]);
            let bucket = (u64::from_le_bytes(head) % self.dimension as u64) as usize;
            let sign = if digest[8] & 1 == 0 { 1.0 } else { -1.0 };
            v[bucket] += sign;
        }

        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for x in &mut v {
                *x /= norm;
            }
        }
        v
    }
}

impl Embedder for HashingEmbedder {
    fn dimension(&self) -> usize {
        self.dimension
    }

    fn embed(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbedError> {
        Ok(texts.iter().map(|t| self.embed_text(t)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::squared_l2;

    #[test]
    fn same_text_same_vector() {
        let e = HashingEmbedder::new(64).unwrap();
        let a = e.embed_one("Rust vector index").unwrap();
        let b = e.embed_one("rust VECTOR index").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn output_is_unit_length_or_zero() {
        let e = HashingEmbedder::new(32).unwrap();
        let out = e.embed(&["some words here", "", "?!"]).unwrap();
        let norm: f32 = out[0].iter().map(|x| x * x).sum();
        assert!((norm - 1.0).abs() < 1e-5);
        assert!(out[1].iter().all(|x| *x == 0.0));
        assert!(out[2].iter().all(|x| *x == 0.0));
    }

    #[test]
    fn shared_vocabulary_is_closer() {
        let e = HashingEmbedder::new(256).unwrap();
        let q = e.embed_one("flat index persistence").unwrap();
        let near = e.embed_one("persistence of the flat index").unwrap();
        let far = e.embed_one("banana smoothie recipe").unwrap();
        assert!(squared_l2(&q, &near) < squared_l2(&q, &far));
    }

    #[test]
    fn zero_dimension_rejected() {
        assert!(HashingEmbedder::new(0).is_err());
    }
}
