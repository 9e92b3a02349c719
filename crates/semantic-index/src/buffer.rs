//! Contiguous row-major storage for fixed-dimension `f32` vectors.

use crate::error::IndexError;

/// Squared Euclidean distance accumulated in `f64`.
///
/// Both slices must have the same length; callers check the dimension first.
#[inline]
pub fn squared_l2(a: &[f32], b: &[f32]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(&x, &y)| {
            let d = f64::from(x) - f64::from(y);
            d * d
        })
        .sum()
}

/// Append-only buffer of vectors sharing one dimension.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorBuffer {
    dimension: usize,
    data: Vec<f32>,
}

impl VectorBuffer {
    pub fn new(dimension: usize) -> Result<Self, IndexError> {
        if dimension == 0 {
            return Err(IndexError::InvalidArgument(
                "vector dimension must be greater than zero".into(),
            ));
        }
        Ok(Self {
            dimension,
            data: Vec::new(),
        })
    }

    /// Rebuild a buffer from row-major data, e.g. after decoding a snapshot.
    pub fn from_raw(dimension: usize, data: Vec<f32>) -> Result<Self, IndexError> {
        let mut buf = Self::new(dimension)?;
        if data.len() % dimension != 0 {
            return Err(IndexError::Corruption(format!(
                "{} floats do not divide into rows of {dimension}",
                data.len()
            )));
        }
        buf.data = data;
        Ok(buf)
    }

    pub const fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn len(&self) -> usize {
        self.data.len() / self.dimension
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn get(&self, position: usize) -> Option<&[f32]> {
        let start = position.checked_mul(self.dimension)?;
        let end = start.checked_add(self.dimension)?;
        self.data.get(start..end)
    }

    /// Raw row-major view of every stored float.
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    pub fn iter(&self) -> impl Iterator<Item = &[f32]> {
        self.data.chunks_exact(self.dimension)
    }

    pub fn check_dimension(&self, vector: &[f32]) -> Result<(), IndexError> {
        if vector.len() == self.dimension {
            Ok(())
        } else {
            Err(IndexError::DimensionMismatch {
                expected: self.dimension,
                actual: vector.len(),
            })
        }
    }

    /// Append vectors in order. The whole batch is rejected if any row has the
    /// wrong length; nothing is written in that case.
    pub(crate) fn append(&mut self, vectors: &[Vec<f32>]) -> Result<(), IndexError> {
        for v in vectors {
            self.check_dimension(v)?;
        }
        self.data.reserve(vectors.len() * self.dimension);
        for v in vectors {
            self.data.extend_from_slice(v);
        }
        Ok(())
    }

    /// Squared distance from `query` to every stored vector, in storage order.
    pub fn scan_l2(&self, query: &[f32]) -> Result<Vec<(f64, usize)>, IndexError> {
        self.check_dimension(query)?;
        Ok(self
            .iter()
            .enumerate()
            .map(|(position, row)| (squared_l2(query, row), position))
            .collect())
    }

    pub(crate) fn clear(&mut self) {
        self.data = Vec::new();
    }
}
