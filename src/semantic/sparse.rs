//! Sparse compression of dense embeddings.
//!
//! Keeps the highest-magnitude components above a threshold, capped at a
//! fixed count. The stored magnitude is the L2 norm of the *full* dense
//! vector so similarity computed from the sparse form stays normalized
//! against the original.

use serde::{Deserialize, Serialize};

use crate::semantic::similarity::l2_norm;

/// Components with an absolute value at or below this are dropped.
pub const SPARSITY_THRESHOLD: f32 = 1e-3;

/// Upper bound on retained components.
pub const MAX_DIMENSIONS: usize = 100;

/// Sparse form of a dense embedding.
///
/// `indices` and `values` are parallel and always the same length.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SparseEmbedding {
    indices: Vec<usize>,
    values: Vec<f32>,
    dimension: usize,
    magnitude: f32,
}

impl SparseEmbedding {
    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }

    /// Length of the dense vector this was encoded from.
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// L2 norm of the original dense vector.
    pub fn magnitude(&self) -> f32 {
        self.magnitude
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Iterate `(index, value)` pairs in stored order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, f32)> + '_ {
        self.indices.iter().copied().zip(self.values.iter().copied())
    }

    /// Copy with pairs reordered by ascending index, values moved in lockstep.
    pub fn sorted_by_index(&self) -> SparseEmbedding {
        let mut pairs: Vec<(usize, f32)> = self.iter().collect();
        pairs.sort_by_key(|(index, _)| *index);

        let (indices, values) = pairs.into_iter().unzip();
        SparseEmbedding {
            indices,
            values,
            dimension: self.dimension,
            magnitude: self.magnitude,
        }
    }

    /// Scatter retained components back into a zero-filled dense vector.
    pub fn to_dense(&self) -> Vec<f32> {
        let mut dense = vec![0.0; self.dimension];
        for (index, value) in self.iter() {
            if let Some(slot) = dense.get_mut(index) {
                *slot = value;
            }
        }
        dense
    }
}

/// Dense to sparse encoder.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SparseEncoder {
    threshold: f32,
    max_dimensions: usize,
}

impl SparseEncoder {
    pub fn new(threshold: f32, max_dimensions: usize) -> Self {
        Self {
            threshold,
            max_dimensions,
        }
    }

    /// Encode `dense`, keeping at most `max_dimensions` components ordered by
    /// descending magnitude. Ties keep their original relative order.
    pub fn encode(&self, dense: &[f32]) -> SparseEmbedding {
        let magnitude = l2_norm(dense);

        let mut retained: Vec<(usize, f32)> = dense
            .iter()
            .copied()
            .enumerate()
            .filter(|(_, value)| value.abs() > self.threshold)
            .collect();

        retained.sort_by(|(_, a), (_, b)| b.abs().total_cmp(&a.abs()));
        retained.truncate(self.max_dimensions);

        let (indices, values) = retained.into_iter().unzip();

        SparseEmbedding {
            indices,
            values,
            dimension: dense.len(),
            magnitude,
        }
    }
}

impl Default for SparseEncoder {
    fn default() -> Self {
        Self::new(SPARSITY_THRESHOLD, MAX_DIMENSIONS)
    }
}

/// Encode with the default threshold and dimension cap.
pub fn create_sparse_embedding(dense: &[f32]) -> SparseEmbedding {
    SparseEncoder::default().encode(dense)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(len: usize) -> Vec<f32> {
        // distinct magnitudes, alternating sign
        (0..len)
            .map(|i| {
                let v = (i + 1) as f32 / len as f32;
                if i % 2 == 0 { v } else { -v }
            })
            .collect()
    }

    #[test]
    fn test_never_exceeds_max_dimensions() {
        let dense = ramp(384);
        let sparse = create_sparse_embedding(&dense);

        assert_eq!(sparse.len(), MAX_DIMENSIONS);
        assert_eq!(sparse.indices().len(), sparse.values().len());
        assert_eq!(sparse.dimension(), 384);
    }

    #[test]
    fn test_magnitude_is_full_vector_norm() {
        let dense = ramp(384);
        let expected = dense.iter().map(|v| v * v).sum::<f32>().sqrt();

        let sparse = create_sparse_embedding(&dense);
        assert!((sparse.magnitude() - expected).abs() < 1e-5);

        // a tighter cap truncates more but reports the same magnitude
        let tiny = SparseEncoder::new(SPARSITY_THRESHOLD, 3).encode(&dense);
        assert_eq!(tiny.len(), 3);
        assert!((tiny.magnitude() - expected).abs() < 1e-5);
    }

    #[test]
    fn test_keeps_largest_magnitudes_with_sign() {
        let dense = vec![0.1, -0.9, 0.5, 0.0005, -0.3];
        let sparse = SparseEncoder::new(SPARSITY_THRESHOLD, 3).encode(&dense);

        assert_eq!(sparse.indices(), &[1, 2, 4]);
        assert_eq!(sparse.values(), &[-0.9, 0.5, -0.3]);
    }

    #[test]
    fn test_threshold_is_exclusive() {
        let dense = vec![SPARSITY_THRESHOLD, -SPARSITY_THRESHOLD, 0.002, 0.0];
        let sparse = create_sparse_embedding(&dense);

        assert_eq!(sparse.indices(), &[2]);
        for value in sparse.values() {
            assert!(value.abs() > SPARSITY_THRESHOLD);
        }
    }

    #[test]
    fn test_ties_keep_original_order() {
        let dense = vec![0.5, -0.5, 0.5];
        let sparse = create_sparse_embedding(&dense);
        assert_eq!(sparse.indices(), &[0, 1, 2]);
    }

    #[test]
    fn test_empty_and_zero_vectors() {
        let empty = create_sparse_embedding(&[]);
        assert!(empty.is_empty());
        assert_eq!(empty.dimension(), 0);
        assert_eq!(empty.magnitude(), 0.0);

        let zeros = create_sparse_embedding(&[0.0; 8]);
        assert!(zeros.is_empty());
        assert_eq!(zeros.dimension(), 8);
    }

    #[test]
    fn test_sorted_by_index_moves_values_in_lockstep() {
        let dense = vec![0.1, 0.9, 0.5];
        let sparse = create_sparse_embedding(&dense);
        assert_eq!(sparse.indices(), &[1, 2, 0]);

        let sorted = sparse.sorted_by_index();
        assert_eq!(sorted.indices(), &[0, 1, 2]);
        assert_eq!(sorted.values(), &[0.1, 0.9, 0.5]);
        assert_eq!(sorted.magnitude(), sparse.magnitude());
    }

    #[test]
    fn test_to_dense_restores_retained_components() {
        let dense = vec![0.0, 0.4, -0.7, 0.0005];
        let restored = create_sparse_embedding(&dense).to_dense();
        assert_eq!(restored, vec![0.0, 0.4, -0.7, 0.0]);
    }
}
