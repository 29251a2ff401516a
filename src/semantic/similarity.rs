//! Cosine similarity over dense and sparse embeddings.
//!
//! Both forms are clamped to `[0.0, 1.0]`. Mismatched dimensions are logged
//! and scored as 0 instead of aborting a ranking pass.

use crate::semantic::sparse::SparseEmbedding;

/// Errors from comparing two embeddings.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SimilarityError {
    #[error("Dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },
}

/// Compute L2 norm of a vector.
pub fn l2_norm(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum::<f32>().sqrt()
}

/// Scale `v` to unit length. Zero vectors are left untouched.
pub fn l2_normalize_in_place(v: &mut [f32]) {
    let norm = l2_norm(v);
    if norm < f32::EPSILON {
        return;
    }
    for x in v.iter_mut() {
        *x /= norm;
    }
}

fn clamp_unit(score: f32) -> f32 {
    if score.is_finite() {
        score.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// Dense cosine similarity, failing on mismatched lengths.
pub fn try_cosine_similarity(a: &[f32], b: &[f32]) -> Result<f32, SimilarityError> {
    if a.len() != b.len() {
        return Err(SimilarityError::DimensionMismatch {
            expected: a.len(),
            got: b.len(),
        });
    }

    let norm_a = l2_norm(a);
    let norm_b = l2_norm(b);
    if norm_a < f32::EPSILON || norm_b < f32::EPSILON {
        return Ok(0.0);
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    Ok(clamp_unit(dot_product / (norm_a * norm_b)))
}

/// Dense cosine similarity; a dimension mismatch scores 0.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    match try_cosine_similarity(a, b) {
        Ok(score) => score,
        Err(err) => {
            log::warn!("similarity=dense outcome=zero err={err}");
            0.0
        }
    }
}

/// Sparse cosine similarity via a merge walk over ascending indices.
///
/// The encoder stores components by descending magnitude, so both sides are
/// re-sorted by index before the walk. The dot product is divided by the
/// stored full-vector magnitudes.
pub fn sparse_cosine_similarity(a: &SparseEmbedding, b: &SparseEmbedding) -> f32 {
    if a.dimension() != b.dimension() {
        let err = SimilarityError::DimensionMismatch {
            expected: a.dimension(),
            got: b.dimension(),
        };
        log::warn!("similarity=sparse outcome=zero err={err}");
        return 0.0;
    }

    let denominator = a.magnitude() * b.magnitude();
    if denominator < f32::EPSILON {
        return 0.0;
    }

    let a = a.sorted_by_index();
    let b = b.sorted_by_index();
    let (ai, av) = (a.indices(), a.values());
    let (bi, bv) = (b.indices(), b.values());

    let mut dot_product = 0.0;
    let (mut i, mut j) = (0, 0);
    while i < ai.len() && j < bi.len() {
        match ai[i].cmp(&bi[j]) {
            std::cmp::Ordering::Equal => {
                dot_product += av[i] * bv[j];
                i += 1;
                j += 1;
            }
            std::cmp::Ordering::Less => i += 1,
            std::cmp::Ordering::Greater => j += 1,
        }
    }

    clamp_unit(dot_product / denominator)
}
