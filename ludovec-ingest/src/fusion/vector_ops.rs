//! Vector math for embedding fusion and similarity
//!
//! The fusion algorithm is uniform across the pipeline: per-dimension
//! weighted arithmetic mean with weights renormalized to sum to 1 over
//! whichever inputs survived, then L2 normalization.

/// Fuse vectors by weighted arithmetic mean.
///
/// Weights are renormalized over the provided inputs, so the result is
/// invariant under scaling all weights by the same positive factor. Inputs
/// shorter than the longest vector contribute zeros in the missing
/// dimensions. Returns `None` when there are no inputs, no positive
/// weights, or a length mismatch between the slices.
pub fn weighted_mean(vectors: &[Vec<f32>], weights: &[f32]) -> Option<Vec<f32>> {
    if vectors.is_empty() || vectors.len() != weights.len() {
        return None;
    }

    let total: f32 = weights.iter().filter(|w| **w > 0.0).sum();
    if total <= 0.0 {
        return None;
    }

    let dim = vectors.iter().map(|v| v.len()).max()?;
    let mut fused = vec![0.0f32; dim];

    for (vector, weight) in vectors.iter().zip(weights) {
        if *weight <= 0.0 {
            continue;
        }
        let w = weight / total;
        for (i, value) in vector.iter().enumerate() {
            fused[i] += w * value;
        }
    }

    Some(fused)
}

/// Scale a vector to unit L2 norm. A zero vector is returned unchanged.
pub fn l2_normalize(vector: &mut [f32]) {
    let norm = l2_norm(vector);
    if norm > f32::EPSILON {
        for value in vector.iter_mut() {
            *value /= norm;
        }
    }
}

/// L2 norm of a vector
pub fn l2_norm(vector: &[f32]) -> f32 {
    vector.iter().map(|v| v * v).sum::<f32>().sqrt()
}

/// Fit a vector to the target dimensionality.
///
/// Zero-pads when shorter, truncates when longer. Truncation is a lossy
/// fallback; providers with a native target-dimension parameter are asked
/// for the right size upstream so this becomes a no-op.
pub fn fit_dimension(mut vector: Vec<f32>, target_dim: usize) -> Vec<f32> {
    if vector.len() != target_dim {
        tracing::debug!(
            from = vector.len(),
            to = target_dim,
            "Fitting embedding dimensionality"
        );
        vector.resize(target_dim, 0.0);
    }
    vector
}

/// Cosine similarity between two vectors.
///
/// Returns 0.0 for mismatched lengths or zero-norm inputs.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm = l2_norm(a) * l2_norm(b);
    if norm <= f32::EPSILON {
        0.0
    } else {
        dot / norm
    }
}
