//! This is the vector math module
//! Provide squared L2 distance, in-place normalization and the distance to score mapping

use crate::error::StoreError;

/// Squared Euclidean distance
/// dist = sum((a[i] - b[i])^2) for i = 0..a.len()
/// Can only process vectors with same dimensions
pub fn squared_l2(left: &[f32], right: &[f32]) -> Result<f32, StoreError> {
    if left.len() != right.len() {
        return Err(StoreError::DimensionMismatch {
            expected: left.len(),
            actual: right.len(),
        });
    }

    let dist = left.iter()
        .zip(right.iter())
        .map(|(x, y)| {
            let d = x - y;
            d * d
        })
        .sum();

    Ok(dist)
}

/// L2 Normalization, in place
/// vec = vec / ||vec||
/// Returns false and leaves the vector untouched when its norm is zero
pub fn normalize(vector: &mut [f32]) -> bool {
    let norm = vector.iter()
        .map(|x| x * x)
        .sum::<f32>()
        .sqrt();

    if norm == 0.0 {
        return false;
    }

    for x in vector.iter_mut() {
        *x /= norm;
    }

    true
}

/// Maps a squared L2 distance onto (0, 1]
/// score = 1 / (1 + dist), so dist 0 gives exactly 1
pub fn similarity_from_distance(distance: f32) -> f32 {
    1.0 / (1.0 + distance.max(0.0))
}
