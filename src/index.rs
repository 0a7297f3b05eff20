//! The flat index module
//! Exact k-nearest-neighbour search by squared L2 distance over a contiguous vector array

use crate::error::StoreError;
use crate::vector::squared_l2;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlatIndex {
    dimension: usize,
    vectors: Vec<f32>,
}

impl FlatIndex {
    /// Creates an empty index whose vectors must all have `dimension` components.
    ///
    /// # Examples
    ///
    /// ```
    /// use prodrag::FlatIndex;
    ///
    /// let index = FlatIndex::new(3);
    /// assert_eq!(index.count(), 0);
    /// assert_eq!(index.dimension(), 3);
    /// ```
    pub fn new(dimension: usize) -> FlatIndex {
        FlatIndex { dimension, vectors: Vec::new() }
    }

    /// Appends vectors in order, each one taking the next position.
    ///
    /// The whole batch is checked before anything is stored, so a
    /// `DimensionMismatch` leaves the index unchanged.
    ///
    /// # Examples
    ///
    /// ```
    /// use prodrag::FlatIndex;
    ///
    /// let mut index = FlatIndex::new(2);
    /// index.append(&[vec![1.0, 0.0], vec![0.0, 1.0]]).unwrap();
    /// assert_eq!(index.count(), 2);
    ///
    /// // Wrong dimension is rejected
    /// assert!(index.append(&[vec![1.0, 2.0, 3.0]]).is_err());
    /// assert_eq!(index.count(), 2);
    /// ```
    pub fn append(&mut self, vectors: &[Vec<f32>]) -> Result<(), StoreError> {
        if let Some(bad) = vectors.iter().find(|v| v.len() != self.dimension) {
            return Err(StoreError::DimensionMismatch {
                expected: self.dimension,
                actual: bad.len(),
            });
        }
        if let Some(position) = vectors.iter().position(|v| v.iter().any(|x| !x.is_finite())) {
            return Err(StoreError::NonFinite(format!("vector {} of the batch", position)));
        }

        self.vectors.reserve(vectors.len() * self.dimension);
        for vector in vectors {
            self.vectors.extend_from_slice(vector);
        }

        Ok(())
    }

    /// Returns up to `k` `(position, distance)` pairs, nearest first.
    ///
    /// Distances are squared L2. Equal distances keep insertion order. An
    /// empty index yields an empty result.
    ///
    /// # Examples
    ///
    /// ```
    /// use prodrag::FlatIndex;
    ///
    /// let mut index = FlatIndex::new(2);
    /// index.append(&[vec![0.0, 0.0], vec![3.0, 4.0]]).unwrap();
    ///
    /// let hits = index.search(&[3.0, 4.0], 5).unwrap();
    /// assert_eq!(hits.len(), 2);
    /// assert_eq!(hits[0], (1, 0.0));
    /// assert_eq!(hits[1], (0, 25.0));
    /// ```
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<(usize, f32)>, StoreError> {
        if query.len() != self.dimension {
            return Err(StoreError::DimensionMismatch {
                expected: self.dimension,
                actual: query.len(),
            });
        }
        if query.iter().any(|x| !x.is_finite()) {
            return Err(StoreError::NonFinite("query vector".to_string()));
        }

        let count = self.count();
        let limit = k.min(count);
        if limit == 0 {
            return Ok(Vec::new());
        }

        // Kept sorted ascending; inserting after every equal distance preserves
        // insertion order among ties.
        let mut best: Vec<(usize, f32)> = Vec::with_capacity(limit + 1);
        for position in 0..count {
            let dist = squared_l2(self.row(position), query)?;
            // Finite inputs can still overflow f32
            if !dist.is_finite() {
                return Err(StoreError::NonFinite(format!("distance to position {}", position)));
            }
            if best.len() == limit {
                if let Some(&(_, worst)) = best.last() {
                    if dist.total_cmp(&worst) != Ordering::Less {
                        continue;
                    }
                }
            }
            let at = best.partition_point(|&(_, d)| d.total_cmp(&dist) != Ordering::Greater);
            best.insert(at, (position, dist));
            best.truncate(limit);
        }

        Ok(best)
    }

    /// Returns the stored vector at `position`.
    pub fn vector(&self, position: usize) -> Result<&[f32], StoreError> {
        let count = self.count();
        if position >= count {
            return Err(StoreError::OutOfRange { position, count });
        }
        Ok(self.row(position))
    }

    /// Discards every vector. Calling it on an empty index is a no-op.
    pub fn clear(&mut self) {
        self.vectors.clear();
    }

    /// Returns the number of vectors in the index.
    pub fn count(&self) -> usize {
        if self.dimension == 0 {
            return 0;
        }
        self.vectors.len() / self.dimension
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Whether the storage holds whole rows of finite values only.
    ///
    /// Always true for an index built through [`append`](Self::append); a
    /// deserialized one may be ragged or carry NaN.
    pub fn is_well_formed(&self) -> bool {
        let whole_rows = match self.dimension {
            0 => self.vectors.is_empty(),
            d => self.vectors.len() % d == 0,
        };
        whole_rows && self.vectors.iter().all(|x| x.is_finite())
    }

    /// Slices one row out of the flat array.
    ///
    /// The vectors are stored contiguously as: `[v1_d1, v1_d2, ..., v2_d1, v2_d2, ...]`
    ///
    /// # Panics
    ///
    /// Panics if the position is out of bounds.
    fn row(&self, position: usize) -> &[f32] {
        let start = position * self.dimension;
        &self.vectors[start..start + self.dimension]
    }
}

#[cfg(test)]
mod index_test {
    use super::*;

    fn unit_rows() -> FlatIndex {
        let mut index = FlatIndex::new(3);
        index
            .append(&[
                vec![1.0, 0.0, 0.0],
                vec![0.0, 1.0, 0.0],
                vec![0.0, 0.0, 1.0],
            ])
            .unwrap();
        index
    }

    #[test]
    fn test_append_assigns_sequential_positions() {
        let index = unit_rows();

        assert_eq!(index.count(), 3);
        assert_eq!(index.vectors.len(), 9); // 3 vectors × 3 dimensions
        assert_eq!(index.vector(1).unwrap(), &[0.0, 1.0, 0.0]);
    }

    #[test]
    fn test_append_dimension_mismatch_is_all_or_nothing() {
        let mut index = unit_rows();

        let result = index.append(&[vec![1.0, 1.0, 1.0], vec![1.0, 2.0]]);
        match result {
            Err(StoreError::DimensionMismatch { expected, actual }) => {
                assert_eq!(expected, 3);
                assert_eq!(actual, 2);
            }
            other => panic!("Expected dimension mismatch, got {:?}", other),
        }
        // The valid first vector must not have been stored either
        assert_eq!(index.count(), 3);
    }

    #[test]
    fn test_append_empty_batch() {
        let mut index = unit_rows();
        index.append(&[]).unwrap();
        assert_eq!(index.count(), 3);
    }

    #[test]
    fn test_search_orders_by_distance() {
        let mut index = FlatIndex::new(2);
        index
            .append(&[vec![5.0, 5.0], vec![1.0, 1.0], vec![2.0, 2.0]])
            .unwrap();

        let hits = index.search(&[0.0, 0.0], 3).unwrap();
        let positions: Vec<usize> = hits.iter().map(|h| h.0).collect();

        assert_eq!(positions, vec![1, 2, 0]);
        assert!((hits[0].1 - 2.0).abs() < 1e-6);
        assert!((hits[1].1 - 8.0).abs() < 1e-6);
        assert!((hits[2].1 - 50.0).abs() < 1e-6);
    }

    #[test]
    fn test_search_returns_top_k() {
        let index = unit_rows();

        let hits = index.search(&[1.0, 0.0, 0.0], 2).unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0], (0, 0.0));
    }

    #[test]
    fn test_search_k_larger_than_count() {
        let index = unit_rows();

        let hits = index.search(&[1.0, 0.0, 0.0], 10).unwrap();
        assert_eq!(hits.len(), 3);
    }

    #[test]
    fn test_search_ties_keep_insertion_order() {
        let mut index = FlatIndex::new(2);
        index
            .append(&[
                vec![1.0, 0.0],
                vec![0.0, 1.0],
                vec![-1.0, 0.0],
                vec![0.0, -1.0],
            ])
            .unwrap();

        // All four are at distance 1 from the origin
        let hits = index.search(&[0.0, 0.0], 4).unwrap();
        let positions: Vec<usize> = hits.iter().map(|h| h.0).collect();
        assert_eq!(positions, vec![0, 1, 2, 3]);

        let hits = index.search(&[0.0, 0.0], 2).unwrap();
        let positions: Vec<usize> = hits.iter().map(|h| h.0).collect();
        assert_eq!(positions, vec![0, 1]);
    }

    #[test]
    fn test_search_empty_index() {
        let index = FlatIndex::new(3);

        let hits = index.search(&[1.0, 2.0, 3.0], 5).unwrap();
        assert!(hits.is_empty());
    }

    #[test]
    fn test_search_zero_k() {
        let index = unit_rows();
        assert!(index.search(&[1.0, 0.0, 0.0], 0).unwrap().is_empty());
    }

    #[test]
    fn test_search_dimension_mismatch() {
        let index = unit_rows();

        let result = index.search(&[1.0, 2.0], 1);
        assert!(matches!(result, Err(StoreError::DimensionMismatch { .. })));
    }

    #[test]
    fn test_append_rejects_non_finite() {
        let mut index = unit_rows();

        let result = index.append(&[vec![0.0, 0.0, 0.0], vec![f32::NAN, 0.0, 0.0]]);
        assert!(matches!(result, Err(StoreError::NonFinite(_))));
        let result = index.append(&[vec![f32::INFINITY, 0.0, 0.0]]);
        assert!(matches!(result, Err(StoreError::NonFinite(_))));
        assert_eq!(index.count(), 3);
    }

    #[test]
    fn test_search_rejects_non_finite_query() {
        let index = unit_rows();

        let result = index.search(&[f32::NAN, 0.0, 0.0], 1);
        assert!(matches!(result, Err(StoreError::NonFinite(_))));
    }

    #[test]
    fn test_search_rejects_overflowing_distance() {
        let mut index = FlatIndex::new(2);
        index.append(&[vec![f32::MAX, 0.0]]).unwrap();

        // (MAX - (-MAX))^2 overflows to infinity
        let result = index.search(&[-f32::MAX, 0.0], 1);
        assert!(matches!(result, Err(StoreError::NonFinite(_))));
    }

    #[test]
    fn test_well_formed() {
        assert!(unit_rows().is_well_formed());
        assert!(FlatIndex::new(4).is_well_formed());

        // Same layout as a serialized FlatIndex: dimension, then the flat array
        let ragged: FlatIndex = bincode::deserialize(&bincode::serialize(&(2usize, vec![1.0f32, 1.0, 9.0])).unwrap()).unwrap();
        assert_eq!(ragged.count(), 1);
        assert!(!ragged.is_well_formed());

        let nan: FlatIndex = bincode::deserialize(&bincode::serialize(&(2usize, vec![1.0f32, f32::NAN])).unwrap()).unwrap();
        assert!(!nan.is_well_formed());
    }

    #[test]
    fn test_vector_out_of_range() {
        let index = unit_rows();

        match index.vector(3) {
            Err(StoreError::OutOfRange { position, count }) => {
                assert_eq!(position, 3);
                assert_eq!(count, 3);
            }
            other => panic!("Expected out of range, got {:?}", other),
        }
    }

    #[test]
    fn test_clear_is_idempotent() {
        let mut index = unit_rows();

        index.clear();
        assert_eq!(index.count(), 0);
        index.clear();
        assert_eq!(index.count(), 0);
        assert_eq!(index.dimension(), 3);

        // Positions restart from zero after a clear
        index.append(&[vec![0.5, 0.5, 0.5]]).unwrap();
        assert_eq!(index.search(&[0.5, 0.5, 0.5], 1).unwrap(), vec![(0, 0.0)]);
    }
}
