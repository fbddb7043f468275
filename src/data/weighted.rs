// ============================================================
// Layer 4 — Weighted Subset
// ============================================================
// Selects a subset of a dataset by index and attaches a
// per-sample weight to each selected item:
//
//   subset[i] = (dataset[indices[i]], weights[i])
//
// Used for sample-weighted training (coreset / importance
// weighting), where the loss becomes
//   sum(loss_i * w_i) / sum(w_i)

use std::marker::PhantomData;

use burn::data::dataset::Dataset;

use crate::data::error::{DataError, DataResult};

/// An item paired with its sample weight.
#[derive(Debug, Clone, PartialEq)]
pub struct Weighted<I> {
    pub item:   I,
    pub weight: f32,
}

/// A view of `dataset` restricted to `indices`, each carrying a weight.
pub struct WeightedSubset<D, I> {
    dataset: D,
    indices: Vec<usize>,
    weights: Vec<f32>,
    _item:   PhantomData<fn() -> I>,
}

impl<D, I> WeightedSubset<D, I>
where
    D: Dataset<I>,
{
    /// Fails when `indices` and `weights` differ in length or an index
    /// points past the end of `dataset`.
    pub fn new(dataset: D, indices: Vec<usize>, weights: Vec<f32>) -> DataResult<Self> {
        if indices.len() != weights.len() {
            return Err(DataError::WeightLengthMismatch {
                indices: indices.len(),
                weights: weights.len(),
            });
        }
        let len = dataset.len();
        if let Some(&index) = indices.iter().find(|&&i| i >= len) {
            return Err(DataError::IndexOutOfRange { index, len });
        }
        Ok(Self { dataset, indices, weights, _item: PhantomData })
    }

    /// Weighted view over the whole dataset, in order.
    pub fn full(dataset: D, weights: Vec<f32>) -> DataResult<Self> {
        let indices = (0..dataset.len()).collect();
        Self::new(dataset, indices, weights)
    }

    pub fn indices(&self) -> &[usize] { &self.indices }

    pub fn weights(&self) -> &[f32] { &self.weights }

    /// List indexing: the items at `positions` and their weights, in the
    /// order requested. `None` if any position is out of range.
    pub fn get_many(&self, positions: &[usize]) -> Option<(Vec<I>, Vec<f32>)> {
        let mut items   = Vec::with_capacity(positions.len());
        let mut weights = Vec::with_capacity(positions.len());
        for &pos in positions {
            let index = *self.indices.get(pos)?;
            items.push(self.dataset.get(index)?);
            weights.push(self.weights[pos]);
        }
        Some((items, weights))
    }
}

impl<D, I> Dataset<Weighted<I>> for WeightedSubset<D, I>
where
    D: Dataset<I>,
{
    fn get(&self, index: usize) -> Option<Weighted<I>> {
        let inner = *self.indices.get(index)?;
        let item  = self.dataset.get(inner)?;
        Some(Weighted { item, weight: self.weights[index] })
    }

    fn len(&self) -> usize {
        self.indices.len()
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::dataset::{ClassificationDataset, ClassificationSample};

    fn dataset() -> ClassificationDataset {
        ClassificationDataset::new(
            (0..5)
                .map(|i| ClassificationSample::new(vec![i as f32], i % 2))
                .collect(),
        )
    }

    #[test]
    fn test_get_maps_through_indices() {
        let subset = WeightedSubset::new(dataset(), vec![4, 1], vec![0.5, 2.0]).unwrap();
        assert_eq!(subset.len(), 2);

        let first = subset.get(0).unwrap();
        assert_eq!(first.item.features, vec![4.0]);
        assert_eq!(first.weight, 0.5);

        let second = subset.get(1).unwrap();
        assert_eq!(second.item.features, vec![1.0]);
        assert_eq!(second.weight, 2.0);

        assert!(subset.get(2).is_none());
    }

    #[test]
    fn test_get_many_preserves_request_order() {
        let subset = WeightedSubset::new(dataset(), vec![0, 2, 3], vec![1.0, 2.0, 3.0]).unwrap();
        let (items, weights) = subset.get_many(&[2, 0]).unwrap();
        assert_eq!(items[0].features, vec![3.0]);
        assert_eq!(items[1].features, vec![0.0]);
        assert_eq!(weights, vec![3.0, 1.0]);
        assert!(subset.get_many(&[3]).is_none());
    }

    #[test]
    fn test_length_mismatch_rejected() {
        let err = WeightedSubset::new(dataset(), vec![0, 1], vec![1.0]).err().unwrap();
        assert!(matches!(err, DataError::WeightLengthMismatch { indices: 2, weights: 1 }));
    }

    #[test]
    fn test_out_of_range_index_rejected() {
        let err = WeightedSubset::new(dataset(), vec![9], vec![1.0]).err().unwrap();
        assert!(matches!(err, DataError::IndexOutOfRange { index: 9, len: 5 }));
    }

    #[test]
    fn test_full_view() {
        let subset = WeightedSubset::full(dataset(), vec![1.0; 5]).unwrap();
        assert_eq!(subset.indices(), &[0, 1, 2, 3, 4]);
    }
}
