// ============================================================
// Layer 4 — Classification Batcher
// ============================================================
// Implements Burn's Batcher trait to turn a Vec of samples
// into tensors:
//
//   inputs  [batch, features]   float
//   targets [batch]             int
//   weights [batch]             float, weighted subsets only
//
// The same batcher handles plain samples and Weighted<_>
// samples so both loaders yield one batch type.

use burn::{
    data::dataloader::batcher::Batcher,
    prelude::*,
};

use crate::data::{dataset::ClassificationSample, weighted::Weighted};

/// A batch ready for the classifier forward pass.
#[derive(Debug, Clone)]
pub struct ClassificationBatch<B: Backend> {
    pub inputs:  Tensor<B, 2>,
    pub targets: Tensor<B, 1, Int>,
    /// Per-sample loss weights; `None` for unweighted data.
    pub weights: Option<Tensor<B, 1>>,
}

impl<B: Backend> ClassificationBatch<B> {
    pub fn len(&self) -> usize {
        self.targets.dims()[0]
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Clone, Debug)]
pub struct ClassificationBatcher<B: Backend> {
    pub device: B::Device,
}

impl<B: Backend> ClassificationBatcher<B> {
    pub fn new(device: B::Device) -> Self {
        Self { device }
    }

    fn stack<'a>(
        &self,
        samples: impl ExactSizeIterator<Item = &'a ClassificationSample> + Clone,
    ) -> (Tensor<B, 2>, Tensor<B, 1, Int>) {
        let batch_size = samples.len();
        let width = samples.clone().next().map(|s| s.features.len()).unwrap_or(0);

        // Row-major flatten: [s1_f1, s1_f2, ..., sN_fF] → [N, F]
        let flat: Vec<f32> = samples
            .clone()
            .flat_map(|s| s.features.iter().copied())
            .collect();
        let labels: Vec<i32> = samples.map(|s| s.label as i32).collect();

        let inputs = Tensor::<B, 1>::from_floats(flat.as_slice(), &self.device)
            .reshape([batch_size, width]);
        let targets = Tensor::<B, 1, Int>::from_ints(labels.as_slice(), &self.device);

        (inputs, targets)
    }
}

impl<B: Backend> Batcher<ClassificationSample, ClassificationBatch<B>> for ClassificationBatcher<B> {
    fn batch(&self, items: Vec<ClassificationSample>) -> ClassificationBatch<B> {
        let (inputs, targets) = self.stack(items.iter());
        ClassificationBatch { inputs, targets, weights: None }
    }
}

impl<B: Backend> Batcher<Weighted<ClassificationSample>, ClassificationBatch<B>>
    for ClassificationBatcher<B>
{
    fn batch(&self, items: Vec<Weighted<ClassificationSample>>) -> ClassificationBatch<B> {
        let (inputs, targets) = self.stack(items.iter().map(|w| &w.item));
        let weights: Vec<f32> = items.iter().map(|w| w.weight).collect();
        let weights = Tensor::<B, 1>::from_floats(weights.as_slice(), &self.device);
        ClassificationBatch { inputs, targets, weights: Some(weights) }
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray<f32>;

    fn samples() -> Vec<ClassificationSample> {
        vec![
            ClassificationSample::new(vec![1.0, 2.0, 3.0], 2),
            ClassificationSample::new(vec![4.0, 5.0, 6.0], 0),
        ]
    }

    #[test]
    fn test_plain_batch_shapes() {
        let batcher = ClassificationBatcher::<TestBackend>::new(Default::default());
        let batch: ClassificationBatch<TestBackend> = batcher.batch(samples());

        assert_eq!(batch.inputs.dims(), [2, 3]);
        assert_eq!(batch.len(), 2);
        assert!(batch.weights.is_none());

        let inputs: Vec<f32> = batch.inputs.into_data().iter::<f32>().collect();
        assert_eq!(inputs, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        let targets: Vec<i64> = batch.targets.into_data().iter::<i64>().collect();
        assert_eq!(targets, vec![2, 0]);
    }

    #[test]
    fn test_weighted_batch_carries_weights() {
        let batcher = ClassificationBatcher::<TestBackend>::new(Default::default());
        let items: Vec<_> = samples()
            .into_iter()
            .zip([0.25f32, 4.0])
            .map(|(item, weight)| Weighted { item, weight })
            .collect();
        let batch: ClassificationBatch<TestBackend> = batcher.batch(items);

        let weights: Vec<f32> = batch.weights.unwrap().into_data().iter::<f32>().collect();
        assert_eq!(weights, vec![0.25, 4.0]);
        assert_eq!(batch.inputs.dims(), [2, 3]);
    }
}
