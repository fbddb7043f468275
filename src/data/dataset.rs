use burn::data::dataset::Dataset;
use serde::{Deserialize, Serialize};

/// One feature vector with its integer class label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationSample {
    pub features: Vec<f32>,
    pub label:    usize,
}

impl ClassificationSample {
    pub fn new(features: Vec<f32>, label: usize) -> Self {
        Self { features, label }
    }
}

/// In-memory dataset of classification samples.
#[derive(Debug, Clone, Default)]
pub struct ClassificationDataset {
    samples: Vec<ClassificationSample>,
}

impl ClassificationDataset {
    pub fn new(samples: Vec<ClassificationSample>) -> Self { Self { samples } }

    pub fn samples(&self) -> &[ClassificationSample] { &self.samples }

    /// Feature width of the first sample (loaders reject ragged rows).
    pub fn num_features(&self) -> usize {
        self.samples.first().map(|s| s.features.len()).unwrap_or(0)
    }

    /// Highest label + 1.
    pub fn num_classes(&self) -> usize {
        self.samples.iter().map(|s| s.label + 1).max().unwrap_or(0)
    }
}

impl Dataset<ClassificationSample> for ClassificationDataset {
    fn get(&self, index: usize) -> Option<ClassificationSample> {
        self.samples.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.samples.len()
    }
}
