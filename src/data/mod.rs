// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// Everything between a CSV file on disk and a tensor batch:
//
//   features.csv (+ weights.csv)
//       │
//       ▼
//   CsvFeatureLoader   → Vec<ClassificationSample>
//       │
//       ▼
//   split_train_val    → seeded train / test split
//       │
//       ▼
//   ClassificationDataset
//     └─ WeightedSubset (optional, attaches sample weights)
//       │
//       ▼
//   ClassificationBatcher → ClassificationBatch<B>
//       │
//       ▼
//   PrefetchLoader     → batches built on a background thread

/// Typed errors for this layer
pub mod error;

/// Reads labelled feature vectors and sample weights from CSV
pub mod loader;

/// Implements Burn's Dataset trait for classification samples
pub mod dataset;

/// Index + weight view over another dataset
pub mod weighted;

/// Implements Burn's Batcher trait for plain and weighted samples
pub mod batcher;

/// Background-thread batch prefetching
pub mod prefetch;

/// Seeded shuffle and train/test split
pub mod splitter;
