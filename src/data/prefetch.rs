// ============================================================
// Layer 4 — Prefetching Data Loader
// ============================================================
// Builds batches on a background thread so the next batch is
// ready while the model is still busy with the current one.
//
//   producer thread                     training loop
//   ───────────────                     ─────────────
//   dataset.get(i) ×batch
//   batcher.batch(items) ──▶ bounded ──▶ next()
//                            channel
//                           (prefetch)
//
// The channel is bounded, so at most `prefetch` finished
// batches wait in memory. Dropping the iterator closes the
// channel; the producer sees the send error and stops.
//
// A panic in the producer ends the stream early. Callers must
// end the epoch with PrefetchIter::finish(), which joins the
// worker and turns that panic into DataError::WorkerPanicked.
//
// Every call to iter() is one epoch. With a shuffle seed the
// order is re-drawn per epoch from seed + epoch_index, so runs
// are reproducible.

use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    thread::{self, JoinHandle},
};

use burn::data::{dataloader::batcher::Batcher, dataset::Dataset};
use crossbeam_channel::{bounded, Receiver};
use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};

use crate::data::error::{DataError, DataResult};

type SharedBatcher<I, O> = Arc<dyn Batcher<I, O> + Sync>;

/// Builder mirroring Burn's `DataLoaderBuilder`.
pub struct PrefetchLoaderBuilder<I, O> {
    batcher:    SharedBatcher<I, O>,
    batch_size: usize,
    shuffle:    Option<u64>,
    prefetch:   usize,
}

impl<I, O> PrefetchLoaderBuilder<I, O>
where
    I: Send + 'static,
    O: Send + 'static,
{
    pub fn new<T>(batcher: T) -> Self
    where
        T: Batcher<I, O> + Sync + 'static,
    {
        Self {
            batcher:    Arc::new(batcher),
            batch_size: 1,
            shuffle:    None,
            prefetch:   2,
        }
    }

    pub fn batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Shuffle every epoch, seeded for reproducibility.
    pub fn shuffle(mut self, seed: u64) -> Self {
        self.shuffle = Some(seed);
        self
    }

    /// Number of finished batches allowed to wait in the queue.
    pub fn prefetch(mut self, depth: usize) -> Self {
        self.prefetch = depth.max(1);
        self
    }

    pub fn build<D>(self, dataset: D) -> PrefetchLoader<I, O>
    where
        D: Dataset<I> + 'static,
    {
        PrefetchLoader {
            dataset:    Arc::new(dataset),
            batcher:    self.batcher,
            batch_size: self.batch_size,
            shuffle:    self.shuffle,
            prefetch:   self.prefetch,
            epoch:      AtomicU64::new(0),
        }
    }
}

pub struct PrefetchLoader<I, O> {
    dataset:    Arc<dyn Dataset<I>>,
    batcher:    SharedBatcher<I, O>,
    batch_size: usize,
    shuffle:    Option<u64>,
    prefetch:   usize,
    epoch:      AtomicU64,
}

impl<I, O> PrefetchLoader<I, O>
where
    I: Send + 'static,
    O: Send + 'static,
{
    /// Number of batches one epoch yields.
    pub fn len(&self) -> usize {
        self.dataset.len().div_ceil(self.batch_size)
    }

    pub fn is_empty(&self) -> bool {
        self.dataset.is_empty()
    }

    pub fn num_items(&self) -> usize {
        self.dataset.len()
    }

    fn order(&self) -> Vec<usize> {
        let epoch = self.epoch.fetch_add(1, Ordering::Relaxed);
        let mut order: Vec<usize> = (0..self.dataset.len()).collect();
        if let Some(seed) = self.shuffle {
            let mut rng = StdRng::seed_from_u64(seed.wrapping_add(epoch));
            order.shuffle(&mut rng);
        }
        order
    }

    /// Start one epoch of background batching.
    pub fn iter(&self) -> PrefetchIter<O> {
        let order      = self.order();
        let batch_size = self.batch_size;
        let dataset    = Arc::clone(&self.dataset);
        let batcher    = Arc::clone(&self.batcher);
        let (tx, rx)   = bounded(self.prefetch);

        let handle = thread::spawn(move || {
            for chunk in order.chunks(batch_size) {
                let items: Vec<I> = chunk.iter().filter_map(|&i| dataset.get(i)).collect();
                if items.is_empty() {
                    continue;
                }
                if tx.send(batcher.batch(items)).is_err() {
                    // consumer hung up
                    break;
                }
            }
        });

        PrefetchIter {
            rx:        Some(rx),
            handle:    Some(handle),
            remaining: self.len(),
        }
    }
}

impl<O> PrefetchIter<O> {
    /// Close the epoch and join the producer.
    ///
    /// Fails if the producer panicked, in which case the batches seen
    /// so far were only part of the epoch.
    pub fn finish(mut self) -> DataResult<()> {
        drop(self.rx.take());
        match self.handle.take() {
            Some(handle) => handle.join().map_err(|_| DataError::WorkerPanicked),
            None => Ok(()),
        }
    }
}

/// Consumer side of one prefetching epoch.
pub struct PrefetchIter<O> {
    rx:        Option<Receiver<O>>,
    handle:    Option<JoinHandle<()>>,
    remaining: usize,
}

impl<O> Iterator for PrefetchIter<O> {
    type Item = O;

    fn next(&mut self) -> Option<O> {
        let batch = self.rx.as_ref()?.recv().ok()?;
        self.remaining = self.remaining.saturating_sub(1);
        Some(batch)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.remaining))
    }
}

impl<O> Drop for PrefetchIter<O> {
    fn drop(&mut self) {
        // Close the channel first so a producer blocked on send wakes up.
        drop(self.rx.take());
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                tracing::warn!("prefetch worker panicked");
            }
        }
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use burn::data::dataset::InMemDataset;

    #[derive(Clone)]
    struct CollectBatcher;

    impl Batcher<usize, Vec<usize>> for CollectBatcher {
        fn batch(&self, items: Vec<usize>) -> Vec<usize> {
            items
        }
    }

    fn loader(batch_size: usize) -> PrefetchLoaderBuilder<usize, Vec<usize>> {
        PrefetchLoaderBuilder::new(CollectBatcher).batch_size(batch_size)
    }

    #[test]
    fn test_sequential_epoch_yields_all_items_in_order() {
        let loader = loader(4).prefetch(1).build(InMemDataset::new((0..10).collect()));
        assert_eq!(loader.len(), 3);

        let batches: Vec<Vec<usize>> = loader.iter().collect();
        assert_eq!(batches, vec![vec![0, 1, 2, 3], vec![4, 5, 6, 7], vec![8, 9]]);
    }

    #[test]
    fn test_shuffle_is_a_permutation_and_changes_per_epoch() {
        let loader = loader(8).shuffle(7).build(InMemDataset::new((0..64).collect()));

        let first: Vec<usize> = loader.iter().flatten().collect();
        let second: Vec<usize> = loader.iter().flatten().collect();

        let mut sorted = first.clone();
        sorted.sort_unstable();
        assert_eq!(sorted, (0..64).collect::<Vec<_>>());
        assert_ne!(first, second);
    }

    #[test]
    fn test_same_seed_same_order() {
        let a = loader(4).shuffle(3).build(InMemDataset::new((0..32).collect()));
        let b = loader(4).shuffle(3).build(InMemDataset::new((0..32).collect()));
        let a: Vec<usize> = a.iter().flatten().collect();
        let b: Vec<usize> = b.iter().flatten().collect();
        assert_eq!(a, b);
    }

    #[test]
    fn test_early_drop_stops_producer() {
        let loader = loader(1).prefetch(1).build(InMemDataset::new((0..1000).collect()));
        let mut iter = loader.iter();
        assert_eq!(iter.next(), Some(vec![0]));
        // Joins the producer; would hang if it kept blocking on send.
        drop(iter);
    }

    #[test]
    fn test_empty_dataset() {
        let loader = loader(4).build(InMemDataset::new(Vec::<usize>::new()));
        assert!(loader.is_empty());
        assert_eq!(loader.len(), 0);
        assert_eq!(loader.iter().count(), 0);
    }

    #[test]
    fn test_finish_after_full_epoch_is_ok() {
        let loader = loader(4).build(InMemDataset::new((0..10).collect()));
        let mut iter = loader.iter();
        assert_eq!(iter.by_ref().count(), 3);
        assert!(iter.finish().is_ok());
    }

    #[derive(Clone)]
    struct FailOnSecondBatch;

    impl Batcher<usize, Vec<usize>> for FailOnSecondBatch {
        fn batch(&self, items: Vec<usize>) -> Vec<usize> {
            assert!(items[0] < 4, "bad item {}", items[0]);
            items
        }
    }

    #[test]
    fn test_producer_panic_surfaces_in_finish() {
        let loader = PrefetchLoaderBuilder::new(FailOnSecondBatch)
            .batch_size(4)
            .build(InMemDataset::new((0..12).collect()));
        let mut iter = loader.iter();

        let seen: Vec<Vec<usize>> = iter.by_ref().collect();
        assert_eq!(seen, vec![vec![0, 1, 2, 3]]);
        assert!(matches!(iter.finish(), Err(DataError::WorkerPanicked)));
    }

    #[test]
    fn test_zero_batch_size_clamped() {
        let loader = loader(0).build(InMemDataset::new(vec![1, 2, 3]));
        assert_eq!(loader.len(), 3);
    }
}
