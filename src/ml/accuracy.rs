use burn::prelude::*;

use crate::domain::classification::MetricError;

/// Top-k accuracy, in percent, for every `k` in `topk`.
///
/// A row counts as correct for `k` when its target is among the `k`
/// largest logits of that row.
pub fn accuracy<B: Backend>(
    logits:  Tensor<B, 2>,
    targets: Tensor<B, 1, Int>,
    topk:    &[usize],
) -> Result<Vec<f64>, MetricError> {
    let [batch_size, classes] = logits.dims();
    let maxk = *topk.iter().max().ok_or(MetricError::EmptyTopK)?;

    if batch_size == 0 {
        return Err(MetricError::EmptyBatch);
    }
    let n_targets = targets.dims()[0];
    if n_targets != batch_size {
        return Err(MetricError::BatchMismatch { logits: batch_size, targets: n_targets });
    }
    if let Some(&k) = topk.iter().find(|&&k| k == 0 || k > classes) {
        return Err(MetricError::InvalidK { k, classes });
    }

    // [batch, maxk] class indices, best first
    let (_, pred) = logits.topk_with_indices(maxk, 1);
    let correct = pred.equal(targets.reshape([batch_size, 1]).expand([batch_size, maxk]));

    Ok(topk
        .iter()
        .map(|&k| {
            let hits: f64 = correct
                .clone()
                .slice([0..batch_size, 0..k])
                .int()
                .sum()
                .into_scalar()
                .elem();
            hits * 100.0 / batch_size as f64
        })
        .collect())
}

/// Index of the largest logit per row.
pub fn argmax_labels<B: Backend>(logits: Tensor<B, 2>) -> Vec<usize> {
    let [batch_size, _] = logits.dims();
    logits
        .argmax(1)
        .reshape([batch_size])
        .into_data()
        .iter::<i64>()
        .map(|v| v as usize)
        .collect()
}

pub fn labels_of<B: Backend>(targets: Tensor<B, 1, Int>) -> Vec<usize> {
    targets.into_data().iter::<i64>().map(|v| v as usize).collect()
}
