use std::path::PathBuf;

use thiserror::Error;

/// Failures while reading or assembling training data.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("failed to read '{path}': {source}")]
    Io {
        path:   PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed csv in '{path}': {source}")]
    Csv {
        path:   PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("'{path}' line {line}: {reason}")]
    Parse { path: PathBuf, line: usize, reason: String },

    #[error("'{path}' contains no samples")]
    Empty { path: PathBuf },

    #[error("{indices} indices but {weights} weights")]
    WeightLengthMismatch { indices: usize, weights: usize },

    #[error("index {index} out of range for dataset of {len} items")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("batch worker panicked before the epoch was complete")]
    WorkerPanicked,
}

pub type DataResult<T> = Result<T, DataError>;
