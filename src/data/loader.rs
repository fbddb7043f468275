// ============================================================
// Layer 4 — CSV Feature Loader
// ============================================================
// Reads labelled feature vectors from a CSV file:
//
//   f1,f2,...,fN,label
//   0.12,3.4,...,0.0,2
//
// Every column but the last is parsed as f32; the last column
// is the integer class label. Rows must all have the same
// width (the csv reader enforces this).
//
// Sample weights for weighted training come from a separate
// single-column file, one weight per sample, same order.

use std::{
    fs::File,
    path::{Path, PathBuf},
};

use csv::{ReaderBuilder, StringRecord};

use crate::data::{
    dataset::ClassificationSample,
    error::{DataError, DataResult},
};

pub struct CsvFeatureLoader {
    path:        PathBuf,
    has_headers: bool,
}

impl CsvFeatureLoader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), has_headers: true }
    }

    pub fn has_headers(mut self, yes: bool) -> Self {
        self.has_headers = yes;
        self
    }

    pub fn load(&self) -> DataResult<Vec<ClassificationSample>> {
        let file = File::open(&self.path)
            .map_err(|source| DataError::Io { path: self.path.clone(), source })?;
        let mut reader = ReaderBuilder::new()
            .has_headers(self.has_headers)
            .trim(csv::Trim::All)
            .from_reader(file);

        let mut samples = Vec::new();
        for record in reader.records() {
            let record = record.map_err(|source| csv_error(&self.path, source))?;
            samples.push(self.parse_row(&record)?);
        }

        if samples.is_empty() {
            return Err(DataError::Empty { path: self.path.clone() });
        }

        tracing::info!(
            "Loaded {} samples x {} features from '{}'",
            samples.len(),
            samples[0].features.len(),
            self.path.display(),
        );
        Ok(samples)
    }

    fn parse_row(&self, record: &StringRecord) -> DataResult<ClassificationSample> {
        let line = record.position().map(|p| p.line() as usize).unwrap_or(0);
        let parse_err = |reason: String| DataError::Parse {
            path: self.path.clone(),
            line,
            reason,
        };

        if record.len() < 2 {
            return Err(parse_err(format!(
                "expected at least one feature and a label, got {} column(s)",
                record.len()
            )));
        }

        let (label_cell, feature_cells) = (&record[record.len() - 1], record.len() - 1);
        let label: usize = label_cell
            .parse()
            .map_err(|_| parse_err(format!("label '{label_cell}' is not a class index")))?;

        let features = record
            .iter()
            .take(feature_cells)
            .map(|cell| {
                cell.parse::<f32>()
                    .map_err(|_| parse_err(format!("feature '{cell}' is not a number")))
            })
            .collect::<DataResult<Vec<f32>>>()?;

        Ok(ClassificationSample::new(features, label))
    }
}

/// Read one non-negative weight per row (single column, no header).
pub fn load_weights(path: impl AsRef<Path>) -> DataResult<Vec<f32>> {
    let path = path.as_ref();
    let file = File::open(path)
        .map_err(|source| DataError::Io { path: path.to_path_buf(), source })?;
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .trim(csv::Trim::All)
        .from_reader(file);

    let mut weights = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|source| csv_error(path, source))?;
        let line = record.position().map(|p| p.line() as usize).unwrap_or(0);
        let cell = record.get(0).unwrap_or("");
        let weight: f32 = cell.parse().map_err(|_| DataError::Parse {
            path:   path.to_path_buf(),
            line,
            reason: format!("weight '{cell}' is not a number"),
        })?;
        if weight.is_nan() || weight < 0.0 {
            return Err(DataError::Parse {
                path:   path.to_path_buf(),
                line,
                reason: format!("weight {weight} must be non-negative"),
            });
        }
        weights.push(weight);
    }

    if weights.is_empty() {
        return Err(DataError::Empty { path: path.to_path_buf() });
    }
    Ok(weights)
}

fn csv_error(path: &Path, source: csv::Error) -> DataError {
    DataError::Csv { path: path.to_path_buf(), source }
}
