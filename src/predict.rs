//! Batch prediction with the tree itself: feature vectors given inline as JSON
//! or read from a CSV file laid out like the training set (feature columns
//! first, class column last).

use std::fs::File;
use std::path::Path;

use csv::ReaderBuilder;

use crate::error::{CompileError, Result};
use crate::tree::DecisionTree;
use crate::utils::accuracy;

/// One feature vector, in tree feature-index order, with its label if known.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub values: Vec<f64>,
    pub expected: Option<i64>,
}

/// Parses an inline list of vectors such as `[[91000,40]]`.
pub fn parse_values_json(text: &str) -> Result<Vec<Sample>> {
    let rows: Vec<Vec<f64>> = serde_json::from_str(text)?;
    Ok(rows.into_iter().map(|values| Sample { values, expected: None }).collect())
}

/// Reads samples from a CSV file with a header row.
///
/// When `labelled` is set the last column is the expected class and every
/// column before it is a feature; otherwise every column is a feature.
pub fn load_samples_csv<P: AsRef<Path>>(path: P, labelled: bool) -> Result<Vec<Sample>> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| CompileError::io(path, e))?;
    let mut rdr = ReaderBuilder::new().has_headers(true).from_reader(file);

    let mut samples = Vec::new();
    for (row_idx, result) in rdr.records().enumerate() {
        let record = result?;
        let feature_count = if labelled { record.len().saturating_sub(1) } else { record.len() };

        let mut values = Vec::with_capacity(feature_count);
        for j in 0..feature_count {
            values.push(parse_cell(record.get(j).unwrap_or(""), row_idx, j)?);
        }
        let expected = if labelled {
            let cell = record.get(feature_count).unwrap_or("");
            // Labels may have been written as floats by pandas.
            Some(parse_cell(cell, row_idx, feature_count)? as i64)
        } else {
            None
        };
        samples.push(Sample { values, expected });
    }
    log::info!("Read {} samples from {:?}", samples.len(), path);
    Ok(samples)
}

fn parse_cell(cell: &str, row_idx: usize, col_idx: usize) -> Result<f64> {
    cell.trim().parse::<f64>().map_err(|e| {
        CompileError::Sample(format!("row {}, col {}: cannot parse '{}': {}", row_idx + 1, col_idx + 1, cell, e))
    })
}

/// Predictions for a batch, plus the accuracy when every sample is labelled.
#[derive(Debug, Clone, PartialEq)]
pub struct PredictionReport {
    pub predictions: Vec<i64>,
    pub accuracy: Option<f64>,
}

pub fn predict_samples(tree: &DecisionTree, samples: &[Sample]) -> PredictionReport {
    let predictions: Vec<i64> = samples.iter().map(|s| tree.predict(&s.values)).collect();

    let labelled: Option<Vec<(i64, i64)>> =
        samples.iter().zip(&predictions).map(|(s, &p)| s.expected.map(|e| (p, e))).collect();
    let accuracy = labelled.filter(|pairs| !pairs.is_empty()).map(|pairs| accuracy(&pairs));

    PredictionReport { predictions, accuracy }
}
