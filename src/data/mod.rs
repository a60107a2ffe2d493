//! Data loading utilities
//!
//! Reads the single CSV of an input directory into a polars `DataFrame` and
//! provides the column accessors and row selection the rest of the crate uses.

pub mod validation;

pub use validation::validate_data;

use crate::error::{ForestError, Result};
use crate::schema::{find_single_file, BinaryClassificationSchema};
use polars::prelude::*;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::path::Path;
use tracing::debug;

/// Rows used for CSV schema inference
const INFER_SCHEMA_LENGTH: usize = 10_000;

/// Read the only CSV file inside `dir`
pub fn read_csv_in_directory(dir: impl AsRef<Path>) -> Result<DataFrame> {
    let path = find_single_file(dir.as_ref(), "csv")?;
    read_csv(&path)
}

/// Read a CSV file with a header row
pub fn read_csv(path: impl AsRef<Path>) -> Result<DataFrame> {
    let path = path.as_ref();
    let df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(INFER_SCHEMA_LENGTH))
        .try_into_reader_with_file_path(Some(path.to_path_buf()))
        .map_err(|e| ForestError::DataError(format!("{}: {}", path.display(), e)))?
        .finish()
        .map_err(|e| ForestError::DataError(format!("{}: {}", path.display(), e)))?;

    debug!(
        path = %path.display(),
        rows = df.height(),
        columns = df.width(),
        "Loaded CSV"
    );
    Ok(df)
}

/// Write a frame as CSV with a header, creating parent directories
pub fn write_csv(df: &mut DataFrame, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut file = std::fs::File::create(path)?;
    CsvWriter::new(&mut file).include_header(true).finish(df)?;
    Ok(())
}

/// Cast the id and (when present) target columns to strings
pub fn cast_key_columns(df: &DataFrame, schema: &BinaryClassificationSchema) -> Result<DataFrame> {
    let mut out = df.clone();
    for name in [schema.id(), schema.target()] {
        if has_column(&out, name) {
            let casted = out.column(name)?.cast(&DataType::String)?;
            out.with_column(casted)?;
        }
    }
    Ok(out)
}

pub fn has_column(df: &DataFrame, name: &str) -> bool {
    df.get_column_names().iter().any(|c| c.as_str() == name)
}

pub fn column_names(df: &DataFrame) -> Vec<String> {
    df.get_column_names().iter().map(|c| c.to_string()).collect()
}

/// Numeric view of a column; nulls, unparseable strings and NaN all become `None`
pub fn column_f64(df: &DataFrame, name: &str) -> Result<Vec<Option<f64>>> {
    let column = df
        .column(name)
        .map_err(|_| ForestError::FeatureNotFound(name.to_string()))?;
    let series = column.as_materialized_series().cast(&DataType::Float64)?;
    Ok(series
        .f64()?
        .into_iter()
        .map(|v| v.filter(|x| !x.is_nan()))
        .collect())
}

/// String view of a column; nulls stay `None`
pub fn column_str(df: &DataFrame, name: &str) -> Result<Vec<Option<String>>> {
    let column = df
        .column(name)
        .map_err(|_| ForestError::FeatureNotFound(name.to_string()))?;
    let series = column.as_materialized_series().cast(&DataType::String)?;
    Ok(series
        .str()?
        .into_iter()
        .map(|v| v.map(str::to_string))
        .collect())
}

/// Select rows by position, in the given order
pub fn take_rows(df: &DataFrame, indices: &[usize]) -> Result<DataFrame> {
    let idx = IdxCa::from_vec(
        "idx".into(),
        indices.iter().map(|&i| i as IdxSize).collect(),
    );
    Ok(df.take(&idx)?)
}

/// Holdout split preserving class proportions.
///
/// Returns `(train, validation)` row indices, each sorted. Every class keeps at
/// least one training row; a fraction of zero yields an empty validation set.
pub fn stratified_split(labels: &[usize], fraction: f64, seed: u64) -> (Vec<usize>, Vec<usize>) {
    if fraction <= 0.0 || labels.is_empty() {
        return ((0..labels.len()).collect(), Vec::new());
    }

    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let n_classes = labels.iter().copied().max().map_or(0, |m| m + 1);
    let mut train = Vec::with_capacity(labels.len());
    let mut validation = Vec::new();

    for class in 0..n_classes {
        let mut members: Vec<usize> = labels
            .iter()
            .enumerate()
            .filter(|(_, &y)| y == class)
            .map(|(i, _)| i)
            .collect();
        if members.is_empty() {
            continue;
        }
        members.shuffle(&mut rng);

        let n_val = ((members.len() as f64) * fraction).round() as usize;
        let n_val = n_val.min(members.len() - 1);
        validation.extend_from_slice(&members[..n_val]);
        train.extend_from_slice(&members[n_val..]);
    }

    train.sort_unstable();
    validation.sort_unstable();
    (train, validation)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stratified_split_keeps_proportions() {
        let labels: Vec<usize> = (0..100).map(|i| if i < 80 { 0 } else { 1 }).collect();
        let (train, val) = stratified_split(&labels, 0.25, 7);

        assert_eq!(train.len() + val.len(), 100);
        assert_eq!(val.iter().filter(|&&i| labels[i] == 1).count(), 5);
        assert_eq!(val.iter().filter(|&&i| labels[i] == 0).count(), 20);
        assert!(train.iter().all(|i| !val.contains(i)));
    }

    #[test]
    fn test_stratified_split_is_seeded() {
        let labels: Vec<usize> = (0..40).map(|i| i % 2).collect();
        assert_eq!(stratified_split(&labels, 0.2, 3), stratified_split(&labels, 0.2, 3));
    }

    #[test]
    fn test_zero_fraction_keeps_all_rows() {
        let labels = vec![0, 1, 0, 1];
        let (train, val) = stratified_split(&labels, 0.0, 1);
        assert_eq!(train, vec![0, 1, 2, 3]);
        assert!(val.is_empty());
    }

    #[test]
    fn test_tiny_class_stays_in_train() {
        let labels = vec![0, 0, 0, 0, 1];
        let (train, _) = stratified_split(&labels, 0.4, 1);
        assert!(train.contains(&4));
    }

    #[test]
    fn test_column_accessors() {
        let df = df! {
            "x" => [Some(1.0), None, Some(f64::NAN)],
            "c" => [Some("a"), None, Some("b")],
        }
        .unwrap();

        assert_eq!(column_f64(&df, "x").unwrap(), vec![Some(1.0), None, None]);
        assert_eq!(
            column_str(&df, "c").unwrap(),
            vec![Some("a".to_string()), None, Some("b".to_string())]
        );
        assert!(matches!(
            column_f64(&df, "missing"),
            Err(ForestError::FeatureNotFound(_))
        ));
    }

    #[test]
    fn test_take_rows_and_csv_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let mut df = df! {
            "id" => [10i64, 20, 30],
            "v" => [1.5, 2.5, 3.5],
        }
        .unwrap();
        write_csv(&mut df, dir.path().join("data.csv")).unwrap();

        let loaded = read_csv_in_directory(dir.path()).unwrap();
        assert_eq!(loaded.height(), 3);

        let picked = take_rows(&loaded, &[2, 0]).unwrap();
        assert_eq!(column_f64(&picked, "v").unwrap(), vec![Some(3.5), Some(1.5)]);
    }
}
