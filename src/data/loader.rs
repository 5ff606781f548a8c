//! Dataset loading from flat files

use super::Dataset;
use crate::error::{Result, TournamentError};
use ndarray::{Array1, Array2};
use polars::prelude::*;
use std::fs::File;
use std::path::Path;
use std::time::Instant;
use tracing::{info, warn};

/// Columns that sensor exports carry but that are never features.
pub const DEFAULT_DROP_COLUMNS: &[&str] = &["Unnamed: 0", "timestamp", "tvoc"];

/// Loads CSV/Parquet files into a [`Dataset`].
///
/// Spurious index/timestamp columns are removed before the feature matrix is
/// built; every remaining non-target column becomes a feature, in file order.
#[derive(Debug, Clone)]
pub struct DatasetLoader {
    target_column: String,
    drop_columns: Vec<String>,
    first_column_is_index: bool,
}

impl DatasetLoader {
    pub fn new(target_column: impl Into<String>) -> Self {
        Self {
            target_column: target_column.into(),
            drop_columns: DEFAULT_DROP_COLUMNS.iter().map(|s| s.to_string()).collect(),
            first_column_is_index: false,
        }
    }

    /// Replace the list of columns dropped on load
    pub fn with_drop_columns(mut self, columns: Vec<String>) -> Self {
        self.drop_columns = columns;
        self
    }

    /// Treat the first column as a row index and drop it
    pub fn with_index_column(mut self, first_column_is_index: bool) -> Self {
        self.first_column_is_index = first_column_is_index;
        self
    }

    pub fn target_column(&self) -> &str {
        &self.target_column
    }

    /// Load a file and convert it to a dataset
    pub fn load(&self, path: impl AsRef<Path>) -> Result<Dataset> {
        let path = path.as_ref();
        let start = Instant::now();
        let df = load_dataframe(path)?;
        let dataset = self.from_dataframe(&df)?;

        info!(
            path = %path.display(),
            rows = dataset.n_rows(),
            features = dataset.n_features(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Dataset loaded"
        );
        Ok(dataset)
    }

    /// Convert an already-loaded DataFrame to a dataset
    pub fn from_dataframe(&self, df: &DataFrame) -> Result<Dataset> {
        let all_columns: Vec<String> = df
            .get_column_names()
            .into_iter()
            .map(|s| s.to_string())
            .collect();

        if !all_columns.iter().any(|c| c == &self.target_column) {
            return Err(TournamentError::DataError(format!(
                "target column '{}' not found",
                self.target_column
            )));
        }

        let feature_names: Vec<String> = all_columns
            .iter()
            .enumerate()
            .filter(|(i, name)| {
                if name.as_str() == self.target_column {
                    return false;
                }
                if *i == 0 && self.first_column_is_index {
                    warn!(column = %name, "Dropping index column");
                    return false;
                }
                if name.is_empty() || self.drop_columns.iter().any(|d| d == *name) {
                    warn!(column = %name, "Dropping non-feature column");
                    return false;
                }
                true
            })
            .map(|(_, name)| name.clone())
            .collect();

        if feature_names.is_empty() {
            return Err(TournamentError::DataError(
                "no feature columns left after cleaning".to_string(),
            ));
        }

        let target = Array1::from_vec(column_as_f64(df, &self.target_column)?);
        let columns: Vec<Vec<f64>> = feature_names
            .iter()
            .map(|name| column_as_f64(df, name))
            .collect::<Result<_>>()?;

        let n_rows = df.height();
        let x = Array2::from_shape_fn((n_rows, columns.len()), |(r, c)| columns[c][r]);

        Dataset::new(feature_names, self.target_column.clone(), x, target)
    }
}

/// Read a CSV or Parquet file depending on its extension (CSV by default)
pub fn load_dataframe(path: &Path) -> Result<DataFrame> {
    let file = File::open(path)
        .map_err(|e| TournamentError::DataError(format!("{}: {}", path.display(), e)))?;

    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    let df = match ext.as_str() {
        "parquet" | "pq" => ParquetReader::new(file).finish()?,
        _ => CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(Some(100))
            .into_reader_with_file_handle(file)
            .finish()?,
    };
    Ok(df)
}

fn column_as_f64(df: &DataFrame, name: &str) -> Result<Vec<f64>> {
    let column = df
        .column(name)
        .map_err(|_| TournamentError::DataError(format!("column '{}' not found", name)))?;
    let cast = column
        .cast(&DataType::Float64)
        .map_err(|e| TournamentError::DataError(format!("column '{}' is not numeric: {}", name, e)))?;
    let values = cast.f64()?;

    if values.null_count() > 0 {
        return Err(TournamentError::DataError(format!(
            "column '{}' contains {} missing or non-numeric values",
            name,
            values.null_count()
        )));
    }

    Ok(values.into_iter().map(|v| v.unwrap_or(0.0)).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn sensor_df() -> DataFrame {
        df!(
            "timestamp" => &["t0", "t1", "t2", "t3"],
            "temperature" => &[20.5, 21.0, 21.5, 22.0],
            "humidity" => &[40i64, 42, 44, 46],
            "tvoc" => &[1.0, 1.0, 1.0, 1.0],
            "co2" => &[400.0, 410.0, 420.0, 430.0]
        )
        .unwrap()
    }

    #[test]
    fn test_drops_spurious_columns_and_keeps_order() {
        let ds = DatasetLoader::new("co2").from_dataframe(&sensor_df()).unwrap();
        assert_eq!(ds.feature_names(), &["temperature".to_string(), "humidity".to_string()]);
        assert_eq!(ds.n_rows(), 4);
        assert_eq!(ds.features()[[1, 1]], 42.0);
        assert_eq!(ds.target()[3], 430.0);
    }

    #[test]
    fn test_missing_target_is_data_error() {
        let err = DatasetLoader::new("nox").from_dataframe(&sensor_df()).unwrap_err();
        assert!(matches!(err, TournamentError::DataError(_)));
    }

    #[test]
    fn test_index_column_dropped() {
        let df = df!(
            "idx" => &[0i64, 1, 2],
            "a" => &[1.0, 2.0, 3.0],
            "co2" => &[1.0, 2.0, 3.0]
        )
        .unwrap();
        let ds = DatasetLoader::new("co2")
            .with_index_column(true)
            .from_dataframe(&df)
            .unwrap();
        assert_eq!(ds.feature_names(), &["a".to_string()]);
    }

    #[test]
    fn test_load_csv_file() {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        writeln!(file, "timestamp,temperature,humidity,co2").unwrap();
        writeln!(file, "2024-01-01,20.0,40.0,400.0").unwrap();
        writeln!(file, "2024-01-02,21.0,41.0,410.0").unwrap();
        writeln!(file, "2024-01-03,22.0,42.0,420.0").unwrap();
        file.flush().unwrap();

        let ds = DatasetLoader::new("co2").load(file.path()).unwrap();
        assert_eq!(ds.n_rows(), 3);
        assert_eq!(ds.n_features(), 2);
    }
}
