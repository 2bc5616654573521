//! Data loading utilities
//!
//! Reads a delimited simulation dump into a [`Table`]: a dense `f64` matrix
//! whose leading columns are inputs and whose following columns are outputs.

use crate::error::{PrepError, Result};
use ndarray::{s, Array2, ArrayView2, Axis};
use polars::prelude::*;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info};

/// In-memory rectangular numeric dataset.
///
/// Columns `[0, n_inputs)` are input features, `[n_inputs, n_inputs + n_outputs)`
/// are output targets. Any trailing columns are kept but belong to neither block.
#[derive(Debug, Clone)]
pub struct Table {
    columns: Vec<String>,
    data: Array2<f64>,
    n_inputs: usize,
    n_outputs: usize,
    source: Option<PathBuf>,
}

impl Table {
    /// Build a table from column names and row-major data.
    ///
    /// `n_outputs = None` derives the output count as `total - n_inputs`.
    pub fn new(
        columns: Vec<String>,
        data: Array2<f64>,
        n_inputs: usize,
        n_outputs: Option<usize>,
    ) -> Result<Self> {
        if columns.len() != data.ncols() {
            return Err(PrepError::Shape {
                expected: format!("{} columns", columns.len()),
                actual: format!("{} columns", data.ncols()),
            });
        }
        let n_outputs = resolve_counts(columns.len(), n_inputs, n_outputs)?;
        if data.nrows() == 0 {
            return Err(PrepError::Schema("table has no data rows".to_string()));
        }

        Ok(Self {
            columns,
            data,
            n_inputs,
            n_outputs,
            source: None,
        })
    }

    fn with_source(mut self, path: &Path) -> Self {
        self.source = Some(path.to_path_buf());
        self
    }

    pub fn n_rows(&self) -> usize {
        self.data.nrows()
    }

    pub fn n_columns(&self) -> usize {
        self.data.ncols()
    }

    pub fn n_inputs(&self) -> usize {
        self.n_inputs
    }

    pub fn n_outputs(&self) -> usize {
        self.n_outputs
    }

    /// Path the table was loaded from, if any
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn input_names(&self) -> &[String] {
        &self.columns[..self.n_inputs]
    }

    pub fn output_names(&self) -> &[String] {
        &self.columns[self.n_inputs..self.n_inputs + self.n_outputs]
    }

    /// Input feature block (all rows)
    pub fn inputs(&self) -> ArrayView2<'_, f64> {
        self.data.slice(s![.., ..self.n_inputs])
    }

    /// Output target block (all rows)
    pub fn outputs(&self) -> ArrayView2<'_, f64> {
        self.data
            .slice(s![.., self.n_inputs..self.n_inputs + self.n_outputs])
    }

    /// Copy the input block for the given rows, in the given order
    pub fn select_inputs(&self, rows: &[usize]) -> Array2<f64> {
        self.inputs().select(Axis(0), rows)
    }

    /// Copy the output block for the given rows, in the given order
    pub fn select_outputs(&self, rows: &[usize]) -> Array2<f64> {
        self.outputs().select(Axis(0), rows)
    }
}

/// Validate the declared block sizes against the file width and return the
/// effective output count.
fn resolve_counts(total: usize, n_inputs: usize, n_outputs: Option<usize>) -> Result<usize> {
    if n_inputs == 0 {
        return Err(PrepError::Schema("n_inputs must be at least 1".to_string()));
    }
    if n_inputs > total {
        return Err(PrepError::Schema(format!(
            "n_inputs ({}) exceeds total columns ({})",
            n_inputs, total
        )));
    }

    let n_outputs = n_outputs.unwrap_or(total - n_inputs);
    if n_outputs == 0 {
        return Err(PrepError::Schema(format!(
            "no output columns: n_inputs ({}) consumes all {} columns",
            n_inputs, total
        )));
    }
    if n_inputs.checked_add(n_outputs).map_or(true, |used| used > total) {
        return Err(PrepError::Schema(format!(
            "n_inputs ({}) + n_outputs ({}) exceeds total columns ({})",
            n_inputs, n_outputs, total
        )));
    }
    Ok(n_outputs)
}

/// Data loader for delimited simulation files
pub struct DataLoader {
    delimiter: u8,
}

impl Default for DataLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl DataLoader {
    /// Create a comma-separated loader
    pub fn new() -> Self {
        Self { delimiter: b',' }
    }

    /// Set the field delimiter
    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Read the raw CSV (header row required) into a DataFrame
    pub fn load_csv(&self, path: &Path) -> Result<DataFrame> {
        if !path.exists() {
            return Err(PrepError::FileNotFound { path: path.to_path_buf() });
        }

        let parse_opts = CsvParseOptions::default().with_separator(self.delimiter);

        // Reader failures (ragged rows, bad quoting) are shape problems of this file.
        let df = CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(None)
            .with_parse_options(parse_opts)
            .try_into_reader_with_file_path(Some(path.to_path_buf()))
            .and_then(|reader| reader.finish())
            .map_err(|e| PrepError::Schema(format!("{}: {}", path.display(), e)))?;

        Ok(df)
    }

    /// Load a CSV file and slice it into input/output blocks
    pub fn load_table(
        &self,
        path: impl AsRef<Path>,
        n_inputs: usize,
        n_outputs: Option<usize>,
    ) -> Result<Table> {
        let path = path.as_ref();
        let start = Instant::now();

        let df = self.load_csv(path)?;
        // Count checks come before type checks so a wrong n_inputs is reported as such.
        resolve_counts(df.width(), n_inputs, n_outputs)?;

        let (columns, data) = frame_to_array(&df)?;
        let table = Table::new(columns, data, n_inputs, n_outputs)?.with_source(path);

        info!(
            path = %path.display(),
            rows = table.n_rows(),
            inputs = table.n_inputs(),
            outputs = table.n_outputs(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Loaded table"
        );
        Ok(table)
    }

    /// Get file info without building a table
    pub fn get_file_info(&self, path: &Path) -> Result<FileInfo> {
        if !path.exists() {
            return Err(PrepError::FileNotFound { path: path.to_path_buf() });
        }
        let file_size = std::fs::metadata(path)?.len();

        let reader = BufReader::new(File::open(path)?);
        let mut lines = reader.lines();

        let header = lines.next().transpose()?.unwrap_or_default();
        let delimiter = self.delimiter as char;
        let columns: Vec<String> = header
            .split(delimiter)
            .map(|s| s.trim().trim_matches('"').to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let mut n_rows = 0;
        for line in lines {
            if !line?.trim().is_empty() {
                n_rows += 1;
            }
        }

        Ok(FileInfo {
            path: path.to_path_buf(),
            file_size,
            n_rows,
            n_cols: columns.len(),
            columns,
        })
    }
}

/// Convert every column to `f64`, rejecting missing or non-numeric cells.
fn frame_to_array(df: &DataFrame) -> Result<(Vec<String>, Array2<f64>)> {
    let mut data = Array2::<f64>::zeros((df.height(), df.width()));
    let mut names = Vec::with_capacity(df.width());

    for (j, column) in df.get_columns().iter().enumerate() {
        let name = column.name().to_string();
        let series = column.as_materialized_series();

        let dtype = series.dtype();
        if !dtype.is_primitive_numeric() && dtype != &DataType::String {
            return Err(PrepError::Schema(format!(
                "column '{}' is not numeric ({})",
                name, dtype
            )));
        }

        let missing = series.null_count();
        if missing > 0 {
            return Err(PrepError::Schema(format!(
                "column '{}' has {} missing values",
                name, missing
            )));
        }

        // Non-strict cast: unparseable cells become null.
        let cast = series.cast(&DataType::Float64)?;
        if cast.null_count() > 0 {
            return Err(PrepError::Schema(format!(
                "column '{}' is not numeric ({})",
                name,
                series.dtype()
            )));
        }

        for (i, value) in cast.f64()?.into_iter().enumerate() {
            match value {
                Some(v) if v.is_finite() => data[[i, j]] = v,
                _ => {
                    return Err(PrepError::Schema(format!(
                        "column '{}' has a non-finite value at row {}",
                        name, i
                    )))
                }
            }
        }
        names.push(name);
    }

    debug!(rows = data.nrows(), cols = data.ncols(), "Converted frame to array");
    Ok((names, data))
}

/// File information
#[derive(Debug, Clone)]
pub struct FileInfo {
    pub path: PathBuf,
    pub file_size: u64,
    pub n_rows: usize,
    pub n_cols: usize,
    pub columns: Vec<String>,
}

/// Save named numeric blocks as CSV
pub struct DataSaver;

impl DataSaver {
    /// Build a DataFrame from column names and a matrix
    pub fn array_to_frame(names: &[String], data: &Array2<f64>) -> Result<DataFrame> {
        if names.len() != data.ncols() {
            return Err(PrepError::Shape {
                expected: format!("{} columns", names.len()),
                actual: format!("{} columns", data.ncols()),
            });
        }

        let columns: Vec<Column> = names
            .iter()
            .zip(data.axis_iter(Axis(1)))
            .map(|(name, col)| Column::new(name.as_str().into(), col.to_vec()))
            .collect();

        Ok(DataFrame::new(columns)?)
    }

    /// Save to CSV with a header row
    pub fn save_csv(df: &mut DataFrame, path: &Path) -> Result<()> {
        let mut file = File::create(path)?;

        CsvWriter::new(&mut file)
            .include_header(true)
            .finish(df)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_test_csv(contents: &[&str]) -> NamedTempFile {
        let mut file = tempfile::Builder::new()
            .suffix(".csv")
            .tempfile()
            .unwrap();
        for line in contents {
            writeln!(file, "{}", line).unwrap();
        }
        file
    }

    #[test]
    fn test_load_table_blocks() {
        let file = create_test_csv(&["x1,x2,y1,y2,t", "1,2,3,4,0", "5,6,7,8,1", "9,10,11,12,2"]);
        let table = DataLoader::new().load_table(file.path(), 2, Some(2)).unwrap();

        assert_eq!(table.n_rows(), 3);
        assert_eq!(table.n_columns(), 5);
        assert_eq!(table.input_names(), &["x1".to_string(), "x2".to_string()]);
        assert_eq!(table.output_names(), &["y1".to_string(), "y2".to_string()]);
        assert_eq!(table.inputs()[[1, 1]], 6.0);
        assert_eq!(table.outputs()[[2, 0]], 11.0);
        assert_eq!(table.source(), Some(file.path()));
    }

    #[test]
    fn test_derived_output_count() {
        let file = create_test_csv(&["a,b,c", "1,2,3", "4,5,6"]);
        let table = DataLoader::new().load_table(file.path(), 1, None).unwrap();
        assert_eq!(table.n_outputs(), 2);
    }

    #[test]
    fn test_missing_file() {
        let err = DataLoader::new()
            .load_table("/definitely/not/here.csv", 2, None)
            .unwrap_err();
        assert!(matches!(err, PrepError::FileNotFound { .. }));
    }

    #[test]
    fn test_too_many_inputs() {
        let file = create_test_csv(&["a,b,c", "1,2,3"]);
        let err = DataLoader::new().load_table(file.path(), 4, None).unwrap_err();
        assert!(matches!(err, PrepError::Schema(_)));
        assert!(err.to_string().contains("n_inputs (4)"));
    }

    #[test]
    fn test_outputs_overflow() {
        let file = create_test_csv(&["a,b,c", "1,2,3"]);
        let err = DataLoader::new().load_table(file.path(), 2, Some(2)).unwrap_err();
        assert!(matches!(err, PrepError::Schema(_)));
    }

    #[test]
    fn test_non_numeric_column() {
        let file = create_test_csv(&["a,b", "1,foo", "2,bar"]);
        let err = DataLoader::new().load_table(file.path(), 1, None).unwrap_err();
        assert!(err.to_string().contains("'b'"));
    }

    #[test]
    fn test_output_count_overflow() {
        let file = create_test_csv(&["a,b,c", "1,2,3"]);
        let err = DataLoader::new()
            .load_table(file.path(), 2, Some(usize::MAX))
            .unwrap_err();
        assert!(matches!(err, PrepError::Schema(_)));
    }

    #[test]
    fn test_ragged_row_names_path() {
        let file = create_test_csv(&["a,b,c", "1,2,3", "4,5,6,7", "8,9,10"]);
        let err = DataLoader::new().load_table(file.path(), 1, None).unwrap_err();
        assert!(matches!(err, PrepError::Schema(_)));
        assert!(err.to_string().contains(&file.path().display().to_string()));
    }

    #[test]
    fn test_boolean_column_rejected() {
        let file = create_test_csv(&["a,b", "1,true", "2,false", "3,true"]);
        let err = DataLoader::new().load_table(file.path(), 1, None).unwrap_err();
        assert!(matches!(err, PrepError::Schema(_)));
        assert!(err.to_string().contains("'b'"));
    }

    #[test]
    fn test_missing_value() {
        let file = create_test_csv(&["a,b", "1,2", "3,"]);
        let err = DataLoader::new().load_table(file.path(), 1, None).unwrap_err();
        assert!(matches!(err, PrepError::Schema(_)));
    }

    #[test]
    fn test_select_rows() {
        let file = create_test_csv(&["x,y", "1,10", "2,20", "3,30"]);
        let table = DataLoader::new().load_table(file.path(), 1, None).unwrap();
        let y = table.select_outputs(&[2, 0]);
        assert_eq!(y[[0, 0]], 30.0);
        assert_eq!(y[[1, 0]], 10.0);
    }

    #[test]
    fn test_get_file_info() {
        let file = create_test_csv(&["a,b,c", "1,2,3", "4,5,6", "7,8,9"]);
        let info = DataLoader::new().get_file_info(file.path()).unwrap();

        assert_eq!(info.n_rows, 3);
        assert_eq!(info.n_cols, 3);
        assert_eq!(info.columns, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_save_csv_reloads() {
        let names = vec!["p".to_string(), "q".to_string()];
        let data = ndarray::array![[0.0, 1.0], [0.5, 0.25]];
        let mut df = DataSaver::array_to_frame(&names, &data).unwrap();

        let file = NamedTempFile::new().unwrap();
        DataSaver::save_csv(&mut df, file.path()).unwrap();

        let table = DataLoader::new().load_table(file.path(), 1, None).unwrap();
        assert_eq!(table.n_rows(), 2);
        assert_eq!(table.outputs()[[1, 0]], 0.25);
    }
}
