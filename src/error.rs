//! Error types for the surrogate data-preparation pipeline

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, PrepError>;

/// Which block of a table a column belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Block {
    Inputs,
    Outputs,
}

impl std::fmt::Display for Block {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Block::Inputs => write!(f, "inputs"),
            Block::Outputs => write!(f, "outputs"),
        }
    }
}

/// Main error type. Every variant is fatal to the current run.
#[derive(Error, Debug)]
pub enum PrepError {
    #[error("File not found: {}", path.display())]
    FileNotFound { path: PathBuf },

    #[error("Schema error: {0}")]
    Schema(String),

    #[error("Degenerate column '{column}' in {block}: constant on the train partition")]
    DegenerateColumn { block: Block, column: String },

    #[error("Cluster {label} has no member rows (available labels: {available:?})")]
    ClusterEmpty { label: i64, available: Vec<i64> },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Data error: {0}")]
    Data(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Invalid shape: expected {expected}, got {actual}")]
    Shape { expected: String, actual: String },

    #[error("Model not fitted")]
    ModelNotFitted,
}

impl From<polars::error::PolarsError> for PrepError {
    fn from(err: polars::error::PolarsError) -> Self {
        PrepError::Data(err.to_string())
    }
}

impl From<serde_json::Error> for PrepError {
    fn from(err: serde_json::Error) -> Self {
        PrepError::Serialization(err.to_string())
    }
}

impl From<ndarray::ShapeError> for PrepError {
    fn from(err: ndarray::ShapeError) -> Self {
        PrepError::Shape {
            expected: "valid shape".to_string(),
            actual: err.to_string(),
        }
    }
}
