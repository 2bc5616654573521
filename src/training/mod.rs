//! Regime clustering and the model plugin seam
//!
//! - Clustering (standardization + DBSCAN) to isolate one operating regime
//! - The [`SurrogateModel`] trait that external model families implement
//! - Regression metrics and test-partition evaluation

pub mod clustering;
mod models;

pub use clustering::{ClusterAssignment, ClusterSelection, Clusterer, ClusteringConfig, DBSCAN, NOISE};
pub use models::{evaluate, EvaluationReport, MeanBaseline, ModelFamily, RegressionMetrics, SurrogateModel};
