//! surrogate-prep - Data preparation for equation surrogate models
//!
//! Turns a per-equation simulation dump into a train/test split ready for a
//! surrogate model:
//! - Loading a CSV table and splitting it into input and output blocks
//! - Regime clustering of the outputs with DBSCAN
//! - Seeded train/test (or K-fold) splitting
//! - Per-column min-max scaling fitted on the train partition only
//!
//! # Modules
//!
//! - [`utils`] - CSV loading and saving
//! - [`training`] - Clustering, the model plugin seam and metrics
//! - [`preprocessing`] - Scalers and splitters
//! - [`pipeline`] - The parameterized preparation pipeline
//! - [`export`] - Artifact export (scalers, scaled partitions, manifest)
//! - [`cli`] - Command-line interface

// Core error handling
pub mod error;

pub mod utils;
pub mod preprocessing;
pub mod training;
pub mod pipeline;
pub mod export;

// Services
pub mod cli;

pub use error::{Block, PrepError, Result};

/// Re-export commonly used types
pub mod prelude {
    // Error handling
    pub use crate::error::{Block, PrepError, Result};

    // Data
    pub use crate::utils::{DataLoader, DataSaver, FileInfo, Table};

    // Preprocessing
    pub use crate::preprocessing::{
        FeatureRange, KFold, MinMaxScaler, ScaledSplit, ScalingConfig, SplitConfig, TrainTestSplitter,
    };

    // Clustering and models
    pub use crate::training::{
        evaluate, ClusterAssignment, ClusterSelection, Clusterer, ClusteringConfig, MeanBaseline,
        RegressionMetrics, SurrogateModel,
    };

    // Pipeline
    pub use crate::pipeline::{prepare, Hyperparameters, PipelineConfig, PrepPipeline, PreparedData};

    // Export
    pub use crate::export::{ArtifactWriter, PrepManifest, ScalerArtifact};
}
