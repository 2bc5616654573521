//! Data preprocessing module
//!
//! Provides the scaling and partitioning stage of the pipeline:
//! - Column-wise scalers (min-max onto a target range, standardization)
//! - Seeded train/test hold-out splits and K-fold splits
//! - [`ScaledSplit`], whose transforms are fitted on the train partition only

mod config;
mod scaler;
pub mod split;

pub use config::{ScalingConfig, SplitConfig};
pub use scaler::{ColumnParams, FeatureRange, MinMaxScaler, StandardScaler};
pub use split::{Fold, KFold, ScaledSplit, TrainTestSplitter};
