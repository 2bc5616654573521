//! Preprocessing configuration

use crate::error::{PrepError, Result};
use serde::{Deserialize, Serialize};
use super::FeatureRange;

/// Configuration for the train/test split
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SplitConfig {
    /// Fraction of rows held out for testing, in `[0, 1)`
    pub test_fraction: f64,

    /// Shuffle rows before splitting. When false the leading rows train.
    pub shuffle: bool,

    /// Random seed for reproducibility; `None` draws from entropy
    pub seed: Option<u64>,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            test_fraction: 0.1,
            shuffle: true,
            seed: None,
        }
    }
}

impl SplitConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_test_fraction(mut self, test_fraction: f64) -> Self {
        self.test_fraction = test_fraction;
        self
    }

    pub fn with_shuffle(mut self, shuffle: bool) -> Self {
        self.shuffle = shuffle;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !(0.0..1.0).contains(&self.test_fraction) {
            return Err(PrepError::Config(format!(
                "test_fraction must lie in [0, 1), got {}",
                self.test_fraction
            )));
        }
        Ok(())
    }
}

/// Target ranges for the input and output min-max transforms
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScalingConfig {
    pub input_range: FeatureRange,
    pub output_range: FeatureRange,
}

impl Default for ScalingConfig {
    fn default() -> Self {
        Self {
            input_range: FeatureRange::default(),
            output_range: FeatureRange::default(),
        }
    }
}

impl ScalingConfig {
    pub fn with_input_range(mut self, range: FeatureRange) -> Self {
        self.input_range = range;
        self
    }

    pub fn with_output_range(mut self, range: FeatureRange) -> Self {
        self.output_range = range;
        self
    }

    pub fn validate(&self) -> Result<()> {
        self.input_range.validate()?;
        self.output_range.validate()
    }
}
