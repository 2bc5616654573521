//! Pipeline configuration

use crate::error::{PrepError, Result};
use crate::preprocessing::{FeatureRange, ScalingConfig, SplitConfig};
use crate::training::{ClusterSelection, ClusteringConfig};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Everything one preparation run needs.
///
/// Paths are used as given; nothing is resolved against the process
/// working directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Equation identifier, used to name artifacts
    pub equation: String,

    /// Directory that receives artifacts
    pub workdir: PathBuf,

    /// Source CSV file
    pub source: PathBuf,

    /// Number of leading input columns
    pub n_inputs: usize,

    /// Number of output columns after the inputs; `None` takes all remaining
    #[serde(default)]
    pub n_outputs: Option<usize>,

    /// Regime clustering; `None` keeps every row
    #[serde(default = "default_clustering")]
    pub clustering: Option<ClusteringConfig>,

    #[serde(default)]
    pub split: SplitConfig,

    #[serde(default)]
    pub scaling: ScalingConfig,
}

fn default_clustering() -> Option<ClusteringConfig> {
    Some(ClusteringConfig::default())
}

impl PipelineConfig {
    /// Create a configuration with default clustering, split and scaling
    pub fn new(
        equation: impl Into<String>,
        workdir: impl Into<PathBuf>,
        n_inputs: usize,
        source: impl Into<PathBuf>,
    ) -> Self {
        Self {
            equation: equation.into(),
            workdir: workdir.into(),
            source: source.into(),
            n_inputs,
            n_outputs: None,
            clustering: default_clustering(),
            split: SplitConfig::default(),
            scaling: ScalingConfig::default(),
        }
    }

    pub fn with_n_outputs(mut self, n_outputs: usize) -> Self {
        self.n_outputs = Some(n_outputs);
        self
    }

    pub fn with_clustering(mut self, clustering: ClusteringConfig) -> Self {
        self.clustering = Some(clustering);
        self
    }

    /// Keep every row instead of one cluster
    pub fn without_clustering(mut self) -> Self {
        self.clustering = None;
        self
    }

    pub fn with_split(mut self, split: SplitConfig) -> Self {
        self.split = split;
        self
    }

    pub fn with_scaling(mut self, scaling: ScalingConfig) -> Self {
        self.scaling = scaling;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.split.seed = Some(seed);
        self
    }

    /// Check every field that can be checked without reading the source
    pub fn validate(&self) -> Result<()> {
        if self.equation.trim().is_empty() {
            return Err(PrepError::Config("equation identifier must not be empty".to_string()));
        }
        if self
            .equation
            .chars()
            .any(|c| std::path::is_separator(c) || c.is_control())
        {
            return Err(PrepError::Config(format!(
                "equation identifier '{}' is not usable in a file name",
                self.equation
            )));
        }
        if self.n_inputs == 0 {
            return Err(PrepError::Config("n_inputs must be at least 1".to_string()));
        }
        if self.n_outputs == Some(0) {
            return Err(PrepError::Config("n_outputs must be at least 1".to_string()));
        }
        if let Some(clustering) = &self.clustering {
            clustering.validate()?;
        }
        self.split.validate()?;
        self.scaling.validate()
    }

    /// Load a configuration from a JSON file
    pub fn from_json_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(PrepError::FileNotFound { path: path.to_path_buf() });
        }
        let text = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text)?;
        Ok(config)
    }

    /// Save the configuration as pretty-printed JSON
    pub fn to_json_file(&self, path: &Path) -> Result<()> {
        let text = serde_json::to_string_pretty(self)?;
        std::fs::write(path, text)?;
        Ok(())
    }
}

/// Optional knobs accepted by [`crate::pipeline::prepare`]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Hyperparameters {
    pub min_samples: Option<usize>,
    pub eps: Option<f64>,
    pub selection: Option<ClusterSelection>,
    pub test_fraction: Option<f64>,
    pub seed: Option<u64>,
    pub input_range: Option<FeatureRange>,
    pub output_range: Option<FeatureRange>,
}

impl Hyperparameters {
    /// Overlay the set fields onto `config`
    pub fn apply(&self, mut config: PipelineConfig) -> PipelineConfig {
        if self.min_samples.is_some() || self.eps.is_some() || self.selection.is_some() {
            let mut clustering = config.clustering.take().unwrap_or_default();
            if let Some(min_samples) = self.min_samples {
                clustering.min_samples = min_samples;
            }
            if let Some(eps) = self.eps {
                clustering.eps = eps;
            }
            if let Some(selection) = self.selection {
                clustering.selection = selection;
            }
            config.clustering = Some(clustering);
        }
        if let Some(test_fraction) = self.test_fraction {
            config.split.test_fraction = test_fraction;
        }
        if let Some(seed) = self.seed {
            config.split.seed = Some(seed);
        }
        if let Some(range) = self.input_range {
            config.scaling.input_range = range;
        }
        if let Some(range) = self.output_range {
            config.scaling.output_range = range;
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn base() -> PipelineConfig {
        PipelineConfig::new("1403", "/tmp/work", 16, "/tmp/eq_1403.csv")
    }

    #[test]
    fn test_defaults() {
        let config = base();
        assert!(config.validate().is_ok());
        let clustering = config.clustering.unwrap();
        assert_eq!(clustering.min_samples, 5);
        assert_eq!(clustering.eps, 5.0);
        assert_eq!(config.split.test_fraction, 0.1);
        assert_eq!(config.scaling.input_range, FeatureRange::default());
    }

    #[test]
    fn test_validation() {
        assert!(PipelineConfig::new("", "/w", 1, "/s.csv").validate().is_err());
        assert!(PipelineConfig::new("a/b", "/w", 1, "/s.csv").validate().is_err());
        assert!(PipelineConfig::new("eq", "/w", 0, "/s.csv").validate().is_err());
        assert!(base().with_n_outputs(0).validate().is_err());
        assert!(base()
            .with_clustering(ClusteringConfig::new().with_eps(-1.0))
            .validate()
            .is_err());
        assert!(base().without_clustering().validate().is_ok());
    }

    #[test]
    fn test_json_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        let config = base().with_n_outputs(110).with_seed(9);
        config.to_json_file(&path).unwrap();

        let loaded = PipelineConfig::from_json_file(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_minimal_json_uses_defaults() {
        let json = r#"{"equation": "2134", "workdir": "w", "source": "eq.csv", "n_inputs": 14}"#;
        let config: PipelineConfig = serde_json::from_str(json).unwrap();
        assert!(config.clustering.is_some());
        assert_eq!(config.n_outputs, None);
        assert!(config.split.shuffle);
    }

    #[test]
    fn test_explicit_null_disables_clustering() {
        let json = r#"{"equation": "e", "workdir": "w", "source": "s.csv", "n_inputs": 2, "clustering": null}"#;
        let config: PipelineConfig = serde_json::from_str(json).unwrap();
        assert!(config.clustering.is_none());
    }

    #[test]
    fn test_hyperparameters_overlay() {
        let hyper = Hyperparameters {
            eps: Some(10.0),
            test_fraction: Some(0.2),
            seed: Some(1),
            ..Default::default()
        };
        let config = hyper.apply(base().without_clustering());
        let clustering = config.clustering.unwrap();
        assert_eq!(clustering.eps, 10.0);
        assert_eq!(clustering.min_samples, 5);
        assert_eq!(config.split.test_fraction, 0.2);
        assert_eq!(config.split.seed, Some(1));
    }
}
