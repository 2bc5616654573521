//! Artifact export
//!
//! Writes what an external model exporter consumes: the fitted transform
//! parameters as JSON and the scaled train/test blocks as CSV, plus a small
//! manifest describing the run. Every path is joined onto the configured
//! working directory.

use ndarray::{concatenate, Axis};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::error::{PrepError, Result};
use crate::pipeline::{PipelineConfig, PreparedData};
use crate::preprocessing::MinMaxScaler;
use crate::training::EvaluationReport;
use crate::utils::DataSaver;

/// Both fitted transforms, in the form written to `<equation>_scalers.json`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScalerArtifact {
    pub equation: String,
    pub input_names: Vec<String>,
    pub output_names: Vec<String>,
    pub inputs: MinMaxScaler,
    pub outputs: MinMaxScaler,
}

impl ScalerArtifact {
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(PrepError::FileNotFound { path: path.to_path_buf() });
        }
        let reader = BufReader::new(File::open(path)?);
        Ok(serde_json::from_reader(reader)?)
    }
}

/// Summary of one preparation run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrepManifest {
    pub equation: String,
    pub source: PathBuf,
    pub tool_version: String,
    pub n_rows: usize,
    pub n_inputs: usize,
    pub n_outputs: usize,
    pub selected_label: Option<i64>,
    /// `(label, size)` pairs, empty when clustering was off
    pub cluster_sizes: Vec<(i64, usize)>,
    pub n_selected: usize,
    pub n_train: usize,
    pub n_test: usize,
    pub seed: Option<u64>,
}

/// Paths written by [`ArtifactWriter::write`]
#[derive(Debug, Clone)]
pub struct ArtifactPaths {
    pub scalers: PathBuf,
    pub train: PathBuf,
    pub test: PathBuf,
    pub manifest: PathBuf,
}

/// Writes preparation artifacts into a working directory
pub struct ArtifactWriter {
    workdir: PathBuf,
    equation: String,
}

impl ArtifactWriter {
    pub fn new(workdir: impl Into<PathBuf>, equation: impl Into<String>) -> Self {
        Self {
            workdir: workdir.into(),
            equation: equation.into(),
        }
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(&config.workdir, &config.equation)
    }

    /// Path of an artifact with the given suffix, e.g. `train.csv`
    pub fn path_for(&self, suffix: &str) -> PathBuf {
        self.workdir.join(format!("{}_{}", self.equation, suffix))
    }

    /// Write scalers, scaled partitions and the manifest for one run
    pub fn write(&self, prepared: &PreparedData, config: &PipelineConfig) -> Result<ArtifactPaths> {
        fs::create_dir_all(&self.workdir)?;

        let table = &prepared.table;
        let split = &prepared.split;

        let paths = ArtifactPaths {
            scalers: self.path_for("scalers.json"),
            train: self.path_for("train.csv"),
            test: self.path_for("test.csv"),
            manifest: self.path_for("manifest.json"),
        };

        let scalers = ScalerArtifact {
            equation: self.equation.clone(),
            input_names: table.input_names().to_vec(),
            output_names: table.output_names().to_vec(),
            inputs: split.x_scaler.clone(),
            outputs: split.y_scaler.clone(),
        };
        write_json(&paths.scalers, &scalers)?;

        let names: Vec<String> = table
            .input_names()
            .iter()
            .chain(table.output_names())
            .cloned()
            .collect();

        let train = concatenate(Axis(1), &[split.x_train.view(), split.y_train.view()])?;
        DataSaver::save_csv(&mut DataSaver::array_to_frame(&names, &train)?, &paths.train)?;

        let test = concatenate(Axis(1), &[split.x_test.view(), split.y_test.view()])?;
        DataSaver::save_csv(&mut DataSaver::array_to_frame(&names, &test)?, &paths.test)?;

        let manifest = PrepManifest {
            equation: self.equation.clone(),
            source: table.source().map(Path::to_path_buf).unwrap_or_default(),
            tool_version: env!("CARGO_PKG_VERSION").to_string(),
            n_rows: table.n_rows(),
            n_inputs: table.n_inputs(),
            n_outputs: table.n_outputs(),
            selected_label: prepared.selected_label,
            cluster_sizes: prepared
                .assignment
                .as_ref()
                .map(|a| a.sizes())
                .unwrap_or_default(),
            n_selected: prepared.selected_rows.len(),
            n_train: split.n_train(),
            n_test: split.n_test(),
            seed: config.split.seed,
        };
        write_json(&paths.manifest, &manifest)?;

        info!(
            workdir = %self.workdir.display(),
            equation = %self.equation,
            "Wrote preparation artifacts"
        );
        Ok(paths)
    }

    /// Write a model evaluation as `<equation>_<family tag>_report.json`
    pub fn write_report(&self, report: &EvaluationReport) -> Result<PathBuf> {
        fs::create_dir_all(&self.workdir)?;
        let path = self.path_for(&format!("{}_report.json", report.family.tag()));
        write_json(&path, report)?;
        info!(path = %path.display(), model = %report.model, "Wrote evaluation report");
        Ok(path)
    }
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(writer, value)?;
    Ok(())
}
