//! Preparation pipeline: load → cluster/select → split → scale
//!
//! One [`PrepPipeline`] replaces the per-model training scripts. It takes an
//! explicit [`PipelineConfig`] and returns everything a model family needs
//! as values.

mod config;

pub use config::{Hyperparameters, PipelineConfig};

use crate::error::Result;
use crate::preprocessing::{KFold, ScaledSplit, TrainTestSplitter};
use crate::training::{ClusterAssignment, Clusterer};
use crate::utils::{DataLoader, Table};
use std::path::PathBuf;
use std::time::Instant;
use tracing::{debug, info};

/// Output of a preparation run
#[derive(Debug, Clone)]
pub struct PreparedData {
    pub table: Table,
    /// Present when clustering was configured
    pub assignment: Option<ClusterAssignment>,
    /// Label whose rows were kept, when clustering was configured
    pub selected_label: Option<i64>,
    /// Row indices (into `table`) that entered the split
    pub selected_rows: Vec<usize>,
    pub split: ScaledSplit,
}

/// Loaded and filtered rows, before splitting
struct Selection {
    table: Table,
    assignment: Option<ClusterAssignment>,
    selected_label: Option<i64>,
    rows: Vec<usize>,
}

/// Parameterized preparation pipeline
pub struct PrepPipeline {
    config: PipelineConfig,
    loader: DataLoader,
}

impl PrepPipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            config,
            loader: DataLoader::new(),
        }
    }

    /// Use a custom loader (e.g. a different delimiter)
    pub fn with_loader(mut self, loader: DataLoader) -> Self {
        self.loader = loader;
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run the full pipeline and produce a single hold-out split
    pub fn run(&self) -> Result<PreparedData> {
        let start = Instant::now();
        let selection = self.load_and_select()?;

        let splitter = TrainTestSplitter::new(self.config.split.clone());
        let (train, test) = splitter.split(&selection.rows)?;
        let split = ScaledSplit::fit(&selection.table, train, test, &self.config.scaling)?;

        info!(
            equation = %self.config.equation,
            selected = selection.rows.len(),
            train = split.n_train(),
            test = split.n_test(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Prepared scaled split"
        );

        Ok(PreparedData {
            table: selection.table,
            assignment: selection.assignment,
            selected_label: selection.selected_label,
            selected_rows: selection.rows,
            split,
        })
    }

    /// Run load and selection, then produce one scaled split per fold.
    ///
    /// Each fold fits its own transforms on its own train rows.
    pub fn run_folds(&self, n_splits: usize) -> Result<Vec<ScaledSplit>> {
        let selection = self.load_and_select()?;

        let folds = KFold::new(n_splits)
            .with_shuffle(self.config.split.shuffle)
            .with_seed(self.config.split.seed)
            .split(&selection.rows)?;

        let splits = folds
            .into_iter()
            .map(|fold| {
                debug!(fold = fold.fold_idx, train = fold.train.len(), test = fold.test.len(), "Scaling fold");
                ScaledSplit::fit(&selection.table, fold.train, fold.test, &self.config.scaling)
            })
            .collect::<Result<Vec<_>>>()?;

        info!(equation = %self.config.equation, folds = splits.len(), "Prepared K-fold splits");
        Ok(splits)
    }

    fn load_and_select(&self) -> Result<Selection> {
        self.config.validate()?;

        let table = self
            .loader
            .load_table(&self.config.source, self.config.n_inputs, self.config.n_outputs)?;

        let Some(clustering) = &self.config.clustering else {
            let rows = (0..table.n_rows()).collect();
            return Ok(Selection {
                table,
                assignment: None,
                selected_label: None,
                rows,
            });
        };

        let assignment = Clusterer::new(clustering.clone()).cluster(&table.outputs())?;
        let (label, members) = assignment.select(clustering.selection)?;
        let rows = members.to_vec();
        info!(label, rows = rows.len(), of = table.n_rows(), "Selected cluster");

        Ok(Selection {
            table,
            assignment: Some(assignment),
            selected_label: Some(label),
            rows,
        })
    }
}

/// Prepare data for one equation.
///
/// Positional arguments mirror the training-script entry point; anything
/// else comes from `hyper` or the defaults.
pub fn prepare(
    equation: &str,
    workdir: impl Into<PathBuf>,
    n_inputs: usize,
    n_outputs: Option<usize>,
    source: impl Into<PathBuf>,
    hyper: Option<&Hyperparameters>,
) -> Result<PreparedData> {
    let mut config = PipelineConfig::new(equation, workdir, n_inputs, source);
    config.n_outputs = n_outputs;
    if let Some(hyper) = hyper {
        config = hyper.apply(config);
    }
    PrepPipeline::new(config).run()
}
