//! Train/test partitioning and the leakage-free scaled split

use crate::error::{Block, PrepError, Result};
use crate::utils::Table;
use ndarray::Array2;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{MinMaxScaler, ScalingConfig, SplitConfig};

fn make_rng(seed: Option<u64>) -> ChaCha8Rng {
    match seed {
        Some(seed) => ChaCha8Rng::seed_from_u64(seed),
        None => ChaCha8Rng::from_entropy(),
    }
}

/// Random (or ordered) hold-out splitter
#[derive(Debug, Clone)]
pub struct TrainTestSplitter {
    config: SplitConfig,
}

impl TrainTestSplitter {
    pub fn new(config: SplitConfig) -> Self {
        Self { config }
    }

    /// Number of train rows for `n` rows: `round((1 - test_fraction) * n)`
    pub fn n_train(&self, n: usize) -> usize {
        let n_train = ((1.0 - self.config.test_fraction) * n as f64).round() as usize;
        n_train.min(n)
    }

    /// Partition `rows` into `(train, test)`.
    ///
    /// With shuffling on, both halves come out in shuffled order.
    pub fn split(&self, rows: &[usize]) -> Result<(Vec<usize>, Vec<usize>)> {
        self.config.validate()?;

        let mut order = rows.to_vec();
        if self.config.shuffle {
            let mut rng = make_rng(self.config.seed);
            order.shuffle(&mut rng);
        }

        let n_train = self.n_train(order.len());
        if n_train == 0 {
            return Err(PrepError::Config(format!(
                "test_fraction {} leaves no train rows out of {}",
                self.config.test_fraction,
                order.len()
            )));
        }

        let test = order.split_off(n_train);
        debug!(train = order.len(), test = test.len(), "Split rows");
        Ok((order, test))
    }
}

/// A single K-fold split
#[derive(Debug, Clone)]
pub struct Fold {
    pub fold_idx: usize,
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

/// K-fold splitter over an arbitrary row subset
#[derive(Debug, Clone)]
pub struct KFold {
    n_splits: usize,
    shuffle: bool,
    seed: Option<u64>,
}

impl KFold {
    pub fn new(n_splits: usize) -> Self {
        Self {
            n_splits,
            shuffle: true,
            seed: None,
        }
    }

    pub fn with_shuffle(mut self, shuffle: bool) -> Self {
        self.shuffle = shuffle;
        self
    }

    pub fn with_seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }

    /// Generate folds; the first `n % k` folds take one extra test row
    pub fn split(&self, rows: &[usize]) -> Result<Vec<Fold>> {
        let n_samples = rows.len();
        if self.n_splits < 2 {
            return Err(PrepError::Config("n_splits must be at least 2".to_string()));
        }
        if n_samples < self.n_splits {
            return Err(PrepError::Config(format!(
                "n_samples ({}) must be >= n_splits ({})",
                n_samples, self.n_splits
            )));
        }

        let mut order = rows.to_vec();
        if self.shuffle {
            let mut rng = make_rng(self.seed);
            order.shuffle(&mut rng);
        }

        let base = n_samples / self.n_splits;
        let remainder = n_samples % self.n_splits;

        let mut folds = Vec::with_capacity(self.n_splits);
        let mut start = 0;
        for fold_idx in 0..self.n_splits {
            let size = if fold_idx < remainder { base + 1 } else { base };
            let end = start + size;

            let test = order[start..end].to_vec();
            let train = order[..start]
                .iter()
                .chain(&order[end..])
                .copied()
                .collect();

            folds.push(Fold { fold_idx, train, test });
            start = end;
        }

        Ok(folds)
    }
}

/// Train/test partitions of a table, scaled by transforms fitted on train only
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScaledSplit {
    /// Row indices into the source table
    pub train_rows: Vec<usize>,
    pub test_rows: Vec<usize>,
    pub x_train: Array2<f64>,
    pub y_train: Array2<f64>,
    pub x_test: Array2<f64>,
    pub y_test: Array2<f64>,
    pub x_scaler: MinMaxScaler,
    pub y_scaler: MinMaxScaler,
}

impl ScaledSplit {
    /// Fit both transforms on `train_rows` and apply them to both partitions
    pub fn fit(
        table: &Table,
        train_rows: Vec<usize>,
        test_rows: Vec<usize>,
        scaling: &ScalingConfig,
    ) -> Result<Self> {
        let mut x_scaler = MinMaxScaler::new(Block::Inputs, scaling.input_range);
        let mut y_scaler = MinMaxScaler::new(Block::Outputs, scaling.output_range);

        let x_train = x_scaler.fit_transform(&table.select_inputs(&train_rows), table.input_names())?;
        let y_train = y_scaler.fit_transform(&table.select_outputs(&train_rows), table.output_names())?;
        let x_test = x_scaler.transform(&table.select_inputs(&test_rows))?;
        let y_test = y_scaler.transform(&table.select_outputs(&test_rows))?;

        Ok(Self {
            train_rows,
            test_rows,
            x_train,
            y_train,
            x_test,
            y_test,
            x_scaler,
            y_scaler,
        })
    }

    pub fn n_train(&self) -> usize {
        self.train_rows.len()
    }

    pub fn n_test(&self) -> usize {
        self.test_rows.len()
    }

    /// Map scaled output predictions back to original units
    pub fn unscale_outputs(&self, y: &Array2<f64>) -> Result<Array2<f64>> {
        self.y_scaler.inverse_transform(y)
    }
}
