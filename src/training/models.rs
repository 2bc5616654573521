//! Model plugin seam and regression metrics
//!
//! Model families (feed-forward networks, Gaussian processes, boosted trees)
//! live outside this crate; they plug in through [`SurrogateModel`] and are
//! scored against a prepared [`ScaledSplit`].

use crate::error::{PrepError, Result};
use crate::preprocessing::ScaledSplit;
use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::info;

/// Model families a prepared split is typically handed to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelFamily {
    FeedForward,
    GaussianProcess,
    BoostedTrees,
    Baseline,
}

impl ModelFamily {
    /// Short tag used in evaluation report file names
    pub fn tag(&self) -> &'static str {
        match self {
            ModelFamily::FeedForward => "fnn",
            ModelFamily::GaussianProcess => "gp",
            ModelFamily::BoostedTrees => "xgb",
            ModelFamily::Baseline => "baseline",
        }
    }
}

/// Multi-output regression model
pub trait SurrogateModel {
    fn name(&self) -> &str;

    fn family(&self) -> ModelFamily;

    /// Fit on scaled inputs `x` (rows × inputs) and targets `y` (rows × outputs)
    fn fit(&mut self, x: &Array2<f64>, y: &Array2<f64>) -> Result<()>;

    /// Predict scaled targets for scaled inputs
    fn predict(&self, x: &Array2<f64>) -> Result<Array2<f64>>;
}

/// Predicts the per-column train mean for every row.
///
/// Any real model family should beat it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MeanBaseline {
    means: Option<Array1<f64>>,
}

impl MeanBaseline {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SurrogateModel for MeanBaseline {
    fn name(&self) -> &str {
        "mean_baseline"
    }

    fn family(&self) -> ModelFamily {
        ModelFamily::Baseline
    }

    fn fit(&mut self, x: &Array2<f64>, y: &Array2<f64>) -> Result<()> {
        if x.nrows() != y.nrows() {
            return Err(PrepError::Shape {
                expected: format!("{} target rows", x.nrows()),
                actual: format!("{} target rows", y.nrows()),
            });
        }
        let means = y.mean_axis(Axis(0)).ok_or_else(|| {
            PrepError::Schema("cannot fit baseline on an empty partition".to_string())
        })?;
        self.means = Some(means);
        Ok(())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        let means = self.means.as_ref().ok_or(PrepError::ModelNotFitted)?;
        let mut out = Array2::zeros((x.nrows(), means.len()));
        for mut row in out.axis_iter_mut(Axis(0)) {
            row.assign(means);
        }
        Ok(out)
    }
}

/// Regression metrics, uniformly averaged over output columns
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegressionMetrics {
    pub mae: f64,
    pub mse: f64,
    pub rmse: f64,
    pub r2: f64,
    pub n_samples: usize,
}

impl RegressionMetrics {
    /// Compare predictions against truth column by column.
    ///
    /// A column with zero variance in `y_true` contributes R² = 0.
    pub fn compute(y_true: &Array2<f64>, y_pred: &Array2<f64>) -> Result<Self> {
        if y_true.dim() != y_pred.dim() {
            return Err(PrepError::Shape {
                expected: format!("{:?}", y_true.dim()),
                actual: format!("{:?}", y_pred.dim()),
            });
        }
        let (n, n_outputs) = y_true.dim();
        if n == 0 || n_outputs == 0 {
            return Err(PrepError::Schema("cannot score an empty partition".to_string()));
        }

        let n_f = n as f64;
        let mut mae = 0.0;
        let mut mse = 0.0;
        let mut r2 = 0.0;
        for (t, p) in y_true.axis_iter(Axis(1)).zip(y_pred.axis_iter(Axis(1))) {
            let mean = t.sum() / n_f;
            let ss_res: f64 = t.iter().zip(p.iter()).map(|(a, b)| (a - b).powi(2)).sum();
            let ss_tot: f64 = t.iter().map(|a| (a - mean).powi(2)).sum();

            mae += t.iter().zip(p.iter()).map(|(a, b)| (a - b).abs()).sum::<f64>() / n_f;
            mse += ss_res / n_f;
            r2 += if ss_tot > 0.0 { 1.0 - ss_res / ss_tot } else { 0.0 };
        }

        let k = n_outputs as f64;
        let mse = mse / k;
        Ok(Self {
            mae: mae / k,
            mse,
            rmse: mse.sqrt(),
            r2: r2 / k,
            n_samples: n,
        })
    }
}

/// Outcome of fitting a model on a split and scoring it on the test partition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub model: String,
    pub family: ModelFamily,
    /// Metrics on the scaled test targets
    pub scaled: RegressionMetrics,
    /// Metrics after mapping predictions back to original units
    pub original: RegressionMetrics,
    pub training_time_secs: f64,
}

/// Fit `model` on the train partition and score it on the test partition
pub fn evaluate(model: &mut dyn SurrogateModel, split: &ScaledSplit) -> Result<EvaluationReport> {
    if split.n_test() == 0 {
        return Err(PrepError::Config(
            "evaluation needs a non-empty test partition".to_string(),
        ));
    }

    let start = Instant::now();
    model.fit(&split.x_train, &split.y_train)?;
    let training_time_secs = start.elapsed().as_secs_f64();

    let y_pred = model.predict(&split.x_test)?;
    let scaled = RegressionMetrics::compute(&split.y_test, &y_pred)?;

    let y_true_orig = split.unscale_outputs(&split.y_test)?;
    let y_pred_orig = split.unscale_outputs(&y_pred)?;
    let original = RegressionMetrics::compute(&y_true_orig, &y_pred_orig)?;

    info!(
        model = model.name(),
        mae = scaled.mae,
        mse = scaled.mse,
        r2 = scaled.r2,
        "Evaluated model on test partition"
    );

    Ok(EvaluationReport {
        model: model.name().to_string(),
        family: model.family(),
        scaled,
        original,
        training_time_secs,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_regression_metrics() {
        let y_true = array![[1.0, 10.0], [2.0, 20.0], [3.0, 30.0], [4.0, 40.0]];
        let y_pred = array![[1.1, 10.0], [2.0, 20.0], [2.9, 30.0], [4.1, 40.0]];

        let metrics = RegressionMetrics::compute(&y_true, &y_pred).unwrap();
        assert!((metrics.mae - 0.0375).abs() < 1e-12);
        assert!((metrics.mse - 0.00375).abs() < 1e-12);
        assert!(metrics.r2 > 0.99);
        assert_eq!(metrics.n_samples, 4);
    }

    #[test]
    fn test_constant_truth_r2_zero() {
        let y_true = array![[5.0], [5.0]];
        let y_pred = array![[5.0], [5.0]];
        let metrics = RegressionMetrics::compute(&y_true, &y_pred).unwrap();
        assert_eq!(metrics.r2, 0.0);
        assert_eq!(metrics.mse, 0.0);
    }

    #[test]
    fn test_shape_mismatch() {
        let err = RegressionMetrics::compute(&array![[1.0, 2.0]], &array![[1.0]]).unwrap_err();
        assert!(matches!(err, PrepError::Shape { .. }));
    }

    #[test]
    fn test_mean_baseline() {
        let x = array![[0.0], [1.0], [2.0]];
        let y = array![[1.0, 0.0], [2.0, 0.0], [3.0, 3.0]];
        let mut model = MeanBaseline::new();
        assert!(matches!(model.predict(&x), Err(PrepError::ModelNotFitted)));

        model.fit(&x, &y).unwrap();
        let pred = model.predict(&array![[9.0], [7.0]]).unwrap();
        assert_eq!(pred, array![[2.0, 1.0], [2.0, 1.0]]);
    }

    #[test]
    fn test_family_tags() {
        assert_eq!(ModelFamily::GaussianProcess.tag(), "gp");
        let json = serde_json::to_string(&ModelFamily::BoostedTrees).unwrap();
        assert_eq!(json, "\"boosted_trees\"");
    }
}
