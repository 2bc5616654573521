//! Feature scaling implementations
//!
//! Scalers work column-wise on ndarray blocks. Fitting stores per-column
//! parameters; transforming applies them to any block with the same width,
//! so parameters fitted on a train partition can be reused on a test partition.

use crate::error::{Block, PrepError, Result};
use ndarray::{Array2, ArrayBase, Axis, Data, Ix2};
use serde::{Deserialize, Serialize};

/// Target interval for min-max scaling
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureRange {
    pub min: f64,
    pub max: f64,
}

impl Default for FeatureRange {
    fn default() -> Self {
        Self { min: 0.0, max: 1.0 }
    }
}

impl FeatureRange {
    pub fn new(min: f64, max: f64) -> Result<Self> {
        let range = Self { min, max };
        range.validate()?;
        Ok(range)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.min.is_finite() || !self.max.is_finite() || self.min >= self.max {
            return Err(PrepError::Config(format!(
                "feature range must satisfy min < max, got [{}, {}]",
                self.min, self.max
            )));
        }
        Ok(())
    }

    fn width(&self) -> f64 {
        self.max - self.min
    }
}

/// Fitted parameters of one min-max column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnParams {
    pub name: String,
    pub data_min: f64,
    pub data_max: f64,
}

impl ColumnParams {
    fn data_range(&self) -> f64 {
        self.data_max - self.data_min
    }
}

/// Per-column affine map of the observed `[min, max]` onto a [`FeatureRange`].
///
/// Values outside the fitted range are not clipped.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MinMaxScaler {
    block: Block,
    range: FeatureRange,
    params: Vec<ColumnParams>,
    is_fitted: bool,
}

impl MinMaxScaler {
    pub fn new(block: Block, range: FeatureRange) -> Self {
        Self {
            block,
            range,
            params: Vec::new(),
            is_fitted: false,
        }
    }

    pub fn block(&self) -> Block {
        self.block
    }

    pub fn range(&self) -> FeatureRange {
        self.range
    }

    pub fn params(&self) -> &[ColumnParams] {
        &self.params
    }

    pub fn is_fitted(&self) -> bool {
        self.is_fitted
    }

    /// Fit on `x`, one parameter set per column.
    ///
    /// Fails with [`PrepError::DegenerateColumn`] when a column is constant,
    /// since its range would be zero.
    pub fn fit<S: Data<Elem = f64>>(
        &mut self,
        x: &ArrayBase<S, Ix2>,
        names: &[String],
    ) -> Result<&mut Self> {
        self.range.validate()?;
        check_width(names.len(), x.ncols())?;
        if x.nrows() == 0 {
            return Err(PrepError::Schema(format!(
                "cannot fit {} scaler on an empty partition",
                self.block
            )));
        }

        let mut params = Vec::with_capacity(x.ncols());
        for (col, name) in x.axis_iter(Axis(1)).zip(names) {
            let (data_min, data_max) = col
                .iter()
                .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));

            if data_max <= data_min {
                return Err(PrepError::DegenerateColumn {
                    block: self.block,
                    column: name.clone(),
                });
            }
            params.push(ColumnParams {
                name: name.clone(),
                data_min,
                data_max,
            });
        }

        self.params = params;
        self.is_fitted = true;
        Ok(self)
    }

    /// Map each column onto the target range
    pub fn transform<S: Data<Elem = f64>>(&self, x: &ArrayBase<S, Ix2>) -> Result<Array2<f64>> {
        self.check_ready(x.ncols())?;
        let range = self.range;

        let mut out = x.to_owned();
        for (mut col, p) in out.axis_iter_mut(Axis(1)).zip(&self.params) {
            let data_range = p.data_range();
            col.mapv_inplace(|v| (v - p.data_min) / data_range * range.width() + range.min);
        }
        Ok(out)
    }

    /// Fit and transform in one step
    pub fn fit_transform<S: Data<Elem = f64>>(
        &mut self,
        x: &ArrayBase<S, Ix2>,
        names: &[String],
    ) -> Result<Array2<f64>> {
        self.fit(x, names)?;
        self.transform(x)
    }

    /// Map scaled values back to original units
    pub fn inverse_transform<S: Data<Elem = f64>>(
        &self,
        x: &ArrayBase<S, Ix2>,
    ) -> Result<Array2<f64>> {
        self.check_ready(x.ncols())?;
        let range = self.range;

        let mut out = x.to_owned();
        for (mut col, p) in out.axis_iter_mut(Axis(1)).zip(&self.params) {
            let data_range = p.data_range();
            col.mapv_inplace(|v| (v - range.min) / range.width() * data_range + p.data_min);
        }
        Ok(out)
    }

    fn check_ready(&self, ncols: usize) -> Result<()> {
        if !self.is_fitted {
            return Err(PrepError::ModelNotFitted);
        }
        check_width(self.params.len(), ncols)
    }
}

/// Zero-mean, unit-variance scaling using the population standard deviation.
///
/// A zero-variance column keeps scale 1 and so maps to all zeros.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StandardScaler {
    mean: Vec<f64>,
    std: Vec<f64>,
    is_fitted: bool,
}

impl StandardScaler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mean(&self) -> &[f64] {
        &self.mean
    }

    pub fn std(&self) -> &[f64] {
        &self.std
    }

    pub fn fit<S: Data<Elem = f64>>(&mut self, x: &ArrayBase<S, Ix2>) -> Result<&mut Self> {
        let n = x.nrows();
        if n == 0 {
            return Err(PrepError::Schema(
                "cannot standardize an empty block".to_string(),
            ));
        }

        let n_f = n as f64;
        let mut mean = Vec::with_capacity(x.ncols());
        let mut std = Vec::with_capacity(x.ncols());
        for col in x.axis_iter(Axis(1)) {
            let m = col.sum() / n_f;
            let var = col.iter().map(|v| (v - m).powi(2)).sum::<f64>() / n_f;
            let s = var.sqrt();
            mean.push(m);
            // Rounding noise on a constant column must not blow up into huge z-scores.
            std.push(if s > 10.0 * f64::EPSILON * m.abs().max(1.0) { s } else { 1.0 });
        }

        self.mean = mean;
        self.std = std;
        self.is_fitted = true;
        Ok(self)
    }

    pub fn transform<S: Data<Elem = f64>>(&self, x: &ArrayBase<S, Ix2>) -> Result<Array2<f64>> {
        if !self.is_fitted {
            return Err(PrepError::ModelNotFitted);
        }
        check_width(self.mean.len(), x.ncols())?;

        let mut out = x.to_owned();
        for ((mut col, &m), &s) in out
            .axis_iter_mut(Axis(1))
            .zip(&self.mean)
            .zip(&self.std)
        {
            col.mapv_inplace(|v| (v - m) / s);
        }
        Ok(out)
    }

    pub fn fit_transform<S: Data<Elem = f64>>(
        &mut self,
        x: &ArrayBase<S, Ix2>,
    ) -> Result<Array2<f64>> {
        self.fit(x)?;
        self.transform(x)
    }
}

fn check_width(expected: usize, actual: usize) -> Result<()> {
    if expected != actual {
        return Err(PrepError::Shape {
            expected: format!("{} columns", expected),
            actual: format!("{} columns", actual),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn names(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("c{}", i)).collect()
    }

    #[test]
    fn test_minmax_scaler() {
        let x = array![[1.0, -3.0], [2.0, 0.0], [5.0, 3.0]];
        let mut scaler = MinMaxScaler::new(Block::Inputs, FeatureRange::default());
        let scaled = scaler.fit_transform(&x, &names(2)).unwrap();

        for col in scaled.axis_iter(Axis(1)) {
            let lo = col.iter().cloned().fold(f64::INFINITY, f64::min);
            let hi = col.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
            assert_eq!(lo, 0.0);
            assert_eq!(hi, 1.0);
        }
        assert!((scaled[[1, 0]] - 0.25).abs() < 1e-12);
    }

    #[test]
    fn test_custom_range() {
        let x = array![[0.0], [10.0], [5.0]];
        let range = FeatureRange::new(-0.9, 0.9).unwrap();
        let mut scaler = MinMaxScaler::new(Block::Outputs, range);
        let scaled = scaler.fit_transform(&x, &names(1)).unwrap();

        assert!((scaled[[0, 0]] + 0.9).abs() < 1e-12);
        assert!((scaled[[1, 0]] - 0.9).abs() < 1e-12);
        assert!(scaled[[2, 0]].abs() < 1e-12);
    }

    #[test]
    fn test_inverse_transform() {
        let x = array![[1.5, 200.0], [2.25, 350.0], [9.75, -40.0]];
        let mut scaler = MinMaxScaler::new(Block::Inputs, FeatureRange::default());
        let scaled = scaler.fit_transform(&x, &names(2)).unwrap();
        let restored = scaler.inverse_transform(&scaled).unwrap();

        for (o, r) in x.iter().zip(restored.iter()) {
            assert!((o - r).abs() < 1e-10);
        }
    }

    #[test]
    fn test_unseen_values_not_clipped() {
        let train = array![[0.0], [1.0]];
        let mut scaler = MinMaxScaler::new(Block::Inputs, FeatureRange::default());
        scaler.fit(&train, &names(1)).unwrap();

        let test = array![[2.0], [-1.0]];
        let scaled = scaler.transform(&test).unwrap();
        assert_eq!(scaled[[0, 0]], 2.0);
        assert_eq!(scaled[[1, 0]], -1.0);
    }

    #[test]
    fn test_degenerate_column() {
        let x = array![[1.0, 4.0], [2.0, 4.0], [3.0, 4.0]];
        let mut scaler = MinMaxScaler::new(Block::Outputs, FeatureRange::default());
        let err = scaler.fit(&x, &names(2)).unwrap_err();

        match err {
            PrepError::DegenerateColumn { block, column } => {
                assert_eq!(block, Block::Outputs);
                assert_eq!(column, "c1");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_transform_requires_fit() {
        let scaler = MinMaxScaler::new(Block::Inputs, FeatureRange::default());
        let err = scaler.transform(&array![[1.0]]).unwrap_err();
        assert!(matches!(err, PrepError::ModelNotFitted));
    }

    #[test]
    fn test_width_mismatch() {
        let mut scaler = MinMaxScaler::new(Block::Inputs, FeatureRange::default());
        scaler.fit(&array![[0.0, 1.0], [1.0, 2.0]], &names(2)).unwrap();
        let err = scaler.transform(&array![[0.5]]).unwrap_err();
        assert!(matches!(err, PrepError::Shape { .. }));
    }

    #[test]
    fn test_invalid_range() {
        assert!(FeatureRange::new(1.0, 1.0).is_err());
        assert!(FeatureRange::new(2.0, -1.0).is_err());
    }

    #[test]
    fn test_standard_scaler() {
        let x = array![[1.0, 7.0], [2.0, 7.0], [3.0, 7.0], [4.0, 7.0], [5.0, 7.0]];
        let mut scaler = StandardScaler::new();
        let z = scaler.fit_transform(&x).unwrap();

        let col = z.column(0);
        let mean = col.sum() / 5.0;
        let var = col.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / 5.0;
        assert!(mean.abs() < 1e-12);
        assert!((var - 1.0).abs() < 1e-12);
        // Constant column collapses to zero
        assert!(z.column(1).iter().all(|&v| v == 0.0));
    }
}
