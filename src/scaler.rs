//! Zero-mean / unit-variance standardization with persisted parameters

use crate::error::RiskError;
use ndarray::{Array1, Array2, ArrayView1, Axis};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Per-column mean and population standard deviation captured at fit time.
///
/// Fit once per training run and reused unchanged for every later record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalingParams {
    pub means: Array1<f64>,
    pub stds: Array1<f64>,
}

impl ScalingParams {
    /// Compute column means and standard deviations (ddof = 0).
    ///
    /// Zero-variance columns are reported with a warning; they standardize to 0.
    pub fn fit(features: &Array2<f64>) -> Result<Self, RiskError> {
        if features.nrows() == 0 {
            return Err(RiskError::EmptyRecordSet);
        }

        let n = features.nrows() as f64;
        let means = features.sum_axis(Axis(0)) / n;
        let stds: Array1<f64> = features
            .axis_iter(Axis(1))
            .zip(means.iter())
            .map(|(column, &mean)| {
                let variance = column.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n;
                let std = variance.sqrt();
                if is_degenerate(std, mean) {
                    0.0
                } else {
                    std
                }
            })
            .collect();

        let params = Self { means, stds };
        for column in params.degenerate_columns() {
            warn!(column, "zero-variance feature column, standardized values set to 0");
        }
        Ok(params)
    }

    pub fn n_features(&self) -> usize {
        self.means.len()
    }

    /// Indices of columns whose standard deviation was zero at fit time
    pub fn degenerate_columns(&self) -> Vec<usize> {
        self.stds
            .iter()
            .enumerate()
            .filter(|(_, &std)| std == 0.0)
            .map(|(i, _)| i)
            .collect()
    }

    /// Apply `(x - mean) / std` column-wise
    pub fn transform(&self, features: &Array2<f64>) -> Result<Array2<f64>, RiskError> {
        self.check_width(features.ncols())?;
        let mut scaled = features.clone();
        for mut row in scaled.axis_iter_mut(Axis(0)) {
            for (j, value) in row.iter_mut().enumerate() {
                *value = self.scale_value(j, *value);
            }
        }
        Ok(scaled)
    }

    /// Standardize a single feature vector
    pub fn transform_row(&self, features: ArrayView1<f64>) -> Result<Array1<f64>, RiskError> {
        self.check_width(features.len())?;
        Ok(features
            .iter()
            .enumerate()
            .map(|(j, &x)| self.scale_value(j, x))
            .collect())
    }

    fn scale_value(&self, column: usize, value: f64) -> f64 {
        let std = self.stds[column];
        if std == 0.0 {
            0.0
        } else {
            (value - self.means[column]) / std
        }
    }

    fn check_width(&self, actual: usize) -> Result<(), RiskError> {
        if actual != self.n_features() {
            return Err(RiskError::DimensionMismatch {
                expected: self.n_features(),
                actual,
            });
        }
        Ok(())
    }
}

// Rounding noise on a constant column leaves a std many orders below the mean.
fn is_degenerate(std: f64, mean: f64) -> bool {
    std <= f64::EPSILON * mean.abs().max(1.0)
}
