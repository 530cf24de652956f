//! Per-feature standardization fitted on training features.
//!
//! `apply` maps each value to `(x - mean) / scale` where `scale` is the
//! population standard deviation of the feature in the fitting data.
//!
//! # Zero-variance guard
//!
//! A feature that is constant in the fitting data (for instance an indicator
//! that is always `0` in the training split) would divide by zero. Such a
//! feature gets `scale = 1.0`, so it is only centred. The guard uses the
//! relative range check in [`DescriptiveStats::is_constant`] plus an absolute
//! floor of [`MIN_SCALE`] on the standard deviation.

use tictac_stats::descriptive::DescriptiveStats;

use crate::features::FeatureMatrix;

/// Standard deviations below this are treated as zero.
pub const MIN_SCALE: f64 = 1e-12;

#[derive(Debug, Clone, PartialEq)]
pub struct StandardScaler {
    mean: Vec<f64>,
    variance: Vec<f64>,
    scale: Vec<f64>,
}

impl StandardScaler {
    /// Fits mean and variance per column.
    ///
    /// An empty matrix yields the identity transform.
    #[must_use]
    pub fn fit(features: &FeatureMatrix) -> Self {
        let n_cols = features.n_cols();
        let mut mean = Vec::with_capacity(n_cols);
        let mut variance = Vec::with_capacity(n_cols);
        let mut scale = Vec::with_capacity(n_cols);
        let mut guarded = 0;
        for col in 0..n_cols {
            match DescriptiveStats::new(features.column(col)) {
                Some(stats) => {
                    mean.push(stats.mean);
                    variance.push(stats.variance);
                    if stats.is_constant() || stats.std_dev < MIN_SCALE {
                        guarded += 1;
                        scale.push(1.0);
                    } else {
                        scale.push(stats.std_dev);
                    }
                }
                None => {
                    mean.push(0.0);
                    variance.push(0.0);
                    scale.push(1.0);
                }
            }
        }
        tracing::debug!(features = n_cols, guarded, "fitted standard scaler");
        Self {
            mean,
            variance,
            scale,
        }
    }

    #[must_use]
    pub fn mean(&self) -> &[f64] {
        &self.mean
    }

    #[must_use]
    pub fn variance(&self) -> &[f64] {
        &self.variance
    }

    #[must_use]
    pub fn scale(&self) -> &[f64] {
        &self.scale
    }

    #[must_use]
    pub fn n_features(&self) -> usize {
        self.mean.len()
    }

    /// Standardizes one row in place.
    ///
    /// # Panics
    ///
    /// Panics if `row` is not as wide as the fitted data.
    pub fn apply_row(&self, row: &mut [f64]) {
        assert_eq!(row.len(), self.n_features(), "row width mismatch");
        for ((x, mean), scale) in row.iter_mut().zip(&self.mean).zip(&self.scale) {
            *x = (*x - mean) / scale;
        }
    }

    #[must_use]
    pub fn apply(&self, features: &FeatureMatrix) -> FeatureMatrix {
        let mut out = features.clone();
        for row in out.rows_mut() {
            self.apply_row(row);
        }
        out
    }
}
