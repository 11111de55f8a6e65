//! Zero-mean / unit-variance scaling of the audio feature columns.
//!
//! The scaler is fit once over the whole cleaned collection and then only
//! used to transform. It is a plain value: queries borrow it, nothing refits it.

use crate::track::{FeatureVector, FEATURE_COUNT};
use anyhow::{bail, Result};
use log::debug;
use serde::{Deserialize, Serialize};

/// Fitted per-column means and population standard deviations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureScaler {
    means: FeatureVector,
    std_devs: FeatureVector,
    samples: usize,
}

impl FeatureScaler {
    /// Fit means and population standard deviations over `rows`.
    ///
    /// # Errors
    ///
    /// Fails on an empty input or a non-finite value, since no recommendation
    /// can be served without a valid fit.
    pub fn fit(rows: &[FeatureVector]) -> Result<Self> {
        if rows.is_empty() {
            bail!("Cannot fit feature scaler on an empty collection");
        }
        if let Some(index) = rows.iter().position(|row| !row.iter().all(|v| v.is_finite())) {
            bail!("Non-finite feature value in row {index}, clean the dataset before fitting");
        }

        #[allow(clippy::cast_precision_loss)]
        let n = rows.len() as f64;
        let mut means = [0.0; FEATURE_COUNT];
        for row in rows {
            for (mean, value) in means.iter_mut().zip(row) {
                *mean += value;
            }
        }
        means.iter_mut().for_each(|mean| *mean /= n);

        let mut std_devs = [0.0; FEATURE_COUNT];
        for row in rows {
            for (column, value) in row.iter().enumerate() {
                std_devs[column] += (value - means[column]).powi(2);
            }
        }
        std_devs.iter_mut().for_each(|sd| *sd = (*sd / n).sqrt());

        debug!("Fitted feature scaler over {} rows: means {means:?}, std devs {std_devs:?}", rows.len());
        Ok(Self { means, std_devs, samples: rows.len() })
    }

    /// Standardize one vector. Constant columns map to `0.0`.
    #[must_use]
    pub fn transform(&self, row: &FeatureVector) -> FeatureVector {
        let mut out = [0.0; FEATURE_COUNT];
        for (column, value) in row.iter().enumerate() {
            out[column] = scale(*value, self.means[column], self.std_devs[column]);
        }
        out
    }

    #[must_use]
    pub fn transform_all(&self, rows: &[FeatureVector]) -> Vec<FeatureVector> {
        rows.iter().map(|row| self.transform(row)).collect()
    }

    #[must_use]
    pub const fn means(&self) -> &FeatureVector {
        &self.means
    }

    #[must_use]
    pub const fn std_devs(&self) -> &FeatureVector {
        &self.std_devs
    }

    /// Number of rows the scaler was fit on.
    #[must_use]
    pub const fn samples(&self) -> usize {
        self.samples
    }
}

#[inline]
fn scale(value: f64, mean: f64, std_dev: f64) -> f64 {
    // Rounding in the mean can leave a tiny non-zero spread on constant columns.
    if std_dev <= 10.0 * f64::EPSILON * mean.abs().max(1.0) {
        0.0
    } else {
        (value - mean) / std_dev
    }
}
