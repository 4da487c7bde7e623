//! Running moment estimation (Welford's online algorithm).
//!
//! Maintains mean and population variance of an unbounded observation stream
//! in O(1) space, and converts each raw value into a z-score against the
//! moments *including* that value.
//!
//! ```text
//!   x ──► count += 1
//!         delta  = x - mean
//!         mean  += delta / count
//!         delta2 = x - mean          (updated mean)
//!         M2    += delta * delta2
//!         z      = (x - mean) / sqrt(M2 / count)    or NaN
//! ```

use serde::{Deserialize, Serialize};

/// Online mean/variance estimator producing z-score normalized values.
///
/// Degeneracy (fewer than two samples, or zero variance) is reported as a
/// NaN normalized value, never as an error.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RunningMomentEstimator {
    count: u64,
    mean: f64,
    sum_squared_deviation: f64,
}

impl RunningMomentEstimator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold `x` into the running moments and return its normalized value.
    ///
    /// Returns NaN while `count <= 1` or while the accumulated squared
    /// deviation is exactly zero. A NaN input poisons the moments; every
    /// later normalized value is NaN as well.
    pub fn update(&mut self, x: f64) -> f64 {
        self.count += 1;
        let delta = x - self.mean;
        self.mean += delta / self.count as f64;
        let delta2 = x - self.mean;
        self.sum_squared_deviation += delta * delta2;

        self.normalize(x)
    }

    /// Z-score of `x` against the current moments, without updating them.
    pub fn normalize(&self, x: f64) -> f64 {
        if self.count <= 1 || self.sum_squared_deviation == 0.0 {
            return f64::NAN;
        }
        (x - self.mean) / (self.sum_squared_deviation / self.count as f64).sqrt()
    }

    /// Observations folded in so far.
    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> f64 {
        self.mean
    }

    /// Welford's M2 accumulator.
    pub fn sum_squared_deviation(&self) -> f64 {
        self.sum_squared_deviation
    }

    /// Population variance (`M2 / count`), `None` before the first sample.
    pub fn variance(&self) -> Option<f64> {
        if self.count == 0 {
            None
        } else {
            Some(self.sum_squared_deviation / self.count as f64)
        }
    }

    /// Population standard deviation, `None` before the first sample.
    pub fn std_dev(&self) -> Option<f64> {
        self.variance().map(f64::sqrt)
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
