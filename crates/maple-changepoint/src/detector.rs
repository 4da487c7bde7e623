//! Estimator → CUSUM composition, independent of any event format.

use serde::{Deserialize, Serialize};

use crate::cusum::{CumulativeDeviationDetector, CusumOutput, LowDecision};
use crate::error::ChangePointResult;
use crate::moments::RunningMomentEstimator;

/// Result of folding one raw value through the detector.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    /// Raw input value.
    pub value: f64,
    /// Z-score against the running moments, NaN during warm-up or at zero variance.
    pub normalized: f64,
    /// Cumulative sums and decision flags after this observation.
    pub output: CusumOutput,
}

/// Read-only view of the running statistics.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DetectorState {
    pub count: u64,
    pub mean: f64,
    pub variance: Option<f64>,
    pub low_sum: f64,
    pub high_sum: f64,
}

/// Single-stream change-point detector.
///
/// Observations must be fed in arrival order; the statistic is order-dependent.
#[derive(Clone, Debug, PartialEq)]
pub struct ChangePointDetector {
    moments: RunningMomentEstimator,
    cusum: CumulativeDeviationDetector,
}

impl ChangePointDetector {
    pub fn new(k: f64, h: f64, low_decision: LowDecision) -> ChangePointResult<Self> {
        Ok(Self {
            moments: RunningMomentEstimator::new(),
            cusum: CumulativeDeviationDetector::new(k, h, low_decision)?,
        })
    }

    pub fn update(&mut self, value: f64) -> Observation {
        let normalized = self.moments.update(value);
        let output = self.cusum.update(normalized);
        Observation {
            value,
            normalized,
            output,
        }
    }

    pub fn moments(&self) -> &RunningMomentEstimator {
        &self.moments
    }

    pub fn cusum(&self) -> &CumulativeDeviationDetector {
        &self.cusum
    }

    pub fn state(&self) -> DetectorState {
        DetectorState {
            count: self.moments.count(),
            mean: self.moments.mean(),
            variance: self.moments.variance(),
            low_sum: self.cusum.low_sum(),
            high_sum: self.cusum.high_sum(),
        }
    }

    pub fn reset(&mut self) {
        self.moments.reset();
        self.cusum.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constant_stream_never_accumulates() {
        let mut det = ChangePointDetector::new(0.5, 1.0, LowDecision::Mirrored).unwrap();
        for _ in 0..4 {
            let obs = det.update(5.0);
            assert!(obs.normalized.is_nan());
            assert_eq!(obs.output.cum_sum_low, 0.0);
            assert_eq!(obs.output.cum_sum_high, 0.0);
            assert!(!obs.output.change_detected());
        }
        assert_eq!(det.state().count, 4);
    }

    #[test]
    fn detects_upward_mean_shift() {
        let mut det = ChangePointDetector::new(0.5, 4.0, LowDecision::Mirrored).unwrap();
        // Alternating noise around 10.
        for i in 0..50 {
            let x = if i % 2 == 0 { 9.0 } else { 11.0 };
            let obs = det.update(x);
            assert!(!obs.output.change_detected_high, "false alarm at {}", i);
        }

        let mut detected_at = None;
        for i in 0..50 {
            if det.update(14.0).output.change_detected_high {
                detected_at = Some(i);
                break;
            }
        }
        assert!(detected_at.is_some(), "shift to 14 should be detected");
    }

    #[test]
    fn detects_downward_mean_shift() {
        let mut det = ChangePointDetector::new(0.5, 4.0, LowDecision::Mirrored).unwrap();
        for i in 0..50 {
            det.update(if i % 2 == 0 { 9.0 } else { 11.0 });
        }
        let detected = (0..50).any(|_| det.update(6.0).output.change_detected_low);
        assert!(detected, "shift to 6 should be detected");
        assert!(det.cusum().low_sum() < -4.0);
    }

    #[test]
    fn warm_up_sample_does_not_touch_sums() {
        let mut det = ChangePointDetector::new(0.0, 1.0, LowDecision::Mirrored).unwrap();
        let first = det.update(100.0);
        assert!(first.normalized.is_nan());
        assert_eq!(det.cusum().high_sum(), 0.0);

        let second = det.update(0.0);
        // [100, 0]: mean 50, std 50
        assert!((second.normalized + 1.0).abs() < 1e-12);
        assert_eq!(second.output.cum_sum_low, -1.0);
    }

    #[test]
    fn reset_clears_both_components() {
        let mut det = ChangePointDetector::new(0.0, 1.0, LowDecision::Mirrored).unwrap();
        for x in [1.0, 5.0, 2.0, 9.0] {
            det.update(x);
        }
        det.reset();
        let state = det.state();
        assert_eq!(state.count, 0);
        assert_eq!(state.mean, 0.0);
        assert_eq!(state.low_sum, 0.0);
        assert_eq!(state.high_sum, 0.0);
    }
}
