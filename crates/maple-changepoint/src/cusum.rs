//! Two-sided CUSUM (cumulative sum) detector over normalized deviations.
//!
//! Maintains an upper sum clamped at `>= 0` and a lower sum clamped at `<= 0`:
//!
//! ```text
//!   high = max(0, high + z - k)      flag_high = high >  h
//!   low  = min(0, low  + z + k)      flag_low  = low  < -h   (Mirrored)
//! ```
//!
//! A NaN input (estimator warm-up, zero variance) leaves both sums untouched.

use serde::{Deserialize, Serialize};

use crate::error::{ChangePointError, ChangePointResult};

// ── Low-side decision policy ────────────────────────────────────────────

/// How the low-side decision flag is computed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LowDecision {
    /// `low_sum < -h`, symmetric to the high side.
    #[default]
    Mirrored,
    /// Always `false`. Matches processors that only ever emitted the high flag.
    Disabled,
}

// ── Output ──────────────────────────────────────────────────────────────

/// The four values emitted per observation, in fixed emission order.
///
/// Serialized field names are the wire names appended to output events.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CusumOutput {
    #[serde(rename = "cumSumLow")]
    pub cum_sum_low: f64,
    #[serde(rename = "cumSumHigh")]
    pub cum_sum_high: f64,
    #[serde(rename = "changeDetectedLow")]
    pub change_detected_low: bool,
    #[serde(rename = "changeDetectionHigh")]
    pub change_detected_high: bool,
}

impl CusumOutput {
    /// Wire names in emission order.
    pub const FIELD_NAMES: [&'static str; 4] = [
        "cumSumLow",
        "cumSumHigh",
        "changeDetectedLow",
        "changeDetectionHigh",
    ];

    /// Whether either side raised its flag.
    pub fn change_detected(&self) -> bool {
        self.change_detected_low || self.change_detected_high
    }
}

// ── Detector ────────────────────────────────────────────────────────────

/// Page's two-sided CUSUM with slack `k` and decision threshold `h`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CumulativeDeviationDetector {
    slack: f64,
    threshold: f64,
    low_decision: LowDecision,
    low_sum: f64,
    high_sum: f64,
}

impl CumulativeDeviationDetector {
    /// Create a detector with both sums at zero.
    ///
    /// `k` and `h` must be finite and non-negative.
    pub fn new(k: f64, h: f64, low_decision: LowDecision) -> ChangePointResult<Self> {
        check_non_negative("k", k)?;
        check_non_negative("h", h)?;
        Ok(Self {
            slack: k,
            threshold: h,
            low_decision,
            low_sum: 0.0,
            high_sum: 0.0,
        })
    }

    /// Fold one normalized deviation into both sums.
    pub fn update(&mut self, z: f64) -> CusumOutput {
        if z.is_nan() {
            return CusumOutput {
                cum_sum_low: self.low_sum,
                cum_sum_high: self.high_sum,
                change_detected_low: false,
                change_detected_high: false,
            };
        }

        self.high_sum = (self.high_sum + z - self.slack).max(0.0);
        self.low_sum = (self.low_sum + z + self.slack).min(0.0);

        CusumOutput {
            cum_sum_low: self.low_sum,
            cum_sum_high: self.high_sum,
            change_detected_low: match self.low_decision {
                LowDecision::Mirrored => self.low_sum < -self.threshold,
                LowDecision::Disabled => false,
            },
            change_detected_high: self.high_sum > self.threshold,
        }
    }

    /// Current lower sum, always `<= 0`.
    pub fn low_sum(&self) -> f64 {
        self.low_sum
    }

    /// Current upper sum, always `>= 0`.
    pub fn high_sum(&self) -> f64 {
        self.high_sum
    }

    /// Slack `k`.
    pub fn slack(&self) -> f64 {
        self.slack
    }

    /// Decision threshold `h`.
    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn low_decision(&self) -> LowDecision {
        self.low_decision
    }

    /// Zero both sums, keeping `k`, `h` and the low-side policy.
    pub fn reset(&mut self) {
        self.low_sum = 0.0;
        self.high_sum = 0.0;
    }
}

fn check_non_negative(parameter: &str, value: f64) -> ChangePointResult<()> {
    if !value.is_finite() || value < 0.0 {
        return Err(ChangePointError::InvalidParameter {
            parameter: parameter.into(),
            reason: format!("must be finite and >= 0, got {}", value),
        });
    }
    Ok(())
}
