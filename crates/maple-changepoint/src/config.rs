//! Activation parameters for the detection stage.
//!
//! Parameters arrive either as a typed JSON document (`CusumConfig::from_json`)
//! or as the host's flat parameter map keyed by the processor's parameter ids
//! (`CusumConfig::from_parameters`). Both paths end in `validate()`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::cusum::LowDecision;
use crate::error::{ChangePointError, ChangePointResult};
use crate::event::FieldSelector;

/// Host parameter id of the numeric field mapping.
pub const PARAM_NUMBER_MAPPING: &str = "number-mapping";

/// Host parameter id of the slack `k`.
pub const PARAM_K: &str = "param-k";

/// Host parameter id of the decision threshold `h`.
pub const PARAM_H: &str = "param-h";

/// Host parameter id of the low-side decision policy (optional).
pub const PARAM_LOW_DECISION: &str = "low-decision";

/// Recognized range for `k` and `h`.
pub const PARAM_MIN: f64 = 0.0;
pub const PARAM_MAX: f64 = 100.0;

/// Configuration of one stage activation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CusumConfig {
    /// Selector of the numeric input field, e.g. `"s0::temperature"`.
    pub field_selector: String,
    /// Slack `k` in `[0, 100]`.
    pub k: f64,
    /// Decision threshold `h` in `[0, 100]`.
    pub h: f64,
    #[serde(default)]
    pub low_decision: LowDecision,
}

impl CusumConfig {
    pub fn new(field_selector: impl Into<String>, k: f64, h: f64) -> Self {
        Self {
            field_selector: field_selector.into(),
            k,
            h,
            low_decision: LowDecision::default(),
        }
    }

    pub fn with_low_decision(mut self, low_decision: LowDecision) -> Self {
        self.low_decision = low_decision;
        self
    }

    /// Parse and validate a JSON configuration document.
    ///
    /// `field_selector`, `k` and `h` are required; `low_decision` is optional.
    pub fn from_json(json: &str) -> ChangePointResult<Self> {
        let document: Value = serde_json::from_str(json).map_err(invalid_document)?;
        let fields = document
            .as_object()
            .ok_or_else(|| ChangePointError::InvalidParameter {
                parameter: "config".into(),
                reason: format!("expected object, got {}", document),
            })?;
        for (key, id) in [
            ("field_selector", "field_selector"),
            ("k", PARAM_K),
            ("h", PARAM_H),
        ] {
            if !fields.contains_key(key) {
                return Err(ChangePointError::MissingParameter(id.into()));
            }
        }

        let config: Self = serde_json::from_value(document).map_err(invalid_document)?;
        config.validate()?;
        Ok(config)
    }

    /// Build from the host's extracted parameter map.
    ///
    /// `number-mapping`, `param-k` and `param-h` are required;
    /// `low-decision` is optional.
    pub fn from_parameters(parameters: &Map<String, Value>) -> ChangePointResult<Self> {
        let field_selector = match parameters.get(PARAM_NUMBER_MAPPING) {
            Some(Value::String(s)) => s.clone(),
            Some(other) => {
                return Err(ChangePointError::InvalidParameter {
                    parameter: PARAM_NUMBER_MAPPING.into(),
                    reason: format!("expected string, got {}", other),
                })
            }
            None => return Err(ChangePointError::MissingParameter(PARAM_NUMBER_MAPPING.into())),
        };
        let k = number_parameter(parameters, PARAM_K)?;
        let h = number_parameter(parameters, PARAM_H)?;
        let low_decision = match parameters.get(PARAM_LOW_DECISION) {
            Some(value) => serde_json::from_value(value.clone()).map_err(|e| {
                ChangePointError::InvalidParameter {
                    parameter: PARAM_LOW_DECISION.into(),
                    reason: e.to_string(),
                }
            })?,
            None => LowDecision::default(),
        };

        let config = Self {
            field_selector,
            k,
            h,
            low_decision,
        };
        config.validate()?;
        Ok(config)
    }

    /// Check the selector parses and both thresholds are in range.
    pub fn validate(&self) -> ChangePointResult<()> {
        FieldSelector::parse(&self.field_selector)?;
        check_range(PARAM_K, self.k)?;
        check_range(PARAM_H, self.h)?;
        Ok(())
    }

    pub fn selector(&self) -> ChangePointResult<FieldSelector> {
        FieldSelector::parse(&self.field_selector)
    }
}

fn invalid_document(e: serde_json::Error) -> ChangePointError {
    ChangePointError::InvalidParameter {
        parameter: "config".into(),
        reason: e.to_string(),
    }
}

fn number_parameter(parameters: &Map<String, Value>, id: &str) -> ChangePointResult<f64> {
    match parameters.get(id) {
        Some(value) => value.as_f64().ok_or_else(|| ChangePointError::InvalidParameter {
            parameter: id.into(),
            reason: format!("expected number, got {}", value),
        }),
        None => Err(ChangePointError::MissingParameter(id.into())),
    }
}

fn check_range(parameter: &str, value: f64) -> ChangePointResult<()> {
    // NaN is outside every range.
    if !(PARAM_MIN..=PARAM_MAX).contains(&value) {
        return Err(ChangePointError::ParameterOutOfRange {
            parameter: parameter.into(),
            value,
            min: PARAM_MIN,
            max: PARAM_MAX,
        });
    }
    Ok(())
}
