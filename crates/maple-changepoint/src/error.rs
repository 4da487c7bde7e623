use thiserror::Error;

/// Errors from the change-point detection stage.
#[derive(Debug, Error)]
pub enum ChangePointError {
    #[error("required parameter missing: {0}")]
    MissingParameter(String),

    #[error("parameter {parameter} out of range: {value} (must be {min}..={max})")]
    ParameterOutOfRange {
        parameter: String,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("invalid parameter {parameter}: {reason}")]
    InvalidParameter { parameter: String, reason: String },

    #[error("invalid field selector: {0:?}")]
    InvalidSelector(String),

    #[error("field not found in event: {selector}")]
    FieldNotFound { selector: String },

    #[error("field {selector} is not numeric (found {found})")]
    FieldNotNumeric { selector: String, found: String },

    #[error("detection stage is not active")]
    NotActive,

    #[error("stale activation handle: {handle}")]
    StaleHandle { handle: String },
}

impl ChangePointError {
    /// Raised at activation time; fatal to that activation.
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            Self::MissingParameter(_)
                | Self::ParameterOutOfRange { .. }
                | Self::InvalidParameter { .. }
                | Self::InvalidSelector(_)
        )
    }

    /// Raised per event; the host decides whether to skip or halt.
    pub fn is_field_extraction_error(&self) -> bool {
        matches!(
            self,
            Self::FieldNotFound { .. } | Self::FieldNotNumeric { .. }
        )
    }
}

/// Convenience type alias for change-point results.
pub type ChangePointResult<T> = Result<T, ChangePointError>;
