use thiserror::Error;

/// Process-level error: a message plus the exit code the binary returns.
///
/// Exit codes:
/// - `2` input, configuration or IO problems
/// - `3` data problems (nothing left to train on)
/// - `4` internal failures (model, bundle invariants, terminal)
#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}

/// Failures of the feature transform and its record boundary.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TransformError {
    /// A categorical value outside the fixed catalog.
    #[error("unknown {field} '{value}'")]
    UnknownCategory { field: &'static str, value: String },

    /// A required field is absent (inference never imputes).
    #[error("incomplete record: missing `{field}`")]
    IncompleteRecord { field: &'static str },

    /// A numeric field outside its domain (negative or non-finite measure).
    #[error("invalid {field} {value}: must be a finite number >= 0")]
    InvalidValue { field: &'static str, value: f64 },

    /// The bundle's column order disagrees with the live transform.
    #[error("column mismatch: {0}")]
    ColumnMismatch(String),

    /// A stored booster could not be loaded or scored.
    #[error("model error: {0}")]
    Model(String),
}

impl TransformError {
    pub fn unknown(field: &'static str, value: impl Into<String>) -> Self {
        TransformError::UnknownCategory {
            field,
            value: value.into(),
        }
    }
}

impl From<TransformError> for AppError {
    fn from(err: TransformError) -> Self {
        let code = match err {
            TransformError::UnknownCategory { .. }
            | TransformError::IncompleteRecord { .. }
            | TransformError::InvalidValue { .. } => 2,
            TransformError::ColumnMismatch(_) | TransformError::Model(_) => 4,
        };
        AppError::new(code, err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transform_errors_map_to_exit_codes() {
        let err: AppError = TransformError::unknown("status", "Cancelled").into();
        assert_eq!(err.exit_code(), 2);
        assert_eq!(err.message(), "unknown status 'Cancelled'");

        let err: AppError = TransformError::ColumnMismatch("3 != 4".to_string()).into();
        assert_eq!(err.exit_code(), 4);

        let err: AppError = TransformError::InvalidValue {
            field: "width",
            value: -1.0,
        }
        .into();
        assert_eq!(err.exit_code(), 2);
        assert_eq!(err.message(), "invalid width -1: must be a finite number >= 0");
    }
}
