//! Error types for the domain layer.

use std::collections::HashMap;
use std::error::Error;
use std::fmt;
use thiserror::Error;

/// Errors that occur during value object construction.
#[derive(Debug, Clone, Error)]
pub enum ValidationError {
    #[error("Field '{field}' cannot be empty")]
    EmptyField { field: String },

    #[error("Field '{field}' must be between {min} and {max}, got {actual}")]
    OutOfRange {
        field: String,
        min: i32,
        max: i32,
        actual: i32,
    },

    #[error("Field '{field}' has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

impl ValidationError {
    /// Creates an empty field validation error.
    pub fn empty_field(field: impl Into<String>) -> Self {
        ValidationError::EmptyField { field: field.into() }
    }

    /// Creates an out of range validation error.
    pub fn out_of_range(field: impl Into<String>, min: i32, max: i32, actual: i32) -> Self {
        ValidationError::OutOfRange {
            field: field.into(),
            min,
            max,
            actual,
        }
    }

    /// Creates an invalid format validation error.
    pub fn invalid_format(field: impl Into<String>, reason: impl Into<String>) -> Self {
        ValidationError::InvalidFormat {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Error codes organized by category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    // Input errors - rejected before any computation
    ValidationFailed,
    DistributionMismatch,
    InsufficientData,
    InvalidDimensions,

    // Numerical failures - surfaced with diagnostics, never retried
    ExtractionDiverged,
    RotationSingular,
    NonOrthogonalMatrix,

    // Session concurrency control - retryable after a state refresh
    SessionNotFound,
    SessionClosed,
    StaleSessionVersion,
    InvalidStateTransition,

    // Import/export errors
    ImportFormat,

    // Long-running work
    BootstrapCancelled,

    // Infrastructure errors
    StorageError,
    InternalError,
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorCode::ValidationFailed => "VALIDATION_FAILED",
            ErrorCode::DistributionMismatch => "DISTRIBUTION_MISMATCH",
            ErrorCode::InsufficientData => "INSUFFICIENT_DATA",
            ErrorCode::InvalidDimensions => "INVALID_DIMENSIONS",
            ErrorCode::ExtractionDiverged => "EXTRACTION_DIVERGED",
            ErrorCode::RotationSingular => "ROTATION_SINGULAR",
            ErrorCode::NonOrthogonalMatrix => "NON_ORTHOGONAL_MATRIX",
            ErrorCode::SessionNotFound => "SESSION_NOT_FOUND",
            ErrorCode::SessionClosed => "SESSION_CLOSED",
            ErrorCode::StaleSessionVersion => "STALE_SESSION_VERSION",
            ErrorCode::InvalidStateTransition => "INVALID_STATE_TRANSITION",
            ErrorCode::ImportFormat => "IMPORT_FORMAT",
            ErrorCode::BootstrapCancelled => "BOOTSTRAP_CANCELLED",
            ErrorCode::StorageError => "STORAGE_ERROR",
            ErrorCode::InternalError => "INTERNAL_ERROR",
        };
        write!(f, "{}", s)
    }
}

impl ErrorCode {
    /// True for errors a client may retry after refreshing session state.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ErrorCode::StaleSessionVersion | ErrorCode::StorageError
        )
    }
}

/// Standard domain error with code, message, and structured details.
///
/// Every error carries enough context to render an actionable message:
/// numerical failures include iteration counts and residuals, import
/// errors include the offending line and field.
#[derive(Debug, Clone)]
pub struct DomainError {
    pub code: ErrorCode,
    pub message: String,
    pub details: HashMap<String, String>,
}

impl DomainError {
    /// Creates a new domain error.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: HashMap::new(),
        }
    }

    /// Creates a validation error for a specific field.
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: ErrorCode::ValidationFailed,
            message: message.into(),
            details: HashMap::new(),
        }
        .with_detail("field", field.into())
    }

    /// Creates a distribution mismatch error for one participant.
    pub fn distribution_mismatch(participant: usize, message: impl Into<String>) -> Self {
        Self::new(ErrorCode::DistributionMismatch, message)
            .with_detail("participant", (participant + 1).to_string())
    }

    /// Creates an extraction divergence error with iteration diagnostics.
    pub fn extraction_diverged(factor: usize, iterations: usize) -> Self {
        Self::new(
            ErrorCode::ExtractionDiverged,
            format!(
                "Centroid sign flipping did not stabilize for factor {} after {} iterations",
                factor + 1,
                iterations
            ),
        )
        .with_detail("factor", (factor + 1).to_string())
        .with_detail("iterations", iterations.to_string())
    }

    /// Creates an import format error pointing at a line and field.
    pub fn import_format(line: usize, field: impl Into<String>, reason: impl Into<String>) -> Self {
        let field = field.into();
        Self::new(
            ErrorCode::ImportFormat,
            format!("Line {}, field '{}': {}", line, field, reason.into()),
        )
        .with_detail("line", line.to_string())
        .with_detail("field", field)
    }

    /// Adds a detail to the error.
    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.details.insert(key.into(), value.into());
        self
    }
}

impl fmt::Display for DomainError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl Error for DomainError {}

impl From<ValidationError> for DomainError {
    fn from(err: ValidationError) -> Self {
        DomainError::new(ErrorCode::ValidationFailed, err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_error_empty_field_displays_correctly() {
        let err = ValidationError::empty_field("ranks");
        assert_eq!(format!("{}", err), "Field 'ranks' cannot be empty");
    }

    #[test]
    fn validation_error_out_of_range_displays_correctly() {
        let err = ValidationError::out_of_range("factor_count", 1, 8, 12);
        assert_eq!(
            format!("{}", err),
            "Field 'factor_count' must be between 1 and 8, got 12"
        );
    }

    #[test]
    fn domain_error_displays_code_and_message() {
        let err = DomainError::new(ErrorCode::SessionClosed, "Session is closed");
        assert_eq!(format!("{}", err), "[SESSION_CLOSED] Session is closed");
    }

    #[test]
    fn extraction_diverged_carries_diagnostics() {
        let err = DomainError::extraction_diverged(2, 100);
        assert_eq!(err.code, ErrorCode::ExtractionDiverged);
        assert_eq!(err.details.get("factor"), Some(&"3".to_string()));
        assert_eq!(err.details.get("iterations"), Some(&"100".to_string()));
    }

    #[test]
    fn import_format_names_line_and_field() {
        let err = DomainError::import_format(7, "rank", "expected integer");
        assert_eq!(err.code, ErrorCode::ImportFormat);
        assert_eq!(err.details.get("line"), Some(&"7".to_string()));
        assert_eq!(err.details.get("field"), Some(&"rank".to_string()));
        assert!(err.message.contains("Line 7"));
    }

    #[test]
    fn stale_version_is_retryable() {
        assert!(ErrorCode::StaleSessionVersion.is_retryable());
        assert!(!ErrorCode::ExtractionDiverged.is_retryable());
    }

    #[test]
    fn validation_error_converts_to_domain_error() {
        let err: DomainError = ValidationError::empty_field("title").into();
        assert_eq!(err.code, ErrorCode::ValidationFailed);
    }
}
