//! # Error Types
//!
//! Validation error types for tally-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                        Error Types                               │
//! │                                                                  │
//! │  tally-core (this file)                                          │
//! │  └── ValidationError  - input/business-rule validation failures  │
//! │                                                                  │
//! │  tally-db (separate crate)                                       │
//! │  ├── DbError          - database operation failures              │
//! │  └── EngineError      - operation-surface taxonomy (forbidden,   │
//! │                         not-found, conflict, insufficient stock) │
//! │                                                                  │
//! │  Flow: ValidationError → EngineError → caller envelope           │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. `thiserror` derive macros, never manual impls
//! 2. Context in the message (field name, bounds)
//! 3. Errors are enum variants, never bare strings

use thiserror::Error;

/// Input validation errors.
///
/// Raised before any transaction is opened; a request failing validation
/// never touches the database.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: &'static str },

    /// Value must be strictly positive.
    #[error("{field} must be positive")]
    MustBePositive { field: &'static str },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: &'static str, min: i64, max: i64 },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: &'static str, max: usize },

    /// Invalid format (bad UUID, malformed phone number, ...).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: &'static str, reason: String },

    /// Two fields that must differ are equal.
    #[error("{field} must differ from {other}")]
    MustDiffer { field: &'static str, other: &'static str },

    /// Bill monetary fields do not balance.
    ///
    /// `total = subtotal - discount + tax + shipping` must hold within
    /// rounding tolerance.
    #[error("bill totals do not balance: expected total {expected}, got {actual}")]
    Unbalanced { expected: i64, actual: i64 },
}

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = ValidationError::Required { field: "quantity" };
        assert_eq!(err.to_string(), "quantity is required");

        let err = ValidationError::OutOfRange {
            field: "discount_percent",
            min: 0,
            max: 10000,
        };
        assert_eq!(err.to_string(), "discount_percent must be between 0 and 10000");

        let err = ValidationError::Unbalanced {
            expected: 33000,
            actual: 32000,
        };
        assert!(err.to_string().contains("33000"));
    }
}
