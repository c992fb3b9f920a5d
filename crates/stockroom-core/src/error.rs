//! # Error Types
//!
//! Domain-specific error types for stockroom-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  stockroom-core errors (this file)                                     │
//! │  ├── ValidationError  - Input and business rule failures               │
//! │  └── ScanError        - Barcode decoder failures                       │
//! │                                                                         │
//! │  stockroom-db errors (separate crate)                                  │
//! │  └── DbError          - Store failures, wraps both of the above        │
//! │                                                                         │
//! │  Flow: ValidationError → DbError → ErrorKind → caller                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These are expected, caller-recoverable conditions. Their messages are
/// meant to be shown to the operator verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too short.
    #[error("{field} must be at least {min} characters")]
    TooShort { field: String, min: usize },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Value falls outside the accepted range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be strictly greater than zero.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Value must be zero or greater.
    #[error("{field} must not be negative")]
    MustNotBeNegative { field: String },

    /// Invalid format (e.g., malformed date, unparseable amount).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Checkout was called without any line items.
    #[error("empty transaction: at least one line item is required")]
    EmptyTransaction,

    /// A sale asked for more units than are on hand while the reject
    /// oversell policy is active.
    ///
    /// ## User Workflow
    /// ```text
    /// Checkout (qty: 5)
    ///      │
    ///      ▼
    /// UPDATE ... WHERE quantity >= 5 matches nothing (on hand: 3)
    ///      │
    ///      ▼
    /// InsufficientStock { item_id, available: 3, requested: 5 }
    ///      │
    ///      ▼
    /// Whole checkout rolled back
    /// ```
    #[error("insufficient stock for item {item_id}: available {available}, requested {requested}")]
    InsufficientStock {
        item_id: String,
        available: i64,
        requested: i64,
    },

    /// The actor lacks the capability the operation needs.
    #[error("permission denied: {capability} required")]
    PermissionDenied { capability: String },
}

impl ValidationError {
    /// Shorthand for [`ValidationError::Required`].
    pub fn required(field: impl Into<String>) -> Self {
        ValidationError::Required {
            field: field.into(),
        }
    }

    /// Shorthand for [`ValidationError::InvalidFormat`].
    pub fn invalid_format(field: impl Into<String>, reason: impl Into<String>) -> Self {
        ValidationError::InvalidFormat {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

// =============================================================================
// Scan Error
// =============================================================================

/// Errors produced while turning an image into a code string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScanError {
    /// A single decoder could not read the image.
    #[error("{decoder} could not decode image: {reason}")]
    DecodeFailed { decoder: String, reason: String },

    /// Every decoder in the chain failed.
    #[error("unrecognized barcode or QR code (tried: {})", attempted.join(", "))]
    Unrecognized { attempted: Vec<String> },
}

// =============================================================================
// Unit Tests
// =============================================================================
