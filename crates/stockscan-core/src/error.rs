//! # Error Types
//!
//! Domain-specific error types for stockscan-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  stockscan-core errors (this file)                                     │
//! │  ├── ScanRejection    - One scan refused; draft left untouched         │
//! │  ├── CoreError        - Domain failures (stock, lifecycle, indexes)    │
//! │  └── ValidationError  - Field-level input failures                     │
//! │                                                                         │
//! │  stockscan-db errors (separate crate)                                  │
//! │  └── DbError          - Database operation failures                    │
//! │                                                                         │
//! │  stockscan-session errors (separate crate)                             │
//! │  └── SessionError     - Hardware, persistence, lifecycle               │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → SessionError → OperatorNotice     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Recovery Policy
//! A [`ScanRejection`] is always recovered locally: it blocks exactly one scan
//! event and the operator may retry. [`CoreError::InsufficientStock`] blocks a
//! whole commit.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use ts_rs::TS;

// =============================================================================
// Scan Rejection
// =============================================================================

/// Why a single scanned code was refused.
///
/// ## User Workflow
/// ```text
/// Scan "A1"
///      │
///      ├── blank after trim?            → Empty
///      ├── already in the sales ledger? → AlreadySold
///      ├── no product owns it?          → NotFound
///      ├── already on a draft line?     → DuplicateInTransaction
///      │
///      ▼
/// Assigned to a line
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum ScanRejection {
    /// The code was blank after trimming.
    #[error("Scanned code is empty")]
    Empty,

    /// The code already appears on a committed sale or debt line.
    #[error("Unit {code} has already been sold")]
    AlreadySold { code: String },

    /// The code is already assigned somewhere in this draft transaction.
    #[error("Unit {code} is already in this transaction")]
    DuplicateInTransaction { code: String },

    /// No product in the store owns the code.
    #[error("No product has unit code {code}")]
    NotFound { code: String },

    /// Catalog editing only: the code cannot be stored (delimiter, length).
    #[error("Unit code {code} cannot be stored")]
    Malformed { code: String },

    /// The code belongs to a different product.
    #[error("Unit {code} already belongs to {owner}")]
    OwnedByOtherProduct { code: String, owner: String },
}

impl ScanRejection {
    /// Machine-readable code for operator notices.
    pub fn code(&self) -> &'static str {
        match self {
            ScanRejection::Empty => "EMPTY",
            ScanRejection::AlreadySold { .. } => "ALREADY_SOLD",
            ScanRejection::DuplicateInTransaction { .. } => "DUPLICATE_IN_TRANSACTION",
            ScanRejection::NotFound { .. } => "NOT_FOUND",
            ScanRejection::Malformed { .. } => "MALFORMED",
            ScanRejection::OwnedByOtherProduct { .. } => "OWNED_BY_OTHER_PRODUCT",
        }
    }
}

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
///
/// These errors represent business rule violations or domain logic failures.
/// They should be caught and translated to operator-facing messages.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// Insufficient stock to commit (or grow) a line.
    ///
    /// ## User Workflow
    /// ```text
    /// Commit [Phone X × 3]
    ///      │
    ///      ▼
    /// inventory.available_qty = 2
    ///      │
    ///      ▼
    /// InsufficientStock { product: "Phone X", available: 2, requested: 3 }
    ///      │
    ///      ▼
    /// Nothing is written. UI shows: "Only 2 Phone X in stock"
    /// ```
    #[error("Insufficient stock for {product}: available {available}, requested {requested}")]
    InsufficientStock {
        product: String,
        available: i64,
        requested: i64,
    },

    /// A draft line index does not exist.
    #[error("Line {index} does not exist (transaction has {len} lines)")]
    LineOutOfRange { index: usize, len: usize },

    /// A code slot index does not exist on a line.
    #[error("Slot {slot} does not exist on line {line}")]
    SlotOutOfRange { line: usize, slot: usize },

    /// A line must be bound to a product before it can be committed.
    #[error("Line {index} has no product")]
    UnboundLine { index: usize },

    /// The transaction has nothing to commit.
    #[error("Transaction has no lines to commit")]
    EmptyTransaction,

    /// Transaction lifecycle does not allow the requested operation.
    ///
    /// ## When This Occurs
    /// - Restructuring lines after commit
    /// - Editing a deleted transaction
    #[error("Cannot {operation} a transaction that is {state}")]
    InvalidTransition {
        state: String,
        operation: String,
    },

    /// Quantity exceeds maximum allowed.
    #[error("Quantity {requested} exceeds maximum allowed ({max})")]
    QuantityTooLarge { requested: i64, max: i64 },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when input doesn't meet requirements.
/// Used for early validation before business logic runs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Value contains the list delimiter and cannot be stored.
    #[error("{field} '{value}' must not contain '{delimiter}'")]
    ContainsDelimiter {
        field: String,
        value: String,
        delimiter: char,
    },

    /// Parallel lists have different lengths.
    #[error("{field} has {actual} entries, expected {expected}")]
    LengthMismatch {
        field: String,
        expected: usize,
        actual: usize,
    },

    /// Duplicate value (e.g., the same unit code twice on a product).
    #[error("{field} '{value}' already exists")]
    Duplicate { field: String, value: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::InsufficientStock {
            product: "Phone X".to_string(),
            available: 2,
            requested: 3,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient stock for Phone X: available 2, requested 3"
        );
    }

    #[test]
    fn test_rejection_messages_and_codes() {
        let rejection = ScanRejection::AlreadySold {
            code: "356938035643809".to_string(),
        };
        assert_eq!(rejection.to_string(), "Unit 356938035643809 has already been sold");
        assert_eq!(rejection.code(), "ALREADY_SOLD");
        assert_eq!(ScanRejection::Empty.code(), "EMPTY");
    }

    #[test]
    fn test_rejection_serializes_with_reason_tag() {
        let json = serde_json::to_value(ScanRejection::NotFound {
            code: "Z9".to_string(),
        })
        .unwrap();
        assert_eq!(json["reason"], "not_found");
        assert_eq!(json["code"], "Z9");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::Required {
            field: "code".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
