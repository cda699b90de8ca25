//! # Error Types
//!
//! Domain-specific error types for motopos-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  motopos-core errors (this file)                                       │
//! │  ├── CoreError        - Business rule violations                       │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  motopos-db errors (separate crate)                                    │
//! │  └── DbError          - Database operation failures, timeouts          │
//! │                                                                         │
//! │  HTTP API errors (in app)                                              │
//! │  └── ApiError         - Status code + JSON body                        │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → ApiError → Client                 │
//! │                          DbError   ─┘                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (SKU, ID, level, etc.)
//! 3. Errors are enum variants, never String
//! 4. Every rejected mutation carries a reason string

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// An entity cannot be found.
    ///
    /// ## When This Occurs
    /// - Product, branch, role, category or brand ID doesn't exist
    /// - Product was deleted (tombstoned)
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// A caller-supplied SKU or barcode collides with an existing product.
    ///
    /// ## User Workflow
    /// ```text
    /// Create product { sku: "PRD-OIL-10W40" }
    ///      │
    ///      ▼
    /// Identity check: "PRD-OIL-10W40" already assigned
    ///      │
    ///      ▼
    /// DuplicateIdentity { field: "sku", value: "PRD-OIL-10W40" }
    /// ```
    #[error("Duplicate {field}: '{value}' is already assigned to another product")]
    DuplicateIdentity { field: String, value: String },

    /// The requested price level is not defined for the product.
    #[error("Unknown price level '{level}' for product {sku}")]
    UnknownPriceLevel { sku: String, level: String },

    /// Attempted to delete (or rename) a seeded system role.
    #[error("System role '{name}' cannot be {action}")]
    SystemRoleProtected { name: String, action: String },

    /// Entity is still referenced and cannot be removed.
    #[error("{entity} {id} is still in use: {reason}")]
    InUse {
        entity: String,
        id: String,
        reason: String,
    },

    /// An OUT adjustment or transfer takes more units than the branch holds.
    #[error("Insufficient stock at branch {branch_id}: {available} available, {requested} requested")]
    InsufficientStock {
        branch_id: String,
        available: i64,
        requested: i64,
    },

    /// A derived amount (stock value, totals) no longer fits in an i64.
    #[error("{field} exceeds the supported range")]
    ValueOverflow { field: String },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    /// Creates a NotFound error for a given entity type and ID.
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        CoreError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Creates a ValueOverflow error for a derived field.
    pub fn value_overflow(field: impl Into<String>) -> Self {
        CoreError::ValueOverflow {
            field: field.into(),
        }
    }

    /// Creates a DuplicateIdentity error.
    pub fn duplicate_identity(field: impl Into<String>, value: impl Into<String>) -> Self {
        CoreError::DuplicateIdentity {
            field: field.into(),
            value: value.into(),
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when user input doesn't meet requirements.
/// Used for early validation before business logic runs.
#[derive(Debug, Error)]
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

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Value must not be negative.
    #[error("{field} must not be negative")]
    MustNotBeNegative { field: String },

    /// Invalid format (e.g., invalid UUID, invalid date).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// A date range where the end does not come after the start.
    #[error("end_date ({end}) must be after start_date ({start})")]
    InvalidDateRange { start: String, end: String },

    /// Field cannot be changed after creation.
    #[error("{field} is immutable once assigned")]
    Immutable { field: String },

    /// Referenced entity does not exist.
    #[error("{field} references unknown {entity} '{id}'")]
    UnknownReference {
        field: String,
        entity: String,
        id: String,
    },

    /// Duplicate value (e.g., duplicate branch code).
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
        let err = CoreError::DuplicateIdentity {
            field: "barcode".to_string(),
            value: "2001234567890".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Duplicate barcode: '2001234567890' is already assigned to another product"
        );

        let err = CoreError::UnknownPriceLevel {
            sku: "PRD-123456-ABC".to_string(),
            level: "vip".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Unknown price level 'vip' for product PRD-123456-ABC"
        );
    }

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::Required {
            field: "name".to_string(),
        };
        assert_eq!(err.to_string(), "name is required");

        let err = ValidationError::MustNotBeNegative {
            field: "stock_quantity".to_string(),
        };
        assert_eq!(err.to_string(), "stock_quantity must not be negative");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::Required {
            field: "sku".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
