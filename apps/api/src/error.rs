//! # API Error Type
//!
//! Unified error type for HTTP handlers.
//!
//! ## Error Handling Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Flow in Moto POS                               │
//! │                                                                         │
//! │  Handler  Result<Json<T>, ApiError>                                     │
//! │     │                                                                   │
//! │     ├── ValidationError / CoreError ──┐                                 │
//! │     ├── DbError ──────────────────────┼──► ApiError ──► IntoResponse    │
//! │     └── bad JSON / query string ──────┘                                 │
//! │                                                                         │
//! │  Client receives:                                                       │
//! │     HTTP 400  { "error": "Retail price is required", "code": "..." }    │
//! │                                                                         │
//! │  Storage failures are logged in full; the client only sees a           │
//! │  generic reason.                                                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{FromRequest, FromRequestParts};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use tracing::error;

use motopos_core::{CoreError, ValidationError};
use motopos_db::DbError;

/// API error returned from handlers.
///
/// ## Serialization
/// ```json
/// {
///   "error": "Product not found: 0b6f…",
///   "code": "NOT_FOUND"
/// }
/// ```
#[derive(Debug, Clone, Serialize)]
pub struct ApiError {
    /// Human-readable reason
    #[serde(rename = "error")]
    pub message: String,

    /// Machine-readable error code for programmatic handling
    pub code: ErrorCode,
}

/// Error codes for API responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Input validation failed (400)
    ValidationError,

    /// SKU or barcode already assigned (409)
    DuplicateIdentity,

    /// Resource not found (404)
    NotFound,

    /// Price level not defined for the product (400)
    UnknownPriceLevel,

    /// Missing or invalid credentials (401)
    Unauthorized,

    /// Seeded system role cannot be deleted or renamed (400)
    SystemRoleProtected,

    /// Entity still referenced (400)
    InUse,

    /// Not enough units at the branch for an OUT movement (400)
    InsufficientStock,

    /// A stored or derived amount would leave the supported range (422)
    ValueOverflow,

    /// Storage call exceeded its time budget (504)
    Timeout,

    /// Database operation failed (500)
    DatabaseError,

    /// Internal server error (500)
    Internal,
}

impl ErrorCode {
    pub fn status(self) -> StatusCode {
        match self {
            ErrorCode::ValidationError
            | ErrorCode::UnknownPriceLevel
            | ErrorCode::SystemRoleProtected
            | ErrorCode::InUse
            | ErrorCode::InsufficientStock => StatusCode::BAD_REQUEST,
            ErrorCode::DuplicateIdentity => StatusCode::CONFLICT,
            ErrorCode::ValueOverflow => StatusCode::UNPROCESSABLE_ENTITY,
            ErrorCode::NotFound => StatusCode::NOT_FOUND,
            ErrorCode::Unauthorized => StatusCode::UNAUTHORIZED,
            ErrorCode::Timeout => StatusCode::GATEWAY_TIMEOUT,
            ErrorCode::DatabaseError | ErrorCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        ApiError {
            code,
            message: message.into(),
        }
    }

    pub fn not_found(resource: &str, id: &str) -> Self {
        ApiError::new(ErrorCode::NotFound, format!("{} not found: {}", resource, id))
    }

    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::ValidationError, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::Unauthorized, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::Internal, message)
    }

    pub fn status(&self) -> StatusCode {
        self.code.status()
    }

    /// Whether an idempotent read may be retried.
    pub fn is_timeout(&self) -> bool {
        self.code == ErrorCode::Timeout
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(self)).into_response()
    }
}

/// Result type for API handlers.
pub type ApiResult<T> = Result<T, ApiError>;

/// Converts database errors to API errors.
impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => ApiError::not_found(&entity, &id),
            DbError::UniqueViolation { field, value } => {
                let message = if value == "unknown" {
                    format!("Duplicate {}: value already exists", field)
                } else {
                    format!("Duplicate {}: '{}' already exists", field, value)
                };
                let code = match field.as_str() {
                    "sku" | "barcode" => ErrorCode::DuplicateIdentity,
                    _ => ErrorCode::ValidationError,
                };
                ApiError::new(code, message)
            }
            DbError::ForeignKeyViolation { message } => {
                tracing::warn!("Foreign key violation: {}", message);
                ApiError::validation("Invalid reference")
            }
            DbError::Timeout(after) => ApiError::new(
                ErrorCode::Timeout,
                format!("Storage did not respond within {} ms", after.as_millis()),
            ),
            DbError::PoolExhausted => {
                ApiError::new(ErrorCode::Timeout, "Database connection pool exhausted")
            }
            other => {
                // Log the actual error but return a generic message
                error!(error = %other, "Database operation failed");
                ApiError::new(ErrorCode::DatabaseError, "Database operation failed")
            }
        }
    }
}

/// Converts core errors to API errors.
impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        let code = match &err {
            CoreError::NotFound { .. } => ErrorCode::NotFound,
            CoreError::DuplicateIdentity { .. } => ErrorCode::DuplicateIdentity,
            CoreError::UnknownPriceLevel { .. } => ErrorCode::UnknownPriceLevel,
            CoreError::SystemRoleProtected { .. } => ErrorCode::SystemRoleProtected,
            CoreError::InUse { .. } => ErrorCode::InUse,
            CoreError::InsufficientStock { .. } => ErrorCode::InsufficientStock,
            CoreError::ValueOverflow { .. } => ErrorCode::ValueOverflow,
            CoreError::Validation(inner) => return ApiError::validation(inner.to_string()),
        };
        ApiError::new(code, err.to_string())
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::validation(err.to_string())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::validation(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::validation(rejection.body_text())
    }
}

/// `axum::Json` whose rejections render as [`ApiError`].
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

/// `axum::extract::Query` whose rejections render as [`ApiError`].
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ApiError))]
pub struct ApiQuery<T>(pub T);

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_status_codes() {
        assert_eq!(ErrorCode::ValidationError.status(), StatusCode::BAD_REQUEST);
        assert_eq!(ErrorCode::DuplicateIdentity.status(), StatusCode::CONFLICT);
        assert_eq!(ErrorCode::NotFound.status(), StatusCode::NOT_FOUND);
        assert_eq!(ErrorCode::Unauthorized.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(ErrorCode::SystemRoleProtected.status(), StatusCode::BAD_REQUEST);
        assert_eq!(ErrorCode::Timeout.status(), StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(ErrorCode::DatabaseError.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_db_error_mapping() {
        let err = ApiError::from(DbError::duplicate("sku", "PRD-1"));
        assert_eq!(err.code, ErrorCode::DuplicateIdentity);

        let err = ApiError::from(DbError::duplicate("code", "JKT-01"));
        assert_eq!(err.code, ErrorCode::ValidationError);

        let err = ApiError::from(DbError::Timeout(Duration::from_millis(50)));
        assert!(err.is_timeout());

        let err = ApiError::from(DbError::QueryFailed("disk I/O error".into()));
        assert_eq!(err.code, ErrorCode::DatabaseError);
        assert!(!err.message.contains("disk"));
    }

    #[test]
    fn test_core_error_mapping() {
        let err = ApiError::from(CoreError::UnknownPriceLevel {
            sku: "PRD-1".into(),
            level: "vip".into(),
        });
        assert_eq!(err.code, ErrorCode::UnknownPriceLevel);
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);

        let err = ApiError::from(CoreError::Validation(ValidationError::Required {
            field: "name".into(),
        }));
        assert_eq!(err.code, ErrorCode::ValidationError);
        assert_eq!(err.message, "name is required");

        let err = ApiError::from(CoreError::value_overflow("stock_value"));
        assert_eq!(err.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(err.message, "stock_value exceeds the supported range");
    }

    #[test]
    fn test_body_shape() {
        let body = serde_json::to_value(ApiError::not_found("Product", "p1")).unwrap();
        assert_eq!(body["error"], "Product not found: p1");
        assert_eq!(body["code"], "NOT_FOUND");
    }
}
