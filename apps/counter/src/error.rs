//! # API Error Type
//!
//! Unified error type for counter commands.
//!
//! ## Error Handling Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Flow in the Counter                            │
//! │                                                                         │
//! │  Command Function: Result<Outcome, ApiError>                            │
//! │         │                                                               │
//! │         ├── DbError::Rejected(CoreError) ──► typed code + message       │
//! │         │     e.g. INSUFFICIENT_STOCK, DUPLICATE_PAYMENT                │
//! │         │                                                               │
//! │         └── any storage failure ──────────► logged with details,        │
//! │               (query, transaction, pool)     STORAGE_FAILURE +          │
//! │                                              generic message            │
//! │                                                                         │
//! │  {"success":false,"code":"EMPTY_CART","message":"Cart is empty ..."}   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A storage failure always means nothing was committed, so the caller can
//! retry the whole command.

use apotheca_core::CoreError;
use apotheca_db::DbError;
use serde::{Deserialize, Serialize};

/// API error returned from counter commands.
///
/// ## Serialization
/// ```json
/// {
///   "code": "INSUFFICIENT_STOCK",
///   "message": "Insufficient stock for product 7 at branch 1: available 5, requested 100"
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiError {
    /// Machine-readable error code for programmatic handling
    pub code: ErrorCode,

    /// Human-readable error message for display
    pub message: String,
}

/// Error codes for API responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Request line was not a valid command
    InvalidRequest,

    /// Input validation failed
    ValidationError,

    /// Order, payment, method or prescription not found
    NotFound,

    UnknownProduct,
    UnknownBranch,
    NotCarried,
    InsufficientStock,
    EmptyCart,
    DuplicateSku,
    DuplicatePayment,
    DuplicatePrescription,

    /// Status change not allowed from the current state
    InvalidTransition,

    /// Cart line or size limit reached
    CartError,

    /// Business rule violated
    BusinessLogic,

    /// Nothing was committed; the command can be retried
    StorageFailure,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        ApiError {
            code,
            message: message.into(),
        }
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::InvalidRequest, message)
    }

    pub fn not_found(resource: &str, id: impl std::fmt::Display) -> Self {
        ApiError::new(ErrorCode::NotFound, format!("{} not found: {}", resource, id))
    }

    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::ValidationError, message)
    }

    fn storage(message: &str) -> Self {
        ApiError::new(ErrorCode::StorageFailure, message)
    }
}

/// Converts database errors to API errors.
impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::Rejected(core) => ApiError::from(core),
            DbError::NotFound { entity, id } => ApiError::not_found(&entity, id),
            DbError::UniqueViolation { field } => {
                ApiError::validation(format!("{} already exists", field))
            }
            DbError::ForeignKeyViolation { message } => {
                tracing::error!("Foreign key violation: {}", message);
                ApiError::validation("Invalid reference")
            }
            DbError::CheckViolation { message } => {
                tracing::error!("Check constraint violation: {}", message);
                ApiError::validation("Value out of range")
            }
            DbError::Busy => {
                tracing::warn!("Database busy");
                ApiError::storage("Database is busy, try again")
            }
            DbError::ConnectionFailed(e) => {
                tracing::error!("Database connection failed: {}", e);
                ApiError::storage("Database connection failed")
            }
            DbError::MigrationFailed(e) => {
                tracing::error!("Database migration failed: {}", e);
                ApiError::storage("Database migration failed")
            }
            DbError::QueryFailed(e) => {
                // Log the actual error but return a generic message
                tracing::error!("Database query failed: {}", e);
                ApiError::storage("Database operation failed")
            }
            DbError::TransactionFailed(e) => {
                tracing::error!("Transaction failed: {}", e);
                ApiError::storage("Database transaction failed")
            }
            DbError::PoolExhausted => ApiError::storage("Database pool exhausted"),
            DbError::Internal(e) => {
                tracing::error!("Internal database error: {}", e);
                ApiError::storage("Database operation failed")
            }
        }
    }
}

/// Converts core errors to API errors.
impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        let message = err.to_string();
        let code = match err {
            CoreError::InsufficientStock { .. } => ErrorCode::InsufficientStock,
            CoreError::NotCarried { .. } => ErrorCode::NotCarried,
            CoreError::UnknownProduct(_) => ErrorCode::UnknownProduct,
            CoreError::UnknownBranch(_) => ErrorCode::UnknownBranch,
            CoreError::EmptyCart { .. } => ErrorCode::EmptyCart,
            CoreError::DuplicateSku { .. } => ErrorCode::DuplicateSku,
            CoreError::DuplicatePayment { .. } => ErrorCode::DuplicatePayment,
            CoreError::DuplicatePrescription(_) => ErrorCode::DuplicatePrescription,
            CoreError::OrderNotFound(_)
            | CoreError::PaymentNotFound(_)
            | CoreError::PaymentMethodNotFound(_)
            | CoreError::PrescriptionNotFound(_) => ErrorCode::NotFound,
            CoreError::InvalidOrderTransition { .. }
            | CoreError::OrderCancelled(_)
            | CoreError::OrderPaid { .. }
            | CoreError::InvalidPaymentTransition { .. }
            | CoreError::PrescriptionAlreadyReviewed { .. } => ErrorCode::InvalidTransition,
            CoreError::StockRemaining { .. } => ErrorCode::BusinessLogic,
            CoreError::CartTooLarge { .. } => ErrorCode::CartError,
            CoreError::QuantityTooLarge { .. }
            | CoreError::InvalidAmount { .. }
            | CoreError::Validation(_) => ErrorCode::ValidationError,
        };

        ApiError { code, message }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{:?}] {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejections_keep_their_message() {
        let err = ApiError::from(DbError::Rejected(CoreError::InsufficientStock {
            branch_id: 1,
            product_id: 7,
            available: 5,
            requested: 100,
        }));

        assert_eq!(err.code, ErrorCode::InsufficientStock);
        assert!(err.message.contains("available 5, requested 100"));
    }

    #[test]
    fn test_storage_details_are_not_returned() {
        let err = ApiError::from(DbError::QueryFailed("no such table: stock".into()));

        assert_eq!(err.code, ErrorCode::StorageFailure);
        assert!(!err.message.contains("stock"));
    }

    #[test]
    fn test_storage_failure_code_matches_db_classification() {
        let errors = vec![
            DbError::Rejected(CoreError::EmptyCart { customer_id: 42 }),
            DbError::not_found("Order", 9),
            DbError::UniqueViolation {
                field: "payments.order_id".into(),
            },
            DbError::ForeignKeyViolation {
                message: "FOREIGN KEY constraint failed".into(),
            },
            DbError::CheckViolation {
                message: "CHECK constraint failed".into(),
            },
            DbError::Busy,
            DbError::ConnectionFailed("refused".into()),
            DbError::MigrationFailed("checksum".into()),
            DbError::QueryFailed("syntax".into()),
            DbError::TransactionFailed("commit".into()),
            DbError::PoolExhausted,
            DbError::Internal("decode".into()),
        ];

        for err in errors {
            let storage = err.is_storage_failure();
            let api = ApiError::from(err);
            assert_eq!(api.code == ErrorCode::StorageFailure, storage, "{}", api);
        }
    }

    #[test]
    fn test_code_serialization() {
        let json = serde_json::to_string(&ErrorCode::DuplicatePayment).unwrap();
        assert_eq!(json, "\"DUPLICATE_PAYMENT\"");
    }
}
