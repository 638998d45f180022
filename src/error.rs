use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use sqlx::migrate::MigrateError;
use thiserror::Error;

/// Top-level error type for the entire application
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("Reconciliation error: {0}")]
    Reconciliation(#[from] ReconciliationError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Unauthorized")]
    Unauthorized,
}

/// Ledger and wallet errors
#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Ledger entry not found: {0}")]
    EntryNotFound(String),

    #[error("Amount must be positive, got {0}")]
    NonPositiveAmount(i64),
}

/// Reconciliation errors
#[derive(Error, Debug)]
pub enum ReconciliationError {
    #[error("Reconciliation pass aborted after {scanned} owners: {message}")]
    Aborted { scanned: u64, message: String },
}

/// API error response structure
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub error_code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_code, message, details) = match self {
            AppError::Ledger(LedgerError::EntryNotFound(id)) => (
                StatusCode::NOT_FOUND,
                "LEDGER_ENTRY_NOT_FOUND",
                format!("Ledger entry not found: {}", id),
                None,
            ),
            AppError::Ledger(LedgerError::NonPositiveAmount(amount)) => (
                StatusCode::BAD_REQUEST,
                "NON_POSITIVE_AMOUNT",
                format!("Amount must be positive, got {}", amount),
                Some(serde_json::json!({ "amount_cents": amount })),
            ),
            AppError::Reconciliation(ReconciliationError::Aborted { scanned, message }) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "RECONCILIATION_ABORTED",
                format!("Reconciliation pass aborted: {}", message),
                Some(serde_json::json!({ "scanned": scanned })),
            ),
            AppError::NotFound(what) => (
                StatusCode::NOT_FOUND,
                "NOT_FOUND",
                format!("Not found: {}", what),
                None,
            ),
            AppError::InvalidInput(message) => (
                StatusCode::BAD_REQUEST,
                "INVALID_INPUT",
                message,
                None,
            ),
            AppError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "UNAUTHORIZED",
                "Unauthorized".to_string(),
                None,
            ),
            AppError::Database(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "DATABASE_ERROR",
                "A database error occurred".to_string(),
                None,
            ),
            _ => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "An internal error occurred".to_string(),
                None,
            ),
        };

        let body = Json(ErrorResponse {
            error: message,
            error_code: error_code.to_string(),
            details,
        });

        (status, body).into_response()
    }
}

impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        AppError::Internal(format!("Error converting: {:?}", error))
    }
}

impl From<MigrateError> for AppError {
    fn from(error: MigrateError) -> Self {
        AppError::Internal(format!("Migration error: {:?}", error))
    }
}

/// Result type alias for the application
pub type AppResult<T> = Result<T, AppError>;
