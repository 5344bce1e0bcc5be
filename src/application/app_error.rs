use thiserror::Error;

use crate::domain::reconciliation::ReconcileError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Forbidden")]
    Forbidden,

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid webhook signature: {0}")]
    InvalidSignature(String),

    #[error("Payment has not completed")]
    PaymentIncomplete,

    #[error("Not found")]
    NotFound,

    #[error("Concurrent updates exhausted the retry budget")]
    PersistenceConflict,

    #[error("Timed out: {0}")]
    Timeout(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Whether retrying the same request may succeed.
    ///
    /// Drives the webhook acknowledgement: retryable failures answer 5xx so
    /// the provider redelivers, everything else is acknowledged.
    pub fn is_retryable(&self) -> bool {
        match self {
            // Transient errors - retry may succeed
            AppError::Database(_) => true,
            AppError::Internal(_) => true,
            AppError::PersistenceConflict => true,
            AppError::Timeout(_) => true,

            // Expected conditions - won't change with retry
            AppError::NotFound => false,
            AppError::InvalidInput(_) => false,
            AppError::InvalidSignature(_) => false,
            AppError::Forbidden => false,
            AppError::InvalidCredentials => false,
            AppError::PaymentIncomplete => false,
        }
    }
}

impl From<ReconcileError> for AppError {
    fn from(err: ReconcileError) -> Self {
        match err {
            ReconcileError::UnknownPlan(_) => AppError::NotFound,
            ReconcileError::AccountMismatch => AppError::Forbidden,
            other => AppError::InvalidInput(other.to_string()),
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub enum ErrorCode {
    DatabaseError,
    InvalidCredentials,
    Forbidden,
    InvalidInput,
    InvalidSignature,
    PaymentIncomplete,
    NotFound,
    PersistenceConflict,
    Timeout,
    InternalError,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::DatabaseError => "DATABASE_ERROR",
            ErrorCode::InvalidCredentials => "INVALID_CREDENTIALS",
            ErrorCode::Forbidden => "FORBIDDEN",
            ErrorCode::InvalidInput => "INVALID_INPUT",
            ErrorCode::InvalidSignature => "INVALID_SIGNATURE",
            ErrorCode::PaymentIncomplete => "PAYMENT_INCOMPLETE",
            ErrorCode::NotFound => "NOT_FOUND",
            ErrorCode::PersistenceConflict => "PERSISTENCE_CONFLICT",
            ErrorCode::Timeout => "TIMEOUT",
            ErrorCode::InternalError => "INTERNAL_ERROR",
        }
    }
}

pub type AppResult<T> = Result<T, AppError>;
