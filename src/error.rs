//! Error types for the HETS rotation engine

use serde::Serialize;
use thiserror::Error;

/// Business result codes reported back to the presentation layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorCode {
    /// HETS-01
    RecordNotFound,
    /// HETS-06
    RequestNotInProgress,
    /// HETS-07
    CountBelowHired,
    /// HETS-08
    DuplicateInProgress,
    /// HETS-09
    AgreementsExist,
    /// HETS-10
    RequestComplete,
}

impl ErrorCode {
    /// Stable code string (e.g. `HETS-07`)
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::RecordNotFound => "HETS-01",
            ErrorCode::RequestNotInProgress => "HETS-06",
            ErrorCode::CountBelowHired => "HETS-07",
            ErrorCode::DuplicateInProgress => "HETS-08",
            ErrorCode::AgreementsExist => "HETS-09",
            ErrorCode::RequestComplete => "HETS-10",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            ErrorCode::RecordNotFound => "Record not found",
            ErrorCode::RequestNotInProgress => "Rental Request is not In Progress",
            ErrorCode::CountBelowHired => {
                "Rental Request count cannot be less than equipment already hired"
            }
            ErrorCode::DuplicateInProgress => {
                "An In Progress Rental Request already exists for this Local Area and Equipment Type"
            }
            ErrorCode::AgreementsExist => {
                "Rental Request cannot be cancelled - Rental Agreements exist"
            }
            ErrorCode::RequestComplete => {
                "Rental Request cannot be cancelled - the request is Complete"
            }
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.as_str(), self.description())
    }
}

/// Main application error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Business rule violation: {0}")]
    BusinessRule(ErrorCode),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Business code for this error, if it maps to one
    pub fn code(&self) -> Option<ErrorCode> {
        match self {
            AppError::NotFound(_) => Some(ErrorCode::RecordNotFound),
            AppError::BusinessRule(code) => Some(*code),
            _ => None,
        }
    }

    pub fn not_found(what: &str, id: i32) -> Self {
        AppError::NotFound(format!("{} {} not found", what, id))
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        AppError::Validation(errors.to_string())
    }
}

/// Structured error body handed to collaborators (API layer, CLI output)
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub code: Option<&'static str>,
    pub error: String,
    pub message: String,
}

impl From<&AppError> for ErrorResponse {
    fn from(err: &AppError) -> Self {
        match err.code() {
            Some(code) => ErrorResponse {
                code: Some(code.as_str()),
                error: format!("{:?}", code),
                message: code.description().to_string(),
            },
            None => {
                if let AppError::Database(e) = err {
                    tracing::error!("Database error: {:?}", e);
                }
                ErrorResponse {
                    code: None,
                    error: "Failure".to_string(),
                    message: err.to_string(),
                }
            }
        }
    }
}

/// Result type alias for application operations
pub type AppResult<T> = Result<T, AppError>;
