/// Error types for engagement-service
use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use thiserror::Error;

use crate::handlers::ApiResponse;

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    #[error("Already exists: {0}")]
    AlreadyExists(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Backend unavailable: {0}")]
    BackendUnavailable(String),
}

impl ServiceError {
    /// Machine-readable error kind surfaced to clients
    pub fn kind(&self) -> &'static str {
        match self {
            ServiceError::Unauthorized(_) => "unauthorized",
            ServiceError::InvalidOperation(_) => "invalid_operation",
            ServiceError::AlreadyExists(_) => "already_exists",
            ServiceError::NotFound(_) => "not_found",
            ServiceError::BackendUnavailable(_) => "backend_unavailable",
        }
    }

    pub fn unauthenticated() -> Self {
        ServiceError::Unauthorized("authenticated actor required".to_string())
    }
}

impl From<sqlx::Error> for ServiceError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => ServiceError::NotFound("row not found".to_string()),
            sqlx::Error::Database(db) if db.is_foreign_key_violation() => {
                ServiceError::NotFound(format!("referenced row not found: {}", db.message()))
            }
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                ServiceError::AlreadyExists(db.message().to_string())
            }
            other => ServiceError::BackendUnavailable(format!("Database error: {}", other)),
        }
    }
}

/// Convert ServiceError to HTTP responses
impl ResponseError for ServiceError {
    fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ServiceError::InvalidOperation(_) => StatusCode::BAD_REQUEST,
            ServiceError::AlreadyExists(_) => StatusCode::CONFLICT,
            ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
            ServiceError::BackendUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(ApiResponse::<()>::err(self.kind(), self))
    }
}

/// Result type alias for service operations
pub type ServiceResult<T> = Result<T, ServiceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sqlx_errors_map_to_taxonomy() {
        assert!(matches!(
            ServiceError::from(sqlx::Error::RowNotFound),
            ServiceError::NotFound(_)
        ));
        assert!(matches!(
            ServiceError::from(sqlx::Error::PoolTimedOut),
            ServiceError::BackendUnavailable(_)
        ));
    }

    #[test]
    fn status_codes() {
        assert_eq!(
            ServiceError::unauthenticated().status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ServiceError::AlreadyExists("follow".into()).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ServiceError::BackendUnavailable("db".into()).status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(ServiceError::NotFound("x".into()).kind(), "not_found");
    }
}
