//! Error types and HTTP response conversion

use std::collections::BTreeMap;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::ids::{IdConfigError, IdError};
use crate::pagination::PaginationError;
use crate::repository::{RepositoryError, RepositoryErrorKind};
use crate::validation::{conflict_message, ValidationErrors};

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Message shared by every not-found response
pub const NOT_FOUND_MESSAGE: &str = "Resource not found";

/// Message for missing or invalid bearer tokens
pub const UNAUTHORIZED_MESSAGE: &str = "Unauthorized request";

/// Main error type
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(Box<figment::Error>),

    /// Identifier obfuscation parameters rejected at startup
    #[error("Identifier configuration error: {0}")]
    Ids(#[from] IdConfigError),

    /// Public identifier did not decode
    #[error("Invalid public identifier")]
    InvalidId,

    /// Decoded identifier has no backing row
    #[error("Not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Pagination(#[from] PaginationError),

    #[error(transparent)]
    Validation(#[from] ValidationErrors),

    /// Missing or invalid credentials
    #[error("Authentication failed: {0}")]
    Unauthorized(String),

    /// Caller does not own the resource
    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal server error
    #[error("Internal server error: {0}")]
    Internal(String),
}

/// Error response body
///
/// Every error is wrapped in a top-level `errors` object.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub errors: ErrorBody,
}

/// Contents of the `errors` object
#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ErrorBody {
    /// Status code plus a message (string or list of strings)
    Status { status_code: u16, message: Value },
    /// Field name to message
    Fields(BTreeMap<String, String>),
}

impl ErrorResponse {
    pub fn status(status: StatusCode, message: impl Into<Value>) -> Self {
        Self {
            errors: ErrorBody::Status {
                status_code: status.as_u16(),
                message: message.into(),
            },
        }
    }

    pub fn fields(fields: BTreeMap<String, String>) -> Self {
        Self {
            errors: ErrorBody::Fields(fields),
        }
    }
}

impl Error {
    /// HTTP status this error maps to
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::InvalidId | Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::Pagination(_) => StatusCode::BAD_REQUEST,
            Error::Validation(errors) if errors.is_conflict() => StatusCode::CONFLICT,
            Error::Validation(_) => StatusCode::BAD_REQUEST,
            Error::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Error::Forbidden(_) => StatusCode::FORBIDDEN,
            Error::Repository(e) => match e.kind {
                RepositoryErrorKind::NotFound => StatusCode::NOT_FOUND,
                RepositoryErrorKind::AlreadyExists => StatusCode::CONFLICT,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Error::Config(_) | Error::Ids(_) | Error::Io(_) | Error::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = match self {
            Error::InvalidId => ErrorResponse::status(status, NOT_FOUND_MESSAGE),

            Error::NotFound(what) => {
                tracing::debug!(resource = %what, "Not found");
                ErrorResponse::status(status, NOT_FOUND_MESSAGE)
            }

            Error::Pagination(e) => ErrorResponse::status(
                status,
                Value::from(e.messages().to_vec()),
            ),

            Error::Validation(errors) => ErrorResponse::fields(errors.into_fields()),

            Error::Unauthorized(reason) => {
                tracing::debug!(%reason, "Unauthorized request");
                ErrorResponse::status(status, UNAUTHORIZED_MESSAGE)
            }

            Error::Forbidden(message) => ErrorResponse::status(status, message),

            Error::Repository(ref e) => {
                tracing::error!(
                    operation = %e.operation,
                    kind = %e.kind,
                    entity_type = ?e.entity_type,
                    retriable = e.is_retriable(),
                    "Repository error: {}", e.message
                );
                match e.kind {
                    RepositoryErrorKind::NotFound => ErrorResponse::status(status, NOT_FOUND_MESSAGE),
                    RepositoryErrorKind::AlreadyExists => {
                        let column = e.column.clone().unwrap_or_else(|| "id".to_string());
                        let message = conflict_message(&column);
                        ErrorResponse::fields(BTreeMap::from([(column, message)]))
                    }
                    _ => ErrorResponse::status(status, "Internal server error"),
                }
            }

            other => {
                tracing::error!(error = %other, "Internal error");
                ErrorResponse::status(status, "Internal server error")
            }
        };

        (status, Json(body)).into_response()
    }
}

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Error::Config(Box::new(err))
    }
}

impl From<IdError> for Error {
    fn from(err: IdError) -> Self {
        match err {
            IdError::InvalidToken => Error::InvalidId,
            // Stored ids outside the permutation domain are a deployment fault
            IdError::OutOfRange { .. } => Error::Internal(err.to_string()),
        }
    }
}

#[cfg(feature = "database")]
impl From<sqlx::Error> for Error {
    fn from(err: sqlx::Error) -> Self {
        Error::Repository(err.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::RepositoryOperation;

    async fn body(error: Error) -> (StatusCode, Value) {
        let response = error.into_response();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_invalid_id_looks_like_missing_row() {
        let invalid = body(Error::InvalidId).await;
        let missing = body(Error::NotFound("User 7".to_string())).await;
        assert_eq!(invalid, missing);
        assert_eq!(invalid.0, StatusCode::NOT_FOUND);
        assert_eq!(
            invalid.1,
            serde_json::json!({"errors": {"status_code": 404, "message": "Resource not found"}})
        );
    }

    #[tokio::test]
    async fn test_validation_status_depends_on_conflicts() {
        let generic = ValidationErrors::single("email", "Not a valid email address.");
        let (status, json) = body(generic.into()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["errors"]["email"], "Not a valid email address.");

        let conflict = ValidationErrors::single("email", "Email is already in use.").into_conflict();
        let (status, json) = body(conflict.into()).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(json["errors"]["email"], "Email is already in use.");
    }

    #[tokio::test]
    async fn test_unique_race_maps_to_conflict() {
        let err = RepositoryError::already_exists("users", "username")
            .with_operation(RepositoryOperation::Update);
        let (status, json) = body(err.into()).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(json["errors"]["username"], "Username is already in use.");
    }

    #[tokio::test]
    async fn test_internal_details_are_hidden() {
        let (status, json) = body(Error::Internal("disk on fire".to_string())).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!json.to_string().contains("disk"));
    }

    #[tokio::test]
    async fn test_unauthorized_envelope() {
        let (status, json) = body(Error::Unauthorized("expired".to_string())).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(json["errors"]["message"], UNAUTHORIZED_MESSAGE);
        assert_eq!(json["errors"]["status_code"], 401);
    }

    #[test]
    fn test_id_error_conversion() {
        assert!(matches!(Error::from(IdError::InvalidToken), Error::InvalidId));
        let out_of_range = IdError::OutOfRange { id: 10, domain: 5 };
        assert!(matches!(Error::from(out_of_range), Error::Internal(_)));
    }
}
