//! Standardized error types following the `error-idp-<domain>-<number>` format.

use axum::{
    Json,
    response::{IntoResponse, Response},
};
use http::StatusCode;
use serde_json::json;
use thiserror::Error;

/// Configuration errors that occur during application startup
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Error when a required environment variable is not set
    #[error("error-idp-config-1 {0} must be set")]
    EnvVarRequired(String),

    /// Error when HTTP_PORT cannot be parsed
    #[error("error-idp-config-2 Parsing HTTP_PORT into u16 failed: {0:?}")]
    PortParsingFailed(std::num::ParseIntError),

    /// Error when version information is not available
    #[error("error-idp-config-3 One of GIT_HASH or CARGO_PKG_VERSION must be set")]
    VersionNotSet,

    /// Error when duration string cannot be parsed
    #[error("error-idp-config-4 Failed to parse duration '{0}': {1}")]
    DurationParsingFailed(String, String),

    /// Error when APP_ENV is not a known environment
    #[error("error-idp-config-5 Unknown APP_ENV '{0}': expected development, staging or production")]
    UnknownEnvironment(String),

    /// Error when the anti-forgery key is too short
    #[error("error-idp-config-6 CSRF_AUTH_KEY must be at least {0} bytes")]
    CsrfKeyTooShort(usize),

    /// Error when a numeric setting cannot be parsed or is out of range
    #[error("error-idp-config-7 Invalid value for {0}: {1}")]
    InvalidNumber(String, String),
}

/// Database/storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    /// Error when database connection fails
    #[error("error-idp-storage-1 Database connection failed: {0}")]
    ConnectionFailed(String),

    /// Error when query execution fails
    #[error("error-idp-storage-2 Query execution failed: {0}")]
    QueryFailed(String),

    /// Error when data serialization fails
    #[error("error-idp-storage-3 Data serialization failed: {0}")]
    SerializationFailed(String),

    /// Error when database operation fails
    #[error("error-idp-storage-4 Database error: {0}")]
    DatabaseError(String),

    /// Error when data validation fails
    #[error("error-idp-storage-5 Invalid data: {0}")]
    InvalidData(String),

    /// Error when requested resource is not found
    #[error("error-idp-storage-6 Not found: {0}")]
    NotFound(String),

    /// Error when a uniqueness constraint would be violated
    #[error("error-idp-storage-7 Conflict: {0}")]
    Conflict(String),
}

/// Credential derivation errors
#[derive(Debug, Error)]
pub enum CredentialError {
    /// Error when deriving a password or secret hash fails
    #[error("error-idp-credential-1 Credential hashing failed: {0}")]
    HashingFailed(String),

    /// Error when a stored hash cannot be parsed
    #[error("error-idp-credential-2 Stored credential is malformed: {0}")]
    MalformedHash(String),
}

/// Administration errors surfaced to API callers
#[derive(Debug, Error)]
pub enum AdminError {
    /// Malformed or missing request field
    #[error("error-idp-admin-1 Validation failed: {0}")]
    Validation(String),

    /// Uniqueness violation on username or client id
    #[error("error-idp-admin-2 Conflict: {0}")]
    Conflict(String),

    /// Operation targets a record that does not exist
    #[error("error-idp-admin-3 Not found: {0}")]
    NotFound(String),

    /// Missing or invalid anti-forgery token
    #[error("error-idp-admin-4 Authorization failed: {0}")]
    Authorization(String),

    /// Unexpected failure, details are kept server side
    #[error("error-idp-admin-5 Internal error: {0}")]
    Internal(String),
}

impl AdminError {
    /// Machine-checkable error kind
    pub fn kind(&self) -> &'static str {
        match self {
            AdminError::Validation(_) => "validation_error",
            AdminError::Conflict(_) => "conflict",
            AdminError::NotFound(_) => "not_found",
            AdminError::Authorization(_) => "authorization_error",
            AdminError::Internal(_) => "server_error",
        }
    }

    /// HTTP status for this error
    pub fn status(&self) -> StatusCode {
        match self {
            AdminError::Validation(_) => StatusCode::BAD_REQUEST,
            AdminError::Conflict(_) => StatusCode::CONFLICT,
            AdminError::NotFound(_) => StatusCode::NOT_FOUND,
            AdminError::Authorization(_) => StatusCode::FORBIDDEN,
            AdminError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Human-readable description safe to return to the caller
    pub fn description(&self) -> String {
        match self {
            AdminError::Internal(_) => "Internal server error".to_string(),
            _ => self.to_string(),
        }
    }
}

impl From<StorageError> for AdminError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Conflict(message) => AdminError::Conflict(message),
            StorageError::NotFound(message) => AdminError::NotFound(message),
            other => AdminError::Internal(other.to_string()),
        }
    }
}

impl From<CredentialError> for AdminError {
    fn from(err: CredentialError) -> Self {
        AdminError::Internal(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AdminError>;

impl IntoResponse for AdminError {
    fn into_response(self) -> Response {
        if let AdminError::Internal(_) = self {
            tracing::error!(error = ?self, "internal server error");
        } else {
            tracing::debug!(error = %self, "request rejected");
        }

        let body = json!({
            "error": self.kind(),
            "error_description": self.description(),
        });

        (self.status(), Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_error_mapping() {
        let conflict: AdminError = StorageError::Conflict("username 'alice'".to_string()).into();
        assert!(matches!(conflict, AdminError::Conflict(_)));

        let missing: AdminError = StorageError::NotFound("client".to_string()).into();
        assert!(matches!(missing, AdminError::NotFound(_)));

        let opaque: AdminError = StorageError::DatabaseError("socket closed".to_string()).into();
        assert!(matches!(opaque, AdminError::Internal(_)));
        assert_eq!(opaque.description(), "Internal server error");
        assert!(!opaque.description().contains("socket"));
    }

    #[test]
    fn test_kinds_and_statuses() {
        let err = AdminError::Authorization("missing token".to_string());
        assert_eq!(err.kind(), "authorization_error");
        assert_eq!(err.status(), StatusCode::FORBIDDEN);

        let err = AdminError::Validation("name is required".to_string());
        assert_eq!(err.kind(), "validation_error");
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert!(err.description().contains("name is required"));
    }
}
