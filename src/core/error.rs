//! # Error Normalizer
//!
//! Every failure a gateway operation can produce ends up as one
//! [`GatewayError`]. Object-store failures arrive as [`StoreError`] and are
//! classified here; decode and invariant failures are raised directly as
//! [`GatewayError::Validation`] before the store is ever called.
//!
//! ## Status code mapping
//!
//! | Class        | HTTP status |
//! |--------------|-------------|
//! | `Validation` | 400         |
//! | `NotFound`   | 404         |
//! | `Conflict`   | 409         |
//! | `Backend`    | 500         |
//! | `Timeout`    | 504         |
//!
//! The body is always `{"message": string}`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

use crate::store::StoreError;

/// Result type used by the translation and gateway layers
pub type GatewayResult<T> = Result<T, GatewayError>;

/// Client-facing error taxonomy
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GatewayError {
    /// Client-supplied data failed to decode or broke an invariant.
    /// Never reaches the store.
    #[error("request invalid: {field}: {reason}")]
    Validation { field: String, reason: String },

    /// The store has no object with the given name
    #[error("{kind} \"{name}\" not found")]
    NotFound { kind: String, name: String },

    /// Name collision on create, or a stale version token on update
    #[error("{kind} \"{name}\" conflict: {reason}")]
    Conflict {
        kind: String,
        name: String,
        reason: String,
    },

    /// Store or transport failure unrelated to the request's validity
    #[error("{kind} {operation} failed: {message}")]
    Backend {
        kind: String,
        operation: String,
        message: String,
    },

    /// The per-request deadline elapsed before the store answered
    #[error("request timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },
}

impl GatewayError {
    /// Create a validation error for a specific request field
    pub fn validation<F: Into<String>, R: Into<String>>(field: F, reason: R) -> Self {
        Self::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub fn not_found<K: Into<String>, N: Into<String>>(kind: K, name: N) -> Self {
        Self::NotFound {
            kind: kind.into(),
            name: name.into(),
        }
    }

    pub fn conflict<K: Into<String>, N: Into<String>, R: Into<String>>(
        kind: K,
        name: N,
        reason: R,
    ) -> Self {
        Self::Conflict {
            kind: kind.into(),
            name: name.into(),
            reason: reason.into(),
        }
    }

    pub fn backend<K: Into<String>, O: Into<String>, M: Into<String>>(
        kind: K,
        operation: O,
        message: M,
    ) -> Self {
        Self::Backend {
            kind: kind.into(),
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// Classify a store failure raised while running `operation` on `kind/name`.
    ///
    /// `Invalid` means the store refused the object itself, which is a
    /// problem with the request rather than with the backend.
    pub fn from_store(kind: &str, name: &str, operation: &str, err: StoreError) -> Self {
        match err {
            StoreError::NotFound => Self::not_found(kind, name),
            StoreError::AlreadyExists => Self::conflict(kind, name, "already exists"),
            StoreError::Conflict { message } => Self::conflict(kind, name, message),
            StoreError::Invalid { message } => Self::validation("metadata", message),
            StoreError::Backend { message } => Self::backend(kind, operation, message),
        }
    }

    /// HTTP status code returned to the client for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation { .. } => StatusCode::BAD_REQUEST,
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::Conflict { .. } => StatusCode::CONFLICT,
            Self::Backend { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
        }
    }

    /// Stable tag used in log records
    pub fn error_type(&self) -> &'static str {
        match self {
            Self::Validation { .. } => "validation_error",
            Self::NotFound { .. } => "not_found",
            Self::Conflict { .. } => "conflict_error",
            Self::Backend { .. } => "backend_error",
            Self::Timeout { .. } => "timeout",
        }
    }

    /// Whether the caller may reasonably retry the same request
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Conflict { .. } | Self::Timeout { .. } | Self::Backend { .. })
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        (status, Json(json!({ "message": self.to_string() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_code_mapping_is_uniform() {
        assert_eq!(
            GatewayError::validation("name", "empty").status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            GatewayError::not_found("Disk", "d1").status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            GatewayError::conflict("Disk", "d1", "already exists").status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            GatewayError::backend("Disk", "list", "connection refused").status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            GatewayError::Timeout { timeout_ms: 100 }.status_code(),
            StatusCode::GATEWAY_TIMEOUT
        );
    }

    #[test]
    fn test_store_errors_are_classified() {
        let err = GatewayError::from_store("Server", "web", "get", StoreError::NotFound);
        assert_eq!(err, GatewayError::not_found("Server", "web"));

        let err = GatewayError::from_store("Server", "web", "create", StoreError::AlreadyExists);
        assert!(matches!(err, GatewayError::Conflict { .. }));

        let err = GatewayError::from_store(
            "Server",
            "web",
            "update",
            StoreError::Conflict {
                message: "stale resourceVersion".to_string(),
            },
        );
        assert!(matches!(err, GatewayError::Conflict { ref reason, .. } if reason.contains("stale")));

        let err = GatewayError::from_store(
            "Server",
            "web",
            "create",
            StoreError::Invalid {
                message: "bad name".to_string(),
            },
        );
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);

        let err = GatewayError::from_store(
            "Server",
            "web",
            "list",
            StoreError::Backend {
                message: "tls handshake".to_string(),
            },
        );
        assert_eq!(
            err,
            GatewayError::backend("Server", "list", "tls handshake")
        );
    }

    #[test]
    fn test_error_type_tags() {
        assert_eq!(GatewayError::validation("a", "b").error_type(), "validation_error");
        assert_eq!(GatewayError::not_found("a", "b").error_type(), "not_found");
        assert!(!GatewayError::validation("a", "b").is_retryable());
        assert!(GatewayError::conflict("a", "b", "c").is_retryable());
    }

    #[test]
    fn test_messages_name_the_object() {
        let err = GatewayError::not_found("ISOImage", "ubuntu");
        assert_eq!(err.to_string(), "ISOImage \"ubuntu\" not found");
    }
}
