use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, error};
use utoipa::ToSchema;

fn current_request_id() -> Option<String> {
    crate::tracing::current_request_id().map(|rid| rid.as_str().to_string())
}

/// Error body returned by every failing endpoint
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "error": "Not Found",
    "message": "shopping cart not found",
    "request_id": "req-abc123xyz",
    "timestamp": "2024-12-09T10:30:00.000Z"
}))]
pub struct ErrorResponse {
    /// HTTP status category (e.g., "Not Found", "Bad Request")
    #[schema(example = "Not Found")]
    pub error: String,
    /// Human-readable error description
    #[schema(example = "shopping cart not found")]
    pub message: String,
    /// Unique request identifier for support and debugging
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(example = "req-abc123xyz")]
    pub request_id: Option<String>,
    /// RFC 3339 timestamp when the error occurred
    pub timestamp: String,
}

/// Coarse classification of a [`ServiceError`], used by the boundary layer
/// to pick a protocol response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Caller-fixable input problem; retrying unchanged will fail again
    Validation,
    /// Cart or item is not visible to this owner
    NotFound,
    /// Item already present and the caller chose to reject rather than merge
    Conflict,
    /// Missing or rejected credentials
    Unauthorized,
    /// Opaque persistence or internal failure
    Storage,
}

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("no owner set")]
    OwnerNotSet,

    #[error("product is not specified")]
    ProductMissing,

    #[error("quantity is not specified")]
    QuantityMissing,

    #[error("quantity overflow: {current} + {added} exceeds the maximum")]
    QuantityOverflow { current: u64, added: u64 },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("shopping cart not found")]
    CartNotFound,

    #[error("shopping cart item not found")]
    ItemNotFound,

    #[error("this product already added to shopping cart")]
    ItemAlreadyExists,

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Database error: {0}")]
    DatabaseError(#[from] sea_orm::error::DbErr),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::NotFound => "not_found",
            Self::Conflict => "conflict",
            Self::Unauthorized => "unauthorized",
            Self::Storage => "storage",
        }
    }
}

impl ServiceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::OwnerNotSet
            | Self::ProductMissing
            | Self::QuantityMissing
            | Self::QuantityOverflow { .. }
            | Self::InvalidInput(_) => ErrorKind::Validation,
            Self::CartNotFound | Self::ItemNotFound => ErrorKind::NotFound,
            Self::ItemAlreadyExists => ErrorKind::Conflict,
            Self::Unauthorized(_) => ErrorKind::Unauthorized,
            Self::DatabaseError(_) | Self::Internal(_) => ErrorKind::Storage,
        }
    }

    /// Returns the HTTP status code for this error.
    /// This is the single source of truth for error-to-status mapping.
    pub fn status_code(&self) -> StatusCode {
        match self.kind() {
            ErrorKind::Validation => StatusCode::BAD_REQUEST,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Conflict => StatusCode::CONFLICT,
            ErrorKind::Unauthorized => StatusCode::UNAUTHORIZED,
            ErrorKind::Storage => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns the error message suitable for HTTP responses.
    /// Storage errors return generic messages to avoid leaking implementation details.
    pub fn response_message(&self) -> String {
        match self {
            Self::DatabaseError(_) => "Database error".to_string(),
            Self::Internal(_) => "Internal server error".to_string(),
            Self::Unauthorized(_) => "user does not have the permissions".to_string(),
            _ => self.to_string(),
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!(error = %self, "request failed");
        } else {
            debug!(error = %self, status = status.as_u16(), "request rejected");
        }

        let body = ErrorResponse {
            error: status.canonical_reason().unwrap_or("Error").to_string(),
            message: self.response_message(),
            request_id: current_request_id(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use rstest::rstest;
    use sea_orm::DbErr;

    #[rstest]
    #[case(ServiceError::OwnerNotSet, StatusCode::BAD_REQUEST)]
    #[case(ServiceError::ProductMissing, StatusCode::BAD_REQUEST)]
    #[case(ServiceError::QuantityMissing, StatusCode::BAD_REQUEST)]
    #[case(ServiceError::QuantityOverflow { current: u64::MAX, added: 1 }, StatusCode::BAD_REQUEST)]
    #[case(ServiceError::CartNotFound, StatusCode::NOT_FOUND)]
    #[case(ServiceError::ItemNotFound, StatusCode::NOT_FOUND)]
    #[case(ServiceError::ItemAlreadyExists, StatusCode::CONFLICT)]
    #[case(ServiceError::Unauthorized("bad header".into()), StatusCode::UNAUTHORIZED)]
    #[case(ServiceError::DatabaseError(DbErr::Custom("boom".into())), StatusCode::INTERNAL_SERVER_ERROR)]
    fn status_code_mapping(#[case] err: ServiceError, #[case] expected: StatusCode) {
        assert_eq!(err.status_code(), expected);
    }

    #[test]
    fn storage_errors_do_not_leak_details() {
        let err = ServiceError::DatabaseError(DbErr::Custom("password=hunter2".into()));
        assert_eq!(err.response_message(), "Database error");
        assert_eq!(err.kind(), ErrorKind::Storage);

        let err = ServiceError::Internal("registry poisoned".into());
        assert_eq!(err.response_message(), "Internal server error");
        assert_eq!(err.kind(), ErrorKind::Storage);
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn error_response_includes_request_id() {
        let response =
            crate::tracing::scope_request_id(crate::tracing::RequestId::new("req-123"), async {
                ServiceError::CartNotFound.into_response()
            })
            .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let payload: ErrorResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(payload.request_id.as_deref(), Some("req-123"));
        assert_eq!(payload.message, "shopping cart not found");
        assert_eq!(payload.error, "Not Found");
    }
}
