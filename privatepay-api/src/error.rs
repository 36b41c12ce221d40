//! API error handling.

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use privatepay_core::error::PrivatePayError;

/// API error type.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
    code: String,
}

impl ApiError {
    /// Creates a new API error.
    pub fn new(status: StatusCode, message: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            code: code.into(),
        }
    }

    /// Bad request error.
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message, "BAD_REQUEST")
    }

    /// Not found error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message, "NOT_FOUND")
    }

    /// Internal server error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message, "INTERNAL_ERROR")
    }

    /// Validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNPROCESSABLE_ENTITY, message, "VALIDATION_ERROR")
    }

    /// HTTP status of this error.
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Machine-readable error code.
    pub fn code(&self) -> &str {
        &self.code
    }
}

/// Error response body.
#[derive(Serialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Serialize)]
struct ErrorBody {
    code: String,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorResponse {
            error: ErrorBody {
                code: self.code,
                message: self.message,
            },
        };

        (self.status, Json(body)).into_response()
    }
}

impl From<PrivatePayError> for ApiError {
    fn from(err: PrivatePayError) -> Self {
        let status = match err.code() {
            "VALIDATION_ERROR"
            | "INVALID_ADDRESS"
            | "INVALID_PUBLIC_KEY"
            | "INVALID_SECRET_KEY" => StatusCode::BAD_REQUEST,
            "NOT_FOUND" => StatusCode::NOT_FOUND,
            "CONFLICT" => StatusCode::CONFLICT,
            "KEY_MISMATCH" | "INSUFFICIENT_FUNDS" => StatusCode::UNPROCESSABLE_ENTITY,
            "NETWORK_ERROR" | "CONTRACT_ERROR" | "TRANSACTION_FAILED" | "WRONG_NETWORK" => {
                StatusCode::BAD_GATEWAY
            }
            "TIMEOUT" => StatusCode::GATEWAY_TIMEOUT,
            _ => {
                tracing::error!(error = %err, "Internal error");
                return ApiError::internal("An internal error occurred");
            }
        };
        ApiError::new(status, err.to_string(), err.code())
    }
}

impl From<hex::FromHexError> for ApiError {
    fn from(err: hex::FromHexError) -> Self {
        ApiError::bad_request(format!("Invalid hex: {}", err))
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::new(rejection.status(), rejection.body_text(), "BAD_REQUEST")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (PrivatePayError::InvalidMetaAddress("x".into()), StatusCode::BAD_REQUEST),
            (PrivatePayError::InvalidPublicKey("x".into()), StatusCode::BAD_REQUEST),
            (PrivatePayError::AliasNotFound("alice".into()), StatusCode::NOT_FOUND),
            (PrivatePayError::AliasTaken("alice".into()), StatusCode::CONFLICT),
            (
                PrivatePayError::KeyMismatch {
                    expected: "a".into(),
                    derived: "b".into(),
                },
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (PrivatePayError::RpcError("down".into()), StatusCode::BAD_GATEWAY),
        ];

        for (err, status) in cases {
            let code = err.code();
            let api: ApiError = err.into();
            assert_eq!(api.status(), status);
            assert_eq!(api.code(), code);
        }
    }

    #[test]
    fn test_internal_errors_are_masked() {
        let api: ApiError = PrivatePayError::InternalError("lock poisoned at 0xdead".into()).into();
        assert_eq!(api.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(api.code(), "INTERNAL_ERROR");
        assert!(!api.message.contains("0xdead"));
    }
}
