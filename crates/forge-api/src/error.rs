//! HTTP error mapping.
//!
//! Every error response has the body `{"error": "<message>"}`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use tracing::error;

use forge_crypto::CryptoError;

/// Errors returned by handlers.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    TooManyRequests(String),
    /// Upstream LLM provider failure.
    #[error("{0}")]
    BadGateway(String),
    /// Message shown to the client; details were logged where the error arose.
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::TooManyRequests(_) => StatusCode::TOO_MANY_REQUESTS,
            ApiError::BadGateway(_) => StatusCode::BAD_GATEWAY,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// 401 for protected routes.
    pub fn auth_required() -> Self {
        ApiError::Unauthorized("Authentication required".to_string())
    }
}

impl From<forge_core::Error> for ApiError {
    fn from(err: forge_core::Error) -> Self {
        use forge_core::Error;

        if err.is_unique_violation() {
            return ApiError::Conflict("Resource already exists".to_string());
        }
        if err.is_foreign_key_violation() {
            return ApiError::BadRequest("Referenced resource does not exist".to_string());
        }

        match err {
            Error::NotFound(msg) => ApiError::NotFound(msg),
            Error::InvalidInput(msg) => ApiError::BadRequest(msg),
            Error::Conflict(msg) => ApiError::Conflict(msg),
            Error::Unauthorized(msg) => ApiError::Unauthorized(msg),
            Error::Forbidden(msg) => ApiError::Forbidden(msg),
            Error::RateLimited(msg) => ApiError::TooManyRequests(msg),
            Error::Inference(msg) | Error::Request(msg) => ApiError::BadGateway(msg),
            other => {
                error!(subsystem = "api", error = %other, "Internal error");
                ApiError::Internal("Internal server error".to_string())
            }
        }
    }
}

impl From<CryptoError> for ApiError {
    fn from(err: CryptoError) -> Self {
        error!(subsystem = "api", component = "crypto", error = %err, "Crypto failure");
        ApiError::Internal("Internal server error".to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = Json(serde_json::json!({
            "error": self.to_string(),
        }));
        (status, body).into_response()
    }
}

/// Attach a resource-specific message to internal failures.
///
/// Client errors (400, 404, 409, ...) pass through unchanged; a 500 gets the
/// given message instead of the generic one.
pub trait ApiResultExt<T> {
    fn or_fail(self, message: &str) -> Result<T, ApiError>;
}

impl<T, E> ApiResultExt<T> for Result<T, E>
where
    E: Into<ApiError>,
{
    fn or_fail(self, message: &str) -> Result<T, ApiError> {
        self.map_err(|e| match e.into() {
            ApiError::Internal(_) => ApiError::Internal(message.to_string()),
            other => other,
        })
    }
}
