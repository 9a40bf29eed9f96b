//! Upstream provider error handling.

use forge_core::{AiProvider, Error};
use serde_json::Value;

/// Longest raw body echoed back when the provider sent no JSON error.
const MAX_RAW_MESSAGE_LEN: usize = 300;

/// Classified upstream failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderErrorCode {
    /// The provider rejected the stored API key.
    AuthenticationError,
    /// Rate limit or quota exceeded.
    RateLimitExceeded,
    /// Model not found or not available to this key.
    ModelNotFound,
    /// Prompt too long for the model.
    ContextLengthExceeded,
    /// Provider is down or overloaded.
    ServerError,
    /// Anything else.
    Unknown,
}

impl ProviderErrorCode {
    /// Classify from HTTP status and the provider's error type string.
    pub fn from_response(status: u16, error_type: &str) -> Self {
        match (status, error_type) {
            (401 | 403, _) | (_, "authentication_error" | "permission_error") => {
                Self::AuthenticationError
            }
            (429, _) | (_, "rate_limit_error") => Self::RateLimitExceeded,
            (404, _) | (_, "model_not_found" | "not_found_error") => Self::ModelNotFound,
            (400, _) if error_type.contains("context_length") => Self::ContextLengthExceeded,
            (500..=599, _) | (_, "overloaded_error" | "api_error") => Self::ServerError,
            _ => Self::Unknown,
        }
    }

    /// Whether retrying later could succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::RateLimitExceeded | Self::ServerError)
    }
}

/// Convert a classified upstream failure into a forge error.
///
/// Rate limits become [`Error::RateLimited`] so the API can answer 429;
/// everything else is an [`Error::Inference`] (a bad gateway to the client).
pub fn to_forge_error(provider: AiProvider, code: ProviderErrorCode, message: &str) -> Error {
    match code {
        ProviderErrorCode::AuthenticationError => Error::Inference(format!(
            "{provider} rejected the API key: {message}"
        )),
        ProviderErrorCode::RateLimitExceeded => {
            Error::RateLimited(format!("{provider} rate limit exceeded: {message}"))
        }
        ProviderErrorCode::ModelNotFound => {
            Error::Inference(format!("{provider} model not found: {message}"))
        }
        ProviderErrorCode::ContextLengthExceeded => {
            Error::Inference(format!("{provider} context too long: {message}"))
        }
        ProviderErrorCode::ServerError => {
            Error::Inference(format!("{provider} server error: {message}"))
        }
        ProviderErrorCode::Unknown => Error::Inference(format!("{provider}: {message}")),
    }
}

/// Pull `(error_type, message)` out of a provider error body.
///
/// Understands the Anthropic shape (`{"type":"error","error":{...}}`), the
/// OpenAI shape (`{"error":{...}}`), and Google's list-wrapped variant.
pub fn parse_error_body(body: &str) -> (String, String) {
    let parsed: Option<Value> = serde_json::from_str(body).ok();
    let error = parsed.as_ref().and_then(|v| match v {
        Value::Array(items) => items.first().and_then(|i| i.get("error")).cloned(),
        other => other.get("error").cloned(),
    });

    match error {
        Some(Value::Object(map)) => {
            let error_type = map
                .get("type")
                .or_else(|| map.get("status"))
                .or_else(|| map.get("code"))
                .map(|v| match v {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
                .unwrap_or_default();
            let message = map
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("Unknown error")
                .to_string();
            (error_type, message)
        }
        Some(Value::String(message)) => (String::new(), message),
        _ => {
            let trimmed = body.trim();
            let message = if trimmed.is_empty() {
                "Unknown error".to_string()
            } else {
                trimmed.chars().take(MAX_RAW_MESSAGE_LEN).collect()
            };
            (String::new(), message)
        }
    }
}

/// Turn a non-success upstream response into a forge error.
pub async fn error_from_response(provider: AiProvider, response: reqwest::Response) -> Error {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    let (error_type, message) = parse_error_body(&body);
    let code = ProviderErrorCode::from_response(status, &error_type);

    tracing::warn!(
        subsystem = "inference",
        provider = %provider,
        status_code = status,
        error_type = %error_type,
        retryable = code.is_retryable(),
        "Upstream provider returned an error"
    );
    to_forge_error(provider, code, &message)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_from_auth_statuses() {
        assert_eq!(
            ProviderErrorCode::from_response(401, "invalid_api_key"),
            ProviderErrorCode::AuthenticationError
        );
        assert_eq!(
            ProviderErrorCode::from_response(403, ""),
            ProviderErrorCode::AuthenticationError
        );
    }

    #[test]
    fn test_code_from_429() {
        assert_eq!(
            ProviderErrorCode::from_response(429, "rate_limit_exceeded"),
            ProviderErrorCode::RateLimitExceeded
        );
    }

    #[test]
    fn test_code_from_anthropic_types() {
        assert_eq!(
            ProviderErrorCode::from_response(529, "overloaded_error"),
            ProviderErrorCode::ServerError
        );
        assert_eq!(
            ProviderErrorCode::from_response(400, "invalid_request_error"),
            ProviderErrorCode::Unknown
        );
    }

    #[test]
    fn test_code_context_length() {
        assert_eq!(
            ProviderErrorCode::from_response(400, "context_length_exceeded"),
            ProviderErrorCode::ContextLengthExceeded
        );
    }

    #[test]
    fn test_retryable() {
        assert!(ProviderErrorCode::RateLimitExceeded.is_retryable());
        assert!(ProviderErrorCode::ServerError.is_retryable());
        assert!(!ProviderErrorCode::AuthenticationError.is_retryable());
        assert!(!ProviderErrorCode::ModelNotFound.is_retryable());
    }

    #[test]
    fn test_rate_limit_maps_to_rate_limited() {
        let err = to_forge_error(
            AiProvider::Openai,
            ProviderErrorCode::RateLimitExceeded,
            "slow down",
        );
        assert!(matches!(err, Error::RateLimited(_)));
        assert!(err.to_string().contains("OPENAI"));
    }

    #[test]
    fn test_auth_maps_to_inference() {
        let err = to_forge_error(
            AiProvider::Anthropic,
            ProviderErrorCode::AuthenticationError,
            "invalid x-api-key",
        );
        assert!(matches!(err, Error::Inference(ref m) if m.contains("invalid x-api-key")));
    }

    #[test]
    fn test_parse_anthropic_body() {
        let (t, m) = parse_error_body(
            r#"{"type":"error","error":{"type":"authentication_error","message":"invalid x-api-key"}}"#,
        );
        assert_eq!(t, "authentication_error");
        assert_eq!(m, "invalid x-api-key");
    }

    #[test]
    fn test_parse_openai_body() {
        let (t, m) = parse_error_body(
            r#"{"error":{"message":"Incorrect API key provided","type":"invalid_request_error","code":"invalid_api_key"}}"#,
        );
        assert_eq!(t, "invalid_request_error");
        assert_eq!(m, "Incorrect API key provided");
    }

    #[test]
    fn test_parse_google_list_body() {
        let (t, m) = parse_error_body(
            r#"[{"error":{"code":400,"message":"API key not valid","status":"INVALID_ARGUMENT"}}]"#,
        );
        assert_eq!(t, "INVALID_ARGUMENT");
        assert_eq!(m, "API key not valid");
    }

    #[test]
    fn test_parse_non_json_body() {
        let (t, m) = parse_error_body("upstream connect error");
        assert_eq!(t, "");
        assert_eq!(m, "upstream connect error");
        assert_eq!(parse_error_body("").1, "Unknown error");
    }
}
