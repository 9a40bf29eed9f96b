//! Request extractors whose rejections use the JSON error body.

use axum::{
    body::Bytes,
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        FromRequest, FromRequestParts, Request,
    },
    response::{IntoResponse, Response},
};
use serde::de::DeserializeOwned;

use crate::ApiError;

/// `axum::Json` with `{"error": ...}` rejections.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

/// `axum::extract::Query` with `{"error": ...}` rejections.
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ApiError))]
pub struct ApiQuery<T>(pub T);

/// `axum::extract::Path` with `{"error": ...}` rejections.
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(ApiError))]
pub struct ApiPath<T>(pub T);

/// A JSON body the client may leave out. An empty body yields `None`; any
/// other body must parse, so a malformed one is a 400 rather than a default.
#[derive(Debug)]
pub struct OptionalJson<T>(pub Option<T>);

#[axum::async_trait]
impl<T, S> FromRequest<S> for OptionalJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(IntoResponse::into_response)?;
        parse_optional_json(&bytes)
            .map(OptionalJson)
            .map_err(IntoResponse::into_response)
    }
}

fn parse_optional_json<T: DeserializeOwned>(bytes: &[u8]) -> Result<Option<T>, ApiError> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }
    serde_json::from_slice(bytes).map(Some).map_err(|e| {
        ApiError::BadRequest(format!(
            "Failed to deserialize the JSON body into the target type: {e}"
        ))
    })
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Window {
        start: Option<String>,
    }

    #[test]
    fn test_optional_json_empty_body() {
        assert_eq!(parse_optional_json::<Window>(b"").unwrap(), None);
        assert_eq!(parse_optional_json::<Window>(b" \n").unwrap(), None);
    }

    #[test]
    fn test_optional_json_parses_body() {
        let window = parse_optional_json::<Window>(br#"{"start":"2026-05-01"}"#).unwrap();
        assert_eq!(window.unwrap().start.as_deref(), Some("2026-05-01"));
    }

    #[test]
    fn test_optional_json_rejects_garbage() {
        let err = parse_optional_json::<Window>(b"{not json").unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));
    }
}
