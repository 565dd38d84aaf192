//! Route handlers and the shared error body.
//!
//! Every failure leaves the service as `{"error": "<message>"}` with the status
//! picked from the [`AuthError`] variant. Server-side failures are logged and
//! answered with a generic message.

pub mod health;
pub mod login;
pub mod me;
pub mod signup;
pub mod verify;

use crate::auth::AuthError;
use axum::{
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::error;
use utoipa::ToSchema;

#[derive(ToSchema, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ErrorBody {
    pub error: String,
}

impl ErrorBody {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

pub(crate) fn status_for(err: &AuthError) -> StatusCode {
    match err {
        AuthError::Validation(_) | AuthError::InvalidToken => StatusCode::BAD_REQUEST,
        AuthError::Conflict => StatusCode::CONFLICT,
        AuthError::UserNotFound => StatusCode::NOT_FOUND,
        AuthError::Authentication => StatusCode::UNAUTHORIZED,
        AuthError::Configuration(_) | AuthError::Delivery(_) | AuthError::Internal(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = status_for(&self);
        let message = if status.is_server_error() {
            error!("request failed: {self:?}");
            "Internal Server Error".to_string()
        } else {
            self.to_string()
        };
        (status, Json(ErrorBody::new(message))).into_response()
    }
}

/// Body used when a JSON payload is missing or cannot be parsed.
pub(crate) fn missing_payload() -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorBody::new("Missing payload")),
    )
        .into_response()
}

/// Token from an `Authorization: Bearer <token>` header.
pub(crate) fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn status_mapping() {
        assert_eq!(
            status_for(&AuthError::Validation(vec!["Username is required".to_string()])),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(status_for(&AuthError::Conflict), StatusCode::CONFLICT);
        assert_eq!(status_for(&AuthError::InvalidToken), StatusCode::BAD_REQUEST);
        assert_eq!(status_for(&AuthError::UserNotFound), StatusCode::NOT_FOUND);
        assert_eq!(
            status_for(&AuthError::Authentication),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            status_for(&AuthError::Internal(anyhow::anyhow!("db down"))),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            status_for(&AuthError::Configuration("bad key".to_string())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn internal_errors_hide_details() {
        let response = AuthError::Internal(anyhow::anyhow!("connection refused")).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: ErrorBody = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body.error, "Internal Server Error");
    }

    #[test]
    fn bearer_token_parsing() {
        let mut headers = HeaderMap::new();
        assert_eq!(bearer_token(&headers), None);

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert_eq!(bearer_token(&headers), None);

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer "));
        assert_eq!(bearer_token(&headers), None);

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer a.b.c"));
        assert_eq!(bearer_token(&headers), Some("a.b.c"));
    }
}
