//! The caller's own identity, resolved from the bearer token.

use super::{bearer_token, ErrorBody};
use crate::auth::{AuthError, AuthService};
use axum::{
    extract::Extension,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;
use utoipa::ToSchema;

#[derive(ToSchema, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct MeResponse {
    pub username: String,
}

#[utoipa::path(
    get,
    path = "/api/auth/me",
    responses(
        (status = 200, description = "Return the authenticated username.", body = MeResponse),
        (status = 401, description = "Missing, invalid or expired bearer token.", body = ErrorBody),
    ),
    security(("bearer" = [])),
    tag = "auth"
)]
pub async fn me(headers: HeaderMap, auth: Extension<Arc<AuthService>>) -> impl IntoResponse {
    let Some(token) = bearer_token(&headers) else {
        debug!("missing bearer token");
        return unauthorized();
    };

    match auth.current_user(token) {
        Ok(principal) => (
            StatusCode::OK,
            Json(MeResponse {
                username: principal.username,
            }),
        )
            .into_response(),
        Err(AuthError::InvalidToken) => unauthorized(),
        Err(err) => err.into_response(),
    }
}

fn unauthorized() -> axum::response::Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(ErrorBody::new(AuthError::InvalidToken.to_string())),
    )
        .into_response()
}
