use super::{missing_payload, ErrorBody};
use crate::auth::{AuthService, AuthenticationResponse};
use axum::{extract::Extension, http::StatusCode, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};
use std::{fmt, sync::Arc};
use tracing::instrument;
use utoipa::ToSchema;

#[derive(ToSchema, Serialize, Deserialize, Clone)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginRequest")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

#[utoipa::path(
    post,
    path= "/api/auth/login",
    request_body = LoginRequest,
    responses (
        (status = 200, description = "Signed session token", body = AuthenticationResponse),
        (status = 401, description = "Bad credentials or account not activated", body = ErrorBody),
    ),
    tag= "auth"
)]
#[instrument(skip(auth, payload))]
pub async fn login(
    auth: Extension<Arc<AuthService>>,
    payload: Option<Json<LoginRequest>>,
) -> impl IntoResponse {
    let Some(Json(request)) = payload else {
        return missing_payload();
    };

    match auth.login(&request.username, &request.password).await {
        Ok(response) => (StatusCode::OK, Json(response)).into_response(),
        Err(err) => err.into_response(),
    }
}
