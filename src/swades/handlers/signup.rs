use super::{missing_payload, ErrorBody};
use crate::auth::AuthService;
use axum::{extract::Extension, http::StatusCode, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};
use std::{fmt, sync::Arc};
use tracing::instrument;
use utoipa::ToSchema;

#[derive(ToSchema, Serialize, Deserialize, Clone)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
    pub email: String,
}

impl fmt::Debug for RegisterRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisterRequest")
            .field("username", &self.username)
            .field("password", &"***")
            .field("email", &self.email)
            .finish()
    }
}

#[utoipa::path(
    post,
    path= "/api/auth/signup",
    request_body = RegisterRequest,
    responses (
        (status = 201, description = "User Registration Successful", body = String, content_type = "text/plain"),
        (status = 400, description = "One or more fields are missing or invalid", body = ErrorBody),
        (status = 409, description = "Username already exists", body = ErrorBody),
    ),
    tag= "auth"
)]
#[instrument(skip(auth, payload))]
pub async fn signup(
    auth: Extension<Arc<AuthService>>,
    payload: Option<Json<RegisterRequest>>,
) -> impl IntoResponse {
    let Some(Json(request)) = payload else {
        return missing_payload();
    };

    match auth
        .signup(&request.username, &request.email, &request.password)
        .await
    {
        Ok(_) => (StatusCode::CREATED, "User Registration Successful").into_response(),
        Err(err) => err.into_response(),
    }
}
