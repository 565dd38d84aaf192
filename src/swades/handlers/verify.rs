use super::ErrorBody;
use crate::auth::AuthService;
use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
};
use std::sync::Arc;
use tracing::instrument;

#[utoipa::path(
    get,
    path= "/api/auth/accountVerification/{token}",
    params(
        ("token" = String, Path, description = "Token from the activation email")
    ),
    responses (
        (status = 200, description = "Account Activated Successfully", body = String, content_type = "text/plain"),
        (status = 400, description = "Token is unknown, expired or already used", body = ErrorBody),
        (status = 404, description = "Token owner no longer exists", body = ErrorBody),
    ),
    tag= "auth"
)]
#[instrument(skip(auth, token))]
pub async fn verify_account(
    auth: Extension<Arc<AuthService>>,
    Path(token): Path<String>,
) -> impl IntoResponse {
    match auth.verify_account(&token).await {
        Ok(_) => (StatusCode::OK, "Account Activated Successfully").into_response(),
        Err(err) => err.into_response(),
    }
}
