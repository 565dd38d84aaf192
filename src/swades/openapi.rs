use super::handlers::{
    health::{self, Health},
    login::{self, LoginRequest},
    me::{self, MeResponse},
    signup::{self, RegisterRequest},
    verify, ErrorBody,
};
use crate::auth::AuthenticationResponse;
use axum::Json;
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health,
        signup::signup,
        verify::verify_account,
        login::login,
        me::me,
    ),
    components(schemas(
        Health,
        RegisterRequest,
        LoginRequest,
        AuthenticationResponse,
        MeResponse,
        ErrorBody,
    )),
    modifiers(&BearerAuth),
    tags(
        (name = "auth", description = "Signup, account verification and login"),
        (name = "health", description = "Service and store health"),
    )
)]
pub struct ApiDoc;

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[must_use]
pub fn openapi() -> utoipa::openapi::OpenApi {
    ApiDoc::openapi()
}

pub(crate) async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(openapi())
}
