use utoipa::OpenApi;

use crate::models::{
    AccountResponse, ForgotPasswordInput, ResetPasswordInput, Role, SignInInput, SignUpInput,
};
use crate::response::{EnvelopeBody, Status, UserData};

/// OpenAPI document served at `/api-docs`.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Credo API",
        version = "0.1.0",
        description = "Account registration, email verification, sign-in and password reset."
    ),
    paths(
        crate::controllers::health_checker,
        crate::controllers::auth::register,
        crate::controllers::auth::login,
        crate::controllers::auth::refresh,
        crate::controllers::auth::logout,
        crate::controllers::auth::verify_email,
        crate::controllers::auth::forgot_password,
        crate::controllers::auth::reset_password,
        crate::controllers::users::me,
    ),
    components(
        schemas(
            SignUpInput,
            SignInInput,
            ForgotPasswordInput,
            ResetPasswordInput,
            EnvelopeBody,
            Status,
            UserData,
            AccountResponse,
            Role,
        )
    ),
    tags(
        (name = "auth", description = "Registration, sessions and password reset"),
        (name = "users", description = "Signed-in account"),
        (name = "health", description = "Liveness")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

/// Add the JWT Bearer security scheme to the OpenAPI spec.
struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                utoipa::openapi::security::SecurityScheme::Http(
                    utoipa::openapi::security::Http::new(
                        utoipa::openapi::security::HttpAuthScheme::Bearer,
                    ),
                ),
            );
        }
    }
}
