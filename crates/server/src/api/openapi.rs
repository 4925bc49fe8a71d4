//! OpenAPI/Utoipa configuration.

use crate::api::health::MISC_TAG;
use crate::flows::FLOWS_TAG;
use utoipa::OpenApi;

/// OpenAPI documentation configuration.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Identity Provider Bridge",
        version = "1.0.0",
        description = "Login, consent and logout pages for an OAuth2/OpenID Connect hub. \
                       Every flow starts from a challenge issued by the hub and ends with a redirect back to it."
    ),
    tags(
        (name = MISC_TAG, description = "Miscellaneous endpoints"),
        (name = FLOWS_TAG, description = "Browser-facing login, consent, logout and account flows")
    )
)]
pub struct ApiDoc;
