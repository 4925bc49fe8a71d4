//! Consent challenge controller.
//!
//! Consent is never asked of the user: every requested scope and audience is granted and
//! the access token carries the subject's privileges for those scopes. What the subject may
//! actually do is decided downstream from the `superuser` flag and the grant list.

use crate::claims::IdTokenClaims;
use crate::flows::{FlowError, FlowState, either_challenge};
use crate::logging::FlowEvent;
use axum::{
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use utoipa_axum::{router::OpenApiRouter, routes};

#[derive(Debug, Deserialize)]
pub struct ConsentQuery {
    pub consent_challenge: Option<String>,
    pub challenge: Option<String>,
}

pub fn router() -> OpenApiRouter<FlowState> {
    OpenApiRouter::new().routes(routes!(consent))
}

#[tracing::instrument(skip(state))]
#[utoipa::path(
    get,
    path = "/consent",
    tag = super::FLOWS_TAG,
    operation_id = "Consent",
    summary = "Grant a consent challenge",
    description = "Fetches the consent request, assembles access-token claims (`superuser`, `grants`) for the \
                   requested scopes and ID-token claims (`email`, `email_verified`) for the subject, accepts \
                   the challenge and redirects back to the hub.",
    params(
        ("consent_challenge" = String, Query, description = "Consent challenge issued by the hub. `challenge` is accepted as an alias."),
    ),
    responses(
        (status = 303, description = "Redirect back to the hub"),
        (status = 400, description = "No challenge supplied"),
        (status = 500, description = "The subject has no local account"),
        (status = 502, description = "The hub admin API failed"),
    )
)]
async fn consent(
    State(state): State<FlowState>,
    Query(query): Query<ConsentQuery>,
) -> Result<Response, FlowError> {
    let evt = FlowEvent::new("consent");
    let challenge = either_challenge(query.consent_challenge, query.challenge)
        .ok_or(FlowError::MissingChallenge)?;
    evt.challenge(&challenge);

    let request = state.hub.get_consent_request(&challenge).await?;
    evt.user(&request.subject);

    let account = state
        .users
        .find_by_id(&request.subject)
        .await?
        .ok_or_else(|| FlowError::UnknownSubject(request.subject.clone()))?;

    let access_token = state
        .claims
        .assemble(&account, &request.requested_scope)
        .await?;
    let id_token = IdTokenClaims::for_user(&account);

    let completed = state
        .hub
        .accept_consent_request(
            &challenge,
            &request.requested_scope,
            &request.requested_access_token_audience,
            &access_token,
            &id_token,
        )
        .await?;

    evt.outcome("accepted");
    evt.info("consent granted");
    Ok(Redirect::to(&completed.redirect_to).into_response())
}
