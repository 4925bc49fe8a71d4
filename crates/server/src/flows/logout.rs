//! Logout challenge controller. Logout is always confirmed.

use crate::flows::{FlowError, FlowState, either_challenge};
use crate::logging::FlowEvent;
use axum::{
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use utoipa_axum::{router::OpenApiRouter, routes};

#[derive(Debug, Deserialize)]
pub struct LogoutQuery {
    pub logout_challenge: Option<String>,
    pub challenge: Option<String>,
}

pub fn router() -> OpenApiRouter<FlowState> {
    OpenApiRouter::new().routes(routes!(logout))
}

#[tracing::instrument(skip(state))]
#[utoipa::path(
    get,
    path = "/logout",
    tag = super::FLOWS_TAG,
    operation_id = "Logout",
    summary = "Confirm a logout challenge",
    params(
        ("logout_challenge" = String, Query, description = "Logout challenge issued by the hub. `challenge` is accepted as an alias."),
    ),
    responses(
        (status = 303, description = "Redirect back to the hub"),
        (status = 400, description = "No challenge supplied"),
        (status = 502, description = "The hub admin API failed"),
    )
)]
async fn logout(
    State(state): State<FlowState>,
    Query(query): Query<LogoutQuery>,
) -> Result<Response, FlowError> {
    let evt = FlowEvent::new("logout");
    let challenge = either_challenge(query.logout_challenge, query.challenge)
        .ok_or(FlowError::MissingChallenge)?;
    evt.challenge(&challenge);

    let request = state.hub.get_logout_request(&challenge).await?;
    evt.user(&request.subject);
    tracing::info!(subject = %request.subject, sid = ?request.sid, "logout requested");

    let completed = state.hub.accept_logout_request(&challenge).await?;
    evt.outcome("accepted");
    evt.info("logout accepted");
    Ok(Redirect::to(&completed.redirect_to).into_response())
}
