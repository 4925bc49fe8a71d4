//! Login challenge controller.
//!
//! `GET /login` either settles a challenge the hub can skip or shows the form;
//! `POST /login` checks the submitted credentials and accepts or rejects the challenge.
//! Wrong email and wrong password produce the same page so the form cannot be used to
//! find out which addresses have accounts.

use crate::entity::user;
use crate::error::CredentialError;
use crate::flows::pages::{LoginPage, MessagePage, render};
use crate::flows::{FlowError, FlowState, either_challenge, verify_email};
use crate::identity::is_plausible_email;
use crate::logging::FlowEvent;
use crate::store::normalize_email;
use axum::{
    Form,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use utoipa::ToSchema;
use utoipa_axum::{router::OpenApiRouter, routes};

const GENERIC_LOGIN_FAILURE: &str = "Invalid email or password.";

/// Query parameters for the login page.
#[derive(Debug, Deserialize)]
pub struct LoginQuery {
    pub login_challenge: Option<String>,
    pub challenge: Option<String>,
}

/// Form data for login submission.
#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginForm {
    pub challenge: Option<String>,
    pub login_challenge: Option<String>,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

pub fn router() -> OpenApiRouter<FlowState> {
    OpenApiRouter::new()
        .routes(routes!(login_page))
        .routes(routes!(login_submit))
}

/// Display the login page, or settle the challenge directly when the hub remembers the user.
#[tracing::instrument(skip(state))]
#[utoipa::path(
    get,
    path = "/login",
    tag = super::FLOWS_TAG,
    operation_id = "Login Page",
    summary = "Start a login challenge",
    description = "Fetches the login request from the hub. If the hub already authenticated the subject \
                   (`skip=true`) the account is re-checked and the challenge is accepted or rejected \
                   without showing a form. Otherwise the login form is rendered.",
    params(
        ("login_challenge" = String, Query, description = "Login challenge issued by the hub. `challenge` is accepted as an alias."),
    ),
    responses(
        (status = 200, description = "Login form HTML"),
        (status = 303, description = "Redirect back to the hub after accepting or rejecting the challenge"),
        (status = 400, description = "No challenge supplied"),
        (status = 502, description = "The hub admin API failed"),
    )
)]
async fn login_page(
    State(state): State<FlowState>,
    Query(query): Query<LoginQuery>,
) -> Result<Response, FlowError> {
    let evt = FlowEvent::new("login");
    let challenge = either_challenge(query.login_challenge, query.challenge)
        .ok_or(FlowError::MissingChallenge)?;
    evt.challenge(&challenge);

    let request = state.hub.get_login_request(&challenge).await?;

    if request.skip {
        evt.user(&request.subject);
        return match state.validator.validate_auto_login(&request.subject).await {
            Ok(account) => accept(&state, &evt, &challenge, &account, true).await,
            Err(e) => reject(&state, &evt, &challenge, e).await,
        };
    }

    evt.outcome("form");
    let mut page = LoginPage::new(&challenge);
    page.client_name = request
        .client
        .map(|c| {
            if c.client_name.is_empty() {
                c.client_id
            } else {
                c.client_name
            }
        })
        .filter(|name| !name.is_empty());
    page.scopes = request.requested_scope;
    Ok(render(StatusCode::OK, &page))
}

/// Handle login form submission.
#[tracing::instrument(skip(state, form), fields(email = %form.email))]
#[utoipa::path(
    post,
    path = "/login",
    tag = super::FLOWS_TAG,
    operation_id = "Login Submit",
    summary = "Submit login credentials",
    description = "Validates the credentials against the account store.\n\n\
                   - Valid credentials accept the challenge and redirect to the hub.\n\
                   - Unknown email or wrong password re-render the form with one generic message.\n\
                   - An unverified address gets a fresh verification email instead of a hub call.\n\
                   - Locked or disabled accounts reject the challenge with a stable error code.",
    request_body(
        content = LoginForm,
        content_type = "application/x-www-form-urlencoded",
        description = "Login challenge and credentials"
    ),
    responses(
        (status = 200, description = "Check-your-inbox page for unverified accounts"),
        (status = 303, description = "Redirect back to the hub"),
        (status = 400, description = "Form validation failed or no challenge supplied"),
        (status = 401, description = "Credentials not accepted, form re-rendered"),
        (status = 502, description = "The hub admin API failed"),
    )
)]
async fn login_submit(
    State(state): State<FlowState>,
    Form(form): Form<LoginForm>,
) -> Result<Response, FlowError> {
    let evt = FlowEvent::new("login");
    let challenge = either_challenge(form.login_challenge, form.challenge)
        .ok_or(FlowError::MissingChallenge)?;
    evt.challenge(&challenge);

    let email = normalize_email(&form.email);
    if !is_plausible_email(&email) {
        evt.outcome("form_error");
        let page =
            LoginPage::new(&challenge).with_error(&form.email, "Please enter a valid email address.");
        return Ok(render(StatusCode::BAD_REQUEST, &page));
    }
    if form.password.is_empty() {
        evt.outcome("form_error");
        let page = LoginPage::new(&challenge).with_error(&email, "Please enter your password.");
        return Ok(render(StatusCode::BAD_REQUEST, &page));
    }

    match state.validator.validate_login(&email, &form.password).await {
        Ok(account) => {
            evt.user(&account.id);
            accept(&state, &evt, &challenge, &account, state.config.remember_login).await
        }
        Err(CredentialError::UserNotFound | CredentialError::IncorrectPassword) => {
            evt.outcome("bad_credentials");
            evt.info("login form re-prompted");
            let page = LoginPage::new(&challenge).with_error(&email, GENERIC_LOGIN_FAILURE);
            Ok(render(StatusCode::UNAUTHORIZED, &page))
        }
        Err(CredentialError::EmailNotVerified { user_id }) => {
            evt.user(&user_id);
            evt.outcome("awaiting_email_verification");
            verify_email::send_verification(&state, &user_id, &email, Some(&challenge))?;
            evt.info("verification email sent instead of accepting login");
            Ok(render(StatusCode::OK, &MessagePage::check_inbox()))
        }
        Err(e) => reject(&state, &evt, &challenge, e).await,
    }
}

/// Accept the challenge for `account` and send the browser back to the hub.
pub(crate) async fn accept(
    state: &FlowState,
    evt: &FlowEvent,
    challenge: &str,
    account: &user::Model,
    remember: bool,
) -> Result<Response, FlowError> {
    let completed = state
        .hub
        .accept_login_request(challenge, &account.id, remember, state.config.remember_for)
        .await?;
    evt.outcome("accepted");
    evt.info("login accepted");
    Ok(Redirect::to(&completed.redirect_to).into_response())
}

/// Reject the challenge with the failure's stable code. Infrastructure failures are
/// never forwarded to the hub.
pub(crate) async fn reject(
    state: &FlowState,
    evt: &FlowEvent,
    challenge: &str,
    error: CredentialError,
) -> Result<Response, FlowError> {
    let Some((code, description)) = error.rejection() else {
        return Err(error.into());
    };
    let completed = state
        .hub
        .reject_login_request(challenge, code, description)
        .await?;
    evt.outcome(format_args!("rejected:{code}"));
    evt.warn("login rejected");
    Ok(Redirect::to(&completed.redirect_to).into_response())
}
