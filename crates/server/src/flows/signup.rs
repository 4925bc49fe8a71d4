//! Account registration.

use crate::error::AccountError;
use crate::flows::pages::{MessagePage, SignupPage, login_href, render};
use crate::flows::{FlowError, FlowState, either_challenge, verify_email};
use crate::logging::FlowEvent;
use crate::store::normalize_email;
use axum::{
    Form,
    extract::{Query, State},
    http::StatusCode,
    response::Response,
};
use serde::Deserialize;
use utoipa::ToSchema;
use utoipa_axum::{router::OpenApiRouter, routes};

#[derive(Debug, Deserialize)]
pub struct SignupQuery {
    pub login_challenge: Option<String>,
    pub challenge: Option<String>,
}

/// Form data for registration submission.
#[derive(Debug, Deserialize, ToSchema)]
pub struct SignupForm {
    pub challenge: Option<String>,
    pub login_challenge: Option<String>,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub password_confirm: String,
}

pub fn router() -> OpenApiRouter<FlowState> {
    OpenApiRouter::new()
        .routes(routes!(signup_page))
        .routes(routes!(signup_submit))
}

#[tracing::instrument(skip_all)]
#[utoipa::path(
    get,
    path = "/signup",
    tag = super::FLOWS_TAG,
    operation_id = "Signup Page",
    summary = "Display the registration form",
    params(
        ("login_challenge" = Option<String>, Query, description = "Login challenge to resume once the address is verified."),
    ),
    responses(
        (status = 200, description = "Registration form HTML"),
    )
)]
async fn signup_page(Query(query): Query<SignupQuery>) -> Response {
    let page = SignupPage {
        challenge: either_challenge(query.login_challenge, query.challenge).unwrap_or_default(),
        email: String::new(),
        errors: Vec::new(),
    };
    render(StatusCode::OK, &page)
}

#[tracing::instrument(skip(state, form), fields(email = %form.email))]
#[utoipa::path(
    post,
    path = "/signup",
    tag = super::FLOWS_TAG,
    operation_id = "Signup Submit",
    summary = "Create an account",
    description = "Validates the email address and password, creates an unverified account and sends a \
                   verification link. The hub is not contacted; the login challenge travels inside the link.",
    request_body(
        content = SignupForm,
        content_type = "application/x-www-form-urlencoded",
        description = "Registration data"
    ),
    responses(
        (status = 200, description = "Check-your-inbox page"),
        (status = 400, description = "Validation failed, form re-rendered with messages"),
    )
)]
async fn signup_submit(
    State(state): State<FlowState>,
    Form(form): Form<SignupForm>,
) -> Result<Response, FlowError> {
    let evt = FlowEvent::new("signup");
    let challenge = either_challenge(form.login_challenge, form.challenge);
    if let Some(challenge) = &challenge {
        evt.challenge(challenge);
    }
    let email = normalize_email(&form.email);

    let mut errors = Vec::new();
    if let Err(e) = state.validator.validate_signup(&email, &form.password).await {
        errors.push(form_message(e)?);
    }
    if form.password != form.password_confirm {
        errors.push("Passwords do not match.".to_string());
    }
    if !errors.is_empty() {
        evt.outcome("form_error");
        return Ok(invalid(challenge, form.email, errors));
    }

    let account = match state.validator.create_account(&email, &form.password).await {
        Ok(account) => account,
        Err(e) => {
            // Lost a race with a concurrent signup for the same address.
            if matches!(e, AccountError::Store(_))
                && state.users.find_by_email(&email).await?.is_some()
            {
                tracing::debug!(error = %e, "concurrent signup for the same address");
                let message = form_message(AccountError::EmailInUse)?;
                return Ok(invalid(challenge, form.email, vec![message]));
            }
            return Err(e.into());
        }
    };
    evt.user(&account.id);

    verify_email::send_verification(&state, &account.id, &account.email, challenge.as_deref())?;
    evt.outcome("created");
    evt.info("account created, verification email sent");

    let mut page = MessagePage::check_inbox();
    if let Some(href) = login_href(challenge.as_deref()) {
        page = page.with_link(href, "Back to sign in");
    }
    Ok(render(StatusCode::OK, &page))
}

fn form_message(error: AccountError) -> Result<String, FlowError> {
    match error.form_message() {
        Some(message) => Ok(message),
        None => Err(error.into()),
    }
}

fn invalid(challenge: Option<String>, email: String, errors: Vec<String>) -> Response {
    let page = SignupPage {
        challenge: challenge.unwrap_or_default(),
        email,
        errors,
    };
    render(StatusCode::BAD_REQUEST, &page)
}
