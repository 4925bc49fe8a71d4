//! Email verification.
//!
//! Verification links carry a `verify_email` challenge token holding the account id and,
//! when the detour started from a login, the hub's login challenge. Following such a link
//! marks the address verified and resumes that login.

use crate::email::AccountEmail;
use crate::error::{AccountError, TokenError};
use crate::flows::pages::{MessagePage, ResendVerificationPage, login_href, render};
use crate::flows::{FlowError, FlowState, either_challenge, login};
use crate::identity::is_plausible_email;
use crate::logging::FlowEvent;
use crate::store::normalize_email;
use crate::token::TokenStep;
use axum::{
    Form,
    extract::{Query, State},
    http::StatusCode,
    response::Response,
};
use serde::Deserialize;
use std::collections::BTreeMap;
use utoipa::ToSchema;
use utoipa_axum::{router::OpenApiRouter, routes};

#[derive(Debug, Deserialize)]
pub struct VerifyQuery {
    pub token: Option<String>,
    pub challenge: Option<String>,
    pub login_challenge: Option<String>,
}

/// Form data for re-sending a verification link.
#[derive(Debug, Deserialize, ToSchema)]
pub struct ResendForm {
    #[serde(default)]
    pub email: String,
    pub challenge: Option<String>,
    pub login_challenge: Option<String>,
}

pub fn router() -> OpenApiRouter<FlowState> {
    OpenApiRouter::new()
        .routes(routes!(verify_email))
        .routes(routes!(resend_verification))
}

/// Issue a verification link for `user_id` and mail it to `address`.
///
/// Delivery problems are logged, not returned: the caller shows the same page either way.
pub(crate) fn send_verification(
    state: &FlowState,
    user_id: &str,
    address: &str,
    challenge: Option<&str>,
) -> Result<(), FlowError> {
    let params = BTreeMap::from([("user_id".to_string(), user_id.to_string())]);
    let token = state
        .tokens
        .encode(challenge.unwrap_or_default(), TokenStep::VerifyEmail, params)?;
    let link = state.public_link("verify-email", &token);

    if let Err(e) = state.mailer.send(AccountEmail::Verification {
        to: address.to_string(),
        link,
    }) {
        tracing::error!(
            name = "flows.verify_email.send_failed",
            target = concat!(env!("CARGO_PKG_NAME"), "::", module_path!()),
            user_id = %user_id,
            error = %e,
            message = "Failed to queue verification email"
        );
    }
    Ok(())
}

/// Confirm an email address from a link, or show the resend form when no token is given.
#[tracing::instrument(skip(state, query))]
#[utoipa::path(
    get,
    path = "/verify-email",
    tag = super::FLOWS_TAG,
    operation_id = "Verify Email",
    summary = "Confirm an email address",
    description = "With `token`, validates the verification link, marks the account verified and, if the link \
                   was issued during a login, re-checks the account and accepts that login challenge.\n\n\
                   Without `token`, renders the form to request a new link.",
    params(
        ("token" = Option<String>, Query, description = "Verification token from the email link."),
        ("challenge" = Option<String>, Query, description = "Login challenge to carry into a re-sent link."),
    ),
    responses(
        (status = 200, description = "Confirmation page or resend form"),
        (status = 303, description = "Redirect back to the hub after resuming the login"),
        (status = 403, description = "Invalid, expired or foreign token"),
        (status = 502, description = "The hub admin API failed"),
    )
)]
async fn verify_email(
    State(state): State<FlowState>,
    Query(query): Query<VerifyQuery>,
) -> Result<Response, FlowError> {
    let Some(token) = query.token.filter(|t| !t.is_empty()) else {
        let page = ResendVerificationPage {
            challenge: either_challenge(query.login_challenge, query.challenge).unwrap_or_default(),
            email: String::new(),
            error: None,
        };
        return Ok(render(StatusCode::OK, &page));
    };

    let evt = FlowEvent::new("verify_email");
    let decoded = state.tokens.decode(&token, TokenStep::VerifyEmail)?;
    let user_id = decoded.param("user_id").ok_or(TokenError::Invalid)?;
    evt.user(user_id);

    let account = match state.validator.confirm_email(user_id).await {
        Ok(account) => account,
        Err(AccountError::UnknownAccount) => return Err(TokenError::Invalid.into()),
        Err(e) => return Err(e.into()),
    };
    tracing::info!(user_id = %account.id, "email address verified");

    let Some(challenge) = decoded.challenge() else {
        evt.outcome("verified");
        evt.info("email verified outside a login");
        let page = MessagePage::new(
            "Email address verified",
            "Thank you. Your email address has been confirmed and you can now sign in.",
        );
        return Ok(render(StatusCode::OK, &page));
    };

    evt.challenge(challenge);
    match state.validator.validate_auto_login(&account.id).await {
        Ok(account) => {
            login::accept(&state, &evt, challenge, &account, state.config.remember_login).await
        }
        Err(e) => login::reject(&state, &evt, challenge, e).await,
    }
}

/// Send a fresh verification link.
#[tracing::instrument(skip(state, form), fields(email = %form.email))]
#[utoipa::path(
    post,
    path = "/verify-email",
    tag = super::FLOWS_TAG,
    operation_id = "Resend Verification Email",
    summary = "Re-send the verification link",
    description = "Sends a new verification link if an unverified account exists for the address. \
                   The response is the same whether or not it does.",
    request_body(
        content = ResendForm,
        content_type = "application/x-www-form-urlencoded",
        description = "Account email and optional login challenge"
    ),
    responses(
        (status = 200, description = "Check-your-inbox page"),
        (status = 400, description = "Malformed email address"),
    )
)]
async fn resend_verification(
    State(state): State<FlowState>,
    Form(form): Form<ResendForm>,
) -> Result<Response, FlowError> {
    let challenge = either_challenge(form.login_challenge, form.challenge);
    let email = normalize_email(&form.email);
    if !is_plausible_email(&email) {
        let page = ResendVerificationPage {
            challenge: challenge.unwrap_or_default(),
            email: form.email,
            error: Some("Please enter a valid email address.".into()),
        };
        return Ok(render(StatusCode::BAD_REQUEST, &page));
    }

    match state.users.find_by_email(&email).await? {
        Some(account) if !account.verified => {
            send_verification(&state, &account.id, &account.email, challenge.as_deref())?;
        }
        Some(_) => tracing::debug!("verification requested for an already verified account"),
        None => tracing::debug!("verification requested for an unknown address"),
    }

    let mut page = MessagePage::check_inbox();
    if let Some(href) = login_href(challenge.as_deref()) {
        page = page.with_link(href, "Back to sign in");
    }
    Ok(render(StatusCode::OK, &page))
}
