//! Password reset by email link.
//!
//! Reset tokens embed a fingerprint of the password hash they were issued against.
//! Setting a new password changes the hash, so each link works at most once.

use crate::email::AccountEmail;
use crate::entity::user;
use crate::error::TokenError;
use crate::flows::pages::{MessagePage, ResetPasswordPage, ResetRequestPage, login_href, render};
use crate::flows::{FlowError, FlowState, either_challenge};
use crate::identity::{is_plausible_email, password_fingerprint};
use crate::logging::FlowEvent;
use crate::store::normalize_email;
use crate::token::{DecodedChallenge, TokenStep};
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
pub struct ResetQuery {
    pub token: Option<String>,
    pub challenge: Option<String>,
    pub login_challenge: Option<String>,
}

/// Either a reset request (`email`) or a new password for a reset link (`token`).
#[derive(Debug, Deserialize, ToSchema)]
pub struct ResetForm {
    pub token: Option<String>,
    pub email: Option<String>,
    pub challenge: Option<String>,
    pub login_challenge: Option<String>,
    pub password: Option<String>,
    pub password_confirm: Option<String>,
}

pub fn router() -> OpenApiRouter<FlowState> {
    OpenApiRouter::new()
        .routes(routes!(reset_page))
        .routes(routes!(reset_submit))
}

#[tracing::instrument(skip(state, query))]
#[utoipa::path(
    get,
    path = "/reset-password",
    tag = super::FLOWS_TAG,
    operation_id = "Reset Password Page",
    summary = "Display a password reset form",
    description = "Without `token`, renders the form to request a reset link. With `token`, validates the \
                   link and renders the form to choose a new password.",
    params(
        ("token" = Option<String>, Query, description = "Reset token from the email link."),
        ("login_challenge" = Option<String>, Query, description = "Login challenge to return to afterwards."),
    ),
    responses(
        (status = 200, description = "Reset form HTML"),
        (status = 403, description = "Invalid, expired or already used link"),
    )
)]
async fn reset_page(
    State(state): State<FlowState>,
    Query(query): Query<ResetQuery>,
) -> Result<Response, FlowError> {
    match query.token.filter(|t| !t.is_empty()) {
        Some(token) => {
            redeemable(&state, &token).await?;
            let page = ResetPasswordPage { token, error: None };
            Ok(render(StatusCode::OK, &page))
        }
        None => {
            let page = ResetRequestPage {
                challenge: either_challenge(query.login_challenge, query.challenge)
                    .unwrap_or_default(),
                email: String::new(),
                error: None,
            };
            Ok(render(StatusCode::OK, &page))
        }
    }
}

#[tracing::instrument(skip_all)]
#[utoipa::path(
    post,
    path = "/reset-password",
    tag = super::FLOWS_TAG,
    operation_id = "Reset Password Submit",
    summary = "Request a reset link or set a new password",
    description = "With `email`, sends a reset link; the response is the same whether or not an account \
                   exists. With `token` and `password`, sets the new password, clears any lockout and \
                   links back to the login that started the reset.",
    request_body(
        content = ResetForm,
        content_type = "application/x-www-form-urlencoded",
        description = "Reset request or new password"
    ),
    responses(
        (status = 200, description = "Check-your-inbox or password-changed page"),
        (status = 400, description = "Validation failed, form re-rendered"),
        (status = 403, description = "Invalid, expired or already used link"),
    )
)]
async fn reset_submit(
    State(state): State<FlowState>,
    Form(form): Form<ResetForm>,
) -> Result<Response, FlowError> {
    match form.token.filter(|t| !t.is_empty()) {
        Some(token) => {
            complete_reset(
                &state,
                token,
                form.password.unwrap_or_default(),
                form.password_confirm.unwrap_or_default(),
            )
            .await
        }
        None => {
            request_reset(
                &state,
                form.email.unwrap_or_default(),
                either_challenge(form.login_challenge, form.challenge),
            )
            .await
        }
    }
}

async fn request_reset(
    state: &FlowState,
    email: String,
    challenge: Option<String>,
) -> Result<Response, FlowError> {
    let normalized = normalize_email(&email);
    if !is_plausible_email(&normalized) {
        let page = ResetRequestPage {
            challenge: challenge.unwrap_or_default(),
            email,
            error: Some("Please enter a valid email address.".into()),
        };
        return Ok(render(StatusCode::BAD_REQUEST, &page));
    }

    let evt = FlowEvent::new("reset_password");
    if let Some(challenge) = &challenge {
        evt.challenge(challenge);
    }

    if let Some(account) = state.users.find_by_email(&normalized).await? {
        evt.user(&account.id);
        let params = BTreeMap::from([
            ("user_id".to_string(), account.id.clone()),
            (
                "fingerprint".to_string(),
                password_fingerprint(&account.password_hash),
            ),
        ]);
        let token = state.tokens.encode(
            challenge.as_deref().unwrap_or_default(),
            TokenStep::ResetPassword,
            params,
        )?;
        let link = state.public_link("reset-password", &token);
        if let Err(e) = state.mailer.send(AccountEmail::PasswordReset {
            to: account.email.clone(),
            link,
        }) {
            tracing::error!(
                name = "flows.reset_password.send_failed",
                target = concat!(env!("CARGO_PKG_NAME"), "::", module_path!()),
                user_id = %account.id,
                error = %e,
                message = "Failed to queue password reset email"
            );
        }
        evt.outcome("link_sent");
    } else {
        evt.outcome("unknown_address");
    }
    evt.info("password reset requested");

    let mut page = MessagePage::check_inbox();
    if let Some(href) = login_href(challenge.as_deref()) {
        page = page.with_link(href, "Back to sign in");
    }
    Ok(render(StatusCode::OK, &page))
}

async fn complete_reset(
    state: &FlowState,
    token: String,
    password: String,
    password_confirm: String,
) -> Result<Response, FlowError> {
    let (decoded, account) = redeemable(state, &token).await?;
    let evt = FlowEvent::new("reset_password");
    evt.user(&account.id);

    if password != password_confirm {
        let page = ResetPasswordPage {
            token,
            error: Some("Passwords do not match.".into()),
        };
        return Ok(render(StatusCode::BAD_REQUEST, &page));
    }

    if let Err(e) = state.validator.reset_password(&account.id, &password).await {
        let Some(message) = e.form_message() else {
            return Err(e.into());
        };
        let page = ResetPasswordPage {
            token,
            error: Some(message),
        };
        return Ok(render(StatusCode::BAD_REQUEST, &page));
    }
    evt.outcome("password_changed");
    evt.info("password reset completed");

    let mut page = MessagePage::new(
        "Password changed",
        "Your password has been changed. You can now sign in with your new password.",
    );
    if let Some(href) = login_href(decoded.challenge()) {
        page = page.with_link(href, "Continue signing in");
    }
    Ok(render(StatusCode::OK, &page))
}

/// Decode a reset token and check that it was issued against the current password.
async fn redeemable(
    state: &FlowState,
    token: &str,
) -> Result<(DecodedChallenge, user::Model), FlowError> {
    let decoded = state.tokens.decode(token, TokenStep::ResetPassword)?;
    let user_id = decoded.param("user_id").ok_or(TokenError::Invalid)?;
    let account = state
        .users
        .find_by_id(user_id)
        .await?
        .ok_or(TokenError::Invalid)?;
    if decoded.param("fingerprint") != Some(password_fingerprint(&account.password_hash).as_str())
    {
        tracing::debug!(user_id = %account.id, "reset link already used");
        return Err(TokenError::Invalid.into());
    }
    Ok((decoded, account))
}
