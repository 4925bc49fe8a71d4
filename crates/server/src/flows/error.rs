use crate::error::{AccountError, CredentialError, HubAdminError, TokenError};
use crate::flows::pages::{MessagePage, render};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

/// Failures that end a flow on one of our own pages instead of a hub redirect.
#[derive(Debug, Error)]
pub enum FlowError {
    #[error("request carries no challenge")]
    MissingChallenge,
    #[error(transparent)]
    Hub(#[from] HubAdminError),
    #[error(transparent)]
    Token(#[from] TokenError),
    #[error("subject {0} has no local account")]
    UnknownSubject(String),
    #[error("store failure: {0}")]
    Store(#[from] sea_orm::DbErr),
    #[error("{0}")]
    Internal(String),
}

impl From<CredentialError> for FlowError {
    fn from(error: CredentialError) -> Self {
        match error {
            CredentialError::Store(e) => FlowError::Store(e),
            other => FlowError::Internal(other.to_string()),
        }
    }
}

impl From<AccountError> for FlowError {
    fn from(error: AccountError) -> Self {
        match error {
            AccountError::Store(e) => FlowError::Store(e),
            other => FlowError::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for FlowError {
    fn into_response(self) -> Response {
        match self {
            FlowError::MissingChallenge => {
                tracing::debug!("flow request without challenge");
                render(StatusCode::BAD_REQUEST, &MessagePage::missing_challenge())
            }
            FlowError::Hub(e) => {
                if e.is_hub_outage() {
                    tracing::error!(
                        name = "flows.hub.outage",
                        target = concat!(env!("CARGO_PKG_NAME"), "::", module_path!()),
                        severity = "critical",
                        method = e.method(),
                        endpoint = e.endpoint(),
                        status = ?e.status(),
                        error = %e,
                        message = "Hub admin API unavailable"
                    );
                } else {
                    tracing::error!(
                        name = "flows.hub.rejected",
                        target = concat!(env!("CARGO_PKG_NAME"), "::", module_path!()),
                        method = e.method(),
                        endpoint = e.endpoint(),
                        status = ?e.status(),
                        error = %e,
                        message = "Hub admin API refused the request"
                    );
                }
                render(StatusCode::BAD_GATEWAY, &MessagePage::failure())
            }
            FlowError::Token(TokenError::Encode(e)) => {
                tracing::error!("Failed to create challenge token: {}", e);
                render(StatusCode::INTERNAL_SERVER_ERROR, &MessagePage::failure())
            }
            FlowError::Token(e) => {
                tracing::warn!(error = %e, "rejected challenge token");
                render(StatusCode::FORBIDDEN, &MessagePage::invalid_link())
            }
            FlowError::UnknownSubject(subject) => {
                tracing::error!(
                    name = "flows.unknown_subject",
                    target = concat!(env!("CARGO_PKG_NAME"), "::", module_path!()),
                    subject = %subject,
                    message = "Hub subject has no local account"
                );
                render(StatusCode::INTERNAL_SERVER_ERROR, &MessagePage::failure())
            }
            FlowError::Store(e) => {
                tracing::error!("Database error during flow: {}", e);
                render(StatusCode::INTERNAL_SERVER_ERROR, &MessagePage::failure())
            }
            FlowError::Internal(e) => {
                tracing::error!("Flow failed: {}", e);
                render(StatusCode::INTERNAL_SERVER_ERROR, &MessagePage::failure())
            }
        }
    }
}
