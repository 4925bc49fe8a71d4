use thiserror::Error;
use time::OffsetDateTime;

/// Failure talking to the hub's admin API.
///
/// Every variant carries the HTTP method and endpoint path of the failed call so the
/// caller can log it without re-deriving the request.
#[derive(Debug, Error)]
pub enum HubAdminError {
    #[error("{method} {endpoint}: hub unavailable: {source}")]
    Unavailable {
        method: &'static str,
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{method} {endpoint}: hub rejected the request with HTTP {status}: {error} ({description})")]
    Rejected {
        method: &'static str,
        endpoint: String,
        status: u16,
        error: String,
        description: String,
    },
    #[error("{method} {endpoint}: unparsable hub response: {detail}")]
    Protocol {
        method: &'static str,
        endpoint: String,
        detail: String,
    },
}

impl HubAdminError {
    pub fn method(&self) -> &'static str {
        match self {
            HubAdminError::Unavailable { method, .. }
            | HubAdminError::Rejected { method, .. }
            | HubAdminError::Protocol { method, .. } => method,
        }
    }

    pub fn endpoint(&self) -> &str {
        match self {
            HubAdminError::Unavailable { endpoint, .. }
            | HubAdminError::Rejected { endpoint, .. }
            | HubAdminError::Protocol { endpoint, .. } => endpoint,
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            HubAdminError::Rejected { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Transport failures and 5xx answers mean the hub itself is down; everything else
    /// is a misuse of the protocol on our side or the client's.
    pub fn is_hub_outage(&self) -> bool {
        match self {
            HubAdminError::Unavailable { .. } => true,
            HubAdminError::Rejected { status, .. } => *status >= 500,
            HubAdminError::Protocol { .. } => false,
        }
    }
}

/// Outcome of the account-state check chain, in the order the checks run.
#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("no account matches the supplied identity")]
    UserNotFound,
    #[error("account is locked until {until}")]
    AccountLocked { until: OffsetDateTime },
    #[error("incorrect password")]
    IncorrectPassword,
    #[error("account is disabled")]
    AccountDisabled,
    #[error("email address is not verified")]
    EmailNotVerified { user_id: String },
    #[error("credential store failure: {0}")]
    Store(#[from] sea_orm::DbErr),
}

impl CredentialError {
    /// Stable `(error, error_description)` pair sent to the hub when a login is rejected.
    /// `None` for infrastructure failures, which are never forwarded.
    pub fn rejection(&self) -> Option<(&'static str, &'static str)> {
        match self {
            CredentialError::UserNotFound => {
                Some(("user_not_found", "No account exists for this identity."))
            }
            CredentialError::AccountLocked { .. } => Some((
                "account_locked",
                "The account is temporarily locked after too many failed sign-in attempts.",
            )),
            CredentialError::IncorrectPassword => {
                Some(("incorrect_password", "The supplied password is incorrect."))
            }
            CredentialError::AccountDisabled => {
                Some(("account_disabled", "The account has been deactivated."))
            }
            CredentialError::EmailNotVerified { .. } => Some((
                "email_not_verified",
                "The email address of this account has not been verified.",
            )),
            CredentialError::Store(_) => None,
        }
    }

    pub fn error_code(&self) -> Option<&'static str> {
        self.rejection().map(|(code, _)| code)
    }
}

/// Failures while creating or changing account credentials.
#[derive(Debug, Error)]
pub enum AccountError {
    #[error("email address is malformed")]
    InvalidEmail,
    #[error("email address is already registered")]
    EmailInUse,
    #[error("password is too weak: {0}")]
    PasswordTooWeak(String),
    #[error("account does not exist")]
    UnknownAccount,
    #[error("password hashing failed: {0}")]
    Hashing(String),
    #[error("credential store failure: {0}")]
    Store(#[from] sea_orm::DbErr),
}

impl AccountError {
    /// Message suitable for showing next to the form field, if the error is user-fixable.
    pub fn form_message(&self) -> Option<String> {
        match self {
            AccountError::InvalidEmail => Some("Please enter a valid email address.".into()),
            AccountError::EmailInUse => {
                Some("An account with this email address already exists.".into())
            }
            AccountError::PasswordTooWeak(reason) => Some(format!("Password {reason}.")),
            _ => None,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("token signature or payload is invalid")]
    Invalid,
    #[error("token was issued for step `{found}`, expected `{expected}`")]
    StepMismatch { expected: String, found: String },
    #[error("token has expired")]
    Expired,
    #[error("token could not be created: {0}")]
    Encode(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hub_outage_classification() {
        let rejected = |status| HubAdminError::Rejected {
            method: "PUT",
            endpoint: "/oauth2/auth/requests/login/accept".into(),
            status,
            error: "x".into(),
            description: "y".into(),
        };
        assert!(!rejected(404).is_hub_outage());
        assert!(!rejected(409).is_hub_outage());
        assert!(rejected(503).is_hub_outage());

        let protocol = HubAdminError::Protocol {
            method: "GET",
            endpoint: "/oauth2/auth/requests/login".into(),
            detail: "EOF".into(),
        };
        assert!(!protocol.is_hub_outage());
        assert_eq!(protocol.method(), "GET");
        assert_eq!(protocol.endpoint(), "/oauth2/auth/requests/login");
    }

    #[test]
    fn every_policy_failure_has_a_stable_code() {
        let cases = [
            (CredentialError::UserNotFound, "user_not_found"),
            (
                CredentialError::AccountLocked {
                    until: OffsetDateTime::UNIX_EPOCH,
                },
                "account_locked",
            ),
            (CredentialError::IncorrectPassword, "incorrect_password"),
            (CredentialError::AccountDisabled, "account_disabled"),
            (
                CredentialError::EmailNotVerified {
                    user_id: "u".into(),
                },
                "email_not_verified",
            ),
        ];
        for (error, code) in cases {
            assert_eq!(error.error_code(), Some(code));
        }
        assert!(
            CredentialError::Store(sea_orm::DbErr::Custom("boom".into()))
                .rejection()
                .is_none()
        );
    }
}
