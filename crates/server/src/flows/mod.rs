//! Browser-facing controllers for the hub's login, consent and logout challenges,
//! plus the account pages (signup, email verification, password reset) a login can
//! detour through.
//!
//! ## Endpoints
//!
//! - `GET/POST /login` - login challenge
//! - `GET /consent` - consent challenge, granted from the privilege graph
//! - `GET /logout` - logout challenge
//! - `GET/POST /signup` - account creation
//! - `GET/POST /verify-email` - email confirmation and resend
//! - `GET/POST /reset-password` - password reset by email link

pub mod consent;
pub mod error;
pub mod login;
pub mod logout;
pub mod pages;
pub mod reset_password;
pub mod signup;
mod state;
pub mod verify_email;

pub use error::FlowError;
pub use state::FlowState;

use utoipa_axum::router::OpenApiRouter;

/// OpenAPI tag for flow endpoints
pub const FLOWS_TAG: &str = "Flows";

pub fn router(state: FlowState) -> OpenApiRouter {
    OpenApiRouter::new()
        .merge(login::router())
        .merge(consent::router())
        .merge(logout::router())
        .merge(signup::router())
        .merge(verify_email::router())
        .merge(reset_password::router())
        .with_state(state)
}

/// Treat an absent and an empty challenge alike.
fn non_empty(challenge: Option<String>) -> Option<String> {
    challenge.filter(|c| !c.trim().is_empty())
}

/// Pick the challenge from the hub's flow-specific parameter (`login_challenge`, ...) or
/// from the short `challenge` our own pages use. The flow-specific one wins.
pub(crate) fn either_challenge(named: Option<String>, short: Option<String>) -> Option<String> {
    non_empty(named).or_else(|| non_empty(short))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flow_specific_challenge_wins() {
        let pick = |named: Option<&str>, short: Option<&str>| {
            either_challenge(named.map(String::from), short.map(String::from))
        };
        assert_eq!(pick(Some("C1"), Some("C2")).as_deref(), Some("C1"));
        assert_eq!(pick(Some(" "), Some("C2")).as_deref(), Some("C2"));
        assert_eq!(pick(None, Some("C2")).as_deref(), Some("C2"));
        assert_eq!(pick(None, Some("")), None);
    }
}
