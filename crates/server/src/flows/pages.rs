//! HTML pages rendered by the flows.

use askama::Template;
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};

/// Render `page` with `status`, falling back to a bare 500 if the template fails.
pub fn render<T: Template>(status: StatusCode, page: &T) -> Response {
    match page.render() {
        Ok(html) => (status, Html(html)).into_response(),
        Err(e) => {
            tracing::error!(
                name = "flows.render.failed",
                target = concat!(env!("CARGO_PKG_NAME"), "::", module_path!()),
                error = %e,
                message = "Failed to render page template"
            );
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error").into_response()
        }
    }
}

#[derive(Template)]
#[template(path = "login.html")]
pub struct LoginPage {
    pub challenge: String,
    pub email: String,
    pub error: Option<String>,
    pub client_name: Option<String>,
    pub scopes: Vec<String>,
}

impl LoginPage {
    pub fn new(challenge: &str) -> Self {
        Self {
            challenge: challenge.to_string(),
            email: String::new(),
            error: None,
            client_name: None,
            scopes: Vec::new(),
        }
    }

    pub fn with_error(mut self, email: &str, error: impl Into<String>) -> Self {
        self.email = email.to_string();
        self.error = Some(error.into());
        self
    }
}

#[derive(Template)]
#[template(path = "signup.html")]
pub struct SignupPage {
    pub challenge: String,
    pub email: String,
    pub errors: Vec<String>,
}

#[derive(Template)]
#[template(path = "verify_email.html")]
pub struct ResendVerificationPage {
    pub challenge: String,
    pub email: String,
    pub error: Option<String>,
}

#[derive(Template)]
#[template(path = "reset_request.html")]
pub struct ResetRequestPage {
    pub challenge: String,
    pub email: String,
    pub error: Option<String>,
}

#[derive(Template)]
#[template(path = "reset_password.html")]
pub struct ResetPasswordPage {
    pub token: String,
    pub error: Option<String>,
}

/// A title, one paragraph and an optional link onwards.
#[derive(Template)]
#[template(path = "message.html")]
pub struct MessagePage {
    pub title: String,
    pub message: String,
    pub link_href: Option<String>,
    pub link_text: String,
}

impl MessagePage {
    pub fn new(title: &str, message: &str) -> Self {
        Self {
            title: title.to_string(),
            message: message.to_string(),
            link_href: None,
            link_text: String::new(),
        }
    }

    pub fn with_link(mut self, href: String, text: &str) -> Self {
        self.link_href = Some(href);
        self.link_text = text.to_string();
        self
    }

    pub fn check_inbox() -> Self {
        Self::new(
            "Check your inbox",
            "If an account exists for this address, we have sent it an email with a link. \
             Open the link to continue signing in.",
        )
    }

    pub fn failure() -> Self {
        Self::new(
            "Something went wrong",
            "We could not complete your request. Please go back to the application and try again.",
        )
    }

    pub fn invalid_link() -> Self {
        Self::new(
            "This link is not valid",
            "The link is invalid, has already been used, or has expired. Please request a new one.",
        )
    }

    pub fn missing_challenge() -> Self {
        Self::new(
            "Missing sign-in request",
            "This page must be opened from an application's sign-in. Please start again from the application.",
        )
    }
}

/// Path of the login page for `challenge`, or `None` outside a hub flow.
pub fn login_href(challenge: Option<&str>) -> Option<String> {
    challenge.map(|c| format!("/login?login_challenge={}", urlencoding::encode(c)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn login_page_escapes_user_input() {
        let html = LoginPage::new("C1")
            .with_error("<script>@example.org", "Invalid email or password.")
            .render()
            .expect("render");
        assert!(html.contains("name=\"challenge\" value=\"C1\""));
        assert!(!html.contains("<script>@example.org"));
        assert!(html.contains("Invalid email or password."));
    }

    #[test]
    fn login_href_encodes_challenge() {
        assert_eq!(
            login_href(Some("a b")).as_deref(),
            Some("/login?login_challenge=a%20b")
        );
        assert_eq!(login_href(None), None);
    }
}
