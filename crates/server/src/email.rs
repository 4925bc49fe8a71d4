//! Outbound account email: address verification and password reset links.
//!
//! Messages are built synchronously so malformed addresses surface to the caller;
//! delivery happens on a spawned task and failures are only logged. Flows talk to an
//! [`EmailSender`] so the transport can be swapped out.

use askama::Template;
use lettre::message::header::ContentType;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use std::sync::Arc;
use thiserror::Error;

pub type Mailer = AsyncSmtpTransport<Tokio1Executor>;

#[derive(Debug, Error)]
pub enum EmailError {
    #[error("invalid email address: {0}")]
    Address(#[from] lettre::address::AddressError),
    #[error("failed to render email: {0}")]
    Render(#[from] askama::Error),
    #[error("failed to build email: {0}")]
    Build(#[from] lettre::error::Error),
}

#[derive(Template)]
#[template(path = "verification_email.txt")]
struct VerificationEmailTemplate<'a> {
    verify_url: &'a str,
    max_age_minutes: i64,
}

#[derive(Template)]
#[template(path = "reset_email.txt")]
struct ResetEmailTemplate<'a> {
    reset_url: &'a str,
    max_age_minutes: i64,
}

/// A message to an account holder carrying the link they have to follow.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AccountEmail {
    Verification { to: String, link: String },
    PasswordReset { to: String, link: String },
}

impl AccountEmail {
    pub fn recipient(&self) -> &str {
        match self {
            AccountEmail::Verification { to, .. } | AccountEmail::PasswordReset { to, .. } => to,
        }
    }

    pub fn link(&self) -> &str {
        match self {
            AccountEmail::Verification { link, .. } | AccountEmail::PasswordReset { link, .. } => {
                link
            }
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            AccountEmail::Verification { .. } => "verification",
            AccountEmail::PasswordReset { .. } => "password_reset",
        }
    }
}

/// Outbound channel for account email.
///
/// `send` only queues: an error means the message could not be built, while delivery
/// failures are logged by the implementation.
pub trait EmailSender: Send + Sync {
    fn send(&self, email: AccountEmail) -> Result<(), EmailError>;
}

/// Renders account email from the askama templates and delivers it over SMTP.
pub struct SmtpSender {
    mailer: Arc<Mailer>,
    from: String,
    max_age_secs: i64,
}

impl SmtpSender {
    pub fn new(mailer: Arc<Mailer>, from: impl Into<String>, max_age_secs: i64) -> Self {
        Self {
            mailer,
            from: from.into(),
            max_age_secs,
        }
    }

    fn message(&self, email: &AccountEmail) -> Result<Message, EmailError> {
        let max_age_minutes = self.max_age_secs / 60;
        let (subject, body) = match email {
            AccountEmail::Verification { link, .. } => (
                "Verify your email address",
                VerificationEmailTemplate {
                    verify_url: link,
                    max_age_minutes,
                }
                .render()?,
            ),
            AccountEmail::PasswordReset { link, .. } => (
                "Reset your password",
                ResetEmailTemplate {
                    reset_url: link,
                    max_age_minutes,
                }
                .render()?,
            ),
        };
        build(&self.from, email.recipient(), subject, body)
    }
}

impl EmailSender for SmtpSender {
    fn send(&self, email: AccountEmail) -> Result<(), EmailError> {
        let message = self.message(&email)?;
        dispatch(&self.mailer, message, email.kind());
        Ok(())
    }
}

fn build(from: &str, to: &str, subject: &str, body: String) -> Result<Message, EmailError> {
    Ok(Message::builder()
        .from(from.parse()?)
        .to(to.parse()?)
        .subject(subject)
        .header(ContentType::TEXT_PLAIN)
        .body(body)?)
}

fn dispatch(mailer: &Arc<Mailer>, message: Message, kind: &'static str) {
    let mailer = Arc::clone(mailer);
    tokio::spawn(async move {
        if let Err(e) = mailer.send(message).await {
            tracing::error!(
                name = "email.send_failed",
                target = concat!(env!("CARGO_PKG_NAME"), "::", module_path!()),
                kind = kind,
                error = %e,
                message = "Failed to send email"
            );
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verification_email_contains_link() {
        let body = VerificationEmailTemplate {
            verify_url: "https://login.example.org/verify-email?token=abc",
            max_age_minutes: 60,
        }
        .render()
        .expect("render");
        assert!(body.contains("https://login.example.org/verify-email?token=abc"));
        assert!(body.contains("60 minutes"));
    }

    #[test]
    fn reset_email_contains_link() {
        let body = ResetEmailTemplate {
            reset_url: "https://login.example.org/reset-password?token=abc",
            max_age_minutes: 60,
        }
        .render()
        .expect("render");
        assert!(body.contains("reset-password?token=abc"));
    }

    #[tokio::test]
    async fn smtp_sender_addresses_the_recipient() {
        let mailer = Arc::new(Mailer::builder_dangerous("localhost").port(2525).build());
        let sender = SmtpSender::new(mailer, "noreply@example.org", 3600);
        let message = sender
            .message(&AccountEmail::PasswordReset {
                to: "ada@example.org".into(),
                link: "https://login.example.org/reset-password?token=abc".into(),
            })
            .expect("message");
        let raw = String::from_utf8(message.formatted()).expect("utf-8");
        assert!(raw.contains("To: ada@example.org"));
        assert!(raw.contains("Subject: Reset your password"));

        let bad = sender.send(AccountEmail::Verification {
            to: "not an address".into(),
            link: "https://login.example.org/verify-email?token=abc".into(),
        });
        assert!(matches!(bad, Err(EmailError::Address(_))));
    }

    #[test]
    fn malformed_recipient_is_reported() {
        let result = build("noreply@example.org", "not an address", "s", "b".into());
        assert!(matches!(result, Err(EmailError::Address(_))));
    }
}
