//! One span per hub round-trip.
//!
//! A `FlowEvent` is created when a flow handler starts and collects the challenge, the
//! subject and the final outcome as span attributes, so a single line at the end of the
//! handler describes the whole interaction:
//!
//! ```rust,ignore
//! let evt = FlowEvent::new("login");
//! evt.challenge(&challenge);
//! evt.user(&account.id);
//! evt.outcome("accepted");
//! evt.info("login accepted");
//! ```
//!
//! Fields must be declared when the span is created; `Span::record` silently drops
//! anything else.

use std::fmt::Display;
use tracing::{Level, Span, field};

#[derive(Clone, Debug)]
pub struct FlowEvent {
    span: Span,
}

impl FlowEvent {
    pub fn new(flow: &'static str) -> Self {
        let span = tracing::info_span!(
            "flow",
            flow = flow,
            challenge = field::Empty,
            user_id = field::Empty,
            outcome = field::Empty,
        );
        FlowEvent { span }
    }

    pub fn challenge(&self, challenge: &str) {
        self.span.record("challenge", field::display(challenge));
    }

    pub fn user(&self, user_id: impl Display) {
        self.span.record("user_id", field::display(user_id));
    }

    /// Short machine-readable result such as `accepted`, `rejected:account_locked`
    /// or `form_error`.
    pub fn outcome(&self, outcome: impl Display) {
        self.span.record("outcome", field::display(outcome));
    }

    pub fn emit(&self, message: &str, level: Level) {
        self.span.in_scope(|| match level {
            Level::ERROR => tracing::event!(Level::ERROR, message = %message),
            Level::WARN => tracing::event!(Level::WARN, message = %message),
            Level::INFO => tracing::event!(Level::INFO, message = %message),
            Level::DEBUG => tracing::event!(Level::DEBUG, message = %message),
            Level::TRACE => tracing::event!(Level::TRACE, message = %message),
        });
    }

    pub fn info(&self, message: &str) {
        self.emit(message, Level::INFO)
    }

    pub fn warn(&self, message: &str) {
        self.emit(message, Level::WARN)
    }
}
