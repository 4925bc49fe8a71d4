//! Wire types of the hub admin API. Unknown fields are ignored and missing ones default,
//! so newer hub versions keep parsing.

use serde::{Deserialize, Serialize};

/// OAuth2 client on whose behalf a challenge was issued.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct HubClient {
    pub client_id: String,
    pub client_name: String,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct LoginRequest {
    pub subject: String,
    /// The hub already authenticated this subject; no form should be shown.
    pub skip: bool,
    pub request_url: String,
    pub requested_scope: Vec<String>,
    pub client: Option<HubClient>,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct ConsentRequest {
    pub subject: String,
    pub skip: bool,
    pub request_url: String,
    pub requested_scope: Vec<String>,
    pub requested_access_token_audience: Vec<String>,
    pub client: Option<HubClient>,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct LogoutRequest {
    pub subject: String,
    pub sid: Option<String>,
    pub request_url: String,
}

/// Answer to every accept/reject call: where to send the browser next.
#[derive(Clone, Debug, Deserialize)]
pub struct CompletedRequest {
    pub redirect_to: String,
}

/// Structured error body the hub returns on non-2xx answers.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct HubErrorBody {
    pub error: String,
    pub error_description: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct AcceptLogin<'a> {
    pub subject: &'a str,
    pub remember: bool,
    pub remember_for: u64,
}

#[derive(Debug, Serialize)]
pub(crate) struct RejectLogin<'a> {
    pub error: &'a str,
    pub error_description: &'a str,
}

#[derive(Debug, Serialize)]
pub(crate) struct AcceptConsent<'a, A, I> {
    pub grant_scope: &'a [String],
    pub grant_access_token_audience: &'a [String],
    pub session: ConsentSession<'a, A, I>,
}

#[derive(Debug, Serialize)]
pub(crate) struct ConsentSession<'a, A, I> {
    pub access_token: &'a A,
    pub id_token: &'a I,
}
