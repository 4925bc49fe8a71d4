use crate::config::{ConfigError, Environment, HubConfig};
use crate::error::HubAdminError;
use crate::hub::types::{
    AcceptConsent, AcceptLogin, CompletedRequest, ConsentRequest, ConsentSession, HubErrorBody,
    LoginRequest, LogoutRequest, RejectLogin,
};
use reqwest::{RequestBuilder, Url};
use serde::Serialize;
use serde::de::DeserializeOwned;

const LOGIN: &str = "oauth2/auth/requests/login";
const LOGIN_ACCEPT: &str = "oauth2/auth/requests/login/accept";
const LOGIN_REJECT: &str = "oauth2/auth/requests/login/reject";
const CONSENT: &str = "oauth2/auth/requests/consent";
const CONSENT_ACCEPT: &str = "oauth2/auth/requests/consent/accept";
const LOGOUT: &str = "oauth2/auth/requests/logout";
const LOGOUT_ACCEPT: &str = "oauth2/auth/requests/logout/accept";

/// Thin typed wrapper over the hub admin API.
///
/// Every call is a single attempt bounded by the configured timeout. Challenges are
/// single-use on the hub side, so a failed accept/reject is surfaced, never repeated.
#[derive(Clone, Debug)]
pub struct HubAdminClient {
    http: reqwest::Client,
    admin_url: Url,
}

impl HubAdminClient {
    pub fn new(config: &HubConfig, environment: Environment) -> Result<Self, ConfigError> {
        let mut base = config.admin_url.clone();
        if !base.ends_with('/') {
            base.push('/');
        }
        let admin_url = Url::parse(&base)
            .map_err(|e| ConfigError::Validation(format!("hub.admin_url is not a URL: {e}")))?;

        if !config.verify_tls {
            tracing::warn!(
                name = "hub.client.insecure",
                target = concat!(env!("CARGO_PKG_NAME"), "::", module_path!()),
                admin_url = %admin_url,
                message = "TLS certificate verification towards the hub is disabled"
            );
        }

        let http = reqwest::Client::builder()
            .timeout(config.timeout(environment))
            .danger_accept_invalid_certs(!config.verify_tls)
            .build()
            .map_err(|e| ConfigError::Validation(format!("cannot build hub client: {e}")))?;

        Ok(Self { http, admin_url })
    }

    #[tracing::instrument(skip(self))]
    pub async fn get_login_request(&self, challenge: &str) -> Result<LoginRequest, HubAdminError> {
        self.get(LOGIN, "login_challenge", challenge).await
    }

    #[tracing::instrument(skip(self))]
    pub async fn accept_login_request(
        &self,
        challenge: &str,
        subject: &str,
        remember: bool,
        remember_for: u64,
    ) -> Result<CompletedRequest, HubAdminError> {
        let body = AcceptLogin {
            subject,
            remember,
            remember_for,
        };
        self.put(LOGIN_ACCEPT, "login_challenge", challenge, Some(&body))
            .await
    }

    #[tracing::instrument(skip(self, error_description))]
    pub async fn reject_login_request(
        &self,
        challenge: &str,
        error: &str,
        error_description: &str,
    ) -> Result<CompletedRequest, HubAdminError> {
        let body = RejectLogin {
            error,
            error_description,
        };
        self.put(LOGIN_REJECT, "login_challenge", challenge, Some(&body))
            .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn get_consent_request(
        &self,
        challenge: &str,
    ) -> Result<ConsentRequest, HubAdminError> {
        self.get(CONSENT, "consent_challenge", challenge).await
    }

    /// Grant a consent request, embedding `access_token` and `id_token` claims in the
    /// session the hub will issue tokens from.
    #[tracing::instrument(skip(self, access_token, id_token))]
    pub async fn accept_consent_request<A, I>(
        &self,
        challenge: &str,
        grant_scope: &[String],
        grant_audience: &[String],
        access_token: &A,
        id_token: &I,
    ) -> Result<CompletedRequest, HubAdminError>
    where
        A: Serialize,
        I: Serialize,
    {
        let body = AcceptConsent {
            grant_scope,
            grant_access_token_audience: grant_audience,
            session: ConsentSession {
                access_token,
                id_token,
            },
        };
        self.put(CONSENT_ACCEPT, "consent_challenge", challenge, Some(&body))
            .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn get_logout_request(&self, challenge: &str) -> Result<LogoutRequest, HubAdminError> {
        self.get(LOGOUT, "logout_challenge", challenge).await
    }

    #[tracing::instrument(skip(self))]
    pub async fn accept_logout_request(
        &self,
        challenge: &str,
    ) -> Result<CompletedRequest, HubAdminError> {
        self.put::<(), _>(LOGOUT_ACCEPT, "logout_challenge", challenge, None)
            .await
    }

    fn url(&self, method: &'static str, path: &str) -> Result<Url, HubAdminError> {
        self.admin_url
            .join(path)
            .map_err(|e| HubAdminError::Protocol {
                method,
                endpoint: format!("/{path}"),
                detail: e.to_string(),
            })
    }

    async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        param: &str,
        challenge: &str,
    ) -> Result<T, HubAdminError> {
        let url = self.url("GET", path)?;
        let request = self.http.get(url).query(&[(param, challenge)]);
        Self::execute("GET", path, request).await
    }

    async fn put<B, T>(
        &self,
        path: &str,
        param: &str,
        challenge: &str,
        body: Option<&B>,
    ) -> Result<T, HubAdminError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.url("PUT", path)?;
        let mut request = self.http.put(url).query(&[(param, challenge)]);
        if let Some(body) = body {
            request = request.json(body);
        }
        Self::execute("PUT", path, request).await
    }

    async fn execute<T: DeserializeOwned>(
        method: &'static str,
        path: &str,
        request: RequestBuilder,
    ) -> Result<T, HubAdminError> {
        let endpoint = format!("/{path}");
        let response = request
            .send()
            .await
            .map_err(|source| HubAdminError::Unavailable {
                method,
                endpoint: endpoint.clone(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let body = serde_json::from_str::<HubErrorBody>(&text)
                .ok()
                .filter(|b| !b.error.is_empty())
                .unwrap_or_else(|| HubErrorBody {
                    error: status
                        .canonical_reason()
                        .unwrap_or("unknown_error")
                        .to_string(),
                    error_description: text,
                });
            return Err(HubAdminError::Rejected {
                method,
                endpoint,
                status: status.as_u16(),
                error: body.error,
                description: body.error_description,
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|source| HubAdminError::Unavailable {
                method,
                endpoint: endpoint.clone(),
                source,
            })?;
        tracing::debug!(%method, %endpoint, status = status.as_u16(), "hub answered");
        serde_json::from_slice(&bytes).map_err(|e| HubAdminError::Protocol {
            method,
            endpoint,
            detail: e.to_string(),
        })
    }
}
