use crate::AppResources;
use crate::claims::ClaimsAssembler;
use crate::config::{AppConfig, ConfigError};
use crate::email::{EmailSender, SmtpSender};
use crate::hub::HubAdminClient;
use crate::identity::{CredentialValidator, PasswordHashing, StandardPasswordPolicy};
use crate::store::{PrivilegeRepository, UserRepository};
use crate::token::ChallengeTokenCodec;
use std::sync::Arc;

/// Everything a flow handler needs, built once at startup.
#[derive(Clone)]
pub struct FlowState {
    pub config: Arc<AppConfig>,
    pub hub: HubAdminClient,
    pub validator: CredentialValidator,
    pub claims: ClaimsAssembler,
    pub users: UserRepository,
    pub tokens: ChallengeTokenCodec,
    pub mailer: Arc<dyn EmailSender>,
}

impl FlowState {
    pub fn new(resources: &AppResources) -> Result<Self, ConfigError> {
        let config = resources.config.clone();
        let hub = HubAdminClient::new(&config.hub, config.environment)?;
        let hashing = PasswordHashing::new(&config.password)
            .map_err(|e| ConfigError::Validation(format!("invalid argon2 parameters: {e}")))?;
        let users = UserRepository::new(resources.db.clone());
        let validator = CredentialValidator::new(
            users.clone(),
            hashing,
            Arc::new(StandardPasswordPolicy {
                min_length: config.password.min_length,
            }),
            config.lockout.clone(),
        );
        let claims = ClaimsAssembler::new(PrivilegeRepository::new(resources.db.clone()));
        let tokens =
            ChallengeTokenCodec::new(config.token_secret.as_bytes(), config.token_max_age_secs);
        let mailer: Arc<dyn EmailSender> = Arc::new(SmtpSender::new(
            resources.mailer.clone(),
            config.smtp.from.clone(),
            config.token_max_age_secs,
        ));

        Ok(Self {
            config,
            hub,
            validator,
            claims,
            users,
            tokens,
            mailer,
        })
    }

    /// Absolute link to one of our own pages, for use in emails.
    pub fn public_link(&self, path: &str, token: &str) -> String {
        format!(
            "{}/{}?token={}",
            self.config.public_url.trim_end_matches('/'),
            path.trim_start_matches('/'),
            urlencoding::encode(token)
        )
    }
}
