use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration build error: {0}")]
    Build(#[from] config::ConfigError),
    #[error("Invalid configuration: {0}")]
    Validation(String),
}

/// Deployment environment. Only `development` may relax TLS verification towards the hub.
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Staging,
    Production,
}

impl Environment {
    pub fn is_development(&self) -> bool {
        matches!(self, Environment::Development)
    }
}

#[derive(Clone, Deserialize)]
pub struct SmtpConfig {
    pub server: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub from: String,
}

/// Connection settings for the hub's admin API.
#[derive(Clone, Debug, Deserialize)]
pub struct HubConfig {
    pub admin_url: String,
    #[serde(default = "default_true")]
    pub verify_tls: bool,
    /// Overrides the per-environment request timeout.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl HubConfig {
    /// Short timeouts in deployed environments, generous ones in development so a
    /// hub paused in a debugger does not fail the flow.
    pub fn timeout(&self, environment: Environment) -> Duration {
        match self.timeout_secs {
            Some(secs) => Duration::from_secs(secs),
            None if environment.is_development() => Duration::from_secs(120),
            None => Duration::from_secs(5),
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct PasswordConfig {
    #[serde(default = "default_min_length")]
    pub min_length: usize,
    #[serde(default = "default_argon2_memory_kib")]
    pub argon2_memory_kib: u32,
    #[serde(default = "default_argon2_iterations")]
    pub argon2_iterations: u32,
    #[serde(default = "default_argon2_parallelism")]
    pub argon2_parallelism: u32,
}

impl Default for PasswordConfig {
    fn default() -> Self {
        Self {
            min_length: default_min_length(),
            argon2_memory_kib: default_argon2_memory_kib(),
            argon2_iterations: default_argon2_iterations(),
            argon2_parallelism: default_argon2_parallelism(),
        }
    }
}

/// Temporary account lockout after consecutive password failures.
#[derive(Clone, Debug, Deserialize)]
pub struct LockoutConfig {
    #[serde(default = "default_lockout_threshold")]
    pub threshold: i32,
    #[serde(default = "default_lockout_window_secs")]
    pub window_secs: i64,
}

impl Default for LockoutConfig {
    fn default() -> Self {
        Self {
            threshold: default_lockout_threshold(),
            window_secs: default_lockout_window_secs(),
        }
    }
}

#[derive(Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,
    pub database_url: String,
    /// Externally reachable base URL of this service, used for links in emails.
    pub public_url: String,
    #[serde(default)]
    pub environment: Environment,
    /// HMAC key for challenge tokens.
    pub token_secret: String,
    #[serde(default = "default_token_max_age_secs")]
    pub token_max_age_secs: i64,
    #[serde(default = "default_true")]
    pub remember_login: bool,
    #[serde(default = "default_remember_for")]
    pub remember_for: u64,
    pub smtp: SmtpConfig,
    pub hub: HubConfig,
    #[serde(default)]
    pub password: PasswordConfig,
    #[serde(default)]
    pub lockout: LockoutConfig,
}

impl AppConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.token_secret.len() < 32 {
            return Err(ConfigError::Validation(
                "token_secret must be at least 32 characters".into(),
            ));
        }
        if self.smtp.port == 0 {
            return Err(ConfigError::Validation("smtp.port must be > 0".into()));
        }
        if !self.hub.verify_tls && !self.environment.is_development() {
            return Err(ConfigError::Validation(
                "hub.verify_tls may only be disabled in development".into(),
            ));
        }
        if self.lockout.threshold <= 0 {
            return Err(ConfigError::Validation(
                "lockout.threshold must be > 0".into(),
            ));
        }
        if self.lockout.window_secs <= 0 {
            return Err(ConfigError::Validation(
                "lockout.window_secs must be > 0".into(),
            ));
        }
        if self.token_max_age_secs <= 0 {
            return Err(ConfigError::Validation(
                "token_max_age_secs must be > 0".into(),
            ));
        }
        Ok(())
    }
}

fn default_true() -> bool {
    true
}

fn default_listen_addr() -> String {
    "0.0.0.0:8080".into()
}

fn default_token_max_age_secs() -> i64 {
    3600
}

fn default_remember_for() -> u64 {
    604_800 // 7 days
}

fn default_min_length() -> usize {
    8
}

fn default_argon2_memory_kib() -> u32 {
    19_456
}

fn default_argon2_iterations() -> u32 {
    2
}

fn default_argon2_parallelism() -> u32 {
    1
}

fn default_lockout_threshold() -> i32 {
    5
}

fn default_lockout_window_secs() -> i64 {
    900
}

/// Load application configuration from `config.yaml` + environment overrides.
///
/// Environment variables prefixed with `IDP__` override file values, with nested keys
/// separated by double underscores (e.g. `IDP__HUB__ADMIN_URL`).
pub fn load_config() -> Result<AppConfig, ConfigError> {
    use config::{Config, Environment, File};
    let cfg = Config::builder()
        .add_source(File::with_name("config.yaml").required(false))
        .add_source(
            Environment::with_prefix("IDP")
                .prefix_separator("__")
                .separator("__"),
        )
        .build()?;

    let app: AppConfig = cfg.try_deserialize()?;
    app.validate()?;

    Ok(app)
}
