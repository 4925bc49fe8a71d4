//! Identity provider for a Hydra-style OAuth2/OpenID Connect hub.
//!
//! The hub owns sessions and token issuance; this crate renders the login, consent and
//! logout pages it redirects browsers to, checks credentials against a local account
//! store and answers each challenge through the hub's admin API.

use std::sync::Arc;

use sea_orm::DatabaseConnection;

use crate::config::AppConfig;
use crate::email::Mailer;

pub mod api;
pub mod claims;
pub mod config;
pub mod email;
pub mod entity;
pub mod error;
pub mod flows;
pub mod hub;
pub mod identity;
pub mod logging;
pub mod store;
pub mod token;

/// Process-wide resources, created once in `main`.
#[derive(Clone)]
pub struct AppResources {
    pub db: Arc<DatabaseConnection>,
    pub mailer: Arc<Mailer>,
    pub config: Arc<AppConfig>,
}
