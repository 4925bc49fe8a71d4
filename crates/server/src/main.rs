use idp_bridge::AppResources;
use idp_bridge::api::start_webserver;
use idp_bridge::config::load_config;
use idp_bridge::flows::FlowState;
use lettre::{AsyncSmtpTransport, Tokio1Executor, transport::smtp::authentication::Credentials};
use rustls::crypto;
use rustls::crypto::CryptoProvider;
use sea_orm::Database;
use std::sync::Arc;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

fn initialize_tracing() {
    let default_directives = "idp_bridge=info,tower_http=info,sea_orm=warn";
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directives));

    let registry = tracing_subscriber::registry().with(env_filter);
    let layer = fmt::layer().with_target(true).with_level(true);

    registry.with(layer).init();
}

#[tokio::main]
async fn main() -> color_eyre::eyre::Result<()> {
    color_eyre::install()?;
    // A missing .env file is fine; real deployments use the environment directly.
    let _ = dotenvy::dotenv();

    initialize_tracing();

    let config = Arc::new(load_config()?);
    tracing::info!(
        environment = ?config.environment,
        hub = %config.hub.admin_url,
        public_url = %config.public_url,
        "configuration loaded"
    );

    CryptoProvider::install_default(crypto::ring::default_provider())
        .map_err(|_| color_eyre::eyre::eyre!("Failed to install crypto provider"))?;

    // Set up SeaORM database connection
    let db = Arc::new(Database::connect(&config.database_url).await?);

    // Set up lettre SMTP client
    let creds = Credentials::new(config.smtp.username.clone(), config.smtp.password.clone());
    let mailer = Arc::new(
        AsyncSmtpTransport::<Tokio1Executor>::relay(&config.smtp.server)?
            .port(config.smtp.port)
            .credentials(creds)
            .build(),
    );

    let resources = AppResources { db, mailer, config };
    let state = FlowState::new(&resources)?;

    start_webserver(state, &resources.config.listen_addr).await
}
