use std::sync::{Arc, Mutex};

use tracing_subscriber::EnvFilter;

use photobooking::config::AppConfig;
use photobooking::db;
use photobooking::services::mailer::mailgun::MailgunMailer;
use photobooking::services::mailer::{Mailer, NoopMailer};
use photobooking::services::payments::stripe::StripeProvider;
use photobooking::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = AppConfig::from_env();

    let conn = db::init_db(&config.database_url)?;

    let mailer: Box<dyn Mailer> = if config.mailgun_api_key.is_empty() {
        tracing::warn!("MAILGUN_API_KEY not set, emails are disabled");
        Box::new(NoopMailer)
    } else {
        Box::new(MailgunMailer::new(
            config.mailgun_domain.clone(),
            config.mailgun_api_key.clone(),
            config.email_from.clone(),
        ))
    };

    anyhow::ensure!(
        !config.stripe_secret_key.is_empty(),
        "STRIPE_SECRET_KEY must be set"
    );
    let payments = StripeProvider::new(config.stripe_secret_key.clone(), &config.client_url);

    let state = Arc::new(AppState {
        db: Arc::new(Mutex::new(conn)),
        config: config.clone(),
        mailer,
        payments: Box::new(payments),
    });

    let app = photobooking::app(state);

    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("starting server on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
