use anyhow::{Context, Result};
use chrono::Duration;
use language_otp_service::api::{self, AppState};
use language_otp_service::config::Config;
use language_otp_service::coordinator::LanguageChangeCoordinator;
use language_otp_service::language::ChannelResolver;
use language_otp_service::notify::LogNotificationSender;
use language_otp_service::store::InMemoryUserStore;
use std::sync::Arc;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file (ignored in production)
    let _ = dotenvy::dotenv();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("language_otp_service=info".parse()?),
        )
        .init();

    info!("Starting language OTP service");

    // Load configuration from environment
    let config = Config::from_env()?;

    if config.expose_otp_in_response {
        warn!("EXPOSE_OTP_IN_RESPONSE is set: issued codes are returned to the caller");
    }

    let store = Arc::new(InMemoryUserStore::with_records([config.demo_user.to_record()]));
    info!(
        "Seeded user {} with language '{}'",
        config.demo_user.id, config.demo_user.preferred_language
    );

    let resolver = ChannelResolver::new(
        config.email_languages.iter().cloned(),
        config.mobile_languages.iter().cloned(),
    );
    info!(
        "Email-verified languages: {:?}, mobile-verified languages: {:?}",
        config.email_languages, config.mobile_languages
    );

    let sender = Arc::new(LogNotificationSender);
    let otp_ttl = Duration::try_seconds(config.otp_ttl_secs)
        .with_context(|| format!("OTP_TTL_SECONDS out of range: {}", config.otp_ttl_secs))?;
    let coordinator = LanguageChangeCoordinator::new(store, resolver, sender).with_otp_ttl(otp_ttl);

    let state = AppState::new(Arc::new(coordinator))
        .with_exposed_otp(config.expose_otp_in_response);
    let app = api::app(state, &config.allowed_origins)?;

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!("✓ Backend server running on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
