// Main entry point for the registration webhook server

use std::sync::Arc;

use anyhow::{Context, Result};
use discord::{DiscordOptions, DiscordService};
use registrar_core::kernel::ServerDeps;
use registrar_core::server::{build_app, AppState};
use registrar_core::Config;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,registrar_core=debug,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting registrar");

    // Load configuration
    let config = Config::from_env().context("Failed to load configuration")?;
    tracing::info!(
        guild_id = %config.discord_guild_id,
        verified_role_id = %config.verified_role_id,
        "Configuration loaded"
    );

    // Connect to database
    tracing::info!("Connecting to database...");
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.database_url)
        .await
        .context("Failed to connect to database")?;
    tracing::info!("Database connected");

    // Run migrations
    tracing::info!("Running database migrations...");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("Failed to run migrations")?;
    tracing::info!("Migrations complete");

    let discord = Arc::new(DiscordService::new(DiscordOptions {
        bot_token: config.discord_bot_token.clone(),
        guild_id: config.discord_guild_id.clone(),
    }));
    let deps = Arc::new(ServerDeps::production(discord, pool));

    let app = build_app(AppState::new(
        deps,
        config.registration(),
        &config.registration_marker,
    ));

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("Starting server on {}", addr);
    tracing::info!("Health check: http://localhost:{}/health", config.port);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
