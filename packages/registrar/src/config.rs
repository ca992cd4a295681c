use anyhow::{Context, Result};
use dotenvy::dotenv;
use std::env;

/// Marker content the registration webhook posts alongside the form embed
pub const DEFAULT_REGISTRATION_MARKER: &str = "`DEV:#!fisibot/registrations`";

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub discord_bot_token: String,
    pub discord_guild_id: String,
    pub verified_role_id: String,
    pub welcome_channel_id: String,
    pub registration_marker: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        Ok(Self {
            database_url: env::var("DATABASE_URL").context("DATABASE_URL must be set")?,
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .context("PORT must be a valid number")?,
            discord_bot_token: env::var("DISCORD_BOT_TOKEN")
                .context("DISCORD_BOT_TOKEN must be set")?,
            discord_guild_id: env::var("DISCORD_GUILD_ID")
                .context("DISCORD_GUILD_ID must be set")?,
            verified_role_id: env::var("VERIFIED_ROLE_ID")
                .context("VERIFIED_ROLE_ID must be set")?,
            welcome_channel_id: env::var("WELCOME_CHANNEL_ID")
                .context("WELCOME_CHANNEL_ID must be set")?,
            registration_marker: env::var("REGISTRATION_MARKER")
                .unwrap_or_else(|_| DEFAULT_REGISTRATION_MARKER.to_string()),
        })
    }

    /// The slice of configuration the registration workflow depends on
    pub fn registration(&self) -> RegistrationConfig {
        RegistrationConfig {
            verified_role_id: self.verified_role_id.clone(),
            welcome_channel_id: self.welcome_channel_id.clone(),
        }
    }
}

/// Guild identifiers the registration workflow acts on.
///
/// Passed in at construction so the workflow never reads process state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrationConfig {
    pub verified_role_id: String,
    pub welcome_channel_id: String,
}
