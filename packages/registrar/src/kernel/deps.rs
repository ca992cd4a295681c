//! Server dependencies for effects (using traits for testability)
//!
//! This module provides the dependency container used by the registration
//! effects, plus the production adapters behind each trait.

use async_trait::async_trait;
use discord::models::{CreateMessage, Embed, MessageReference};
use discord::{DiscordError, DiscordService, CANNOT_MESSAGE_USER};
use sqlx::PgPool;
use std::sync::Arc;
use tracing::warn;

use crate::common::{GuildMember, Signal, SourceMessage};
use crate::domains::registration::models::RegistrationRecord;
use crate::kernel::{
    BaseMemberDirectory, BaseMessenger, BaseRecordStore, DeliveryError, GrantAccessError,
    InsertError, LookupError, MemberFetchError,
};

// =============================================================================
// DiscordService Adapter (implements BaseMemberDirectory + BaseMessenger)
// =============================================================================

/// Wrapper around DiscordService that implements the directory and messenger traits
pub struct DiscordAdapter(pub Arc<DiscordService>);

impl DiscordAdapter {
    pub fn new(service: Arc<DiscordService>) -> Self {
        Self(service)
    }
}

fn delivery_error(target: &str, error: DiscordError) -> DeliveryError {
    match &error {
        DiscordError::Api {
            code: CANNOT_MESSAGE_USER,
            ..
        } => DeliveryError::Unreachable(format!("{}: {}", target, error)),
        DiscordError::Api { status: 404, .. } => {
            DeliveryError::ChannelNotFound(format!("{}: {}", target, error))
        }
        DiscordError::Api { .. } | DiscordError::Transport(_) | DiscordError::Decode(_) => {
            DeliveryError::Transport(error.to_string())
        }
    }
}

#[async_trait]
impl BaseMemberDirectory for DiscordAdapter {
    async fn fetch_member(&self, discord_id: &str) -> Result<GuildMember, MemberFetchError> {
        self.0
            .fetch_member(discord_id)
            .await
            .map(GuildMember::from)
            .map_err(|e| {
                if e.is_not_found() {
                    MemberFetchError::NotFound(e.to_string())
                } else {
                    MemberFetchError::Transport(e.to_string())
                }
            })
    }

    async fn grant_access(
        &self,
        member: &GuildMember,
        role_id: &str,
    ) -> Result<(), GrantAccessError> {
        self.0
            .add_member_role(&member.id, role_id)
            .await
            .map_err(|e| {
                if e.is_missing_permissions() {
                    GrantAccessError::Permission(e.to_string())
                } else if e.is_not_found() {
                    GrantAccessError::NotFound(e.to_string())
                } else {
                    GrantAccessError::Transport(e.to_string())
                }
            })
    }
}

#[async_trait]
impl BaseMessenger for DiscordAdapter {
    async fn send_channel_embed(
        &self,
        channel_id: &str,
        embed: Embed,
    ) -> Result<(), DeliveryError> {
        let message = self
            .0
            .send_embed(channel_id, embed)
            .await
            .map_err(|e| delivery_error(channel_id, e))?;

        // Greeting reaction on the welcome post; losing it is harmless
        if let Err(e) = self
            .0
            .create_reaction(&message.channel_id, &message.id, "👋")
            .await
        {
            warn!(channel_id = %channel_id, error = %e, "Failed to react to welcome message");
        }

        Ok(())
    }

    async fn send_direct_message(&self, user_id: &str, text: &str) -> Result<(), DeliveryError> {
        self.0
            .send_direct_message(user_id, text)
            .await
            .map(|_| ())
            .map_err(|e| delivery_error(user_id, e))
    }

    async fn acknowledge(
        &self,
        source: &SourceMessage,
        signal: Signal,
    ) -> Result<(), DeliveryError> {
        self.0
            .create_reaction(&source.channel_id, &source.message_id, signal.emoji())
            .await
            .map_err(|e| delivery_error(&source.message_id, e))
    }

    async fn react(&self, source: &SourceMessage, emoji: &str) -> Result<(), DeliveryError> {
        self.0
            .create_reaction(&source.channel_id, &source.message_id, emoji)
            .await
            .map_err(|e| delivery_error(&source.message_id, e))
    }

    async fn reply(
        &self,
        source: &SourceMessage,
        text: Option<&str>,
        embeds: Vec<Embed>,
    ) -> Result<(), DeliveryError> {
        let message = CreateMessage {
            content: text.map(str::to_string),
            embeds,
            message_reference: Some(MessageReference {
                message_id: source.message_id.clone(),
            }),
        };

        self.0
            .create_message(&source.channel_id, &message)
            .await
            .map(|_| ())
            .map_err(|e| delivery_error(&source.channel_id, e))
    }
}

// =============================================================================
// Postgres Record Store (implements BaseRecordStore)
// =============================================================================

pub struct PostgresRecordStore {
    pool: PgPool,
}

impl PostgresRecordStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BaseRecordStore for PostgresRecordStore {
    async fn find_candidates(
        &self,
        gmail: &str,
        discord_id: &str,
        student_code: &str,
    ) -> Result<Vec<RegistrationRecord>, LookupError> {
        RegistrationRecord::find_candidates(gmail, discord_id, student_code, &self.pool)
            .await
            .map_err(|e| LookupError::Transport(e.to_string()))
    }

    async fn insert(&self, record: &RegistrationRecord) -> Result<RegistrationRecord, InsertError> {
        record.insert(&self.pool).await.map_err(|e| match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                InsertError::DuplicateKey(db.message().to_string())
            }
            _ => InsertError::Transport(e.to_string()),
        })
    }

    async fn ping(&self) -> Result<(), LookupError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map(|_| ())
            .map_err(|e| LookupError::Transport(e.to_string()))
    }
}

// =============================================================================
// ServerDeps
// =============================================================================

/// Server dependencies accessible to effects (using traits for testability)
#[derive(Clone)]
pub struct ServerDeps {
    pub directory: Arc<dyn BaseMemberDirectory>,
    pub store: Arc<dyn BaseRecordStore>,
    pub messenger: Arc<dyn BaseMessenger>,
}

impl ServerDeps {
    pub fn new(
        directory: Arc<dyn BaseMemberDirectory>,
        store: Arc<dyn BaseRecordStore>,
        messenger: Arc<dyn BaseMessenger>,
    ) -> Self {
        Self {
            directory,
            store,
            messenger,
        }
    }

    /// Production wiring: Discord for members and messages, Postgres for records
    pub fn production(discord: Arc<DiscordService>, pool: PgPool) -> Self {
        let adapter = Arc::new(DiscordAdapter::new(discord));
        Self {
            directory: adapter.clone(),
            store: Arc::new(PostgresRecordStore::new(pool)),
            messenger: adapter,
        }
    }
}
