// Trait definitions for dependency injection
//
// These are INFRASTRUCTURE traits only - no business logic.
// The registration machine decides; effects call these collaborators.
//
// Each operation fails with its own closed error enum so call sites match
// every failure explicitly.
//
// Naming convention: Base* for trait names (e.g., BaseMemberDirectory)

use async_trait::async_trait;
use discord::models::Embed;
use thiserror::Error;

use crate::common::{GuildMember, Signal, SourceMessage};
use crate::domains::registration::models::RegistrationRecord;

// =============================================================================
// Collaborator errors
// =============================================================================

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MemberFetchError {
    #[error("member not found: {0}")]
    NotFound(String),

    #[error("member lookup failed: {0}")]
    Transport(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GrantAccessError {
    #[error("missing permissions: {0}")]
    Permission(String),

    #[error("member or role not found: {0}")]
    NotFound(String),

    #[error("role grant request failed: {0}")]
    Transport(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LookupError {
    #[error("candidate lookup failed: {0}")]
    Transport(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InsertError {
    #[error("duplicate registration: {0}")]
    DuplicateKey(String),

    #[error("insert failed: {0}")]
    Transport(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeliveryError {
    #[error("channel not found: {0}")]
    ChannelNotFound(String),

    #[error("recipient unreachable: {0}")]
    Unreachable(String),

    #[error("delivery failed: {0}")]
    Transport(String),
}

// =============================================================================
// Member Directory Trait (Infrastructure - guild membership)
// =============================================================================

#[async_trait]
pub trait BaseMemberDirectory: Send + Sync {
    /// Resolve a platform user id to a live guild member
    async fn fetch_member(&self, discord_id: &str) -> Result<GuildMember, MemberFetchError>;

    /// Give the member the role
    async fn grant_access(&self, member: &GuildMember, role_id: &str)
        -> Result<(), GrantAccessError>;

    /// Whether the member held the role when it was fetched
    fn has_access(&self, member: &GuildMember, role_id: &str) -> bool {
        member.has_role(role_id)
    }
}

// =============================================================================
// Record Store Trait (Infrastructure - registration persistence)
// =============================================================================

#[async_trait]
pub trait BaseRecordStore: Send + Sync {
    /// Records sharing gmail, discord id or student code, in insertion order
    async fn find_candidates(
        &self,
        gmail: &str,
        discord_id: &str,
        student_code: &str,
    ) -> Result<Vec<RegistrationRecord>, LookupError>;

    /// Persist the record; the returned copy carries its creation time
    async fn insert(&self, record: &RegistrationRecord) -> Result<RegistrationRecord, InsertError>;

    /// Connectivity check for the health endpoint
    async fn ping(&self) -> Result<(), LookupError> {
        Ok(())
    }
}

// =============================================================================
// Messenger Trait (Infrastructure - notifications and acknowledgments)
// =============================================================================

#[async_trait]
pub trait BaseMessenger: Send + Sync {
    /// Post an embed to a guild channel
    async fn send_channel_embed(&self, channel_id: &str, embed: Embed)
        -> Result<(), DeliveryError>;

    /// Direct message a user
    async fn send_direct_message(&self, user_id: &str, text: &str) -> Result<(), DeliveryError>;

    /// React to the source message with the signal
    async fn acknowledge(&self, source: &SourceMessage, signal: Signal)
        -> Result<(), DeliveryError>;

    /// Add an arbitrary reaction to the source message
    async fn react(&self, source: &SourceMessage, emoji: &str) -> Result<(), DeliveryError>;

    /// Reply to the source message
    async fn reply(
        &self,
        source: &SourceMessage,
        text: Option<&str>,
        embeds: Vec<Embed>,
    ) -> Result<(), DeliveryError>;
}
