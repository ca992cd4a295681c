// Common types used across multiple domains and layers
//
// These types are shared between the kernel and domain layers to avoid
// circular dependencies while keeping the collaborator traits typed.

use serde::{Deserialize, Serialize};

/// A live member of the guild, as resolved by the member directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuildMember {
    pub id: String,
    pub username: String,
    pub avatar_url: String,
    /// Role ids the member held when fetched
    pub role_ids: Vec<String>,
}

impl GuildMember {
    pub fn has_role(&self, role_id: &str) -> bool {
        self.role_ids.iter().any(|r| r == role_id)
    }

    /// Discord mention markup for this member
    pub fn mention(&self) -> String {
        format!("<@{}>", self.id)
    }
}

impl From<discord::models::GuildMember> for GuildMember {
    fn from(member: discord::models::GuildMember) -> Self {
        Self {
            avatar_url: member.user.display_avatar_url(),
            id: member.user.id,
            username: member.user.username,
            role_ids: member.roles,
        }
    }
}

/// The inbound webhook message a registration arrived on.
///
/// Acknowledgments (reactions, replies) are attached to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceMessage {
    pub channel_id: String,
    pub message_id: String,
}

/// Acknowledgment vocabulary attached to a processed source message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Signal {
    Success,
    AlreadyDone,
    SoftError,
    HardError,
    Suspicious,
}

impl Signal {
    /// Reaction emoji used to render the signal on the source message
    pub fn emoji(&self) -> &'static str {
        match self {
            Signal::Success => "👌",
            Signal::AlreadyDone => "🤔",
            Signal::SoftError => "⚠️",
            Signal::HardError => "❌",
            Signal::Suspicious => "🚨",
        }
    }
}
