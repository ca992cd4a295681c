use discord::models::Embed;
use serde::Serialize;

use crate::common::GuildMember;
use crate::domains::registration::models::RegistrationRecord;

/// Registration domain commands - intent for IO operations
///
/// Exactly one command is in flight at a time; each one is answered by a
/// single event from the effect.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RegistrationCommand {
    FetchMember {
        discord_id: String,
        role_id: String,
    },
    FindCandidates {
        gmail: String,
        discord_id: String,
        student_code: String,
    },
    GrantAccess {
        member: GuildMember,
        role_id: String,
    },
    SendWelcome {
        channel_id: String,
        embed: Embed,
    },
    NotifyUser {
        user_id: String,
        text: String,
    },
    InsertRecord {
        record: RegistrationRecord,
    },
}

impl RegistrationCommand {
    /// Short name used in logs and effect journals
    pub fn name(&self) -> &'static str {
        match self {
            Self::FetchMember { .. } => "fetch_member",
            Self::FindCandidates { .. } => "find_candidates",
            Self::GrantAccess { .. } => "grant_access",
            Self::SendWelcome { .. } => "send_welcome",
            Self::NotifyUser { .. } => "notify_user",
            Self::InsertRecord { .. } => "insert_record",
        }
    }
}
