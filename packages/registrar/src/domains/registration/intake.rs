//! Registration intake - relayed webhook message to validated record
//!
//! The registration form posts through a webhook: a marker line as content
//! and the answers as fields of the first embed.

use discord::models::Embed;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::models::RegistrationRecord;
use crate::common::SourceMessage;

/// Webhook message as relayed by the gateway forwarder
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundMessage {
    pub id: String,
    pub channel_id: String,
    #[serde(default)]
    pub webhook_id: Option<String>,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub embeds: Vec<Embed>,
}

impl InboundMessage {
    pub fn source(&self) -> SourceMessage {
        SourceMessage {
            channel_id: self.channel_id.clone(),
            message_id: self.id.clone(),
        }
    }

    /// Only webhook posts carrying the marker are registrations
    pub fn is_registration(&self, marker: &str) -> bool {
        self.webhook_id.is_some() && self.content.trim() == marker
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IntakeError {
    #[error("message has no embed with the form answers")]
    MissingEmbed,

    #[error("missing field `{0}`")]
    MissingField(&'static str),

    #[error("base must be an integer, got `{0}`")]
    InvalidBase(String),
}

/// Field names compare case-insensitively, ignoring spaces and underscores
fn normalize_name(name: &str) -> String {
    name.chars()
        .filter(|c| !c.is_whitespace() && *c != '_')
        .flat_map(char::to_lowercase)
        .collect()
}

fn clean_value(value: &str) -> String {
    value.trim().trim_matches('`').trim().to_string()
}

fn field(embed: &Embed, key: &'static str) -> Result<String, IntakeError> {
    embed
        .fields
        .iter()
        .find(|f| normalize_name(&f.name) == key)
        .map(|f| clean_value(&f.value))
        .filter(|v| !v.is_empty())
        .ok_or(IntakeError::MissingField(key))
}

/// Build a record from the first embed's fields, coercing `base` to an integer
pub fn parse_registration(message: &InboundMessage) -> Result<RegistrationRecord, IntakeError> {
    let embed = message.embeds.first().ok_or(IntakeError::MissingEmbed)?;

    let base_raw = field(embed, "base")?;
    let base = base_raw
        .parse::<i32>()
        .map_err(|_| IntakeError::InvalidBase(base_raw.clone()))?;

    Ok(RegistrationRecord::new(
        field(embed, "discordid")?,
        field(embed, "studentcode")?,
        field(embed, "gmail")?,
        field(embed, "fullname")?,
        base,
    ))
}
