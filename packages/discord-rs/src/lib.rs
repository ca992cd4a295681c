// https://discord.com/developers/docs/reference

pub mod models;

use reqwest::{header, Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::models::{ApiErrorBody, Channel, CreateMessage, Embed, GuildMember, Message};

const API_BASE: &str = "https://discord.com/api/v10";

/// JSON error code for "Unknown Member"
pub const UNKNOWN_MEMBER: u64 = 10007;
/// JSON error code for "Missing Permissions"
pub const MISSING_PERMISSIONS: u64 = 50013;
/// JSON error code for "Cannot send messages to this user"
pub const CANNOT_MESSAGE_USER: u64 = 50007;

#[derive(Error, Debug)]
pub enum DiscordError {
    #[error("Discord API error {status} (code {code}): {message}")]
    Api {
        status: u16,
        code: u64,
        message: String,
    },

    #[error("Request to Discord failed: {0}")]
    Transport(String),

    #[error("Failed to parse Discord response: {0}")]
    Decode(String),
}

impl DiscordError {
    /// Build an API error from a non-2xx status and its raw body.
    ///
    /// Bodies that are not Discord's `{code, message}` shape keep the raw text.
    pub fn from_response_parts(status: u16, body: &str) -> Self {
        match serde_json::from_str::<ApiErrorBody>(body) {
            Ok(parsed) => DiscordError::Api {
                status,
                code: parsed.code,
                message: parsed.message,
            },
            Err(_) => DiscordError::Api {
                status,
                code: 0,
                message: body.to_string(),
            },
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, DiscordError::Api { status: 404, .. })
    }

    pub fn is_missing_permissions(&self) -> bool {
        matches!(
            self,
            DiscordError::Api { status: 403, .. }
                | DiscordError::Api {
                    code: MISSING_PERMISSIONS,
                    ..
                }
        )
    }
}

#[derive(Debug, Clone)]
pub struct DiscordOptions {
    pub bot_token: String,
    pub guild_id: String,
}

#[derive(Debug, Clone)]
pub struct DiscordService {
    options: DiscordOptions,
    client: Client,
}

impl DiscordService {
    pub fn new(options: DiscordOptions) -> Self {
        Self {
            options,
            client: Client::new(),
        }
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client
            .request(method, format!("{}{}", API_BASE, path))
            .header(
                header::AUTHORIZATION,
                format!("Bot {}", self.options.bot_token),
            )
    }

    async fn send(&self, builder: RequestBuilder) -> Result<Response, DiscordError> {
        let response = builder
            .send()
            .await
            .map_err(|e| DiscordError::Transport(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(DiscordError::from_response_parts(status.as_u16(), &body))
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        builder: RequestBuilder,
    ) -> Result<T, DiscordError> {
        self.send(builder)
            .await?
            .json::<T>()
            .await
            .map_err(|e| DiscordError::Decode(e.to_string()))
    }

    /// `GET /guilds/{guild.id}/members/{user.id}`
    pub async fn fetch_member(&self, user_id: &str) -> Result<GuildMember, DiscordError> {
        let path = format!("/guilds/{}/members/{}", self.options.guild_id, user_id);
        self.send_json(self.request(Method::GET, &path)).await
    }

    /// `PUT /guilds/{guild.id}/members/{user.id}/roles/{role.id}`
    pub async fn add_member_role(&self, user_id: &str, role_id: &str) -> Result<(), DiscordError> {
        let path = format!(
            "/guilds/{}/members/{}/roles/{}",
            self.options.guild_id, user_id, role_id
        );
        self.send(
            self.request(Method::PUT, &path)
                .header(header::CONTENT_LENGTH, 0),
        )
        .await
        .map(|_| ())
    }

    /// `POST /channels/{channel.id}/messages`
    pub async fn create_message(
        &self,
        channel_id: &str,
        message: &CreateMessage,
    ) -> Result<Message, DiscordError> {
        let path = format!("/channels/{}/messages", channel_id);
        self.send_json(self.request(Method::POST, &path).json(message))
            .await
    }

    pub async fn send_embed(&self, channel_id: &str, embed: Embed) -> Result<Message, DiscordError> {
        let message = CreateMessage {
            embeds: vec![embed],
            ..Default::default()
        };
        self.create_message(channel_id, &message).await
    }

    /// `POST /users/@me/channels`
    pub async fn create_dm(&self, recipient_id: &str) -> Result<Channel, DiscordError> {
        let body = serde_json::json!({ "recipient_id": recipient_id });
        self.send_json(self.request(Method::POST, "/users/@me/channels").json(&body))
            .await
    }

    /// Opens (or reuses) the DM channel and posts `content` to it
    pub async fn send_direct_message(
        &self,
        recipient_id: &str,
        content: &str,
    ) -> Result<Message, DiscordError> {
        let channel = self.create_dm(recipient_id).await?;
        let message = CreateMessage {
            content: Some(content.to_string()),
            ..Default::default()
        };
        self.create_message(&channel.id, &message).await
    }

    /// `PUT /channels/{channel.id}/messages/{message.id}/reactions/{emoji}/@me`
    pub async fn create_reaction(
        &self,
        channel_id: &str,
        message_id: &str,
        emoji: &str,
    ) -> Result<(), DiscordError> {
        let path = format!(
            "/channels/{}/messages/{}/reactions/{}/@me",
            channel_id,
            message_id,
            urlencoding::encode(emoji)
        );
        self.send(
            self.request(Method::PUT, &path)
                .header(header::CONTENT_LENGTH, 0),
        )
        .await
        .map(|_| ())
    }
}
