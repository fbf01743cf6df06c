//! Dispatch event decoding.
//!
//! Dispatch frames carry an event type (`t`) and a payload (`d`). The
//! decoder turns each known type into a [`DomainEvent`]; anything it does
//! not recognise, or cannot parse, becomes [`DomainEvent::Unknown`] so the
//! receive loop never stops on a bad payload.

use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::warn;

use bronze_core::{MessageIdentifier, Post, Reaction};

// =============================================================================
// Payloads
// =============================================================================

/// A message author or channel recipient.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Author {
    pub id: String,
    #[serde(default)]
    pub username: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MessageCreate {
    pub id: String,
    pub channel_id: String,
    #[serde(default)]
    pub guild_id: Option<String>,
    pub author: Author,
    #[serde(default)]
    pub content: String,
}

impl MessageCreate {
    /// Converts the payload into a plugin-facing post.
    pub fn into_post(self, is_private: bool) -> Post {
        Post {
            message_id: Some(MessageIdentifier::new(self.id, self.channel_id.clone())),
            user_id: self.author.id,
            user: self.author.username,
            channel_id: self.channel_id,
            content: self.content,
            is_private,
        }
    }
}

/// Edits only carry the fields that changed.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MessageUpdate {
    pub id: String,
    pub channel_id: String,
    #[serde(default)]
    pub author: Option<Author>,
    #[serde(default)]
    pub content: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MessageDelete {
    pub id: String,
    pub channel_id: String,
    #[serde(default)]
    pub guild_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Emoji {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ReactionPayload {
    pub user_id: String,
    pub channel_id: String,
    pub message_id: String,
    #[serde(default)]
    pub guild_id: Option<String>,
    pub emoji: Emoji,
}

impl From<ReactionPayload> for Reaction {
    fn from(payload: ReactionPayload) -> Self {
        Reaction {
            user_id: payload.user_id,
            channel_id: payload.channel_id,
            message_id: payload.message_id,
            emoji: payload
                .emoji
                .name
                .or(payload.emoji.id)
                .unwrap_or_default(),
            guild_id: payload.guild_id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ChannelCreate {
    pub id: String,
    #[serde(rename = "type", default)]
    pub kind: u8,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub recipients: Vec<Author>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GuildCreate {
    pub id: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PresenceUser {
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PresenceUpdate {
    pub user: PresenceUser,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub guild_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TypingStart {
    pub channel_id: String,
    pub user_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Ready {
    pub user: Author,
    #[serde(default)]
    pub session_id: Option<String>,
}

// =============================================================================
// Domain events
// =============================================================================

/// A decoded dispatch event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DomainEvent {
    MessageCreated(MessageCreate),
    MessageUpdated(MessageUpdate),
    MessageDeleted(MessageDelete),
    ReactionAdded(ReactionPayload),
    ReactionRemoved(ReactionPayload),
    ChannelCreated(ChannelCreate),
    GuildCreated(GuildCreate),
    PresenceChanged(PresenceUpdate),
    TypingStarted(TypingStart),
    /// The session is established; carries the bot's own identity.
    SessionReady(Ready),
    /// An event type this client does not act on, or one whose payload
    /// failed to decode.
    Unknown { event_type: String },
}

impl DomainEvent {
    /// Short name for logging.
    pub fn kind(&self) -> &str {
        match self {
            Self::MessageCreated(_) => "message_created",
            Self::MessageUpdated(_) => "message_updated",
            Self::MessageDeleted(_) => "message_deleted",
            Self::ReactionAdded(_) => "reaction_added",
            Self::ReactionRemoved(_) => "reaction_removed",
            Self::ChannelCreated(_) => "channel_created",
            Self::GuildCreated(_) => "guild_created",
            Self::PresenceChanged(_) => "presence_changed",
            Self::TypingStarted(_) => "typing_started",
            Self::SessionReady(_) => "session_ready",
            Self::Unknown { event_type } => event_type,
        }
    }
}

/// Decodes a dispatch payload by event type. Never fails.
pub fn decode_event(event_type: &str, data: &Value) -> DomainEvent {
    match event_type {
        "READY" => payload(event_type, data, DomainEvent::SessionReady),
        "MESSAGE_CREATE" => payload(event_type, data, DomainEvent::MessageCreated),
        "MESSAGE_UPDATE" => payload(event_type, data, DomainEvent::MessageUpdated),
        "MESSAGE_DELETE" => payload(event_type, data, DomainEvent::MessageDeleted),
        "MESSAGE_REACTION_ADD" => payload(event_type, data, DomainEvent::ReactionAdded),
        "MESSAGE_REACTION_REMOVE" => payload(event_type, data, DomainEvent::ReactionRemoved),
        "CHANNEL_CREATE" => payload(event_type, data, DomainEvent::ChannelCreated),
        "GUILD_CREATE" => payload(event_type, data, DomainEvent::GuildCreated),
        "PRESENCE_UPDATE" => payload(event_type, data, DomainEvent::PresenceChanged),
        "TYPING_START" => payload(event_type, data, DomainEvent::TypingStarted),
        other => DomainEvent::Unknown {
            event_type: other.to_string(),
        },
    }
}

fn payload<T, F>(event_type: &str, data: &Value, wrap: F) -> DomainEvent
where
    T: DeserializeOwned,
    F: FnOnce(T) -> DomainEvent,
{
    match T::deserialize(data) {
        Ok(value) => wrap(value),
        Err(e) => {
            warn!(event = %event_type, error = %e, "Failed to decode dispatch payload");
            DomainEvent::Unknown {
                event_type: event_type.to_string(),
            }
        }
    }
}
