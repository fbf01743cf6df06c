//! Platform-neutral values exchanged with plugins.

use serde::{Deserialize, Serialize};

/// Identifies a message previously created on a platform.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageIdentifier {
    /// Platform message id.
    pub id: String,
    /// Channel the message lives in.
    pub channel: String,
}

impl MessageIdentifier {
    pub fn new(id: impl Into<String>, channel: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            channel: channel.into(),
        }
    }
}

/// A user known to the platform.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub name: String,
}

/// A channel known to the platform.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channel {
    pub id: String,
    pub name: String,
    /// Number of direct recipients; `1` marks a private conversation.
    #[serde(default)]
    pub recipient_count: usize,
}

/// A message, either received from the gateway or about to be sent.
///
/// Every plugin receives its own copy.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    /// Author id.
    pub user_id: String,
    /// Author display name.
    pub user: String,
    /// Channel the post was seen in (or should go to).
    pub channel_id: String,
    /// Message text.
    pub content: String,
    /// Whether the post came through a private (one recipient) channel.
    pub is_private: bool,
    /// Platform identifier, when the platform supplied one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_id: Option<MessageIdentifier>,
}

impl Post {
    /// Creates an outbound post for a channel.
    pub fn new(channel_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            channel_id: channel_id.into(),
            content: content.into(),
            ..Default::default()
        }
    }

    /// Builds a post answering this one in the same channel.
    pub fn reply(&self, content: impl Into<String>) -> Self {
        Self {
            channel_id: self.channel_id.clone(),
            content: content.into(),
            is_private: self.is_private,
            ..Default::default()
        }
    }
}

/// Result of a create/update/delete call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostResponse {
    pub post_id: MessageIdentifier,
}

/// A reaction added to or removed from a message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reaction {
    pub user_id: String,
    pub channel_id: String,
    pub message_id: String,
    /// Emoji name (unicode or custom emoji name).
    pub emoji: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guild_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reply_keeps_channel_and_privacy() {
        let incoming = Post {
            user_id: "42".into(),
            user: "alice".into(),
            channel_id: "dm-1".into(),
            content: "!echo hi".into(),
            is_private: true,
            message_id: Some(MessageIdentifier::new("m1", "dm-1")),
        };

        let reply = incoming.reply("hi");
        assert_eq!(reply.channel_id, "dm-1");
        assert!(reply.is_private);
        assert_eq!(reply.content, "hi");
        assert!(reply.user_id.is_empty());
        assert!(reply.message_id.is_none());
    }
}
