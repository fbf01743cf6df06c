//! Channels and guilds announced by the gateway.

use std::collections::HashMap;

use crate::event::{ChannelCreate, GuildCreate};

/// A channel seen in a CHANNEL_CREATE event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KnownChannel {
    pub id: String,
    pub name: Option<String>,
    pub recipient_count: usize,
}

impl KnownChannel {
    /// Exactly one recipient marks a direct conversation with the bot.
    pub fn is_private(&self) -> bool {
        self.recipient_count == 1
    }
}

/// Lookup tables filled from dispatch events.
///
/// Survives reconnects: the gateway re-announces guilds after identify, and
/// direct channels stay valid across sessions.
#[derive(Debug, Default)]
pub struct Registry {
    channels: HashMap<String, KnownChannel>,
    guilds: HashMap<String, String>,
    guild_ids: HashMap<String, String>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_channel(&mut self, channel: &ChannelCreate) {
        self.channels.insert(
            channel.id.clone(),
            KnownChannel {
                id: channel.id.clone(),
                name: channel.name.clone(),
                recipient_count: channel.recipients.len(),
            },
        );
    }

    pub fn add_guild(&mut self, guild: &GuildCreate) {
        if let Some(previous) = self.guilds.insert(guild.id.clone(), guild.name.clone()) {
            self.guild_ids.remove(&previous);
        }
        self.guild_ids.insert(guild.name.clone(), guild.id.clone());
    }

    pub fn channel(&self, id: &str) -> Option<&KnownChannel> {
        self.channels.get(id)
    }

    /// Whether `channel_id` is a known direct conversation.
    ///
    /// Unknown channels are treated as public.
    pub fn is_private(&self, channel_id: &str) -> bool {
        self.channel(channel_id).is_some_and(KnownChannel::is_private)
    }

    pub fn guild_name(&self, id: &str) -> Option<&str> {
        self.guilds.get(id).map(String::as_str)
    }

    pub fn guild_id(&self, name: &str) -> Option<&str> {
        self.guild_ids.get(name).map(String::as_str)
    }

    pub fn guild_count(&self) -> usize {
        self.guilds.len()
    }
}
