//! Prefix command parsing and routing.
//!
//! A post is a command when its first space-delimited token starts with the
//! call prefix:
//!
//! ```text
//! "!roll   2d6 + 1 "
//!  ├────┘  └──────┘
//!  name    content = "2d6 + 1"   (rest of the text, trimmed)
//! ```
//!
//! Every command name maps to exactly one [`CommandReceiver`]; registering a
//! name again replaces the previous receiver. The name `help` is reserved and
//! answered by the dispatcher itself.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::{debug, trace, warn};

use bronze_core::{HookResult, Post};

use crate::error::{CommandError, CommandResult};

/// Prefix used when none is configured.
pub const DEFAULT_CALL_PREFIX: &str = "!";

/// Reserved command answered with the command listing.
pub const HELP_COMMAND: &str = "help";

const MODS_NOTE: &str = "Note: Some of them are only available for mods.";

/// Something that handles registered commands.
#[async_trait]
pub trait CommandReceiver: Send + Sync {
    /// Identity used when logging this receiver's failures.
    fn name(&self) -> &str {
        "anonymous"
    }

    /// Called with the command name (without prefix), the trimmed content
    /// after it and the originating post.
    async fn on_command(&self, command: &str, content: &str, post: Post) -> HookResult;
}

/// A command recognised in a post.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCommand {
    pub name: String,
    pub content: String,
}

/// What [`CommandDispatcher::dispatch`] did with a post.
#[derive(Debug)]
pub enum Dispatch {
    /// The post is not command-shaped.
    NotACommand,
    /// The post asked for help; the listing should be posted back.
    Help(String),
    /// No receiver is registered for this name.
    Unknown(String),
    /// A receiver ran.
    Handled {
        command: String,
        receiver: String,
        result: HookResult,
    },
}

/// Maps command names to receivers and routes command posts.
pub struct CommandDispatcher {
    prefix: String,
    receivers: RwLock<HashMap<String, Arc<dyn CommandReceiver>>>,
}

impl CommandDispatcher {
    /// Creates a dispatcher. An empty prefix falls back to
    /// [`DEFAULT_CALL_PREFIX`].
    pub fn new(prefix: impl Into<String>) -> Self {
        let mut prefix = prefix.into();
        if prefix.is_empty() {
            prefix = DEFAULT_CALL_PREFIX.to_string();
        }
        Self {
            prefix,
            receivers: RwLock::new(HashMap::new()),
        }
    }

    /// The configured call prefix.
    pub fn call_prefix(&self) -> &str {
        &self.prefix
    }

    /// Registers `receiver` for `command`, replacing any previous receiver.
    pub fn register(
        &self,
        command: impl Into<String>,
        receiver: Arc<dyn CommandReceiver>,
    ) -> CommandResult<()> {
        let command = command.into();
        if command.is_empty() {
            warn!("Refusing to register an empty command name");
            return Err(CommandError::EmptyName);
        }

        if self
            .receivers
            .write()
            .insert(command.clone(), receiver)
            .is_some()
        {
            debug!(command = %command, "Command receiver replaced");
        } else {
            debug!(command = %command, "Command registered");
        }
        Ok(())
    }

    /// Removes the receiver for `command`. Unknown names are ignored.
    pub fn unregister(&self, command: &str) {
        if self.receivers.write().remove(command).is_some() {
            debug!(command = %command, "Command unregistered");
        }
    }

    /// Whether a receiver is registered for `command`.
    pub fn is_registered(&self, command: &str) -> bool {
        self.receivers.read().contains_key(command)
    }

    /// Registered command names, sorted.
    pub fn commands(&self) -> Vec<String> {
        let mut names: Vec<String> = self.receivers.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Splits a post text into command name and content.
    pub fn parse(&self, text: &str) -> Option<ParsedCommand> {
        if text.len() < 2 {
            return None;
        }

        let (head, rest) = text.split_once(' ').unwrap_or((text, ""));
        let name = head.strip_prefix(self.prefix.as_str())?;

        Some(ParsedCommand {
            name: name.to_string(),
            content: rest.trim().to_string(),
        })
    }

    /// The reply to `<prefix>help`.
    pub fn help_text(&self) -> String {
        let commands = self.commands();
        let listing = if commands.is_empty() {
            "none".to_string()
        } else {
            commands
                .iter()
                .map(|name| format!("{}{}", self.prefix, name))
                .collect::<Vec<_>>()
                .join(", ")
        };
        format!("The following commands are available: {listing}\n{MODS_NOTE}")
    }

    /// Routes `post` to the receiver of its command, if any.
    pub async fn dispatch(&self, post: &Post) -> Dispatch {
        let Some(parsed) = self.parse(&post.content) else {
            return Dispatch::NotACommand;
        };

        if parsed.name == HELP_COMMAND {
            return Dispatch::Help(self.help_text());
        }

        let receiver = self.receivers.read().get(&parsed.name).cloned();
        match receiver {
            Some(receiver) => {
                trace!(command = %parsed.name, "Dispatching command");
                let result = receiver
                    .on_command(&parsed.name, &parsed.content, post.clone())
                    .await;
                Dispatch::Handled {
                    command: parsed.name,
                    receiver: receiver.name().to_string(),
                    result,
                }
            }
            None => {
                trace!(command = %parsed.name, "No receiver for command");
                Dispatch::Unknown(parsed.name)
            }
        }
    }
}

impl Default for CommandDispatcher {
    fn default() -> Self {
        Self::new(DEFAULT_CALL_PREFIX)
    }
}

impl std::fmt::Debug for CommandDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandDispatcher")
            .field("prefix", &self.prefix)
            .field("commands", &self.commands())
            .finish()
    }
}
