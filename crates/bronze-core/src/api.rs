//! Outbound chat API and gateway discovery.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::ApiResult;
use crate::model::{Channel, MessageIdentifier, Post, PostResponse, User};

/// Outbound actions available to plugins.
///
/// Implemented by platform REST clients. Plugins reach it through their
/// `PluginApi` handle, never directly through the gateway connection.
#[async_trait]
pub trait ChatApi: Send + Sync {
    /// Creates a post in `post.channel_id`.
    async fn create_post(&self, post: Post) -> ApiResult<PostResponse>;

    /// Replaces the content of a previously created post.
    async fn update_post(&self, id: &MessageIdentifier, post: Post) -> ApiResult<PostResponse>;

    /// Deletes a previously created post.
    async fn delete_post(&self, id: &MessageIdentifier) -> ApiResult<PostResponse>;

    /// Looks up a user by id.
    async fn get_user(&self, user_id: &str) -> ApiResult<User>;

    /// Looks up a channel by id.
    async fn get_channel(&self, channel_id: &str) -> ApiResult<Channel>;
}

/// Resolves the current gateway address.
///
/// Called once when a bot is created and again on every full recovery.
#[async_trait]
pub trait GatewayResolver: Send + Sync {
    async fn resolve_gateway(&self) -> ApiResult<String>;
}

/// Shared chat API handle.
pub type BoxedChatApi = Arc<dyn ChatApi>;

/// Shared gateway resolver handle.
pub type BoxedResolver = Arc<dyn GatewayResolver>;
