//! Discord REST API client.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use bronze_core::{
    ApiResult, Channel, ChatApi, GatewayResolver, MessageIdentifier, Post, PostResponse,
    TransportResult, User,
};
use bronze_transport::HttpClient;

use crate::config::DiscordConfig;

#[derive(Deserialize)]
struct GatewayResponse {
    url: String,
}

#[derive(Serialize)]
struct MessageBody<'a> {
    content: &'a str,
}

#[derive(Deserialize)]
struct MessageResponse {
    id: String,
    channel_id: String,
}

impl From<MessageResponse> for PostResponse {
    fn from(message: MessageResponse) -> Self {
        PostResponse {
            post_id: MessageIdentifier::new(message.id, message.channel_id),
        }
    }
}

#[derive(Deserialize)]
struct UserResponse {
    id: String,
    #[serde(default)]
    username: String,
}

impl From<UserResponse> for User {
    fn from(user: UserResponse) -> Self {
        User {
            id: user.id,
            name: user.username,
        }
    }
}

#[derive(Deserialize)]
struct ChannelResponse {
    id: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    recipients: Vec<UserResponse>,
}

impl From<ChannelResponse> for Channel {
    fn from(channel: ChannelResponse) -> Self {
        Channel {
            id: channel.id,
            name: channel.name.unwrap_or_default(),
            recipient_count: channel.recipients.len(),
        }
    }
}

/// REST client authorised as a bot.
///
/// Serves both gateway discovery (`GET /gateway`) and the outbound
/// [`ChatApi`] used by plugins.
#[derive(Debug, Clone)]
pub struct DiscordRestClient {
    http: HttpClient,
}

impl DiscordRestClient {
    pub fn new(config: &DiscordConfig) -> TransportResult<Self> {
        let http = HttpClient::new(&config.api_url, config.request_timeout)?
            .with_authorization(format!("Bot {}", config.token));
        Ok(Self { http })
    }
}

#[async_trait]
impl GatewayResolver for DiscordRestClient {
    async fn resolve_gateway(&self) -> ApiResult<String> {
        let response: GatewayResponse = self.http.get("gateway").await?;
        debug!(url = %response.url, "Gateway address resolved");
        Ok(response.url)
    }
}

#[async_trait]
impl ChatApi for DiscordRestClient {
    async fn create_post(&self, post: Post) -> ApiResult<PostResponse> {
        let path = format!("channels/{}/messages", post.channel_id);
        let message: MessageResponse = self
            .http
            .post(&path, &MessageBody {
                content: &post.content,
            })
            .await?;
        Ok(message.into())
    }

    async fn update_post(&self, id: &MessageIdentifier, post: Post) -> ApiResult<PostResponse> {
        let path = format!("channels/{}/messages/{}", id.channel, id.id);
        let message: MessageResponse = self
            .http
            .patch(&path, &MessageBody {
                content: &post.content,
            })
            .await?;
        Ok(message.into())
    }

    async fn delete_post(&self, id: &MessageIdentifier) -> ApiResult<PostResponse> {
        let path = format!("channels/{}/messages/{}", id.channel, id.id);
        self.http.delete(&path).await?;
        Ok(PostResponse {
            post_id: id.clone(),
        })
    }

    async fn get_user(&self, user_id: &str) -> ApiResult<User> {
        let user: UserResponse = self.http.get(&format!("users/{user_id}")).await?;
        Ok(user.into())
    }

    async fn get_channel(&self, channel_id: &str) -> ApiResult<Channel> {
        let channel: ChannelResponse = self.http.get(&format!("channels/{channel_id}")).await?;
        Ok(channel.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_response_counts_recipients() {
        let channel: ChannelResponse = serde_json::from_str(
            r#"{"id":"dm","type":1,"recipients":[{"id":"u1","username":"alice"}]}"#,
        )
        .unwrap();
        let channel = Channel::from(channel);
        assert_eq!(channel.id, "dm");
        assert_eq!(channel.name, "");
        assert_eq!(channel.recipient_count, 1);
    }

    #[test]
    fn message_response_identifies_the_post() {
        let message: MessageResponse =
            serde_json::from_str(r#"{"id":"m1","channel_id":"c1","content":"hi"}"#).unwrap();
        assert_eq!(
            PostResponse::from(message).post_id,
            MessageIdentifier::new("m1", "c1")
        );
    }

    #[test]
    fn client_builds_from_config() {
        let config = DiscordConfig::new("secret");
        let client = DiscordRestClient::new(&config).unwrap();
        let rendered = format!("{client:?}");
        assert!(rendered.contains("https://discord.com/api"));
        assert!(!rendered.contains("secret"));
    }
}
