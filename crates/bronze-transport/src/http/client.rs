//! JSON REST client.

use std::time::Duration;

use reqwest::{Client, ClientBuilder, RequestBuilder, Response};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, trace};

use bronze_core::{ApiError, ApiResult, TransportError, TransportResult};

/// A thin JSON client bound to one API base URL.
///
/// Every request carries the configured `Authorization` header. Non-success
/// statuses become [`ApiError::Http`] with the response body as message.
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    base_url: String,
    authorization: Option<String>,
}

impl HttpClient {
    /// Creates a client for `base_url` with a request timeout.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> TransportResult<Self> {
        let client = ClientBuilder::new()
            .timeout(timeout)
            .build()
            .map_err(|e| TransportError::Io(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            authorization: None,
        })
    }

    /// Sets the raw `Authorization` header value, e.g. `"Bot <token>"`.
    pub fn with_authorization(mut self, value: impl Into<String>) -> Self {
        self.authorization = Some(value.into());
        self
    }

    /// The base URL requests are resolved against.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Joins `path` onto the base URL.
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> ApiResult<T> {
        let response = self.execute(self.client.get(self.endpoint(path))).await?;
        decode(response).await
    }

    pub async fn post<B, T>(&self, path: &str, body: &B) -> ApiResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self
            .execute(self.client.post(self.endpoint(path)).json(body))
            .await?;
        decode(response).await
    }

    pub async fn patch<B, T>(&self, path: &str, body: &B) -> ApiResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self
            .execute(self.client.patch(self.endpoint(path)).json(body))
            .await?;
        decode(response).await
    }

    /// Sends a DELETE; the response body is ignored.
    pub async fn delete(&self, path: &str) -> ApiResult<()> {
        self.execute(self.client.delete(self.endpoint(path)))
            .await
            .map(|_| ())
    }

    async fn execute(&self, mut request: RequestBuilder) -> ApiResult<Response> {
        if let Some(value) = &self.authorization {
            request = request.header(reqwest::header::AUTHORIZATION, value);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ApiError::Request(e.to_string()))?;

        let status = response.status();
        trace!(status = status.as_u16(), url = %response.url(), "HTTP response");
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            debug!(status = status.as_u16(), body = %text, "HTTP request failed");
            return Err(ApiError::http(status.as_u16(), text));
        }
        Ok(response)
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> ApiResult<T> {
    response
        .json()
        .await
        .map_err(|e| ApiError::Serialization(e.to_string()))
}

impl std::fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpClient")
            .field("base_url", &self.base_url)
            .field("authorized", &self.authorization.is_some())
            .finish()
    }
}
