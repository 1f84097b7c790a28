//! Outbound HTTP used by webhook delivery and cover art fetching

use async_trait::async_trait;
use reqwest::{
    Client, StatusCode,
    header::{CONTENT_LENGTH, CONTENT_TYPE},
};
use thiserror::Error;

/// Outbound request failure
#[derive(Debug, Error)]
pub enum DeliveryError {
    /// Request could not be sent or its body could not be read
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Endpoint answered with a non-success status
    #[error("endpoint returned {0}")]
    Status(StatusCode),

    /// Failure reported by a non-HTTP transport
    #[error("transport error: {0}")]
    Transport(String),
}

/// A JSON POST to a webhook endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookRequest {
    /// Target URL
    pub url: String,
    /// Extra headers beyond content type and length
    pub headers: Vec<(String, String)>,
    /// Serialized JSON body
    pub body: Vec<u8>,
}

impl WebhookRequest {
    /// Create a request with no extra headers
    #[must_use]
    pub fn new(url: impl Into<String>, body: Vec<u8>) -> Self {
        Self {
            url: url.into(),
            headers: Vec::new(),
            body,
        }
    }

    /// Add an extra header
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

/// Response to a binary GET
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedBody {
    pub status: StatusCode,
    pub bytes: Vec<u8>,
}

/// Outbound HTTP seam, swapped for a recording fake in tests
#[async_trait]
pub trait WebhookTransport: Send + Sync {
    /// POST a JSON body; non-2xx responses are errors
    async fn post_json(&self, request: WebhookRequest) -> Result<(), DeliveryError>;

    /// GET a URL as raw bytes; any status is returned to the caller
    async fn get_bytes(&self, url: &str) -> Result<FetchedBody, DeliveryError>;
}

/// [`WebhookTransport`] over a shared `reqwest` client
#[derive(Debug, Clone, Default)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    /// Create a transport with a default client
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl WebhookTransport for HttpTransport {
    async fn post_json(&self, request: WebhookRequest) -> Result<(), DeliveryError> {
        let mut builder = self
            .client
            .post(&request.url)
            .header(CONTENT_TYPE, "application/json")
            .header(CONTENT_LENGTH, request.body.len());

        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let response = builder.body(request.body).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(DeliveryError::Status(status));
        }

        Ok(())
    }

    async fn get_bytes(&self, url: &str) -> Result<FetchedBody, DeliveryError> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        let bytes = response.bytes().await?.to_vec();

        Ok(FetchedBody { status, bytes })
    }
}
