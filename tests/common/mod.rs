//! Shared test utilities

#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use sonos_gateway::webhook::{DeliveryError, FetchedBody, WebhookRequest, WebhookTransport};
use sonos_gateway::{ActionRegistry, ApiServerBuilder, Player, StaticDiscovery};

/// Album art served by [`RecordingTransport`]
pub const FIXTURE_ART: &[u8] = b"\x89PNG\r\n\x1a\nfixture-cover-art";

/// Two players, each its own zone
pub fn kitchen_and_office() -> Arc<StaticDiscovery> {
    Arc::new(StaticDiscovery::new(vec![
        Player::new("Kitchen", "RINCON_1"),
        Player::new("Living Room", "RINCON_2"),
    ]))
}

/// Build a test API router over `registry` and `discovery`
pub fn build_test_router(
    registry: ActionRegistry,
    discovery: Arc<StaticDiscovery>,
) -> axum::Router {
    ApiServerBuilder::new(registry, discovery, 0).build().router()
}

/// Records every webhook POST and serves [`FIXTURE_ART`] for every GET
#[derive(Default)]
pub struct RecordingTransport {
    posts: Mutex<Vec<WebhookRequest>>,
    fetches: Mutex<Vec<String>>,
    fail_posts: bool,
    art_status: Option<StatusCode>,
}

impl RecordingTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// A transport whose POSTs all fail, as if the endpoint were down
    pub fn unreachable() -> Arc<Self> {
        Arc::new(Self {
            fail_posts: true,
            ..Self::default()
        })
    }

    /// A transport whose art GETs answer with `status`
    pub fn art_status(status: StatusCode) -> Arc<Self> {
        Arc::new(Self {
            art_status: Some(status),
            ..Self::default()
        })
    }

    pub fn posts(&self) -> Vec<WebhookRequest> {
        self.posts.lock().unwrap().clone()
    }

    pub fn fetches(&self) -> Vec<String> {
        self.fetches.lock().unwrap().clone()
    }

    /// POSTs to `url`, with bodies parsed as JSON
    pub fn bodies_to(&self, url: &str) -> Vec<serde_json::Value> {
        self.posts()
            .iter()
            .filter(|r| r.url == url)
            .map(|r| serde_json::from_slice(&r.body).unwrap())
            .collect()
    }

    /// Wait until at least `count` POSTs were recorded
    pub async fn wait_for_posts(&self, count: usize) -> Vec<WebhookRequest> {
        tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                let posts = self.posts();
                if posts.len() >= count {
                    return posts;
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("timed out waiting for webhook posts")
    }
}

#[async_trait]
impl WebhookTransport for RecordingTransport {
    async fn post_json(&self, request: WebhookRequest) -> Result<(), DeliveryError> {
        self.posts.lock().unwrap().push(request);
        if self.fail_posts {
            return Err(DeliveryError::Transport("connection refused".to_string()));
        }
        Ok(())
    }

    async fn get_bytes(&self, url: &str) -> Result<FetchedBody, DeliveryError> {
        self.fetches.lock().unwrap().push(url.to_string());
        Ok(FetchedBody {
            status: self.art_status.unwrap_or(StatusCode::OK),
            bytes: FIXTURE_ART.to_vec(),
        })
    }
}
