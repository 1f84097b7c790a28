//! Webhook delivery of device events
//!
//! Every discovery event is POSTed as JSON to the configured webhook. Playback
//! state events that carry album art additionally trigger a cover webhook with
//! the art inlined as base64.
//!
//! Delivery is best-effort: failures are logged, never retried, and never
//! reported back to the event source.

pub mod cover_art;
pub mod transport;

pub use cover_art::{CoverArtError, album_art_uri, fetch_cover_art};
pub use transport::{DeliveryError, FetchedBody, HttpTransport, WebhookRequest, WebhookTransport};

use std::sync::Arc;

use serde_json::{Map, Value};
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::{JoinError, JoinHandle, JoinSet};

use crate::events::{DiscoveryEvent, EventBus, EventKind};

/// Default JSON field carrying the event type
pub const DEFAULT_TYPE_FIELD: &str = "type";

/// Default JSON field carrying the event payload
pub const DEFAULT_DATA_FIELD: &str = "data";

/// JSON field carrying the send timestamp (epoch millis)
pub const SENT_TIME_FIELD: &str = "sentTime";

/// Extra header attached to primary webhook requests
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomHeader {
    pub name: String,
    pub value: String,
}

/// Webhook delivery configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookConfig {
    /// Primary webhook; delivery is disabled when unset
    pub url: Option<String>,
    /// Cover art webhook
    pub cover_url: Option<String>,
    /// Field name for the event type
    pub type_field: String,
    /// Field name for the event payload
    pub data_field: String,
    /// Optional header sent with primary requests
    pub header: Option<CustomHeader>,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            url: None,
            cover_url: None,
            type_field: DEFAULT_TYPE_FIELD.to_string(),
            data_field: DEFAULT_DATA_FIELD.to_string(),
            header: None,
        }
    }
}

impl WebhookConfig {
    /// Body of the primary webhook request
    #[must_use]
    pub fn event_body(&self, event: &DiscoveryEvent, sent_time: i64) -> Value {
        let mut body = Map::new();
        body.insert(self.type_field.clone(), Value::from(event.kind.as_str()));
        body.insert(self.data_field.clone(), event.data.clone());
        body.insert(SENT_TIME_FIELD.to_string(), Value::from(sent_time));
        Value::Object(body)
    }

    /// Body of the cover art webhook request
    #[must_use]
    pub fn cover_body(&self, data: &Value, base64: String, sent_time: i64) -> Value {
        let mut body = Map::new();
        body.insert(self.data_field.clone(), data.clone());
        body.insert("base64".to_string(), Value::String(base64));
        body.insert(SENT_TIME_FIELD.to_string(), Value::from(sent_time));
        Value::Object(body)
    }
}

/// Which of the two deliveries failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Delivery {
    Primary,
    Cover,
}

impl Delivery {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Primary => "primary",
            Self::Cover => "cover",
        }
    }
}

/// A delivery that did not reach its endpoint
struct DeliveryFailure {
    delivery: Delivery,
    url: String,
    error: DeliveryError,
}

type DeliveryResult = Result<(), DeliveryFailure>;

/// Forwards discovery events to the configured webhooks
#[derive(Clone)]
pub struct WebhookNotifier {
    config: Arc<WebhookConfig>,
    transport: Arc<dyn WebhookTransport>,
}

impl WebhookNotifier {
    /// Create a notifier
    #[must_use]
    pub fn new(config: WebhookConfig, transport: Arc<dyn WebhookTransport>) -> Self {
        Self {
            config: Arc::new(config),
            transport,
        }
    }

    /// Whether a primary webhook is configured
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.config.url.is_some()
    }

    /// Start one consumer task per event kind
    ///
    /// Consumers run until the bus is dropped.
    #[must_use]
    pub fn spawn(&self, bus: &EventBus) -> Vec<JoinHandle<()>> {
        if self.is_enabled() {
            tracing::info!(
                url = self.config.url.as_deref(),
                cover_url = self.config.cover_url.as_deref(),
                "webhook notifier started"
            );
        } else {
            tracing::info!("no webhook configured, events will not be forwarded");
        }

        EventKind::ALL
            .into_iter()
            .map(|kind| {
                let notifier = self.clone();
                let rx = bus.subscribe();
                tokio::spawn(async move { notifier.consume(kind, rx).await })
            })
            .collect()
    }

    /// Receive events of one kind and deliver each in its own task
    async fn consume(self, kind: EventKind, mut rx: broadcast::Receiver<DiscoveryEvent>) {
        let mut deliveries = JoinSet::new();

        loop {
            tokio::select! {
                received = rx.recv() => match received {
                    Ok(event) if event.kind == kind => {
                        let notifier = self.clone();
                        deliveries.spawn(async move { notifier.notify(&event).await });
                    }
                    Ok(_) => {}
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(event = %kind, skipped, "webhook consumer lagged, events dropped");
                    }
                    Err(RecvError::Closed) => break,
                },
                Some(joined) = deliveries.join_next(), if !deliveries.is_empty() => {
                    log_join_error(joined);
                }
            }
        }

        while let Some(joined) = deliveries.join_next().await {
            log_join_error(joined);
        }
        tracing::debug!(event = %kind, "webhook consumer stopped");
    }

    /// Deliver one event: the primary webhook, plus the cover webhook when the
    /// event carries album art
    ///
    /// Both deliveries run as independent tasks. Failures are logged here and
    /// go no further.
    pub async fn notify(&self, event: &DiscoveryEvent) {
        let Some(url) = self.config.url.clone() else {
            return;
        };

        let mut deliveries: JoinSet<DeliveryResult> = JoinSet::new();

        let body = self
            .config
            .event_body(event, chrono::Utc::now().timestamp_millis());
        let mut request = WebhookRequest::new(url, body.to_string().into_bytes());
        if let Some(header) = &self.config.header {
            request = request.header(header.name.clone(), header.value.clone());
        }
        deliveries.spawn(deliver(Arc::clone(&self.transport), Delivery::Primary, request));

        if let Some(track) = event.current_track().filter(|t| album_art_uri(t).is_some()) {
            match self.config.cover_url.clone() {
                Some(cover_url) => {
                    deliveries.spawn(deliver_cover(
                        Arc::clone(&self.config),
                        Arc::clone(&self.transport),
                        cover_url,
                        event.data.clone(),
                        track.clone(),
                    ));
                }
                None => {
                    tracing::debug!(event = %event.kind, "no cover webhook configured, skipping cover art");
                }
            }
        }

        while let Some(joined) = deliveries.join_next().await {
            match joined {
                Ok(Ok(())) => {}
                Ok(Err(failure)) => log_delivery_failure(&failure),
                Err(e) => log_join_error(Err(e)),
            }
        }
    }
}

async fn deliver(
    transport: Arc<dyn WebhookTransport>,
    delivery: Delivery,
    request: WebhookRequest,
) -> DeliveryResult {
    let url = request.url.clone();
    transport
        .post_json(request)
        .await
        .map_err(|error| DeliveryFailure {
            delivery,
            url: url.clone(),
            error,
        })?;

    tracing::debug!(delivery = delivery.as_str(), url = %url, "webhook delivered");
    Ok(())
}

async fn deliver_cover(
    config: Arc<WebhookConfig>,
    transport: Arc<dyn WebhookTransport>,
    cover_url: String,
    data: Value,
    track: Value,
) -> DeliveryResult {
    tracing::debug!(url = %cover_url, "uploading cover art");

    let base64 = match fetch_cover_art(transport.as_ref(), &track).await {
        Ok(art) => art.unwrap_or_default(),
        Err(e) => {
            tracing::warn!(
                uri = album_art_uri(&track),
                error = %e,
                "failed to fetch cover art, sending without it"
            );
            String::new()
        }
    };

    let body = config.cover_body(&data, base64, chrono::Utc::now().timestamp_millis());
    let request = WebhookRequest::new(cover_url, body.to_string().into_bytes());
    deliver(transport, Delivery::Cover, request).await
}

fn log_delivery_failure(failure: &DeliveryFailure) {
    tracing::error!(
        delivery = failure.delivery.as_str(),
        url = %failure.url,
        error = %failure.error,
        "could not reach webhook endpoint, verify that the receiving end is up and running"
    );
}

fn log_join_error(joined: Result<(), JoinError>) {
    if let Err(e) = joined {
        tracing::error!(error = %e, "webhook delivery task failed");
    }
}
