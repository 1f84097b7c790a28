//! Device state events
//!
//! The discovery collaborator publishes [`DiscoveryEvent`]s on an [`EventBus`].
//! Publishing is best-effort: with no subscribers the event is dropped.

use std::fmt;

use tokio::sync::broadcast;

/// Default number of events buffered per subscriber
const DEFAULT_CAPACITY: usize = 256;

/// Kind of device state change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// Playback state or current track changed
    TransportState,
    /// Players joined, left, or regrouped
    TopologyChange,
    /// Volume changed
    VolumeChange,
    /// Mute toggled
    MuteChange,
}

impl EventKind {
    /// Every event kind, in subscription order
    pub const ALL: [Self; 4] = [
        Self::TransportState,
        Self::TopologyChange,
        Self::VolumeChange,
        Self::MuteChange,
    ];

    /// Wire name sent as the webhook event type
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::TransportState => "transport-state",
            Self::TopologyChange => "topology-change",
            Self::VolumeChange => "volume-change",
            Self::MuteChange => "mute-change",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An event published by the discovery collaborator
#[derive(Debug, Clone, PartialEq)]
pub struct DiscoveryEvent {
    /// What changed
    pub kind: EventKind,
    /// Event-specific payload, forwarded verbatim
    pub data: serde_json::Value,
}

impl DiscoveryEvent {
    /// Create an event
    #[must_use]
    pub const fn new(kind: EventKind, data: serde_json::Value) -> Self {
        Self { kind, data }
    }

    /// The `state.currentTrack` object, present on playback-state payloads
    #[must_use]
    pub fn current_track(&self) -> Option<&serde_json::Value> {
        self.data
            .get("state")
            .and_then(|state| state.get("currentTrack"))
            .filter(|track| track.is_object())
    }
}

/// Broadcast channel carrying [`DiscoveryEvent`]s to any number of consumers
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<DiscoveryEvent>,
}

impl EventBus {
    /// Create a bus buffering up to `capacity` events per subscriber
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Publish an event, returning how many subscribers will see it
    pub fn publish(&self, event: DiscoveryEvent) -> usize {
        let kind = event.kind;
        match self.tx.send(event) {
            Ok(receivers) => {
                tracing::trace!(event = %kind, receivers, "published event");
                receivers
            }
            Err(_) => {
                tracing::debug!(event = %kind, "no subscribers, event dropped");
                0
            }
        }
    }

    /// Subscribe to all subsequently published events
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<DiscoveryEvent> {
        self.tx.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
