//! Device discovery collaborator
//!
//! The gateway never talks to speakers directly. It asks a [`Discovery`]
//! implementation which players exist, resolves request targets through it,
//! and consumes the state events it publishes on its [`EventBus`].

mod memory;

pub use memory::StaticDiscovery;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::events::EventBus;

/// Errors raised by a discovery implementation
#[derive(Debug, Error)]
pub enum DiscoveryError {
    /// Player name could not be used as a lookup key
    #[error("invalid player name: {0:?}")]
    InvalidName(String),

    /// No player with the given room name exists
    #[error("unknown player: {0}")]
    UnknownPlayer(String),
}

/// An addressable audio endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    /// Room name as shown to users (e.g. "Living Room")
    pub room_name: String,

    /// Stable device identifier
    pub uuid: String,

    /// Last known device state (volume, mute, current track, ...)
    #[serde(default)]
    pub state: serde_json::Value,
}

impl Player {
    /// Create a player with an empty state object
    #[must_use]
    pub fn new(room_name: impl Into<String>, uuid: impl Into<String>) -> Self {
        Self {
            room_name: room_name.into(),
            uuid: uuid.into(),
            state: serde_json::json!({}),
        }
    }

    /// JSON form used as the payload of player events
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "roomName": self.room_name,
            "uuid": self.uuid,
            "state": self.state,
        })
    }
}

/// A group of players playing in sync
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Zone {
    /// Zone identifier (the coordinator's uuid)
    pub uuid: String,

    /// Room name of the coordinating player
    pub coordinator: String,

    /// Room names of all members, coordinator included
    pub members: Vec<String>,
}

/// Read access to the discovered system
///
/// Implementations must be cheap to query: the resolver calls into them on
/// every HTTP request.
pub trait Discovery: Send + Sync {
    /// Number of zones currently known
    fn zone_count(&self) -> usize;

    /// Snapshot of the current zone topology
    fn zones(&self) -> Vec<Zone>;

    /// Look up a player by room name
    ///
    /// # Errors
    ///
    /// Returns error if the name cannot be used as a lookup key
    fn get_player(&self, name: &str) -> Result<Option<Player>, DiscoveryError>;

    /// Any known player, used when a request does not name one
    fn any_player(&self) -> Option<Player>;

    /// Channel on which device state events are published
    fn events(&self) -> &EventBus;
}
