//! In-memory discovery backed by a fixed player list

use std::sync::{PoisonError, RwLock};

use super::{Discovery, DiscoveryError, Player, Zone};
use crate::events::{DiscoveryEvent, EventBus, EventKind};

/// Discovery over a player list supplied up front (config file or tests)
///
/// Every player forms its own zone. Room names are matched case-insensitively.
pub struct StaticDiscovery {
    players: RwLock<Vec<Player>>,
    events: EventBus,
}

impl StaticDiscovery {
    /// Create a discovery over the given players
    #[must_use]
    pub fn new(players: Vec<Player>) -> Self {
        Self {
            players: RwLock::new(players),
            events: EventBus::default(),
        }
    }

    /// Create a discovery that has not found any system yet
    #[must_use]
    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    /// Add a player, publishing a `topology-change` event
    pub fn add_player(&self, player: Player) {
        let zones = {
            let mut players = self.players.write().unwrap_or_else(PoisonError::into_inner);
            players.retain(|p| p.uuid != player.uuid);
            tracing::info!(room = %player.room_name, uuid = %player.uuid, "player added");
            players.push(player);
            zones_of(&players)
        };

        self.events.publish(DiscoveryEvent::new(
            EventKind::TopologyChange,
            serde_json::json!(zones),
        ));
    }

    /// Replace a player's state, publishing a `transport-state` event
    ///
    /// # Errors
    ///
    /// Returns error if no player has the given room name
    pub fn update_state(
        &self,
        room_name: &str,
        state: serde_json::Value,
    ) -> Result<(), DiscoveryError> {
        let payload = {
            let mut players = self.players.write().unwrap_or_else(PoisonError::into_inner);
            let player = players
                .iter_mut()
                .find(|p| p.room_name.eq_ignore_ascii_case(room_name))
                .ok_or_else(|| DiscoveryError::UnknownPlayer(room_name.to_string()))?;
            player.state = state;
            player.to_json()
        };

        self.events
            .publish(DiscoveryEvent::new(EventKind::TransportState, payload));
        Ok(())
    }
}

fn zones_of(players: &[Player]) -> Vec<Zone> {
    players
        .iter()
        .map(|p| Zone {
            uuid: p.uuid.clone(),
            coordinator: p.room_name.clone(),
            members: vec![p.room_name.clone()],
        })
        .collect()
}

impl Discovery for StaticDiscovery {
    fn zone_count(&self) -> usize {
        self.players
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn zones(&self) -> Vec<Zone> {
        zones_of(&self.players.read().unwrap_or_else(PoisonError::into_inner))
    }

    fn get_player(&self, name: &str) -> Result<Option<Player>, DiscoveryError> {
        if name.chars().any(char::is_control) {
            return Err(DiscoveryError::InvalidName(name.to_string()));
        }

        Ok(self
            .players
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .find(|p| p.room_name.eq_ignore_ascii_case(name))
            .cloned())
    }

    fn any_player(&self) -> Option<Player> {
        self.players
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .first()
            .cloned()
    }

    fn events(&self) -> &EventBus {
        &self.events
    }
}
