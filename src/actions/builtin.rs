//! Actions shipped with the gateway itself

use std::sync::Arc;

use super::{ActionModule, ActionOutcome, ActionRegistryBuilder, FailureKind};
use crate::discovery::Discovery;

/// `zones`, `state` and `ping`
pub struct BuiltinActions {
    discovery: Arc<dyn Discovery>,
}

impl BuiltinActions {
    /// Create the module over a discovery handle
    #[must_use]
    pub fn new(discovery: Arc<dyn Discovery>) -> Self {
        Self { discovery }
    }
}

impl ActionModule for BuiltinActions {
    fn name(&self) -> &str {
        "builtin"
    }

    fn register(&self, builder: &mut ActionRegistryBuilder) {
        let discovery = Arc::clone(&self.discovery);
        builder.register("zones", move |_, _| {
            let zones = discovery.zones();
            async move { ActionOutcome::json(serde_json::json!(zones)) }
        });

        builder.register("state", |player, _| async move {
            match player {
                Some(player) => ActionOutcome::json(player.state),
                None => ActionOutcome::failure(FailureKind::InvalidArgument, "no player available"),
            }
        });

        builder.register("ping", |_, _| async { ActionOutcome::done() });
    }
}
