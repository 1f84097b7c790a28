//! Action dispatch and result normalization

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use serde_json::Value;
use thiserror::Error;

use super::resolver::RequestAddress;
use crate::actions::{ActionFailure, ActionOutcome, ActionRegistry, FailureKind};

/// Why a dispatched action produced no response body
#[derive(Debug, Error)]
pub enum DispatchError {
    /// No action registered under the requested name
    #[error("action '{0}' not found")]
    ActionNotFound(String),

    /// The handler reported a failure
    #[error(transparent)]
    Handler(#[from] ActionFailure),
}

/// Runs resolved requests against the action registry
#[derive(Debug, Clone)]
pub struct Dispatcher {
    registry: Arc<ActionRegistry>,
}

impl Dispatcher {
    /// Create a dispatcher over a frozen registry
    #[must_use]
    pub const fn new(registry: Arc<ActionRegistry>) -> Self {
        Self { registry }
    }

    /// The registry this dispatcher consults
    #[must_use]
    pub fn registry(&self) -> &ActionRegistry {
        &self.registry
    }

    /// Invoke the addressed action and normalize its outcome
    ///
    /// # Errors
    ///
    /// Returns error if the action is not registered or its handler fails
    pub async fn dispatch(&self, address: RequestAddress) -> Result<Value, DispatchError> {
        let RequestAddress {
            player,
            action,
            args,
        } = address;

        let handler = self
            .registry
            .get(&action)
            .ok_or_else(|| DispatchError::ActionNotFound(action.clone()))?;

        tracing::debug!(
            action = %action,
            player = player.as_ref().map(|p| p.room_name.as_str()),
            args = ?args,
            "dispatching action"
        );

        let outcome = AssertUnwindSafe(async move { handler(player, args).await })
            .catch_unwind()
            .await
            .unwrap_or_else(|panic| {
                let message = panic_message(panic.as_ref());
                tracing::error!(action = %action, panic = %message, "action handler panicked");
                ActionOutcome::failure(FailureKind::Internal, message)
            });

        normalize(outcome).map_err(DispatchError::from)
    }
}

/// Text of a caught panic payload
fn panic_message(panic: &(dyn Any + Send)) -> String {
    panic
        .downcast_ref::<&str>()
        .map(ToString::to_string)
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "action handler panicked".to_string())
}

/// Turn an action outcome into the JSON response body
///
/// Empty and `null` payloads, and raw transport passthroughs, become
/// `{"status":"success"}`; any other payload is returned verbatim.
///
/// # Errors
///
/// Returns the handler's failure unchanged
pub fn normalize(outcome: ActionOutcome) -> Result<Value, ActionFailure> {
    match outcome {
        ActionOutcome::Success(None | Some(Value::Null)) | ActionOutcome::RawTransportPassthrough => {
            Ok(serde_json::json!({ "status": "success" }))
        }
        ActionOutcome::Success(Some(value)) => Ok(value),
        ActionOutcome::Failure(failure) => Err(failure),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discovery::Player;

    fn dispatcher() -> Dispatcher {
        let mut builder = ActionRegistry::builder();
        builder
            .register("args", |player, args| async move {
                ActionOutcome::json(serde_json::json!({
                    "player": player.map(|p| p.room_name),
                    "args": args,
                }))
            })
            .register("fail", |_, _| async {
                ActionOutcome::failure(FailureKind::Device, "speaker unreachable")
            })
            .register("first", |_, args| async move { ActionOutcome::json(args[0].clone().into()) });
        Dispatcher::new(Arc::new(builder.build()))
    }

    #[test]
    fn normalize_collapses_empty_results() {
        let success = serde_json::json!({ "status": "success" });
        assert_eq!(normalize(ActionOutcome::done()).unwrap(), success);
        assert_eq!(normalize(ActionOutcome::json(Value::Null)).unwrap(), success);
        assert_eq!(normalize(ActionOutcome::RawTransportPassthrough).unwrap(), success);
    }

    #[test]
    fn normalize_passes_payload_through() {
        let payload = serde_json::json!([1, 2, 3]);
        assert_eq!(normalize(ActionOutcome::json(payload.clone())).unwrap(), payload);
    }

    #[tokio::test]
    async fn dispatch_passes_player_and_args() {
        let body = dispatcher()
            .dispatch(RequestAddress {
                player: Some(Player::new("Office", "RINCON_2")),
                action: "args".to_string(),
                args: vec!["x".to_string(), "y".to_string()],
            })
            .await
            .unwrap();

        assert_eq!(body["player"], "Office");
        assert_eq!(body["args"], serde_json::json!(["x", "y"]));
    }

    #[tokio::test]
    async fn dispatch_unknown_action() {
        let err = dispatcher()
            .dispatch(RequestAddress {
                player: None,
                action: "nope".to_string(),
                args: Vec::new(),
            })
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "action 'nope' not found");
    }

    #[tokio::test]
    async fn dispatch_handler_failure() {
        let err = dispatcher()
            .dispatch(RequestAddress {
                player: None,
                action: "fail".to_string(),
                args: Vec::new(),
            })
            .await
            .unwrap_err();

        assert!(matches!(err, DispatchError::Handler(ref f) if f.kind == FailureKind::Device));
        assert_eq!(err.to_string(), "speaker unreachable");
    }

    #[tokio::test]
    async fn dispatch_handler_panic_becomes_failure() {
        let err = dispatcher()
            .dispatch(RequestAddress {
                player: None,
                action: "first".to_string(),
                args: Vec::new(),
            })
            .await
            .unwrap_err();

        assert!(matches!(err, DispatchError::Handler(ref f) if f.kind == FailureKind::Internal));
        assert!(err.to_string().contains("index out of bounds"));
    }

    #[test]
    fn panic_message_reads_str_and_string_payloads() {
        assert_eq!(panic_message(&"boom"), "boom");
        assert_eq!(panic_message(&"owned".to_string()), "owned");
        assert_eq!(panic_message(&42_u8), "action handler panicked");
    }
}
