//! Named actions invocable through the HTTP path
//!
//! Actions are registered once at startup by [`ActionModule`]s into an
//! [`ActionRegistryBuilder`]. The resulting [`ActionRegistry`] is immutable and
//! shared by reference with the dispatcher.

mod builtin;

pub use builtin::BuiltinActions;

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::FutureExt;
use futures::future::BoxFuture;
use thiserror::Error;

use crate::discovery::Player;

/// Future returned by an action handler
pub type ActionFuture = BoxFuture<'static, ActionOutcome>;

/// Type-erased action handler: `(player, args) -> outcome`
pub type ActionHandler = Arc<dyn Fn(Option<Player>, Vec<String>) -> ActionFuture + Send + Sync>;

/// Category of an action failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Arguments were missing or malformed
    InvalidArgument,
    /// The device rejected or did not answer the command
    Device,
    /// Anything else
    Internal,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::InvalidArgument => "invalid argument",
            Self::Device => "device",
            Self::Internal => "internal",
        })
    }
}

/// A failed action, surfaced verbatim to the HTTP client
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ActionFailure {
    /// Failure category
    pub kind: FailureKind,
    /// Human-readable message
    pub message: String,
    /// Diagnostic trace, if the handler captured one
    pub stack: Option<String>,
}

impl ActionFailure {
    /// Create a failure without a trace
    #[must_use]
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            stack: None,
        }
    }

    /// Capture an error and its source chain
    #[must_use]
    pub fn from_error(kind: FailureKind, err: &(dyn std::error::Error + 'static)) -> Self {
        Self {
            kind,
            message: err.to_string(),
            stack: Some(error_trace(err)),
        }
    }
}

/// Render an error and its sources, one per line
#[must_use]
pub fn error_trace(err: &(dyn std::error::Error + 'static)) -> String {
    let mut trace = format!("{err:?}");
    let mut source = err.source();
    while let Some(cause) = source {
        trace.push_str("\n    caused by: ");
        trace.push_str(&cause.to_string());
        source = cause.source();
    }
    trace
}

/// Result of running an action
#[derive(Debug, Clone, PartialEq)]
pub enum ActionOutcome {
    /// Completed; the payload (if any) becomes the response body
    Success(Option<serde_json::Value>),
    /// Completed by relaying a raw device/transport response that must not be
    /// serialized back to the client
    RawTransportPassthrough,
    /// Failed
    Failure(ActionFailure),
}

impl ActionOutcome {
    /// Completed with no payload
    #[must_use]
    pub const fn done() -> Self {
        Self::Success(None)
    }

    /// Completed with a JSON payload
    #[must_use]
    pub const fn json(value: serde_json::Value) -> Self {
        Self::Success(Some(value))
    }

    /// Failed with the given kind and message
    #[must_use]
    pub fn failure(kind: FailureKind, message: impl Into<String>) -> Self {
        Self::Failure(ActionFailure::new(kind, message))
    }

    /// Combine the outcomes of an action that issued several commands
    ///
    /// A list headed by a raw passthrough is itself a passthrough. Otherwise the
    /// first failure wins, and successes are collected into a JSON array.
    #[must_use]
    pub fn batch(outcomes: Vec<Self>) -> Self {
        if matches!(outcomes.first(), Some(Self::RawTransportPassthrough)) {
            return Self::RawTransportPassthrough;
        }

        let mut values = Vec::with_capacity(outcomes.len());
        for outcome in outcomes {
            match outcome {
                Self::Success(value) => values.push(value.unwrap_or(serde_json::Value::Null)),
                Self::RawTransportPassthrough => values.push(serde_json::Value::Null),
                Self::Failure(failure) => return Self::Failure(failure),
            }
        }
        Self::json(serde_json::Value::Array(values))
    }
}

/// A source of actions, called once while the registry is built
pub trait ActionModule {
    /// Module name, for logging
    fn name(&self) -> &str;

    /// Register this module's actions
    fn register(&self, builder: &mut ActionRegistryBuilder);
}

/// Immutable action name → handler map
#[derive(Clone, Default)]
pub struct ActionRegistry {
    actions: HashMap<String, ActionHandler>,
}

impl ActionRegistry {
    /// Start building a registry
    #[must_use]
    pub fn builder() -> ActionRegistryBuilder {
        ActionRegistryBuilder::default()
    }

    /// Look up a handler by (lowercase) name
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ActionHandler> {
        self.actions.get(name)
    }

    /// Whether an action is registered
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.actions.contains_key(name)
    }

    /// Registered action names, sorted
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.actions.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Number of registered actions
    #[must_use]
    pub fn len(&self) -> usize {
        self.actions.len()
    }

    /// Whether no actions are registered
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}

impl fmt::Debug for ActionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionRegistry")
            .field("actions", &self.names())
            .finish()
    }
}

/// Mutable builder for an [`ActionRegistry`]
#[derive(Default)]
pub struct ActionRegistryBuilder {
    actions: HashMap<String, ActionHandler>,
}

impl ActionRegistryBuilder {
    /// Register a handler under `name`
    ///
    /// Names are stored lowercase. Registering an existing name replaces the
    /// earlier handler.
    pub fn register<F, Fut>(&mut self, name: &str, handler: F) -> &mut Self
    where
        F: Fn(Option<Player>, Vec<String>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ActionOutcome> + Send + 'static,
    {
        let name = name.to_lowercase();
        let handler: ActionHandler = Arc::new(move |player, args| handler(player, args).boxed());
        if self.actions.insert(name.clone(), handler).is_some() {
            tracing::debug!(action = %name, "replaced existing action handler");
        }
        self
    }

    /// Let a module register its actions
    #[must_use]
    pub fn module(mut self, module: &dyn ActionModule) -> Self {
        let before = self.actions.len();
        module.register(&mut self);
        tracing::debug!(
            module = module.name(),
            added = self.actions.len().saturating_sub(before),
            "loaded action module"
        );
        self
    }

    /// Freeze the registry
    #[must_use]
    pub fn build(self) -> ActionRegistry {
        tracing::info!(count = self.actions.len(), "action registry built");
        ActionRegistry {
            actions: self.actions,
        }
    }
}
