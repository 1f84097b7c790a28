//! Sonos Gateway - HTTP control surface and webhook relay for networked speakers
//!
//! This library provides the core of the gateway:
//! - Request resolution (`/{player}/{action}/{args...}`) and action dispatch
//! - A registry of named action handlers, assembled at startup
//! - Webhook delivery of device state events, with album art upload
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                   HTTP clients                       │
//! └────────────────────┬────────────────────────────────┘
//!                      │ GET /Kitchen/volume/20
//! ┌────────────────────▼────────────────────────────────┐
//! │  Resolver  →  Dispatcher  →  ActionRegistry         │
//! └────────────────────┬────────────────────────────────┘
//!                      │
//! ┌────────────────────▼────────────────────────────────┐
//! │  Discovery  ──EventBus──▶  WebhookNotifier ──▶ POST │
//! └─────────────────────────────────────────────────────┘
//! ```

pub mod actions;
pub mod api;
pub mod config;
pub mod discovery;
pub mod error;
pub mod events;
pub mod webhook;

pub use actions::{
    ActionFailure, ActionModule, ActionOutcome, ActionRegistry, ActionRegistryBuilder,
    FailureKind,
};
pub use api::{ApiServer, ApiServerBuilder};
pub use config::Config;
pub use discovery::{Discovery, DiscoveryError, Player, StaticDiscovery, Zone};
pub use error::{Error, Result};
pub use events::{DiscoveryEvent, EventBus, EventKind};
pub use webhook::{HttpTransport, WebhookConfig, WebhookNotifier, WebhookTransport};
