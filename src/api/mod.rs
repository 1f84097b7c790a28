//! HTTP API server for the gateway
//!
//! A single method-agnostic handler serves every path: it resolves the path
//! to an action, dispatches it, and writes the JSON result.

pub mod dispatch;
pub mod resolver;
pub mod response;

pub use dispatch::{DispatchError, Dispatcher};
pub use resolver::{RequestAddress, ResolveError, Route};
pub use response::ResponseEnvelope;

use std::sync::Arc;

use axum::{
    Router,
    extract::State,
    http::{StatusCode, Uri},
    response::Response,
};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::Result;
use crate::actions::ActionRegistry;
use crate::discovery::Discovery;

/// Shared state for the request handler
#[derive(Clone)]
pub struct ApiState {
    pub dispatcher: Dispatcher,
    pub discovery: Arc<dyn Discovery>,
}

/// Build the gateway router
pub fn router(state: Arc<ApiState>) -> Router {
    Router::new()
        .fallback(handle_request)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// Resolve, dispatch and respond
async fn handle_request(State(state): State<Arc<ApiState>>, uri: Uri) -> Response {
    let path = uri.path();

    let address = match resolver::resolve(path, state.discovery.as_ref()) {
        Ok(Route::Favicon) => return response::empty_response(),
        Ok(Route::Action(address)) => address,
        Err(e) => {
            tracing::error!(path, error = %e, "failed to resolve request");
            return response::json_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &ResponseEnvelope::from(&e),
            );
        }
    };

    match state.dispatcher.dispatch(address).await {
        Ok(body) => response::json_response(StatusCode::OK, &body),
        Err(e) => {
            tracing::error!(path, error = %e, "action failed");
            response::json_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &ResponseEnvelope::from(&e),
            )
        }
    }
}

/// Configuration for building an API server
pub struct ApiServerBuilder {
    registry: Arc<ActionRegistry>,
    discovery: Arc<dyn Discovery>,
    port: u16,
}

impl ApiServerBuilder {
    /// Create a new API server builder
    #[must_use]
    pub fn new(registry: ActionRegistry, discovery: Arc<dyn Discovery>, port: u16) -> Self {
        Self {
            registry: Arc::new(registry),
            discovery,
            port,
        }
    }

    /// Build the API server
    #[must_use]
    pub fn build(self) -> ApiServer {
        let state = Arc::new(ApiState {
            dispatcher: Dispatcher::new(self.registry),
            discovery: self.discovery,
        });

        ApiServer {
            state,
            port: self.port,
        }
    }
}

/// API server
pub struct ApiServer {
    state: Arc<ApiState>,
    port: u16,
}

impl ApiServer {
    /// Router serving this server's state
    #[must_use]
    pub fn router(&self) -> Router {
        router(Arc::clone(&self.state))
    }

    /// Run the API server
    ///
    /// # Errors
    ///
    /// Returns error if server fails to bind or run
    pub async fn run(self) -> Result<()> {
        let addr = format!("0.0.0.0:{}", self.port);
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| crate::Error::Config(format!("failed to bind API server: {e}")))?;

        if self.state.dispatcher.registry().is_empty() {
            tracing::warn!("no actions registered, every request will fail");
        }

        tracing::info!(
            port = self.port,
            actions = self.state.dispatcher.registry().len(),
            "API server listening"
        );

        axum::serve(listener, self.router())
            .await
            .map_err(|e| crate::Error::Config(format!("API server error: {e}")))?;

        Ok(())
    }
}
