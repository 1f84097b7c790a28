//! JSON response writing

use axum::{
    body::Body,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Serialize;

use super::dispatch::DispatchError;
use super::resolver::ResolveError;
use crate::actions::error_trace;

/// Content type of every response body
pub const JSON_CONTENT_TYPE: &str = "application/json;charset=utf-8";

/// Outcome marker carried by envelopes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Success,
    Error,
}

/// Standard response body when an action has nothing else to say
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResponseEnvelope {
    pub status: Status,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
}

impl ResponseEnvelope {
    /// `{"status":"success"}`
    #[must_use]
    pub const fn success() -> Self {
        Self {
            status: Status::Success,
            error: None,
            stack: None,
        }
    }

    /// Error envelope with a message and optional trace
    #[must_use]
    pub fn error(message: impl Into<String>, stack: Option<String>) -> Self {
        Self {
            status: Status::Error,
            error: Some(message.into()),
            stack,
        }
    }
}

impl From<&ResolveError> for ResponseEnvelope {
    fn from(err: &ResolveError) -> Self {
        match err {
            ResolveError::NotDiscovered => Self::error(err.to_string(), None),
            ResolveError::Decode(_) | ResolveError::Discovery(_) => {
                Self::error(err.to_string(), Some(error_trace(err)))
            }
        }
    }
}

impl From<&DispatchError> for ResponseEnvelope {
    fn from(err: &DispatchError) -> Self {
        match err {
            DispatchError::ActionNotFound(_) => Self::error(err.to_string(), None),
            DispatchError::Handler(failure) => {
                Self::error(failure.message.clone(), failure.stack.clone())
            }
        }
    }
}

/// Serialize `body` as a JSON response with explicit length
#[must_use]
pub fn json_response(status: StatusCode, body: &impl Serialize) -> Response {
    let bytes = match serde_json::to_vec(body) {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::error!(error = %e, "failed to serialize response body");
            return (StatusCode::INTERNAL_SERVER_ERROR, Body::empty()).into_response();
        }
    };

    (
        status,
        [
            (header::CONTENT_TYPE, HeaderValue::from_static(JSON_CONTENT_TYPE)),
            (header::CONTENT_LENGTH, HeaderValue::from(bytes.len())),
        ],
        bytes,
    )
        .into_response()
}

/// 200 with no body
#[must_use]
pub fn empty_response() -> Response {
    (StatusCode::OK, Body::empty()).into_response()
}
