//! Request path resolution
//!
//! Paths have two shapes:
//!
//! ```text
//! /<player>/<action>/<arg>...   player named explicitly
//! /<action>/<arg>...            any player
//! ```
//!
//! The first segment is a player only if discovery knows a player by that
//! name; otherwise it is the action.

use thiserror::Error;

use crate::discovery::{Discovery, DiscoveryError, Player};

/// Browsers request this unprompted; it is answered with an empty body
pub const FAVICON_PATH: &str = "/favicon.ico";

/// Returned for every request until at least one zone is known
pub const NOT_DISCOVERED_MESSAGE: &str = "No system has yet been discovered. Please see https://github.com/jishi/node-sonos-http-api/issues/77 if it doesn't resolve itself in a few seconds.";

/// Where a request should go
#[derive(Debug, Clone, PartialEq)]
pub enum Route {
    /// `/favicon.ico`
    Favicon,
    /// An action invocation
    Action(RequestAddress),
}

/// Target of an action invocation
#[derive(Debug, Clone, PartialEq)]
pub struct RequestAddress {
    /// Player the action runs against
    pub player: Option<Player>,
    /// Lowercased action name, possibly empty
    pub action: String,
    /// Remaining path segments, verbatim
    pub args: Vec<String>,
}

/// Malformed percent-encoding in a path segment
#[derive(Debug, Error)]
pub enum DecodeError {
    /// `%` not followed by two hex digits
    #[error("URI malformed: invalid escape at byte {0}")]
    InvalidEscape(usize),

    /// Escapes decode to bytes that are not UTF-8
    #[error("URI malformed: {0}")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),
}

/// Why a path could not be resolved
#[derive(Debug, Error)]
pub enum ResolveError {
    /// No zones discovered yet
    #[error("{}", NOT_DISCOVERED_MESSAGE)]
    NotDiscovered,

    /// Player segment is not valid percent-encoding
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// Discovery rejected the player name
    #[error(transparent)]
    Discovery(#[from] DiscoveryError),
}

/// Strictly percent-decode one path segment
///
/// # Errors
///
/// Returns error on a truncated or non-hex escape, or non-UTF-8 output
pub fn decode_segment(segment: &str) -> Result<String, DecodeError> {
    let bytes = segment.as_bytes();
    for (i, _) in segment.match_indices('%') {
        let valid = bytes
            .get(i + 1..i + 3)
            .is_some_and(|hex| hex.iter().all(u8::is_ascii_hexdigit));
        if !valid {
            return Err(DecodeError::InvalidEscape(i));
        }
    }

    Ok(urlencoding::decode(segment)?.into_owned())
}

/// Resolve a request path against the discovered system
///
/// # Errors
///
/// Returns error if nothing is discovered yet, the player segment is not
/// valid percent-encoding, or discovery rejects the player name
pub fn resolve(path: &str, discovery: &dyn Discovery) -> Result<Route, ResolveError> {
    if path == FAVICON_PATH {
        return Ok(Route::Favicon);
    }

    if discovery.zone_count() == 0 {
        return Err(ResolveError::NotDiscovered);
    }

    let segments: Vec<&str> = path.strip_prefix('/').unwrap_or(path).split('/').collect();
    let first = segments.first().copied().unwrap_or_default();

    let player_name = decode_segment(first).inspect_err(|e| {
        tracing::error!(segment = first, error = %e, "unable to parse supplied URI component");
    })?;

    let (player, rest) = match discovery.get_player(&player_name)? {
        Some(player) => (Some(player), segments.get(1..).unwrap_or_default()),
        None => (discovery.any_player(), segments.as_slice()),
    };

    let action = rest.first().map(|a| a.to_lowercase()).unwrap_or_default();
    let args = rest
        .get(1..)
        .unwrap_or_default()
        .iter()
        .map(ToString::to_string)
        .collect();

    Ok(Route::Action(RequestAddress {
        player,
        action,
        args,
    }))
}
