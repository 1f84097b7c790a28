//! TOML configuration file loading
//!
//! Supports `~/.config/sonos-gateway/config.toml` as a persistent config source.
//! All fields are optional; the file is a partial overlay on top of defaults.
//! Keys written in the legacy camel-case style (`webhookCover`) are accepted.

use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Top-level TOML configuration file schema
#[derive(Debug, Default, Deserialize)]
pub struct GatewayConfigFile {
    /// HTTP port
    pub port: Option<u16>,

    /// Static web root (served outside the gateway core)
    pub webroot: Option<String>,

    /// Primary webhook URL
    pub webhook: Option<String>,

    /// Cover art webhook URL
    #[serde(alias = "webhookCover")]
    pub webhook_cover: Option<String>,

    /// JSON field name for the event type
    #[serde(alias = "webhookType")]
    pub webhook_type: Option<String>,

    /// JSON field name for the event payload
    #[serde(alias = "webhookData")]
    pub webhook_data: Option<String>,

    /// Custom header name for primary webhook requests
    #[serde(alias = "webhookHeaderName")]
    pub webhook_header_name: Option<String>,

    /// Custom header value for primary webhook requests
    #[serde(alias = "webhookHeaderContents")]
    pub webhook_header_contents: Option<String>,

    /// Players known without network discovery
    #[serde(default)]
    pub players: Vec<PlayerFileConfig>,
}

/// A statically declared player
#[derive(Debug, Default, Deserialize)]
pub struct PlayerFileConfig {
    /// Room name
    pub name: String,

    /// Device identifier (generated when omitted)
    pub uuid: Option<String>,
}

/// Load the TOML config file from `path`, or the standard path when `None`
///
/// Returns `GatewayConfigFile::default()` if the file doesn't exist or can't be parsed.
pub fn load_config_file(path: Option<&Path>) -> GatewayConfigFile {
    let Some(path) = path.map(Path::to_path_buf).or_else(config_file_path) else {
        return GatewayConfigFile::default();
    };

    if !path.exists() {
        return GatewayConfigFile::default();
    }

    match std::fs::read_to_string(&path) {
        Ok(content) => match toml::from_str(&content) {
            Ok(config) => {
                tracing::info!(path = %path.display(), "loaded config file");
                config
            }
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "failed to parse config file, using defaults"
                );
                GatewayConfigFile::default()
            }
        },
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "failed to read config file"
            );
            GatewayConfigFile::default()
        }
    }
}

/// Return the config file path: `~/.config/sonos-gateway/config.toml`
pub fn config_file_path() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| d.config_dir().join("sonos-gateway").join("config.toml"))
}
