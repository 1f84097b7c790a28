//! Configuration management for the gateway

pub mod file;

use std::path::{Path, PathBuf};

use reqwest::header::{HeaderName, HeaderValue};

use crate::discovery::Player;
use crate::webhook::{CustomHeader, DEFAULT_DATA_FIELD, DEFAULT_TYPE_FIELD, WebhookConfig};
use crate::{Error, Result};

/// Default HTTP port
pub const DEFAULT_PORT: u16 = 5005;

/// Default static web root
pub const DEFAULT_WEBROOT: &str = "./static";

/// Gateway configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP API server configuration
    pub api_server: ApiServerConfig,

    /// Webhook delivery configuration
    pub webhook: WebhookConfig,

    /// Players known without network discovery
    pub players: Vec<Player>,
}

/// HTTP API server configuration
#[derive(Debug, Clone)]
pub struct ApiServerConfig {
    /// Port to listen on
    pub port: u16,

    /// Static files directory, consumed by whatever serves the web UI
    pub webroot: PathBuf,
}

impl Config {
    /// Load configuration from the environment and the TOML file at `path`
    /// (or the standard location)
    ///
    /// # Errors
    ///
    /// Returns error if a configured webhook URL or header is invalid
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let fc = file::load_config_file(path);
        Self::from_sources(fc, |key| std::env::var(key).ok())
    }

    /// Resolve configuration with precedence env > file > default
    ///
    /// # Errors
    ///
    /// Returns error if a configured webhook URL or header is invalid
    pub fn from_sources(
        fc: file::GatewayConfigFile,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        // API server config (env > toml > default)
        let api_server = ApiServerConfig {
            port: env("SONOS_GATEWAY_PORT")
                .or_else(|| env("PORT"))
                .and_then(|s| s.parse().ok())
                .or(fc.port)
                .unwrap_or(DEFAULT_PORT),
            webroot: env("SONOS_GATEWAY_WEBROOT")
                .or(fc.webroot)
                .map_or_else(|| PathBuf::from(DEFAULT_WEBROOT), PathBuf::from),
        };

        // Webhook config (env > toml > default)
        let url = env("SONOS_WEBHOOK")
            .or(fc.webhook)
            .filter(|u| !u.is_empty())
            .map(validate_url)
            .transpose()?;
        let cover_url = env("SONOS_WEBHOOK_COVER")
            .or(fc.webhook_cover)
            .filter(|u| !u.is_empty())
            .map(validate_url)
            .transpose()?;

        let header_name = env("SONOS_WEBHOOK_HEADER_NAME").or(fc.webhook_header_name);
        let header_contents = env("SONOS_WEBHOOK_HEADER_CONTENTS").or(fc.webhook_header_contents);
        let header = match (header_name, header_contents) {
            (Some(name), Some(value)) if !name.is_empty() && !value.is_empty() => {
                Some(validate_header(name, value)?)
            }
            (None, None) => None,
            _ => {
                tracing::warn!("webhook header needs both a name and contents, ignoring it");
                None
            }
        };

        let webhook = WebhookConfig {
            url,
            cover_url,
            type_field: env("SONOS_WEBHOOK_TYPE")
                .or(fc.webhook_type)
                .filter(|f| !f.is_empty())
                .unwrap_or_else(|| DEFAULT_TYPE_FIELD.to_string()),
            data_field: env("SONOS_WEBHOOK_DATA")
                .or(fc.webhook_data)
                .filter(|f| !f.is_empty())
                .unwrap_or_else(|| DEFAULT_DATA_FIELD.to_string()),
            header,
        };

        let players = fc
            .players
            .into_iter()
            .enumerate()
            .map(|(i, p)| {
                let uuid = p.uuid.unwrap_or_else(|| format!("static-{i}"));
                Player::new(p.name, uuid)
            })
            .collect();

        Ok(Self {
            api_server,
            webhook,
            players,
        })
    }
}

/// Check that a webhook URL parses as an absolute http(s) URL
fn validate_url(raw: String) -> Result<String> {
    let parsed = url::Url::parse(&raw)
        .map_err(|e| Error::Config(format!("invalid webhook url '{raw}': {e}")))?;

    match parsed.scheme() {
        "http" | "https" => Ok(raw),
        scheme => Err(Error::Config(format!(
            "invalid webhook url '{raw}': unsupported scheme '{scheme}'"
        ))),
    }
}

/// Check that the custom header can be sent as an HTTP header
fn validate_header(name: String, value: String) -> Result<CustomHeader> {
    HeaderName::from_bytes(name.as_bytes())
        .map_err(|e| Error::Config(format!("invalid webhook header name '{name}': {e}")))?;
    HeaderValue::from_str(&value)
        .map_err(|e| Error::Config(format!("invalid webhook header contents for '{name}': {e}")))?;

    Ok(CustomHeader { name, value })
}
