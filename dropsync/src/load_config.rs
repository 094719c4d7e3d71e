use std::env;
use std::fmt;

use dropsync_core::error::ConfigError;
use tracing::{error, info};

pub const TOKEN_VAR: &str = "DROPBOX_ACCESS_TOKEN";
pub const API_URL_VAR: &str = "DROPSYNC_API_URL";
pub const CONTENT_URL_VAR: &str = "DROPSYNC_CONTENT_URL";

pub const DEFAULT_API_URL: &str = "https://api.dropboxapi.com";
pub const DEFAULT_CONTENT_URL: &str = "https://content.dropboxapi.com";

/// Everything the remote client needs, resolved once before any pair is synced.
#[derive(Clone)]
pub struct Settings {
    pub token: String,
    pub api_url: String,
    pub content_url: String,
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("token", &"<redacted>")
            .field("api_url", &self.api_url)
            .field("content_url", &self.content_url)
            .finish()
    }
}

/// Loads `.env` if present, then reads settings from the environment.
pub fn load_config() -> Result<Settings, ConfigError> {
    match dotenvy::dotenv() {
        Ok(path) => info!(env_file = %path.display(), "Loaded .env file"),
        Err(e) if e.not_found() => {}
        Err(e) => error!(error = ?e, "Ignoring unreadable .env file"),
    }
    settings_from_env()
}

/// Reads settings from the process environment only.
pub fn settings_from_env() -> Result<Settings, ConfigError> {
    let token = match env::var(TOKEN_VAR) {
        Ok(token) if token.trim().is_empty() => {
            error!(var = TOKEN_VAR, "Access token is empty");
            return Err(ConfigError::EmptyVar { name: TOKEN_VAR });
        }
        Ok(token) => {
            info!(var = TOKEN_VAR, "Access token found in env");
            token.trim().to_owned()
        }
        Err(e) => {
            error!(error = ?e, var = TOKEN_VAR, "Access token environment variable not set");
            return Err(ConfigError::MissingVar { name: TOKEN_VAR });
        }
    };

    let api_url = base_url(API_URL_VAR, DEFAULT_API_URL)?;
    let content_url = base_url(CONTENT_URL_VAR, DEFAULT_CONTENT_URL)?;

    info!(%api_url, %content_url, "Settings loaded");
    Ok(Settings {
        token,
        api_url,
        content_url,
    })
}

fn base_url(name: &'static str, default: &str) -> Result<String, ConfigError> {
    let raw = match env::var(name) {
        Ok(raw) if !raw.trim().is_empty() => raw,
        _ => return Ok(default.to_owned()),
    };

    match reqwest::Url::parse(raw.trim()) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => {
            Ok(url.as_str().trim_end_matches('/').to_owned())
        }
        Ok(url) => Err(ConfigError::InvalidVar {
            name,
            reason: format!("unsupported scheme {:?}", url.scheme()),
        }),
        Err(e) => {
            error!(error = ?e, var = name, "Invalid base URL");
            Err(ConfigError::InvalidVar {
                name,
                reason: e.to_string(),
            })
        }
    }
}
