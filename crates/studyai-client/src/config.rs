//! Configuration types for the StudyAI client.
//!
//! Configuration is read from `studyai.json` in the working directory, with
//! every field optional. The backend address can additionally be overridden
//! through the `STUDYAI_WS_URL` environment variable.

use std::path::Path;
use std::time::Duration;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{Result, StudyError};

/// The default config file name.
const CONFIG_FILE_NAME: &str = "studyai.json";

/// Environment variable that overrides [`Config::server_url`].
pub const SERVER_URL_ENV: &str = "STUDYAI_WS_URL";

static WS_URL_PATTERN: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"^wss?://[^\s/?#]+(/[^\s?#]*)?$").ok());

/// Default backend base address.
fn default_server_url() -> String {
    "ws://localhost:8000".to_string()
}

/// Default delay before reconnecting after the channel closes.
const fn default_reconnect_delay_ms() -> u64 {
    3000
}

/// Default time a renderer waits for a card to flip back before showing the next one.
const fn default_flip_back_delay_ms() -> u64 {
    100
}

/// Main configuration for a StudyAI client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Base address of the generation backend (`ws://` or `wss://`).
    #[serde(default = "default_server_url")]
    pub server_url: String,

    /// Fixed delay between a channel closing and the next connection attempt.
    #[serde(default = "default_reconnect_delay_ms")]
    pub reconnect_delay_ms: u64,

    /// Flip-back animation time used by flashcard renderers.
    #[serde(default = "default_flip_back_delay_ms")]
    pub flip_back_delay_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_url: default_server_url(),
            reconnect_delay_ms: default_reconnect_delay_ms(),
            flip_back_delay_ms: default_flip_back_delay_ms(),
        }
    }
}

impl Config {
    /// Loads configuration from the current working directory.
    ///
    /// Looks for `studyai.json` in the current directory. If not found,
    /// returns the default configuration. The environment override is
    /// applied afterwards.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but contains invalid JSON, or if
    /// the resulting configuration is invalid.
    pub fn load() -> Result<Self> {
        let current_dir = std::env::current_dir().map_err(|e| {
            StudyError::config_parse(
                "<current directory>",
                format!("cannot determine current directory: {e}"),
            )
        })?;
        let mut config = Self::load_from_dir(&current_dir)?;
        config.apply_env_override(std::env::var(SERVER_URL_ENV).ok());
        config.validate()?;
        Ok(config)
    }

    /// Loads configuration from a specific directory.
    pub fn load_from_dir(dir: &Path) -> Result<Self> {
        let config_path = dir.join(CONFIG_FILE_NAME);
        Self::load_from_file(&config_path)
    }

    /// Loads configuration from a specific file path.
    ///
    /// If the file does not exist, returns default configuration.
    ///
    /// # Errors
    ///
    /// Returns `StudyError::ConfigParseError` if the file exists but contains
    /// invalid JSON, and `StudyError::ConfigValidationError` if the values
    /// are invalid.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let config = Self::default();
                config.validate()?;
                return Ok(config);
            }
            Err(e) => {
                return Err(StudyError::config_parse(
                    path,
                    format!("failed to read file: {e}"),
                ));
            }
        };

        let config: Self = serde_json::from_str(&contents)
            .map_err(|e| StudyError::config_parse(path, e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Replaces the server URL with `value` when it is set and non-blank.
    pub fn apply_env_override(&mut self, value: Option<String>) {
        if let Some(url) = value.filter(|v| !v.trim().is_empty()) {
            tracing::debug!(server_url = %url, "Using server URL from {}", SERVER_URL_ENV);
            self.server_url = url.trim().to_string();
        }
    }

    /// Validates the configuration values.
    ///
    /// - `server_url` must be a `ws://` or `wss://` address without query or fragment
    /// - `reconnect_delay_ms` must be greater than 0
    ///
    /// # Errors
    ///
    /// Returns `StudyError::ConfigValidationError` if any validation check fails.
    pub fn validate(&self) -> Result<()> {
        if self.server_url.trim().is_empty() {
            return Err(StudyError::config_validation(
                "serverUrl must not be empty",
                "Set serverUrl in studyai.json or STUDYAI_WS_URL (e.g. ws://localhost:8000)",
            ));
        }

        let is_ws_url = WS_URL_PATTERN
            .as_ref()
            .is_some_and(|re| re.is_match(&self.server_url));
        if !is_ws_url {
            return Err(StudyError::config_validation(
                format!("serverUrl '{}' is not a WebSocket address", self.server_url),
                "Use a ws:// or wss:// URL such as ws://localhost:8000",
            ));
        }

        if self.reconnect_delay_ms == 0 {
            return Err(StudyError::config_validation(
                "reconnectDelayMs must be greater than 0",
                "Set reconnectDelayMs to at least 1 in your studyai.json",
            ));
        }

        Ok(())
    }

    /// Returns the reconnect delay as a [`Duration`].
    #[must_use]
    pub const fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }

    /// Returns the flip-back delay as a [`Duration`].
    #[must_use]
    pub const fn flip_back_delay(&self) -> Duration {
        Duration::from_millis(self.flip_back_delay_ms)
    }

    /// Builds the channel address for a client id: `<server_url>/ws/<client_id>`.
    #[must_use]
    pub fn endpoint(&self, client_id: &str) -> String {
        format!("{}/ws/{client_id}", self.server_url.trim_end_matches('/'))
    }
}
