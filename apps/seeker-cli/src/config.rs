//! CLI configuration.
//!
//! Sources, lowest priority first:
//! - `~/.config/seeker/config.json`
//! - `SEEKER_URL` / `SEEKER_TOKEN` environment variables
//! - command-line flags (applied by `main`)

use std::path::{Path, PathBuf};
use std::time::Duration;

use seeker_protocol::DEFAULT_REQUEST_TIMEOUT;
use serde::{Deserialize, Serialize};

/// On-disk config file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConfigFile {
    #[serde(default)]
    server_url: String,
    #[serde(default)]
    token: String,
    #[serde(default)]
    request_timeout_secs: u64,
    #[serde(default)]
    destination: String,
}

/// Effective uploader configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct CliConfig {
    /// API base URL, e.g. `https://files.example.com/api`.
    pub server_url: Option<String>,
    /// Bearer token.
    pub token: Option<String>,
    /// Timeout for init, chunk and cancel requests.
    pub request_timeout: Duration,
    /// Default destination directory on the server.
    pub destination: String,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            server_url: None,
            token: None,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            destination: "/".into(),
        }
    }
}

impl CliConfig {
    /// Loads the config file and applies environment overrides.
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(&config_path(), |key| std::env::var(key).ok())
    }

    fn load_from(path: &Path, env: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let mut config = CliConfig::default();

        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            if let Ok(file) = serde_json::from_str::<ConfigFile>(&content) {
                config.apply_file(file);
            } else {
                tracing::warn!(
                    path = %path.display(),
                    "failed to parse config, using defaults"
                );
            }
        }

        if let Some(url) = env("SEEKER_URL").filter(|v| !v.is_empty()) {
            config.server_url = Some(url);
        }
        if let Some(token) = env("SEEKER_TOKEN").filter(|v| !v.is_empty()) {
            config.token = Some(token);
        }

        Ok(config)
    }

    fn apply_file(&mut self, file: ConfigFile) {
        if !file.server_url.is_empty() {
            self.server_url = Some(file.server_url);
        }
        if !file.token.is_empty() {
            self.token = Some(file.token);
        }
        if file.request_timeout_secs > 0 {
            self.request_timeout = Duration::from_secs(file.request_timeout_secs);
        }
        if !file.destination.is_empty() {
            self.destination = file.destination;
        }
    }
}

fn config_path() -> PathBuf {
    config_base_dir().join("seeker").join("config.json")
}

fn config_base_dir() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        let appdata =
            std::env::var("APPDATA").unwrap_or_else(|_| "C:\\Users\\Default\\AppData".into());
        PathBuf::from(appdata)
    }

    #[cfg(not(target_os = "windows"))]
    {
        let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".into());
        PathBuf::from(home).join(".config")
    }
}
