//! Submitter configuration.
//!
//! Read from `~/.config/intake/config.json` (`%APPDATA%\intake` on
//! Windows). A missing or unparsable file falls back to defaults. The
//! `INTAKE_ACCESS_TOKEN` environment variable overrides the stored token.

use std::path::{Path, PathBuf};
use std::time::Duration;

use intake_client::ClientConfig;
use intake_protocol::FormCode;
use intake_session::TransferConfig;
use serde::{Deserialize, Serialize};

const TOKEN_ENV: &str = "INTAKE_ACCESS_TOKEN";

/// Status polling settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollSettings {
    pub delay_ms: u64,
    pub max_attempts: u32,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            delay_ms: 1000,
            max_attempts: 60,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SubmitConfig {
    pub base_url: String,
    pub access_token: String,
    pub form_code: FormCode,
    /// Fixed part count. `None` picks the smallest count within limits.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub part_count: Option<usize>,
    pub parallel_uploads: usize,
    pub poll: PollSettings,
    pub request_timeout_secs: u64,
}

impl Default for SubmitConfig {
    fn default() -> Self {
        Self {
            base_url: intake_client::DEFAULT_BASE_URL.to_string(),
            access_token: String::new(),
            form_code: FormCode::default(),
            part_count: None,
            parallel_uploads: 1,
            poll: PollSettings::default(),
            request_timeout_secs: 120,
        }
    }
}

impl SubmitConfig {
    /// Loads from the default location, then applies the environment.
    pub fn load() -> anyhow::Result<Self> {
        let mut config = Self::load_from(&config_path()?)?;
        if let Ok(token) = std::env::var(TOKEN_ENV)
            && !token.is_empty()
        {
            config.access_token = token;
        }
        Ok(config)
    }

    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        match serde_json::from_str::<Self>(&content) {
            Ok(config) => Ok(config),
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "failed to parse config, using defaults"
                );
                Ok(Self::default())
            }
        }
    }

    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            base_url: self.base_url.clone(),
            access_token: self.access_token.clone(),
            timeout: Duration::from_secs(self.request_timeout_secs),
            ..ClientConfig::default()
        }
    }

    pub fn transfer_config(&self) -> TransferConfig {
        TransferConfig {
            status_poll_delay: Duration::from_millis(self.poll.delay_ms),
            status_poll_attempts: self.poll.max_attempts,
            form_code: self.form_code.clone(),
            parallel_uploads: self.parallel_uploads.max(1),
            ..TransferConfig::default()
        }
    }
}

fn config_path() -> anyhow::Result<PathBuf> {
    Ok(config_base_dir()?.join("intake").join("config.json"))
}

fn config_base_dir() -> anyhow::Result<PathBuf> {
    if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME")
        && !xdg.is_empty()
    {
        return Ok(PathBuf::from(xdg));
    }

    #[cfg(target_os = "windows")]
    {
        let appdata = std::env::var("APPDATA")?;
        Ok(PathBuf::from(appdata))
    }

    #[cfg(not(target_os = "windows"))]
    {
        let home = std::env::var("HOME")?;
        Ok(PathBuf::from(home).join(".config"))
    }
}
