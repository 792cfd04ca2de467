use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";

fn default_timeout_ms() -> u64 {
    10_000
}

fn default_dismiss_after_ms() -> u64 {
    5_000
}

/// A validation error in the configuration
#[derive(Debug, Clone)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]: {}", self.field, self.message)
    }
}

/// Notice banner settings
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct NotificationsConfig {
    #[serde(default)]
    pub dismiss_after_ms: Option<u64>,
}

/// List region settings
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct ListsConfig {
    /// Sent as `limit` on every list request; the server default applies when unset
    #[serde(default)]
    pub page_size: Option<u32>,
}

/// Session transcript settings
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct LogConfig {
    #[serde(default)]
    pub enabled: Option<bool>,
    #[serde(default)]
    pub dir: Option<PathBuf>,
}

/// Main configuration structure
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Config {
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub timeout_ms: Option<u64>,
    #[serde(default)]
    pub notifications: NotificationsConfig,
    #[serde(default)]
    pub lists: ListsConfig,
    #[serde(default)]
    pub log: LogConfig,
}

impl Config {
    /// Load configuration from default paths
    /// Priority: local (.shelf/config.local.toml) > project (.shelf/config.toml) > user (~/.shelf/config.toml)
    pub fn load() -> Result<Self> {
        let mut config = Self::default();

        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".shelf").join("config.toml");
            if user_config.exists() {
                config.merge(Self::load_from(&user_config)?);
            }
        }

        let project_config = Path::new(".shelf").join("config.toml");
        if project_config.exists() {
            config.merge(Self::load_from(&project_config)?);
        }

        // Should be gitignored
        let local_config = Path::new(".shelf").join("config.local.toml");
        if local_config.exists() {
            config.merge(Self::load_from(&local_config)?);
        }

        Ok(config)
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config {}", path.display()))?;
        Ok(config)
    }

    /// Merge another config into this one; values set in `other` win
    pub fn merge(&mut self, other: Config) {
        if other.base_url.is_some() {
            self.base_url = other.base_url;
        }
        if other.timeout_ms.is_some() {
            self.timeout_ms = other.timeout_ms;
        }
        if other.notifications.dismiss_after_ms.is_some() {
            self.notifications.dismiss_after_ms = other.notifications.dismiss_after_ms;
        }
        if other.lists.page_size.is_some() {
            self.lists.page_size = other.lists.page_size;
        }
        if other.log.enabled.is_some() {
            self.log.enabled = other.log.enabled;
        }
        if other.log.dir.is_some() {
            self.log.dir = other.log.dir;
        }
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms.unwrap_or_else(default_timeout_ms))
    }

    pub fn dismiss_after(&self) -> Duration {
        Duration::from_millis(
            self.notifications
                .dismiss_after_ms
                .unwrap_or_else(default_dismiss_after_ms),
        )
    }

    pub fn log_enabled(&self) -> bool {
        self.log.enabled.unwrap_or(true)
    }

    pub fn log_dir(&self) -> PathBuf {
        self.log
            .dir
            .clone()
            .unwrap_or_else(|| Path::new(".shelf").join("sessions"))
    }

    /// Validate configuration and return any errors found
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        match url::Url::parse(self.base_url()) {
            Ok(url) if url.scheme() == "http" || url.scheme() == "https" => {}
            Ok(url) => errors.push(ValidationError {
                field: "base_url".to_string(),
                message: format!("Unsupported scheme '{}', use http or https", url.scheme()),
            }),
            Err(e) => errors.push(ValidationError {
                field: "base_url".to_string(),
                message: format!("Invalid URL '{}': {}", self.base_url(), e),
            }),
        }

        if self.timeout_ms == Some(0) {
            errors.push(ValidationError {
                field: "timeout_ms".to_string(),
                message: "Must be greater than 0".to_string(),
            });
        }

        if self.notifications.dismiss_after_ms == Some(0) {
            errors.push(ValidationError {
                field: "notifications.dismiss_after_ms".to_string(),
                message: "Must be greater than 0".to_string(),
            });
        }

        if self.lists.page_size == Some(0) {
            errors.push(ValidationError {
                field: "lists.page_size".to_string(),
                message: "Must be greater than 0".to_string(),
            });
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
