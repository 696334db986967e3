//! Settings configuration loaded from TOML files.
//!
//! Non-sensitive configuration stored in the XDG config directory
//! (~/.config/shitu/config.toml).

use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::message::DisplayStyle;

/// Default TOML configuration file content
const DEFAULT_CONFIG_TOML: &str = r#"# shitu configuration file
# Located at: ~/.config/shitu/config.toml
#
# Secrets are loaded from environment variables:
#   - DISCORD_BOT_TOKEN

[recognition]
api_url = "https://api.animetrace.com/v1/search"
# Upper bound for each network call (URL lookup, image download, upload)
timeout_seconds = 30
# Images larger than this (longest side, px) are downscaled before upload
max_dimension = 1024
jpeg_quality = 85

[session]
# How long a user may take to send the image after a bare command
timeout_seconds = 30

[avatar]
# {id} is replaced with the resolved user identity
url_template = "https://q.qlogo.cn/headimg_dl?dst_uin={id}&spec=640"

[commands]
prefixes = ["/"]

[render]
# "decorated" or "plain"
style = "decorated"

[discord]
enabled = true

[logging]
level = "info"
"#;

/// Settings loaded from TOML configuration file.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Settings {
    /// Recognition service settings
    #[serde(default)]
    pub recognition: RecognitionSettings,

    /// Waiting-session settings
    #[serde(default)]
    pub session: SessionSettings,

    /// Avatar lookup settings
    #[serde(default)]
    pub avatar: AvatarSettings,

    /// Command matching settings
    #[serde(default)]
    pub commands: CommandSettings,

    /// Result rendering settings
    #[serde(default)]
    pub render: RenderSettings,

    /// Discord bot configuration
    #[serde(default)]
    pub discord: DiscordSettings,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingSettings,
}

/// Recognition service settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RecognitionSettings {
    /// Endpoint accepting both URL and base64 submissions
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Timeout applied to every network call, in seconds
    #[serde(default = "default_recognition_timeout_seconds")]
    pub timeout_seconds: u64,

    /// Longest side allowed for re-encoded uploads
    #[serde(default = "default_max_dimension")]
    pub max_dimension: u32,

    /// JPEG quality for re-encoded uploads (1-100)
    #[serde(default = "default_jpeg_quality")]
    pub jpeg_quality: u8,
}

/// Waiting-session settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SessionSettings {
    #[serde(default = "default_session_timeout_seconds")]
    pub timeout_seconds: u64,
}

/// Avatar lookup settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AvatarSettings {
    /// Avatar URL template; `{id}` is substituted
    #[serde(default = "default_avatar_url_template")]
    pub url_template: String,
}

/// Command matching settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CommandSettings {
    /// Wake prefixes that introduce a command (e.g. "/")
    #[serde(default = "default_command_prefixes")]
    pub prefixes: Vec<String>,
}

/// Result rendering settings
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RenderSettings {
    #[serde(default)]
    pub style: DisplayStyle,
}

/// Discord bot settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DiscordSettings {
    /// Whether Discord bot is enabled
    #[serde(default = "default_true")]
    pub enabled: bool,
}

/// Logging settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingSettings {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub level: String,
}

// Default value functions

fn default_api_url() -> String {
    "https://api.animetrace.com/v1/search".to_string()
}

fn default_recognition_timeout_seconds() -> u64 {
    30
}

fn default_max_dimension() -> u32 {
    1024
}

fn default_jpeg_quality() -> u8 {
    85
}

fn default_session_timeout_seconds() -> u64 {
    30
}

fn default_avatar_url_template() -> String {
    "https://q.qlogo.cn/headimg_dl?dst_uin={id}&spec=640".to_string()
}

fn default_command_prefixes() -> Vec<String> {
    vec!["/".to_string()]
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

impl RecognitionSettings {
    /// Bound applied to each recognition-side network call.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

impl SessionSettings {
    /// Lifetime of a waiting session.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

impl Default for RecognitionSettings {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            timeout_seconds: default_recognition_timeout_seconds(),
            max_dimension: default_max_dimension(),
            jpeg_quality: default_jpeg_quality(),
        }
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            timeout_seconds: default_session_timeout_seconds(),
        }
    }
}

impl Default for AvatarSettings {
    fn default() -> Self {
        Self {
            url_template: default_avatar_url_template(),
        }
    }
}

impl Default for CommandSettings {
    fn default() -> Self {
        Self {
            prefixes: default_command_prefixes(),
        }
    }
}

impl Default for DiscordSettings {
    fn default() -> Self {
        Self {
            enabled: default_true(),
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// Errors that can occur when loading settings
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Config directory not found")]
    ConfigDirNotFound,
}

impl Settings {
    /// Load settings from the TOML configuration file.
    ///
    /// If the config file doesn't exist, creates it with default values.
    pub fn load() -> Result<Self, SettingsError> {
        let config_path = Self::config_path()?;

        if !config_path.exists() {
            tracing::info!("Creating default configuration at {:?}", config_path);
            Self::create_default_config(&config_path)?;
        }

        let content = fs::read_to_string(&config_path)?;
        Self::from_toml(&content)
    }

    /// Parse settings from TOML content.
    pub fn from_toml(content: &str) -> Result<Self, SettingsError> {
        let settings: Self = toml::from_str(content)?;
        Ok(settings)
    }

    /// Serialize settings to TOML content.
    pub fn to_toml(&self) -> Result<String, SettingsError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Get the configuration file path.
    ///
    /// Uses `SHITU_CONFIG_DIR` when set, otherwise `~/.config/shitu/config.toml`.
    pub fn config_path() -> Result<PathBuf, SettingsError> {
        if let Ok(override_dir) = std::env::var("SHITU_CONFIG_DIR") {
            let dir = PathBuf::from(override_dir);
            return Ok(dir.join("config.toml"));
        }

        let config_dir = dirs::config_dir()
            .ok_or(SettingsError::ConfigDirNotFound)?
            .join("shitu");

        Ok(config_dir.join("config.toml"))
    }

    fn create_default_config(path: &PathBuf) -> Result<(), SettingsError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        fs::write(path, DEFAULT_CONFIG_TOML)?;

        Ok(())
    }

    /// Save settings to a specific file path.
    pub fn save_to_path(&self, path: &PathBuf) -> Result<(), SettingsError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = self.to_toml()?;
        fs::write(path, content)?;
        Ok(())
    }
}
