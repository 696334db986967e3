//! Configuration management for shitu.
//!
//! Secrets come from environment variables, settings from a TOML file.
//!
//! ## Secrets (Environment Variables)
//! - `DISCORD_BOT_TOKEN` - Discord bot token
//!
//! ## Settings (TOML File)
//! Located at `~/.config/shitu/config.toml`:
//! ```toml
//! [recognition]
//! api_url = "https://api.animetrace.com/v1/search"
//! timeout_seconds = 30
//!
//! [session]
//! timeout_seconds = 30
//!
//! [discord]
//! enabled = true
//! ```

mod secrets;
mod settings;

pub use secrets::{Secrets, SecretsError};
pub use settings::{
    AvatarSettings, CommandSettings, DiscordSettings, LoggingSettings, RecognitionSettings,
    RenderSettings, SessionSettings, Settings, SettingsError,
};

/// Load .env file if it exists
pub fn load_dotenv() {
    // Silently ignore errors (file might not exist)
    let _ = dotenvy::dotenv();
}

/// Combined configuration containing both secrets and settings.
#[derive(Debug, Clone)]
pub struct Config {
    /// Secrets loaded from environment variables
    pub secrets: Secrets,
    /// Settings loaded from TOML configuration file
    pub settings: Settings,
}

/// Errors that can occur when loading configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Secrets error: {0}")]
    Secrets(#[from] SecretsError),

    #[error("Settings error: {0}")]
    Settings(#[from] SettingsError),

    #[error("No command prefixes configured")]
    NoCommandPrefixes,
}

impl Config {
    /// Load configuration from all sources.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The TOML file cannot be read or parsed
    /// - Discord is enabled but `DISCORD_BOT_TOKEN` is missing
    /// - `commands.prefixes` is empty
    pub fn load() -> Result<Self, ConfigError> {
        let secrets = Secrets::from_env();
        let settings = Settings::load()?;
        Self::validate(secrets, settings)
    }

    fn validate(secrets: Secrets, settings: Settings) -> Result<Self, ConfigError> {
        if settings.discord.enabled {
            secrets.require_discord_token()?;
        }
        if settings.commands.prefixes.is_empty() {
            return Err(ConfigError::NoCommandPrefixes);
        }
        Ok(Self { secrets, settings })
    }

    /// Get the Discord bot token (if configured).
    pub fn discord_bot_token(&self) -> Option<&str> {
        self.secrets.discord_bot_token.as_deref()
    }

    /// Whether the Discord adapter should start.
    pub fn discord_enabled(&self) -> bool {
        self.settings.discord.enabled
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_discord_enabled_requires_token() {
        let mut settings = Settings::default();
        settings.discord.enabled = true;

        let result = Config::validate(Secrets::default(), settings);
        assert!(matches!(result, Err(ConfigError::Secrets(_))));
    }

    #[test]
    fn test_discord_enabled_by_default() {
        let result = Config::validate(Secrets::default(), Settings::default());
        assert!(matches!(result, Err(ConfigError::Secrets(_))));

        let secrets = Secrets {
            discord_bot_token: Some("token".to_string()),
        };
        let config = Config::validate(secrets, Settings::default()).unwrap();
        assert!(config.discord_enabled());
        assert_eq!(config.discord_bot_token(), Some("token"));
    }

    #[test]
    fn test_discord_disabled_needs_no_token() {
        let mut settings = Settings::default();
        settings.discord.enabled = false;

        let config = Config::validate(Secrets::default(), settings).unwrap();
        assert!(!config.discord_enabled());
        assert!(config.discord_bot_token().is_none());
    }

    #[test]
    fn test_empty_prefixes_rejected() {
        let mut settings = Settings::default();
        settings.discord.enabled = false;
        settings.commands.prefixes.clear();

        let result = Config::validate(Secrets::default(), settings);
        assert!(matches!(result, Err(ConfigError::NoCommandPrefixes)));
    }
}
