//! Secrets configuration loaded from environment variables only.

use std::env;

/// Secrets loaded exclusively from environment variables.
#[derive(Debug, Clone, Default)]
pub struct Secrets {
    /// Discord bot token (env: DISCORD_BOT_TOKEN)
    pub discord_bot_token: Option<String>,
}

/// Errors that can occur when loading secrets
#[derive(Debug, thiserror::Error)]
pub enum SecretsError {
    #[error("Missing required secret: {0}")]
    MissingSecret(String),
}

impl Secrets {
    /// Load secrets from environment variables.
    ///
    /// Also loads a .env file if present (development convenience).
    pub fn from_env() -> Self {
        super::load_dotenv();

        Self::from_env_inner()
    }

    pub(crate) fn from_env_inner() -> Self {
        Self {
            discord_bot_token: env::var("DISCORD_BOT_TOKEN")
                .ok()
                .filter(|token| !token.trim().is_empty()),
        }
    }

    /// Discord token, or an error naming the missing variable.
    pub fn require_discord_token(&self) -> Result<&str, SecretsError> {
        self.discord_bot_token
            .as_deref()
            .ok_or_else(|| SecretsError::MissingSecret("DISCORD_BOT_TOKEN".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // Tests that modify environment variables must not run concurrently
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    #[test]
    fn test_token_from_env() {
        let _lock = ENV_MUTEX.lock().unwrap();
        unsafe {
            env::set_var("DISCORD_BOT_TOKEN", "discord-token");
        }

        let secrets = Secrets::from_env_inner();
        assert_eq!(secrets.discord_bot_token.as_deref(), Some("discord-token"));
        assert_eq!(secrets.require_discord_token().unwrap(), "discord-token");
    }

    #[test]
    fn test_blank_token_is_missing() {
        let _lock = ENV_MUTEX.lock().unwrap();
        unsafe {
            env::set_var("DISCORD_BOT_TOKEN", "  ");
        }

        let secrets = Secrets::from_env_inner();
        assert!(secrets.discord_bot_token.is_none());
        let err = secrets.require_discord_token().unwrap_err();
        assert!(err.to_string().contains("DISCORD_BOT_TOKEN"));
    }
}
