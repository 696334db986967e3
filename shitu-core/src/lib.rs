pub mod config;
pub mod message;

pub use config::{
    Config, ConfigError, Secrets, SecretsError, Settings, SettingsError, load_dotenv,
};
pub use message::{DisplayStyle, InboundMessage, MessageElement, ModelSelector};
