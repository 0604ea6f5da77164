use std::path::PathBuf;

/// Errors loading or saving scheduler configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to access config file '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Could not determine home directory")]
    NoHomeDir,
}

/// Errors from plugin command and ticker registration
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RegistryError {
    #[error("Unknown command: {0}")]
    UnknownCommand(String),

    #[error("Command '{name}' already registered by {owner}")]
    DuplicateCommand { name: String, owner: String },

    #[error("Plugin '{0}' is already registered")]
    DuplicatePlugin(String),

    #[error("Invalid ticker '{name}': {reason}")]
    InvalidTicker { name: String, reason: String },

    #[error("Invalid arguments for '{command}': {reason}")]
    InvalidArguments { command: String, reason: String },
}
