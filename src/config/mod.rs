/// Database configuration and connection management
pub mod database;

/// Runtime settings loaded from config.toml and the environment
pub mod settings;
