//! Unified error type for `LedgerBuddy`.
//!
//! Conversational negatives (unsupported language, rate limiting, invalid codes)
//! are modelled as ordinary result enums in `core`; this type only carries
//! failures the user cannot fix by rephrasing.

use thiserror::Error;

/// Errors raised by storage, configuration and external collaborators.
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid or unreadable configuration
    #[error("Configuration error: {message}")]
    Config {
        /// Human-readable description
        message: String,
    },

    /// Any failure reported by the database layer
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// Amount is zero, negative or not a finite number
    #[error("Invalid amount: {amount}")]
    InvalidAmount {
        /// The rejected amount
        amount: f64,
    },

    /// A committed entry was missing its category label
    #[error("Category cannot be empty")]
    EmptyCategory,

    /// No user row exists for the given key
    #[error("User not found: {key}")]
    UserNotFound {
        /// Phone number or id that was looked up
        key: String,
    },

    /// The AI fallback parser could not produce a candidate
    #[error("AI fallback unavailable: {message}")]
    AiFallback {
        /// Provider-side description, never shown to users
        message: String,
    },

    /// Transport failure talking to the AI provider
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Malformed JSON from a collaborator
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error (config file, socket binding)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Missing or malformed environment variable
    #[error("Environment variable error: {0}")]
    EnvVar(#[from] std::env::VarError),
}

/// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;
