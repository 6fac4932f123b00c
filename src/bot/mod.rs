//! Bot layer - conversation routing, reply texts and the HTTP surface
//!
//! This module turns inbound chat messages into replies using the core
//! operations, and exposes them to the messaging transport over HTTP.

/// Webhook, chat and code-verification endpoints
pub mod http;
/// Fixed reply texts and formatters
pub mod replies;
/// Intent classification and per-message handling
pub mod router;

use crate::{config::settings::Settings, core::parser::EntryParser};
use sea_orm::DatabaseConnection;

/// Shared data available to every handler.
/// This structure holds the database connection, the runtime settings and
/// the configured entry parser.
pub struct BotData {
    /// Database connection for all database operations
    pub database: DatabaseConnection,
    /// Runtime settings
    pub settings: Settings,
    /// Entry parser (rules, plus the AI fallback when enabled)
    pub parser: EntryParser,
}

impl BotData {
    /// Creates a new `BotData` instance.
    #[must_use]
    pub const fn new(database: DatabaseConnection, settings: Settings, parser: EntryParser) -> Self {
        Self {
            database,
            settings,
            parser,
        }
    }
}

pub use router::{InboundMessage, respond};
