//! Shared test utilities for `LedgerBuddy`.
//!
//! This module provides common helper functions for setting up test databases,
//! a fixed clock, and stand-in AI extractors.

use crate::{
    bot::BotData,
    config::settings::Settings,
    core::{
        entry::ParseContext,
        extractor::{AiCandidate, FallbackExtractor},
        parser::EntryParser,
        user,
    },
    entities,
    errors::{Error, Result},
};
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use sea_orm::DatabaseConnection;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// Creates an in-memory `SQLite` database with all tables initialized.
/// This is the standard setup for all integration tests.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

/// Fixed "now": Wednesday 14 October 2026, 10:00 in Lima (15:00 UTC).
#[allow(clippy::unwrap_used)]
pub fn test_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 10, 14, 15, 0, 0).unwrap()
}

/// Parse context with default settings at `now`.
pub fn test_context(now: DateTime<Utc>) -> ParseContext {
    ParseContext::from_settings(&Settings::default(), now)
}

/// Creates a user for `number` at [`test_now`].
pub async fn create_test_user(
    db: &DatabaseConnection,
    number: &str,
) -> Result<entities::user::Model> {
    user::ensure_user(db, number, test_now()).await
}

/// Bot data over a fresh in-memory database, default settings and the rule engine only.
pub async fn test_bot_data() -> Result<BotData> {
    let db = setup_test_db().await?;
    Ok(BotData::new(db, Settings::default(), EntryParser::rules_only()))
}

/// Extractor that always returns the same candidate and counts its calls.
pub struct StaticExtractor {
    candidate: Option<AiCandidate>,
    calls: AtomicUsize,
}

impl StaticExtractor {
    /// Returns `candidate` for every message.
    pub const fn new(candidate: Option<AiCandidate>) -> Self {
        Self {
            candidate,
            calls: AtomicUsize::new(0),
        }
    }

    /// How many times `extract` ran.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FallbackExtractor for StaticExtractor {
    async fn extract(&self, _text: &str) -> Result<Option<AiCandidate>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.candidate.clone())
    }
}

/// Extractor whose provider is always down.
pub struct FailingExtractor;

#[async_trait]
impl FallbackExtractor for FailingExtractor {
    async fn extract(&self, _text: &str) -> Result<Option<AiCandidate>> {
        Err(Error::AiFallback {
            message: "provider unavailable".to_string(),
        })
    }
}

/// Extractor that writes another user's row through its own connection handle
/// before answering, so a test can tell whether the database was free meanwhile.
pub struct WritingExtractor {
    database: DatabaseConnection,
    user_id: i64,
    candidate: Option<AiCandidate>,
    wrote: AtomicBool,
}

impl WritingExtractor {
    /// Stamps `user_id` through `database`, then returns `candidate`.
    pub const fn new(
        database: DatabaseConnection,
        user_id: i64,
        candidate: Option<AiCandidate>,
    ) -> Self {
        Self {
            database,
            user_id,
            candidate,
            wrote: AtomicBool::new(false),
        }
    }

    /// Whether the write succeeded
    pub fn wrote(&self) -> bool {
        self.wrote.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FallbackExtractor for WritingExtractor {
    async fn extract(&self, _text: &str) -> Result<Option<AiCandidate>> {
        user::lock_user(&self.database, self.user_id, test_now()).await?;
        self.wrote.store(true, Ordering::SeqCst);
        Ok(self.candidate.clone())
    }
}
