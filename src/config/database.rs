//! Database configuration module for `LedgerBuddy`.
//!
//! This module handles `SQLite` database connection and table creation using `SeaORM`.
//! Tables are generated from the entity definitions with `Schema::create_table_from_entity`,
//! so the schema always matches the Rust structs. Secondary indexes backing the per-user
//! range lookups are created alongside the tables.

use crate::entities::{
    Draft, DraftColumn, InboundMessage, InboundMessageColumn, Otp, OtpColumn, Transaction,
    TransactionColumn, User,
};
use crate::errors::Result;
use sea_orm::sea_query::Index;
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, Schema};
use std::path::Path;

/// Default location of the `SQLite` file when `DATABASE_URL` is not set.
pub const DEFAULT_DATABASE_URL: &str = "sqlite://data/ledger_buddy.sqlite?mode=rwc";

/// Establishes a connection to the database at `database_url`.
///
/// For file-backed `SQLite` URLs the parent directory is created first.
pub async fn create_connection(database_url: &str) -> Result<DatabaseConnection> {
    if let Some(parent) = sqlite_file_parent(database_url) {
        std::fs::create_dir_all(parent)?;
    }
    Database::connect(database_url).await.map_err(Into::into)
}

/// Directory holding the file of a `sqlite://` URL, if it has one.
fn sqlite_file_parent(database_url: &str) -> Option<&Path> {
    let path = database_url.strip_prefix("sqlite://")?;
    let path = path.split('?').next().unwrap_or(path);
    Path::new(path)
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
}

/// Creates all tables and indexes if they do not exist yet.
///
/// Safe to call on every start-up.
pub async fn create_tables<C>(db: &C) -> Result<()>
where
    C: ConnectionTrait,
{
    let builder = db.get_database_backend();
    let schema = Schema::new(builder);

    let tables = [
        schema.create_table_from_entity(User).if_not_exists().to_owned(),
        schema
            .create_table_from_entity(Transaction)
            .if_not_exists()
            .to_owned(),
        schema.create_table_from_entity(Draft).if_not_exists().to_owned(),
        schema.create_table_from_entity(Otp).if_not_exists().to_owned(),
        schema
            .create_table_from_entity(InboundMessage)
            .if_not_exists()
            .to_owned(),
    ];
    for table in &tables {
        db.execute(builder.build(table)).await?;
    }

    let indexes = [
        Index::create()
            .name("idx_transactions_user_occurred")
            .table(Transaction)
            .col(TransactionColumn::UserId)
            .col(TransactionColumn::OccurredAt)
            .if_not_exists()
            .to_owned(),
        Index::create()
            .name("idx_otps_user_created")
            .table(Otp)
            .col(OtpColumn::UserId)
            .col(OtpColumn::CreatedAt)
            .if_not_exists()
            .to_owned(),
        Index::create()
            .name("idx_drafts_user_created")
            .table(Draft)
            .col(DraftColumn::UserId)
            .col(DraftColumn::CreatedAt)
            .if_not_exists()
            .to_owned(),
        Index::create()
            .name("idx_inbound_user_key")
            .table(InboundMessage)
            .col(InboundMessageColumn::UserId)
            .col(InboundMessageColumn::MessageKey)
            .if_not_exists()
            .to_owned(),
    ];
    for index in &indexes {
        db.execute(builder.build(index)).await?;
    }

    Ok(())
}
