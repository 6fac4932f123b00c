//! Ledger business logic - the append-only set of committed transactions.
//!
//! Transactions are only ever inserted; corrections are new rows. Inserts happen
//! exclusively through the draft coordinator, inside the caller's locked
//! database transaction.

use crate::{
    core::entry::Entry,
    entities::{Transaction, transaction},
    errors::{Error, Result},
};
use chrono::{DateTime, Utc};
use sea_orm::{QueryOrder, Set, prelude::*};

/// Validates and inserts a complete entry for `user_id`.
///
/// # Arguments
/// * `conn` - Connection or open transaction (the caller holds the user lock)
/// * `user_id` - Owner of the new row
/// * `entry` - Complete entry; amount must be finite and positive
/// * `now` - Creation timestamp
pub async fn record_transaction<C: ConnectionTrait>(
    conn: &C,
    user_id: i64,
    entry: &Entry,
    now: DateTime<Utc>,
) -> Result<transaction::Model> {
    if !entry.amount.is_finite() || entry.amount <= 0.0 {
        return Err(Error::InvalidAmount {
            amount: entry.amount,
        });
    }
    if entry.category.trim().is_empty() {
        return Err(Error::EmptyCategory);
    }

    let model = transaction::ActiveModel {
        user_id: Set(user_id),
        transaction_type: Set(entry.kind.as_str().to_string()),
        amount: Set(entry.amount),
        currency: Set(entry.currency.clone()),
        category: Set(entry.category.trim().to_string()),
        description: Set(entry.description.clone()),
        occurred_at: Set(entry.occurred_at),
        created_at: Set(now),
        ..Default::default()
    };
    let saved = model.insert(conn).await?;
    tracing::info!(
        user_id,
        transaction_id = saved.id,
        kind = %saved.transaction_type,
        amount = saved.amount,
        category = %saved.category,
        "Transaction committed"
    );
    Ok(saved)
}

/// Transactions for `user_id` with `start <= occurred_at <= end`, oldest first.
pub async fn transactions_in_range<C: ConnectionTrait>(
    conn: &C,
    user_id: i64,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Result<Vec<transaction::Model>> {
    Transaction::find()
        .filter(transaction::Column::UserId.eq(user_id))
        .filter(transaction::Column::OccurredAt.gte(start))
        .filter(transaction::Column::OccurredAt.lte(end))
        .order_by_asc(transaction::Column::OccurredAt)
        .all(conn)
        .await
        .map_err(Into::into)
}

/// Number of committed transactions for `user_id`.
pub async fn count_transactions<C: ConnectionTrait>(conn: &C, user_id: i64) -> Result<u64> {
    Transaction::find()
        .filter(transaction::Column::UserId.eq(user_id))
        .count(conn)
        .await
        .map_err(Into::into)
}
