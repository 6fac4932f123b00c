//! Redelivery log - replies already given for delivered messages.
//!
//! Transports retry deliveries. A message carrying a transport id is recognised by
//! that id forever; one without an id is recognised by its normalised text inside a
//! short window. Lookups and inserts run under the per-user lock.

use crate::{
    core::language::fold,
    entities::{InboundMessage, inbound_message},
    errors::Result,
};
use chrono::{DateTime, Duration, Utc};
use sea_orm::{QueryOrder, Set, prelude::*};

const ID_PREFIX: &str = "id:";
const TEXT_PREFIX: &str = "text:";

/// Builds the redelivery key for a message.
#[must_use]
pub fn message_key(text: &str, message_id: Option<&str>) -> String {
    match message_id.map(str::trim).filter(|id| !id.is_empty()) {
        Some(id) => format!("{ID_PREFIX}{id}"),
        None => {
            let normalized = fold(text).split_whitespace().collect::<Vec<_>>().join(" ");
            format!("{TEXT_PREFIX}{normalized}")
        }
    }
}

/// Returns the stored reply if `key` was already handled for this user.
///
/// # Arguments
/// * `key` - Output of [`message_key`]
/// * `now` - Current instant
/// * `window` - How far back text keys are considered redeliveries
pub async fn find_duplicate<C: ConnectionTrait>(
    conn: &C,
    user_id: i64,
    key: &str,
    now: DateTime<Utc>,
    window: Duration,
) -> Result<Option<String>> {
    let mut query = InboundMessage::find()
        .filter(inbound_message::Column::UserId.eq(user_id))
        .filter(inbound_message::Column::MessageKey.eq(key));
    if key.starts_with(TEXT_PREFIX) {
        query = query.filter(inbound_message::Column::CreatedAt.gte(now - window));
    }

    let found = query
        .order_by_desc(inbound_message::Column::CreatedAt)
        .one(conn)
        .await?;
    Ok(found.map(|m| m.reply))
}

/// Records the reply given for `key`.
///
/// Text-keyed rows of this user older than `window` can no longer match a
/// redelivery and are removed on the way.
pub async fn record<C: ConnectionTrait>(
    conn: &C,
    user_id: i64,
    key: &str,
    reply: &str,
    now: DateTime<Utc>,
    window: Duration,
) -> Result<()> {
    let pruned = InboundMessage::delete_many()
        .filter(inbound_message::Column::UserId.eq(user_id))
        .filter(inbound_message::Column::MessageKey.starts_with(TEXT_PREFIX))
        .filter(inbound_message::Column::CreatedAt.lt(now - window))
        .exec(conn)
        .await?;
    if pruned.rows_affected > 0 {
        tracing::debug!(user_id, pruned = pruned.rows_affected, "Pruned expired message keys");
    }

    let model = inbound_message::ActiveModel {
        user_id: Set(user_id),
        message_key: Set(key.to_string()),
        reply: Set(reply.to_string()),
        created_at: Set(now),
        ..Default::default()
    };
    model.insert(conn).await?;
    Ok(())
}
