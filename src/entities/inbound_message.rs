//! Inbound message entity - Replies already produced for delivered messages.
//! Used to answer transport redeliveries without repeating side effects.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Handled inbound message
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "inbound_messages")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Sender
    pub user_id: i64,
    /// `id:<transport id>` or `text:<normalised text>`
    pub message_key: String,
    /// Reply that was returned the first time
    pub reply: String,
    /// When the message was handled
    pub created_at: DateTimeUtc,
}

/// `InboundMessage` is only ever queried by user id and key
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
