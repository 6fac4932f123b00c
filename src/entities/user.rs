//! User entity - One row per chat participant, keyed by phone number.
//!
//! Users are created on their first inbound message. The `last_message_at`
//! column doubles as the per-user lock row: every mutation begins by updating it.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// User database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "users")]
pub struct Model {
    /// Unique identifier for the user
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Channel identifier (phone number as delivered by the transport)
    #[sea_orm(unique)]
    pub whatsapp_number: String,
    /// Optional display name
    pub name: Option<String>,
    /// Optional email used by the web dashboard
    pub email: Option<String>,
    /// When the user first wrote to the bot
    pub created_at: DateTimeUtc,
    /// Last time a mutation locked this user
    pub last_message_at: Option<DateTimeUtc>,
}

/// Defines relationships between User and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One user owns many committed transactions
    #[sea_orm(has_many = "super::transaction::Entity")]
    Transactions,
    /// One user owns at most one open draft (enforced by the coordinator)
    #[sea_orm(has_many = "super::draft::Entity")]
    Drafts,
    /// One user owns a history of issued codes
    #[sea_orm(has_many = "super::otp::Entity")]
    Otps,
}

impl Related<super::transaction::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Transactions.def()
    }
}

impl Related<super::draft::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Drafts.def()
    }
}

impl Related<super::otp::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Otps.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
