//! Draft entity - A partially specified transaction awaiting more messages.
//!
//! Same shape as a transaction with every field optional.
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Draft database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "drafts")]
pub struct Model {
    /// Unique identifier for the draft
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Owner of the draft
    pub user_id: i64,
    /// `"gasto"`, `"ingreso"` or not yet known
    pub transaction_type: Option<String>,
    /// Amount if already given
    pub amount: Option<f64>,
    /// Currency code if already given
    pub currency: Option<String>,
    /// Category if already given
    pub category: Option<String>,
    /// Text of the message that opened the draft
    pub description: Option<String>,
    /// Occurrence time if a date was mentioned
    pub occurred_at: Option<DateTimeUtc>,
    /// When the draft was opened
    pub created_at: DateTimeUtc,
}

/// Defines relationships between Draft and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each draft belongs to one user
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id"
    )]
    User,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
