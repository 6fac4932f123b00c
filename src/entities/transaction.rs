//! Transaction entity - The append-only ledger of committed entries.
//!
//! Each row has a `transaction_type` (`"gasto"` or `"ingreso"`), a strictly positive
//! amount in the base currency, a category label and the time it occurred.
//! Rows are never updated; corrections are recorded as new transactions.
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Transaction database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "transactions")]
pub struct Model {
    /// Unique identifier for the transaction
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Owner of the transaction
    pub user_id: i64,
    /// Type of transaction: `"gasto"` or `"ingreso"`
    pub transaction_type: String,
    /// Amount, always greater than zero
    pub amount: f64,
    /// Currency code, always the configured base currency
    pub currency: String,
    /// Category label (e.g. `"comida"`)
    pub category: String,
    /// Original message text or a short description
    pub description: Option<String>,
    /// When the expense or income happened
    pub occurred_at: DateTimeUtc,
    /// When the row was committed
    pub created_at: DateTimeUtc,
}

/// Defines relationships between Transaction and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each transaction belongs to one user
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
