//! OTP entity - One-time passcodes for the companion web dashboard.
//!
//! Rows are inserted unused and flipped to `used = true` exactly once.
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// OTP database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "otps")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Owner of the code
    pub user_id: i64,
    /// Six-digit numeric code, leading zeros preserved
    pub code: String,
    /// Instant after which the code no longer verifies
    pub expires_at: DateTimeUtc,
    /// Whether the code has already been verified
    pub used: bool,
    /// Issuance time, used for rate limiting
    pub created_at: DateTimeUtc,
}

/// Defines relationships between Otp and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each code belongs to one user
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
