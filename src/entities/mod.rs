//! Entity module - Contains all SeaORM entity definitions for the database.
//! These entities represent the database tables and their relationships.
//! Each entity has a Model struct for data and an Entity struct for operations.

pub mod draft;
pub mod inbound_message;
pub mod otp;
pub mod transaction;
pub mod user;

// Re-export specific types to avoid conflicts
pub use draft::{Column as DraftColumn, Entity as Draft, Model as DraftModel};
pub use inbound_message::{
    Column as InboundMessageColumn, Entity as InboundMessage, Model as InboundMessageModel,
};
pub use otp::{Column as OtpColumn, Entity as Otp, Model as OtpModel};
pub use transaction::{
    Column as TransactionColumn, Entity as Transaction, Model as TransactionModel,
};
pub use user::{Entity as User, Model as UserModel};
