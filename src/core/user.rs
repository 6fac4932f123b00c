//! User business logic - identity, profile and the per-user lock.
//!
//! Users are keyed by the phone number the transport delivers. Every mutation of a
//! user's drafts, ledger or codes runs inside one database transaction that starts
//! with [`lock_user`], so concurrent messages from the same number are serialised.

use crate::{
    entities::{User, user},
    errors::{Error, Result},
};
use chrono::{DateTime, Utc};
use sea_orm::{
    Set,
    prelude::*,
    sea_query::{Expr, OnConflict},
};

/// Country prefix added to bare nine-digit local numbers
const COUNTRY_PREFIX: &str = "51";

/// Canonical form of a phone number: digits only, with the country prefix.
///
/// `"+51 911-222-333"`, `"911 222 333"` and `"51911222333"` all become `"51911222333"`.
#[must_use]
pub fn normalize_number(raw: &str) -> String {
    let digits: String = raw
        .trim()
        .chars()
        .filter(|c| !matches!(c, '+' | ' ' | '-' | '(' | ')' | '.'))
        .collect();
    if digits.len() == 9 && !digits.starts_with(COUNTRY_PREFIX) {
        format!("{COUNTRY_PREFIX}{digits}")
    } else {
        digits
    }
}

/// Returns the user for `whatsapp_number`, creating it on first contact.
pub async fn ensure_user<C: ConnectionTrait>(
    conn: &C,
    whatsapp_number: &str,
    now: DateTime<Utc>,
) -> Result<user::Model> {
    let (user, _) = find_or_create(conn, whatsapp_number, now).await?;
    Ok(user)
}

/// Like [`ensure_user`], also reporting whether this call created the row.
///
/// Insertion ignores a concurrent insert of the same number, so two first messages
/// racing each other still end up with a single row (and only one sees `true`).
pub async fn find_or_create<C: ConnectionTrait>(
    conn: &C,
    whatsapp_number: &str,
    now: DateTime<Utc>,
) -> Result<(user::Model, bool)> {
    let number = normalize_number(whatsapp_number);
    if let Some(existing) = find_by_number(conn, &number).await? {
        return Ok((existing, false));
    }

    let new_user = user::ActiveModel {
        whatsapp_number: Set(number.clone()),
        name: Set(None),
        email: Set(None),
        created_at: Set(now),
        last_message_at: Set(None),
        ..Default::default()
    };
    let inserted = User::insert(new_user)
        .on_conflict(
            OnConflict::column(user::Column::WhatsappNumber)
                .do_nothing()
                .to_owned(),
        )
        .exec_without_returning(conn)
        .await?;
    if inserted > 0 {
        tracing::info!(number = %number, "Registered new user");
    }

    let user = find_by_number(conn, &number)
        .await?
        .ok_or_else(|| Error::UserNotFound {
            key: number.clone(),
        })?;
    Ok((user, inserted > 0))
}

/// Whether the user still has to tell us their name and email
#[must_use]
pub fn profile_incomplete(user: &user::Model) -> bool {
    user.name.as_deref().is_none_or(|n| n.trim().is_empty())
        || user.email.as_deref().is_none_or(|e| e.trim().is_empty())
}

/// Looks a user up by phone number.
pub async fn find_by_number<C: ConnectionTrait>(
    conn: &C,
    whatsapp_number: &str,
) -> Result<Option<user::Model>> {
    User::find()
        .filter(user::Column::WhatsappNumber.eq(normalize_number(whatsapp_number)))
        .one(conn)
        .await
        .map_err(Into::into)
}

/// Takes the per-user lock for the enclosing database transaction.
///
/// The lock is a write to the user's row; it is held until the transaction
/// commits or is dropped (rolled back), whichever happens first.
pub async fn lock_user<C: ConnectionTrait>(
    conn: &C,
    user_id: i64,
    now: DateTime<Utc>,
) -> Result<()> {
    let result = User::update_many()
        .col_expr(user::Column::LastMessageAt, Expr::value(now))
        .filter(user::Column::Id.eq(user_id))
        .exec(conn)
        .await?;

    if result.rows_affected == 0 {
        return Err(Error::UserNotFound {
            key: user_id.to_string(),
        });
    }
    Ok(())
}

/// Outcome of a profile update
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProfileUpdate {
    /// Name and email were stored
    Saved(user::Model),
    /// The email does not look like an address
    InvalidEmail,
}

/// Updates a user's display name and email.
///
/// # Arguments
/// * `user_id` - The user to update
/// * `name` - Display name, trimmed
/// * `email` - Address, must contain `@`
pub async fn update_profile<C: ConnectionTrait>(
    conn: &C,
    user_id: i64,
    name: &str,
    email: &str,
) -> Result<ProfileUpdate> {
    let email = email.trim();
    let Some((local, domain)) = email.split_once('@') else {
        return Ok(ProfileUpdate::InvalidEmail);
    };
    if local.is_empty() || domain.is_empty() {
        return Ok(ProfileUpdate::InvalidEmail);
    }

    let existing = User::find_by_id(user_id)
        .one(conn)
        .await?
        .ok_or_else(|| Error::UserNotFound {
            key: user_id.to_string(),
        })?;

    let mut active: user::ActiveModel = existing.into();
    active.name = Set(Some(name.trim().to_string()));
    active.email = Set(Some(email.to_lowercase()));
    let updated = active.update(conn).await?;
    Ok(ProfileUpdate::Saved(updated))
}
