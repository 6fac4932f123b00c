//! One-time passcodes for the companion dashboard.
//!
//! Issuance is rate limited per user over a trailing window; verification flips
//! `used` with a conditional update so the same code can never verify twice.
//! Older unused codes are not invalidated when a new one is issued.

use crate::{
    config::settings::Settings,
    core::user,
    entities::{Otp, otp},
    errors::Result,
};
use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*, sea_query::Expr};

/// Issuance limits and code lifetime
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OtpPolicy {
    /// How long a code stays valid
    pub ttl: Duration,
    /// Trailing window used for rate limiting
    pub window: Duration,
    /// Codes allowed per window
    pub max_per_window: u64,
}

impl OtpPolicy {
    /// Policy from runtime settings
    #[must_use]
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            ttl: settings.otp_ttl(),
            window: settings.otp_rate_limit_window(),
            max_per_window: settings.otp_rate_limit_count,
        }
    }
}

impl Default for OtpPolicy {
    fn default() -> Self {
        Self::from_settings(&Settings::default())
    }
}

/// Result of asking for a code
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OtpResult {
    /// A fresh six-digit code
    Issued(String),
    /// Too many codes in the trailing window; nothing was created
    RateLimited,
}

/// Result of checking a code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerifyResult {
    /// The code matched and is now used
    Valid(i64),
    /// Wrong, expired or already used
    Invalid,
}

/// Six random digits, leading zeros kept.
#[must_use]
pub fn generate_code() -> String {
    let value: u32 = rand::thread_rng().gen_range(0..1_000_000);
    format!("{value:06}")
}

/// Issues a code for `user_id` unless the rate limit is reached.
///
/// Run inside a transaction holding the user lock so concurrent requests cannot
/// both pass the count check.
pub async fn issue_otp<C: ConnectionTrait>(
    conn: &C,
    user_id: i64,
    policy: &OtpPolicy,
    now: DateTime<Utc>,
) -> Result<OtpResult> {
    let recent = Otp::find()
        .filter(otp::Column::UserId.eq(user_id))
        .filter(otp::Column::CreatedAt.gt(now - policy.window))
        .count(conn)
        .await?;
    if recent >= policy.max_per_window {
        tracing::info!(user_id, recent, "OTP rate limit reached");
        return Ok(OtpResult::RateLimited);
    }

    let code = generate_code();
    let model = otp::ActiveModel {
        user_id: Set(user_id),
        code: Set(code.clone()),
        expires_at: Set(now + policy.ttl),
        used: Set(false),
        created_at: Set(now),
        ..Default::default()
    };
    model.insert(conn).await?;
    tracing::info!(user_id, "Issued OTP");
    Ok(OtpResult::Issued(code))
}

/// Verifies `code` for `user_id`, marking the matching row used.
///
/// Any unused, unexpired row with the same code matches.
pub async fn verify_otp<C: ConnectionTrait>(
    conn: &C,
    user_id: i64,
    code: &str,
    now: DateTime<Utc>,
) -> Result<VerifyResult> {
    let candidates = Otp::find()
        .filter(otp::Column::UserId.eq(user_id))
        .filter(otp::Column::Code.eq(code.trim()))
        .filter(otp::Column::Used.eq(false))
        .filter(otp::Column::ExpiresAt.gt(now))
        .order_by_desc(otp::Column::CreatedAt)
        .all(conn)
        .await?;

    for candidate in candidates {
        // Only the caller whose update flips the flag wins
        let result = Otp::update_many()
            .col_expr(otp::Column::Used, Expr::value(true))
            .filter(otp::Column::Id.eq(candidate.id))
            .filter(otp::Column::Used.eq(false))
            .exec(conn)
            .await?;
        if result.rows_affected == 1 {
            return Ok(VerifyResult::Valid(user_id));
        }
    }
    Ok(VerifyResult::Invalid)
}

/// Verifies a code presented together with a phone number (web login).
///
/// The number is normalised first; unknown numbers are simply `Invalid`.
pub async fn verify_for_number(
    db: &DatabaseConnection,
    whatsapp_number: &str,
    code: &str,
    now: DateTime<Utc>,
) -> Result<VerifyResult> {
    let Some(owner) = user::find_by_number(db, whatsapp_number).await? else {
        return Ok(VerifyResult::Invalid);
    };

    let txn = db.begin().await?;
    user::lock_user(&txn, owner.id, now).await?;
    let result = verify_otp(&txn, owner.id, code, now).await?;
    txn.commit().await?;
    Ok(result)
}
