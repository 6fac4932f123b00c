//! Conversation router - one inbound message in, one reply out.
//!
//! Explicit commands (`reporte …`, `código`, `ayuda`, `registrar …`) are matched
//! first; everything else goes through the parser and draft coordinator. Parsing
//! runs before any lock is taken. The writes of a message then happen inside a
//! single database transaction that holds the sender's lock, so a redelivered or
//! double-sent message is answered from the redelivery log instead of being
//! applied twice.

use super::{BotData, replies};
use crate::{
    core::{
        draft::{self, DraftOutcome},
        entry::ParseContext,
        inbound,
        language::fold,
        otp::{self, OtpPolicy, OtpResult},
        report::{self, ReportPeriod},
        user::{self, ProfileUpdate},
    },
    errors::Result,
};
use chrono::{DateTime, Utc};
use sea_orm::TransactionTrait;
use serde::Deserialize;
use tracing::{debug, error, info};

/// Message as delivered by the transport
#[derive(Debug, Clone, Deserialize)]
pub struct InboundMessage {
    /// Sender phone number
    pub from: String,
    /// Message text
    pub text: String,
    /// Transport message id, when the transport provides one
    #[serde(default)]
    pub message_id: Option<String>,
}

/// Classified purpose of a message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    /// `reporte semanal|mensual|anual`; `None` for a bare `reporte`
    Report(Option<ReportPeriod>),
    /// `código`
    Code,
    /// `ayuda`
    Help,
    /// `registrar <nombre> <email>`
    Register {
        /// Display name (may contain spaces)
        name: String,
        /// Address as typed
        email: String,
    },
    /// `registrar` without a usable name and email
    RegisterUsage,
    /// Anything else: a transaction or a draft follow-up
    Entry,
}

const CODE_WORDS: &[&str] = &["codigo", "otp", "dame", "mi", "un", "el", "quiero", "nuevo"];

/// Classifies a message; commands take precedence over entry parsing.
#[must_use]
pub fn classify(text: &str) -> Intent {
    let folded = fold(text);
    let words: Vec<&str> = folded
        .split_whitespace()
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric() && c != '@'))
        .filter(|w| !w.is_empty())
        .collect();

    match words.first().copied() {
        Some("registrar") => return parse_register(text),
        Some("ayuda") => return Intent::Help,
        _ => {}
    }
    if words.contains(&"reporte") {
        return Intent::Report(words.iter().find_map(|w| ReportPeriod::from_word(w)));
    }
    if words.contains(&"codigo") && words.iter().all(|w| CODE_WORDS.contains(w)) {
        return Intent::Code;
    }
    Intent::Entry
}

fn parse_register(text: &str) -> Intent {
    let rest: Vec<&str> = text.split_whitespace().skip(1).collect();
    let Some(email_at) = rest.iter().rposition(|w| w.contains('@')) else {
        return Intent::RegisterUsage;
    };
    let name = rest
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != email_at)
        .map(|(_, w)| *w)
        .collect::<Vec<_>>()
        .join(" ");
    if name.is_empty() {
        return Intent::RegisterUsage;
    }
    Intent::Register {
        name,
        email: rest[email_at].to_string(),
    }
}

/// Handles one message and returns the reply.
///
/// Parsing (including any AI call) happens before the sender's lock is taken; the
/// lock then covers the redelivery check, the draft and ledger writes and the reply
/// log. Errors leave no partial state behind: the message transaction is rolled back.
pub async fn handle_message(
    data: &BotData,
    message: &InboundMessage,
    now: DateTime<Utc>,
) -> Result<String> {
    let text = message.text.trim();
    let settings = &data.settings;
    let window = settings.duplicate_window();
    let (sender, first_contact) = user::find_or_create(&data.database, &message.from, now).await?;

    let key = inbound::message_key(text, message.message_id.as_deref());
    // Known redeliveries skip parsing; the check is repeated under the lock
    if let Some(reply) = inbound::find_duplicate(&data.database, sender.id, &key, now, window).await?
    {
        info!(user_id = sender.id, "Redelivered message answered from log");
        return Ok(reply);
    }

    let intent = classify(text);
    debug!(user_id = sender.id, ?intent, "Classified message");
    let ctx = ParseContext::from_settings(settings, now);
    let parsed = if intent == Intent::Entry {
        draft::prepare(&data.database, &data.parser, sender.id, text, &ctx).await?
    } else {
        None
    };
    let greet = first_contact
        && user::profile_incomplete(&sender)
        && !matches!(intent, Intent::Register { .. } | Intent::RegisterUsage);

    let txn = data.database.begin().await?;
    user::lock_user(&txn, sender.id, now).await?;

    if let Some(reply) = inbound::find_duplicate(&txn, sender.id, &key, now, window).await? {
        info!(user_id = sender.id, "Redelivered message answered from log");
        txn.commit().await?;
        return Ok(reply);
    }

    let reply = match intent {
        Intent::Report(Some(period)) => {
            let summary =
                report::build_report(&txn, sender.id, period, now, settings.timezone).await?;
            report::format_summary(&summary, settings.timezone)
        }
        Intent::Report(None) => replies::ASK_PERIOD.to_string(),
        Intent::Code => {
            let policy = OtpPolicy::from_settings(settings);
            match otp::issue_otp(&txn, sender.id, &policy, now).await? {
                OtpResult::Issued(code) => replies::otp_issued(
                    &code,
                    settings.otp_ttl_minutes,
                    settings.dashboard_url.as_deref(),
                ),
                OtpResult::RateLimited => replies::RATE_LIMITED.to_string(),
            }
        }
        Intent::Help => replies::help_text(settings.dashboard_url.as_deref()),
        Intent::Register { name, email } => {
            match user::update_profile(&txn, sender.id, &name, &email).await? {
                ProfileUpdate::Saved(saved) => replies::profile_saved(
                    saved.name.as_deref().unwrap_or(&name),
                    saved.email.as_deref().unwrap_or(&email),
                ),
                ProfileUpdate::InvalidEmail => replies::INVALID_EMAIL.to_string(),
            }
        }
        Intent::RegisterUsage => replies::REGISTER_USAGE.to_string(),
        Intent::Entry => match draft::advance(&txn, sender.id, text, parsed, &ctx).await? {
            DraftOutcome::Committed(saved) => replies::confirmation(&saved, settings.timezone),
            DraftOutcome::NeedsField { field, fragment } => replies::ask_field(field, &fragment),
            DraftOutcome::Rejected(reason) => replies::unsupported(reason).to_string(),
        },
    };
    let reply = if greet {
        replies::with_welcome(reply)
    } else {
        reply
    };

    inbound::record(&txn, sender.id, &key, &reply, now, window).await?;
    txn.commit().await?;
    Ok(reply)
}

/// Handles one message; storage failures become the fixed retry-later reply.
pub async fn respond(data: &BotData, message: &InboundMessage, now: DateTime<Utc>) -> String {
    match handle_message(data, message, now).await {
        Ok(reply) => reply,
        Err(e) => {
            error!(from = %message.from, "Failed to handle message: {}", e);
            replies::RETRY_LATER.to_string()
        }
    }
}
