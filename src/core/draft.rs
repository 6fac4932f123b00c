//! Draft coordinator - completes entries across conversational turns.
//!
//! Each user is either in [`DraftState::NoDraft`] or [`DraftState::OpenDraft`]; the
//! state lives in the `drafts` table so any worker can pick up the next message.
//!
//! Handling a message takes two steps. [`prepare`] runs the full parser (which may
//! call the AI provider) before any lock is taken, and only when the draft state
//! calls for it. [`advance`] then runs inside a database transaction that already
//! holds the per-user lock (see [`crate::core::user::lock_user`]), so committing an
//! entry and clearing the draft land together or not at all.

use crate::{
    core::{
        entry::{Field, Fragment, ParseContext, ParseResult, UnsupportedReason},
        ledger,
        language::is_spanish,
        parser::{EntryParser, Fill, parse_fill, parse_offline, parse_rules},
    },
    entities::{Draft, draft, transaction},
    errors::Result,
};
use chrono::{DateTime, Utc};
use sea_orm::{QueryOrder, Set, prelude::*};
use tracing::debug;

/// Persisted per-user draft state
#[derive(Debug, Clone, PartialEq)]
pub enum DraftState {
    /// Nothing pending
    NoDraft,
    /// An incomplete entry awaiting more messages
    OpenDraft(draft::Model),
}

/// What happened to a message routed through the coordinator
#[derive(Debug, Clone, PartialEq)]
pub enum DraftOutcome {
    /// The entry was complete and is now in the ledger
    Committed(transaction::Model),
    /// The draft is open and still needs `field`
    NeedsField {
        /// First field to ask for
        field: Field,
        /// Everything known so far
        fragment: Fragment,
    },
    /// The message was rejected; any open draft is untouched
    Rejected(UnsupportedReason),
}

/// Reads the user's open draft, if any.
pub async fn load_state<C: ConnectionTrait>(conn: &C, user_id: i64) -> Result<DraftState> {
    let open = Draft::find()
        .filter(draft::Column::UserId.eq(user_id))
        .order_by_desc(draft::Column::CreatedAt)
        .order_by_desc(draft::Column::Id)
        .one(conn)
        .await?;
    Ok(open.map_or(DraftState::NoDraft, DraftState::OpenDraft))
}

/// Fields stored in a draft row
#[must_use]
pub fn fragment_of(model: &draft::Model) -> Fragment {
    Fragment {
        kind: model
            .transaction_type
            .as_deref()
            .and_then(crate::core::entry::EntryKind::from_db),
        amount: model.amount,
        currency: model.currency.clone(),
        category: model.category.clone(),
        description: model.description.clone(),
        occurred_at: model.occurred_at,
    }
}

/// Replaces the user's draft with `fragment`.
///
/// Any previous row is removed first, so a user never has more than one draft.
pub async fn save_fragment<C: ConnectionTrait>(
    conn: &C,
    user_id: i64,
    fragment: &Fragment,
    now: DateTime<Utc>,
) -> Result<draft::Model> {
    clear(conn, user_id).await?;
    let model = draft::ActiveModel {
        user_id: Set(user_id),
        transaction_type: Set(fragment.kind.map(|k| k.as_str().to_string())),
        amount: Set(fragment.amount),
        currency: Set(fragment.currency.clone()),
        category: Set(fragment.category.clone()),
        description: Set(fragment.description.clone()),
        occurred_at: Set(fragment.occurred_at),
        created_at: Set(now),
        ..Default::default()
    };
    model.insert(conn).await.map_err(Into::into)
}

/// Deletes the user's draft; returns the number of rows removed.
pub async fn clear<C: ConnectionTrait>(conn: &C, user_id: i64) -> Result<u64> {
    let result = Draft::delete_many()
        .filter(draft::Column::UserId.eq(user_id))
        .exec(conn)
        .await?;
    Ok(result.rows_affected)
}

/// Applies a parse result: commit, open/update the draft, or reject.
async fn settle<C: ConnectionTrait>(
    conn: &C,
    user_id: i64,
    result: ParseResult,
    ctx: &ParseContext,
) -> Result<DraftOutcome> {
    match result {
        ParseResult::Complete(entry) => {
            let saved = ledger::record_transaction(conn, user_id, &entry, ctx.now).await?;
            clear(conn, user_id).await?;
            Ok(DraftOutcome::Committed(saved))
        }
        ParseResult::Partial(fragment, missing) => {
            save_fragment(conn, user_id, &fragment, ctx.now).await?;
            Ok(DraftOutcome::NeedsField {
                field: missing.first().copied().unwrap_or(Field::Category),
                fragment,
            })
        }
        ParseResult::Unsupported(reason) => Ok(DraftOutcome::Rejected(reason)),
    }
}

/// A typed message that only supplies what a type-less draft lacks completes it
/// instead of starting over.
fn completes_typeless(draft: &Fragment, missing: &[Field], new: &Fragment) -> bool {
    draft.kind.is_none()
        && new.kind.is_some()
        && (new.amount.is_none() || missing.contains(&Field::Amount))
        && (new.category.is_none() || missing.contains(&Field::Category))
}

/// Whether [`advance`] will need the full parser for `text` in `state`
fn needs_full_parse(state: &DraftState, text: &str, ctx: &ParseContext) -> bool {
    match state {
        DraftState::NoDraft => true,
        DraftState::OpenDraft(model) => {
            let fragment = fragment_of(model);
            is_spanish(text)
                && parse_rules(text, ctx).is_none()
                && matches!(
                    parse_fill(text, &fragment, &fragment.missing(), ctx),
                    Fill::Nothing
                )
        }
    }
}

/// Runs the full parser for `text` if the user's current draft state needs it.
///
/// Reads the draft without the user lock; [`advance`] reads it again under the
/// lock. Returns `None` when the message is a plain answer to the open draft.
pub async fn prepare<C: ConnectionTrait>(
    conn: &C,
    parser: &EntryParser,
    user_id: i64,
    text: &str,
    ctx: &ParseContext,
) -> Result<Option<ParseResult>> {
    let state = load_state(conn, user_id).await?;
    if !needs_full_parse(&state, text, ctx) {
        return Ok(None);
    }
    Ok(Some(parser.parse(text, ctx).await))
}

/// Routes one transaction-like message through the user's draft state.
///
/// # Arguments
/// * `conn` - Open database transaction holding the user lock
/// * `user_id` - Sender
/// * `text` - Message text
/// * `parsed` - Output of [`prepare`]; if the state changed since and a full parse
///   is needed after all, the rule engine alone stands in
/// * `ctx` - Clock, timezone and base currency
pub async fn advance<C: ConnectionTrait>(
    conn: &C,
    user_id: i64,
    text: &str,
    parsed: Option<ParseResult>,
    ctx: &ParseContext,
) -> Result<DraftOutcome> {
    let open = match load_state(conn, user_id).await? {
        DraftState::NoDraft => {
            let result = parsed.unwrap_or_else(|| parse_offline(text, ctx));
            return settle(conn, user_id, result, ctx).await;
        }
        DraftState::OpenDraft(model) => model,
    };

    let mut fragment = fragment_of(&open);
    let missing = fragment.missing();
    if !is_spanish(text) {
        return Ok(DraftOutcome::Rejected(UnsupportedReason::Language));
    }

    match parse_rules(text, ctx) {
        Some(ParseResult::Partial(new, _)) if completes_typeless(&fragment, &missing, &new) => {
            debug!(user_id, "Typed follow-up completes type-less draft");
            fragment.fill_from(Fragment {
                description: None,
                ..new
            });
            return settle(conn, user_id, fragment.into_result(ctx), ctx).await;
        }
        // A new transaction start supersedes the open draft
        Some(result) => {
            debug!(user_id, draft_id = open.id, "New entry supersedes open draft");
            if !matches!(result, ParseResult::Unsupported(_)) {
                clear(conn, user_id).await?;
            }
            return settle(conn, user_id, result, ctx).await;
        }
        None => {}
    }

    match parse_fill(text, &fragment, &missing, ctx) {
        Fill::Fields(fill) => {
            fragment.fill_from(fill);
            settle(conn, user_id, fragment.into_result(ctx), ctx).await
        }
        Fill::Rejected(reason) => Ok(DraftOutcome::Rejected(reason)),
        Fill::Nothing => match parsed.unwrap_or_else(|| parse_offline(text, ctx)) {
            result @ (ParseResult::Complete(_) | ParseResult::Partial(_, _)) => {
                clear(conn, user_id).await?;
                settle(conn, user_id, result, ctx).await
            }
            ParseResult::Unsupported(UnsupportedReason::Unparseable) => {
                // Not an answer: ask again for the same field
                Ok(DraftOutcome::NeedsField {
                    field: missing.first().copied().unwrap_or(Field::Category),
                    fragment,
                })
            }
            ParseResult::Unsupported(reason) => Ok(DraftOutcome::Rejected(reason)),
        },
    }
}
