//! Entry types shared by the parser, the draft coordinator and the ledger.
//!
//! A [`Fragment`] is what a message (or a sequence of messages) has told us so far;
//! an [`Entry`] is a fragment with every required field present, ready to commit.

use crate::config::settings::Settings;
use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

/// Whether money went out or came in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntryKind {
    /// `gasto`
    Expense,
    /// `ingreso`
    Income,
}

impl EntryKind {
    /// Persisted representation
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Expense => "gasto",
            Self::Income => "ingreso",
        }
    }

    /// Capitalised label used in replies
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Expense => "Gasto",
            Self::Income => "Ingreso",
        }
    }

    /// Parses the persisted representation
    #[must_use]
    pub fn from_db(value: &str) -> Option<Self> {
        match value {
            "gasto" => Some(Self::Expense),
            "ingreso" => Some(Self::Income),
            _ => None,
        }
    }
}

/// Fields a fragment may still be missing, in the order they are asked for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    /// Expense or income
    Type,
    /// Positive amount
    Amount,
    /// Category label
    Category,
}

/// Why a message was rejected outright
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnsupportedReason {
    /// The message is not in Spanish
    Language,
    /// The message mentions a currency other than the base currency
    WrongCurrency,
    /// Neither the rules nor the AI fallback found a financial entry
    Unparseable,
}

/// Everything needed to resolve relative dates and default currency
#[derive(Debug, Clone)]
pub struct ParseContext {
    /// Current instant
    pub now: DateTime<Utc>,
    /// Operating timezone
    pub timezone: Tz,
    /// Base currency code
    pub base_currency: String,
}

impl ParseContext {
    /// Builds a context from settings at the given instant
    #[must_use]
    pub fn from_settings(settings: &Settings, now: DateTime<Utc>) -> Self {
        Self {
            now,
            timezone: settings.timezone,
            base_currency: settings.base_currency.clone(),
        }
    }

    /// Today's date in the operating timezone
    #[must_use]
    pub fn today(&self) -> NaiveDate {
        self.now.with_timezone(&self.timezone).date_naive()
    }
}

/// Start of `date` in `tz`, as a UTC instant.
///
/// Falls back to midnight UTC for the (DST-gap) case where local midnight does not exist.
#[must_use]
pub fn local_midnight(tz: Tz, date: NaiveDate) -> DateTime<Utc> {
    let naive = date.and_time(NaiveTime::MIN);
    tz.from_local_datetime(&naive).earliest().map_or_else(
        || Utc.from_utc_datetime(&naive),
        |local| local.with_timezone(&Utc),
    )
}

/// A complete entry, ready to be committed to the ledger
#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    /// Expense or income
    pub kind: EntryKind,
    /// Strictly positive amount
    pub amount: f64,
    /// Base currency code
    pub currency: String,
    /// Non-empty category label
    pub category: String,
    /// Free-text description
    pub description: Option<String>,
    /// When it happened
    pub occurred_at: DateTime<Utc>,
}

/// A possibly incomplete entry
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Fragment {
    /// Expense or income, if known
    pub kind: Option<EntryKind>,
    /// Amount, if known and valid
    pub amount: Option<f64>,
    /// Currency code, if stated
    pub currency: Option<String>,
    /// Category, if known
    pub category: Option<String>,
    /// Free-text description
    pub description: Option<String>,
    /// Occurrence time, if a date was mentioned
    pub occurred_at: Option<DateTime<Utc>>,
}

impl Fragment {
    /// Required fields still absent, in asking order
    #[must_use]
    pub fn missing(&self) -> Vec<Field> {
        let mut missing = Vec::new();
        if self.kind.is_none() {
            missing.push(Field::Type);
        }
        if self.amount.is_none() {
            missing.push(Field::Amount);
        }
        if self.category.as_deref().is_none_or(|c| c.trim().is_empty()) {
            missing.push(Field::Category);
        }
        missing
    }

    /// Fills fields that are still empty from `other`; known fields are never overwritten.
    pub fn fill_from(&mut self, other: Self) {
        if self.kind.is_none() {
            self.kind = other.kind;
        }
        if self.amount.is_none() {
            self.amount = other.amount;
        }
        if self.currency.is_none() {
            self.currency = other.currency;
        }
        if self.category.is_none() {
            self.category = other.category;
        }
        if self.description.is_none() {
            self.description = other.description;
        }
        if self.occurred_at.is_none() {
            self.occurred_at = other.occurred_at;
        }
    }

    /// Turns the fragment into a [`ParseResult`], defaulting currency and date.
    #[must_use]
    pub fn into_result(self, ctx: &ParseContext) -> ParseResult {
        match self {
            Self {
                kind: Some(kind),
                amount: Some(amount),
                category: Some(category),
                currency,
                description,
                occurred_at,
            } if !category.trim().is_empty() => ParseResult::Complete(Entry {
                kind,
                amount,
                currency: currency.unwrap_or_else(|| ctx.base_currency.clone()),
                category,
                description,
                occurred_at: occurred_at.unwrap_or(ctx.now),
            }),
            fragment => {
                let missing = fragment.missing();
                ParseResult::Partial(fragment, missing)
            }
        }
    }
}

/// Outcome of parsing one message
#[derive(Debug, Clone, PartialEq)]
pub enum ParseResult {
    /// Every required field was found
    Complete(Entry),
    /// A financial intent was found but fields are missing
    Partial(Fragment, Vec<Field>),
    /// The message cannot be recorded
    Unsupported(UnsupportedReason),
}
