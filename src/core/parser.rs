//! Entry parser - turns free Spanish text into a financial entry.
//!
//! Parsing runs an ordered list of strategies behind a language gate:
//!
//! 1. the deterministic rule engine (keywords, amounts, categories, dates);
//! 2. an optional AI extractor, consulted only when the rules find no financial
//!    intent at all.
//!
//! Both stages produce the same [`ParseResult`]. The module also reads follow-up
//! replies for an open draft (see [`parse_fill`]).

use crate::core::entry::{
    EntryKind, Field, Fragment, ParseContext, ParseResult, UnsupportedReason, local_midnight,
};
use crate::core::extractor::{AiAmount, AiCandidate, FallbackExtractor};
use crate::core::language::{fold, is_spanish};
use chrono::{Datelike, Duration, NaiveDate};
use regex::Regex;
use std::sync::{Arc, LazyLock};
use tracing::{debug, warn};

/// Expense categories accepted by the ledger vocabulary
pub const EXPENSE_CATEGORIES: &[&str] = &[
    "comida",
    "diversión",
    "ropa",
    "transporte",
    "salud",
    "vivienda",
    "servicios",
    "educación",
    "ahorro",
    "otros",
];

/// Income categories accepted by the ledger vocabulary
pub const INCOME_CATEGORIES: &[&str] = &["salario", "freelance", "regalos", "otros"];

/// Everyday (often Peruvian) words mapped onto expense categories
const EXPENSE_SYNONYMS: &[(&str, &str)] = &[
    ("tabas", "ropa"),
    ("zapatillas", "ropa"),
    ("polos", "ropa"),
    ("polo", "ropa"),
    ("pantalon", "ropa"),
    ("chifa", "comida"),
    ("chifita", "comida"),
    ("ceviche", "comida"),
    ("menu", "comida"),
    ("almuerzo", "comida"),
    ("desayuno", "comida"),
    ("cena", "comida"),
    ("pollo", "comida"),
    ("pizza", "comida"),
    ("combi", "transporte"),
    ("micro", "transporte"),
    ("taxi", "transporte"),
    ("uber", "transporte"),
    ("pasaje", "transporte"),
    ("gasolina", "transporte"),
    ("cine", "diversión"),
    ("fiesta", "diversión"),
    ("chelas", "diversión"),
    ("farmacia", "salud"),
    ("medicinas", "salud"),
    ("doctor", "salud"),
    ("alquiler", "vivienda"),
    ("luz", "servicios"),
    ("agua", "servicios"),
    ("internet", "servicios"),
    ("celular", "servicios"),
    ("curso", "educación"),
    ("libros", "educación"),
];

const INCOME_SYNONYMS: &[(&str, &str)] = &[
    ("sueldo", "salario"),
    ("quincena", "salario"),
    ("web", "freelance"),
    ("pagina", "freelance"),
    ("app", "freelance"),
    ("proyecto", "freelance"),
    ("regalo", "regalos"),
];

const EXPENSE_KEYWORDS: &[&str] = &["gasto", "gastos", "gaste", "pague", "compre"];
const INCOME_KEYWORDS: &[&str] = &["ingreso", "ingresos", "recibi", "cobre", "gane"];

const PREPOSITIONS: &[&str] = &["en", "por", "de", "para"];
const ARTICLES: &[&str] = &["el", "la", "los", "las", "un", "una", "unos", "unas", "mi", "mis"];

/// Words that can follow a preposition but are never categories
const NON_CATEGORY_WORDS: &[&str] = &[
    "s", "pen", "sol", "soles", "luca", "lucas", "hoy", "ayer", "anteayer", "me", "pagaron",
    "depositaron", "dolar", "dolares", "euro", "euros", "usd", "eur", "gasto", "gastos", "gaste", "pague",
    "compre", "ingreso", "ingresos", "recibi", "cobre", "gane", "monto", "total",
];

/// Greetings, acknowledgements and function words that never answer a category question
const NON_ANSWER_WORDS: &[&str] = &[
    "hola", "buenas", "buenos", "dias", "tardes", "noches", "gracias", "si", "no", "ok", "okay",
    "oki", "vale", "listo", "bueno", "ya", "claro", "perfecto", "genial", "chau", "adios", "que",
    "como", "cuanto", "cuando", "donde", "porque", "pero", "y", "o", "el", "la", "los", "las",
    "un", "una", "de", "en", "por", "para", "con", "mi", "tu", "su", "esto", "eso", "nada",
    "nose", "jaja", "jajaja", "ah", "eh", "mm", "hmm",
];

static DATE_RE: LazyLock<Regex> =
    LazyLock::new(|| pattern(r"\b(\d{1,2})[/-](\d{1,2})(?:[/-](\d{2}|\d{4}))?\b"));
// Words that double as ordinary Spanish ("peso", "real", "libra") only count
// right after a number.
static FOREIGN_CURRENCY_RE: LazyLock<Regex> = LazyLock::new(|| {
    pattern(concat!(
        r"us\$|\$|€|£|¥|\b(?:usd|eur|gbp|jpy|brl|ars|clp|cop|mxn)\b",
        r"|\bdolar(?:es)?\b|\bdollars?\b|\beuros?\b|\bpesos\b|\breales\b|\breais\b",
        r"|\blibras\b|\bpounds?\b|\byen(?:es)?\b|\byuan(?:es)?\b|\bbolivar(?:es)?\b",
        r"|\d\s*(?:peso|real|libra)\b",
    ))
});
static BASE_PREFIX_RE: LazyLock<Regex> =
    LazyLock::new(|| pattern(r"(?:\bs/\.?|\bpen\b)\s*(-?\d[\d.,]*)"));
static BASE_SUFFIX_RE: LazyLock<Regex> =
    LazyLock::new(|| pattern(r"(-?\d[\d.,]*)\s*(?:soles|sol|pen|lucas|luca)\b"));
static BASE_WORD_RE: LazyLock<Regex> =
    LazyLock::new(|| pattern(r"\bs/|\b(?:soles|pen|lucas)\b"));
// A leading minus is kept so negative amounts fail the positivity check
static NUMBER_RE: LazyLock<Regex> = LazyLock::new(|| pattern(r"-?\d[\d.,]*"));

#[allow(clippy::expect_used)]
fn pattern(re: &str) -> Regex {
    Regex::new(re).expect("parser patterns are valid")
}

/// One whitespace-separated word, lowercased, with surrounding punctuation trimmed
#[derive(Debug)]
struct Token {
    raw: String,
    folded: String,
}

impl Token {
    fn is_word(&self) -> bool {
        self.raw.chars().count() >= 2 && self.raw.chars().all(char::is_alphabetic)
    }
}

fn tokenize(text: &str) -> Vec<Token> {
    text.split_whitespace()
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()).to_lowercase())
        .filter(|raw| !raw.is_empty())
        .map(|raw| Token {
            folded: fold(&raw),
            raw,
        })
        .collect()
}

/// Everything the rule engine could read from one message
#[derive(Debug, Default)]
struct Scan {
    kind: Option<EntryKind>,
    amount: Option<f64>,
    base_currency: bool,
    foreign_currency: bool,
    category: Option<String>,
    occurred_at: Option<chrono::DateTime<chrono::Utc>>,
}

fn scan(text: &str, ctx: &ParseContext, kind_hint: Option<EntryKind>) -> Scan {
    let folded = fold(text);
    let tokens = tokenize(text);

    let date = DATE_RE
        .captures_iter(&folded)
        .find_map(|caps| {
            let day = caps.get(1)?.as_str().parse().ok()?;
            let month = caps.get(2)?.as_str().parse().ok()?;
            let year = caps.get(3).and_then(|y| y.as_str().parse::<i32>().ok());
            resolve_day_month(day, month, year, ctx)
        })
        .or_else(|| relative_date(&tokens, ctx));
    // Date tokens must not be mistaken for amounts
    let without_dates = DATE_RE.replace_all(&folded, " ");

    let (amount, base_currency) = extract_amount(&without_dates);
    let kind = detect_kind(&tokens);

    Scan {
        kind,
        amount,
        base_currency,
        foreign_currency: FOREIGN_CURRENCY_RE.is_match(&without_dates),
        category: detect_category(&tokens, kind.or(kind_hint)),
        occurred_at: date,
    }
}

fn resolve_day_month(
    day: u32,
    month: u32,
    year: Option<i32>,
    ctx: &ParseContext,
) -> Option<chrono::DateTime<chrono::Utc>> {
    let today = ctx.today();
    let date = match year {
        Some(y) if y < 100 => NaiveDate::from_ymd_opt(2000 + y, month, day)?,
        Some(y) => NaiveDate::from_ymd_opt(y, month, day)?,
        None => {
            let this_year = NaiveDate::from_ymd_opt(today.year(), month, day)?;
            // A day/month still ahead of us refers to last year
            if this_year > today {
                NaiveDate::from_ymd_opt(today.year() - 1, month, day)?
            } else {
                this_year
            }
        }
    };
    Some(local_midnight(ctx.timezone, date))
}

fn relative_date(tokens: &[Token], ctx: &ParseContext) -> Option<chrono::DateTime<chrono::Utc>> {
    tokens.iter().find_map(|t| match t.folded.as_str() {
        "hoy" => Some(ctx.now),
        "ayer" => Some(ctx.now - Duration::days(1)),
        "anteayer" => Some(ctx.now - Duration::days(2)),
        _ => None,
    })
}

/// Resolves a short temporal reference such as `"ayer"` or `"12/11"`.
#[must_use]
pub fn resolve_date(text: &str, ctx: &ParseContext) -> Option<chrono::DateTime<chrono::Utc>> {
    scan(text, ctx, None).occurred_at
}

fn extract_amount(folded: &str) -> (Option<f64>, bool) {
    let marked = BASE_PREFIX_RE
        .captures(folded)
        .or_else(|| BASE_SUFFIX_RE.captures(folded))
        .and_then(|caps| caps.get(1));
    if let Some(m) = marked {
        return (parse_amount(m.as_str()), true);
    }
    let base_currency = BASE_WORD_RE.is_match(folded);
    let amount = NUMBER_RE
        .find(folded)
        .and_then(|m| parse_amount(m.as_str()));
    (amount, base_currency)
}

/// Parses a decimal written with `.` or `,` and returns it only if strictly positive.
///
/// The last separator is the decimal one when both appear; a lone separator
/// followed by exactly three digits (or repeated) is a thousands separator.
#[must_use]
pub fn parse_amount(raw: &str) -> Option<f64> {
    let trimmed = raw.trim().trim_end_matches(['.', ',']);
    let normalized = match (trimmed.rfind('.'), trimmed.rfind(',')) {
        (Some(dot), Some(comma)) => {
            let (int_part, frac_part) = trimmed.split_at(dot.max(comma));
            format!(
                "{}.{}",
                int_part.replace(['.', ','], ""),
                frac_part.trim_start_matches(['.', ','])
            )
        }
        (Some(pos), None) | (None, Some(pos)) => {
            let sep = if trimmed.contains('.') { '.' } else { ',' };
            let repeated = trimmed.matches(sep).count() > 1;
            let frac_len = trimmed.len() - pos - 1;
            if repeated || frac_len == 3 {
                trimmed.replace(sep, "")
            } else {
                trimmed.replace(sep, ".")
            }
        }
        (None, None) => trimmed.to_string(),
    };
    normalized
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite() && *v > 0.0)
}

fn detect_kind(tokens: &[Token]) -> Option<EntryKind> {
    tokens.iter().enumerate().find_map(|(i, t)| {
        let word = t.folded.as_str();
        if EXPENSE_KEYWORDS.contains(&word) {
            Some(EntryKind::Expense)
        } else if INCOME_KEYWORDS.contains(&word)
            || (matches!(word, "pagaron" | "depositaron")
                && i.checked_sub(1)
                    .and_then(|prev| tokens.get(prev))
                    .is_some_and(|p| p.folded == "me"))
        {
            Some(EntryKind::Income)
        } else {
            None
        }
    })
}

/// Maps a word onto the fixed category vocabulary (directly or via a synonym).
#[must_use]
pub fn canonical_category(word: &str, kind: Option<EntryKind>) -> Option<&'static str> {
    let folded = fold(word.trim());
    let expense = kind != Some(EntryKind::Income);
    let income = kind != Some(EntryKind::Expense);

    let vocabulary = EXPENSE_CATEGORIES
        .iter()
        .filter(|_| expense)
        .chain(INCOME_CATEGORIES.iter().filter(|_| income));
    let synonyms = EXPENSE_SYNONYMS
        .iter()
        .filter(|_| expense)
        .chain(INCOME_SYNONYMS.iter().filter(|_| income));

    vocabulary
        .copied()
        .find(|category| fold(category) == folded)
        .or_else(|| {
            synonyms
                .filter(|(synonym, _)| *synonym == folded)
                .map(|(_, category)| *category)
                .next()
        })
}

fn is_category_candidate(token: &Token) -> bool {
    token.is_word() && !NON_CATEGORY_WORDS.contains(&token.folded.as_str())
}

fn detect_category(tokens: &[Token], kind: Option<EntryKind>) -> Option<String> {
    // Any vocabulary word or synonym wins over a free label
    if let Some(category) = tokens.iter().find_map(|t| canonical_category(&t.raw, kind)) {
        return Some(category.to_string());
    }
    // "en mercado", "por cumple": the word after a preposition becomes the label
    tokens.iter().enumerate().find_map(|(i, token)| {
        if !PREPOSITIONS.contains(&token.folded.as_str()) {
            return None;
        }
        tokens
            .iter()
            .skip(i + 1)
            .find(|t| !ARTICLES.contains(&t.folded.as_str()))
            .filter(|t| is_category_candidate(t))
            .map(|t| t.raw.clone())
    })
}

/// Deterministic stage.
///
/// Returns `None` when no financial intent (no `gasto`/`ingreso` keyword) is found,
/// so the next strategy may try.
#[must_use]
pub fn parse_rules(text: &str, ctx: &ParseContext) -> Option<ParseResult> {
    let scan = scan(text, ctx, None);
    if scan.foreign_currency {
        return Some(ParseResult::Unsupported(UnsupportedReason::WrongCurrency));
    }
    let kind = scan.kind?;
    let fragment = Fragment {
        kind: Some(kind),
        amount: scan.amount,
        currency: scan.base_currency.then(|| ctx.base_currency.clone()),
        category: scan.category,
        description: Some(text.trim().to_string()),
        occurred_at: scan.occurred_at,
    };
    Some(fragment.into_result(ctx))
}

/// Validates an AI candidate with the same checks as rule-based results.
///
/// Returns `None` when the candidate carries neither a type nor an amount.
#[must_use]
pub fn candidate_result(
    candidate: AiCandidate,
    text: &str,
    ctx: &ParseContext,
) -> Option<ParseResult> {
    let currency = candidate
        .currency
        .as_deref()
        .map(|c| c.trim().to_uppercase());
    if currency.as_deref() == Some("OTHER") {
        return Some(ParseResult::Unsupported(UnsupportedReason::WrongCurrency));
    }

    let kind = candidate
        .kind
        .as_deref()
        .and_then(|k| EntryKind::from_db(&fold(k.trim())));
    let amount = match candidate.amount {
        Some(AiAmount::Number(n)) => Some(n).filter(|v| v.is_finite() && *v > 0.0),
        Some(AiAmount::Text(s)) => parse_amount(&s),
        None => None,
    };
    if kind.is_none() && amount.is_none() {
        return None;
    }

    // The model may only pick from the vocabulary; anything else is "otros"
    let category = candidate
        .category
        .as_deref()
        .and_then(|c| canonical_category(c, kind))
        .unwrap_or("otros")
        .to_string();
    let occurred_at = candidate
        .date_text
        .as_deref()
        .and_then(|d| resolve_date(d, ctx))
        .or_else(|| resolve_date(text, ctx));

    let fragment = Fragment {
        kind,
        amount,
        currency: (currency.as_deref() == Some(ctx.base_currency.as_str()))
            .then(|| ctx.base_currency.clone()),
        category: Some(category),
        description: candidate
            .description
            .filter(|d| !d.trim().is_empty())
            .or_else(|| Some(text.trim().to_string())),
        occurred_at,
    };
    Some(fragment.into_result(ctx))
}

/// The stages that need no network: the language gate and the rule engine.
///
/// Anything the rules do not recognise is `Unparseable`.
#[must_use]
pub fn parse_offline(text: &str, ctx: &ParseContext) -> ParseResult {
    if !is_spanish(text) {
        return ParseResult::Unsupported(UnsupportedReason::Language);
    }
    parse_rules(text, ctx).unwrap_or(ParseResult::Unsupported(UnsupportedReason::Unparseable))
}

/// How a follow-up message relates to an open draft
#[derive(Debug, Clone, PartialEq)]
pub enum Fill {
    /// The message supplies at least one missing field
    Fields(Fragment),
    /// The message must be rejected (language or currency)
    Rejected(UnsupportedReason),
    /// The message supplies none of the missing fields
    Nothing,
}

/// Reads a reply to a follow-up question, e.g. `"comida"` or `"S/25"`.
///
/// Only the `missing` fields (plus an occurrence date the draft lacks) are taken.
#[must_use]
pub fn parse_fill(
    text: &str,
    draft: &Fragment,
    missing: &[Field],
    ctx: &ParseContext,
) -> Fill {
    if !is_spanish(text) {
        return Fill::Rejected(UnsupportedReason::Language);
    }
    let scan = scan(text, ctx, draft.kind);
    if scan.foreign_currency {
        return Fill::Rejected(UnsupportedReason::WrongCurrency);
    }

    let mut category = scan.category;
    if category.is_none() && scan.amount.is_none() {
        // A lone word answering "¿en qué categoría?"
        let tokens = tokenize(text);
        if let [only] = tokens.as_slice() {
            if is_category_candidate(only) && !NON_ANSWER_WORDS.contains(&only.folded.as_str()) {
                category = Some(
                    canonical_category(&only.raw, draft.kind)
                        .map_or_else(|| only.raw.clone(), str::to_string),
                );
            }
        }
    }

    let fragment = Fragment {
        kind: scan.kind.filter(|_| missing.contains(&Field::Type)),
        amount: scan.amount.filter(|_| missing.contains(&Field::Amount)),
        currency: scan.base_currency.then(|| ctx.base_currency.clone()),
        category: category.filter(|_| missing.contains(&Field::Category)),
        description: None,
        occurred_at: scan.occurred_at.filter(|_| draft.occurred_at.is_none()),
    };
    if fragment.kind.is_none() && fragment.amount.is_none() && fragment.category.is_none() {
        Fill::Nothing
    } else {
        Fill::Fields(fragment)
    }
}

/// One stage of the parsing pipeline
#[derive(Clone)]
enum Strategy {
    Rules,
    Ai(Arc<dyn FallbackExtractor>),
}

impl Strategy {
    async fn run(&self, text: &str, ctx: &ParseContext) -> Option<ParseResult> {
        match self {
            Self::Rules => parse_rules(text, ctx),
            Self::Ai(extractor) => match extractor.extract(text).await {
                Ok(Some(candidate)) => candidate_result(candidate, text, ctx),
                Ok(None) => None,
                Err(e) => {
                    warn!("AI fallback unavailable: {}", e);
                    None
                }
            },
        }
    }
}

/// Ordered parsing pipeline behind a language gate
#[derive(Clone)]
pub struct EntryParser {
    strategies: Vec<Strategy>,
}

impl Default for EntryParser {
    fn default() -> Self {
        Self::rules_only()
    }
}

impl EntryParser {
    /// Rule engine only; unrecognised messages are unparseable.
    #[must_use]
    pub fn rules_only() -> Self {
        Self {
            strategies: vec![Strategy::Rules],
        }
    }

    /// Rule engine first, `extractor` second.
    #[must_use]
    pub fn with_fallback(extractor: Arc<dyn FallbackExtractor>) -> Self {
        Self {
            strategies: vec![Strategy::Rules, Strategy::Ai(extractor)],
        }
    }

    /// Parses one message.
    pub async fn parse(&self, text: &str, ctx: &ParseContext) -> ParseResult {
        if !is_spanish(text) {
            return ParseResult::Unsupported(UnsupportedReason::Language);
        }
        for strategy in &self.strategies {
            if let Some(result) = strategy.run(text, ctx).await {
                return result;
            }
        }
        debug!("No strategy recognised a financial intent");
        ParseResult::Unsupported(UnsupportedReason::Unparseable)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::core::entry::Entry;
    use crate::test_utils::{FailingExtractor, StaticExtractor};
    use chrono::{TimeZone, Utc};

    /// Wednesday 14 October 2026, 10:00 in Lima
    fn ctx() -> ParseContext {
        ParseContext {
            now: Utc.with_ymd_and_hms(2026, 10, 14, 15, 0, 0).unwrap(),
            timezone: chrono_tz::America::Lima,
            base_currency: "PEN".to_string(),
        }
    }

    fn complete(text: &str) -> Entry {
        match parse_rules(text, &ctx()) {
            Some(ParseResult::Complete(entry)) => entry,
            other => panic!("expected complete entry for {text:?}, got {other:?}"),
        }
    }

    #[test]
    fn test_complete_expense_with_dates() {
        let ctx = ctx();
        let cases = [
            ("gasto S/25 en comida hoy", 25.0, "comida", ctx.now),
            (
                "gasto S/12.50 en transporte ayer",
                12.5,
                "transporte",
                ctx.now - Duration::days(1),
            ),
            (
                "gasto S/ 40 en diversión 12/10",
                40.0,
                "diversión",
                Utc.with_ymd_and_hms(2026, 10, 12, 5, 0, 0).unwrap(),
            ),
            (
                "gasto S/7 en mercado 01/10/2026",
                7.0,
                "mercado",
                Utc.with_ymd_and_hms(2026, 10, 1, 5, 0, 0).unwrap(),
            ),
        ];
        for (text, amount, category, occurred_at) in cases {
            let entry = complete(text);
            assert_eq!(entry.kind, EntryKind::Expense, "{text}");
            assert_eq!(entry.amount, amount, "{text}");
            assert_eq!(entry.category, category, "{text}");
            assert_eq!(entry.occurred_at, occurred_at, "{text}");
            assert_eq!(entry.currency, "PEN");
        }
    }

    #[test]
    fn test_missing_date_defaults_to_now() {
        let entry = complete("gasto S/25 en comida");
        assert_eq!(entry.occurred_at, ctx().now);
        assert_eq!(entry.description.as_deref(), Some("gasto S/25 en comida"));
    }

    #[test]
    fn test_income_variants() {
        let entry = complete("ingreso 3000 soles de sueldo");
        assert_eq!(entry.kind, EntryKind::Income);
        assert_eq!(entry.amount, 3000.0);
        assert_eq!(entry.category, "salario");

        let entry = complete("me pagaron 1.500 por una web");
        assert_eq!(entry.kind, EntryKind::Income);
        assert_eq!(entry.amount, 1500.0);
        assert_eq!(entry.category, "freelance");

        let entry = complete("Recibí 500 por un trabajo freelance");
        assert_eq!(entry.kind, EntryKind::Income);
        assert_eq!(entry.category, "freelance");
    }

    #[test]
    fn test_synonyms_and_slang() {
        let entry = complete("gasté 15 lucas en unas tabas");
        assert_eq!(entry.amount, 15.0);
        assert_eq!(entry.category, "ropa");

        let entry = complete("Pagué S/. 8,50 por el taxi");
        assert_eq!(entry.amount, 8.5);
        assert_eq!(entry.category, "transporte");
    }

    #[test]
    fn test_future_day_month_is_last_year() {
        let entry = complete("gasto S/10 en comida 20/12");
        assert_eq!(
            entry.occurred_at,
            Utc.with_ymd_and_hms(2025, 12, 20, 5, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_missing_category_is_partial() {
        let result = parse_rules("gasto S/25", &ctx()).unwrap();
        let ParseResult::Partial(fragment, missing) = result else {
            panic!("expected partial");
        };
        assert_eq!(missing, vec![Field::Category]);
        assert_eq!(fragment.amount, Some(25.0));
        assert_eq!(fragment.kind, Some(EntryKind::Expense));
    }

    #[test]
    fn test_missing_or_zero_amount_is_partial() {
        for text in ["gasto en comida", "gasto S/0 en comida"] {
            let result = parse_rules(text, &ctx()).unwrap();
            let ParseResult::Partial(fragment, missing) = result else {
                panic!("expected partial for {text}");
            };
            assert_eq!(missing, vec![Field::Amount], "{text}");
            assert_eq!(fragment.category.as_deref(), Some("comida"));
        }
    }

    #[test]
    fn test_foreign_currency_rejected() {
        for text in [
            "gasto $25 en comida",
            "gasto 25 dólares en comida",
            "gasto US$10 en ropa",
            "ingreso 100 euros",
            "gasto 20 USD en taxi",
            "gasto 50 pesos en comida",
            "gasto 25 reais en comida",
            "gasto 10 libras en ropa",
            "gasto 25 dollars en comida",
            "ingreso 300 reales de freelance",
            "gasto 1 peso en comida",
            "gasto 100 bolívares en comida",
            "gasto 500 yenes en comida",
        ] {
            assert_eq!(
                parse_rules(text, &ctx()),
                Some(ParseResult::Unsupported(UnsupportedReason::WrongCurrency)),
                "{text}"
            );
        }
    }

    #[test]
    fn test_currency_lookalike_words_pass() {
        let entry = complete("gasto S/30 en pesas para el gym de verdad real");
        assert_eq!(entry.amount, 30.0);
        let entry = complete("gasto S/12 en comida para bajar de peso");
        assert_eq!(entry.category, "comida");
    }

    #[test]
    fn test_negative_amount_is_not_taken() {
        for text in ["gasto -25 en comida", "gasto S/ -25 en comida", "gasto -25 soles en comida"] {
            let result = parse_rules(text, &ctx()).unwrap();
            let ParseResult::Partial(fragment, missing) = result else {
                panic!("expected partial for {text}");
            };
            assert_eq!(missing, vec![Field::Amount], "{text}");
            assert_eq!(fragment.amount, None, "{text}");
        }
        assert_eq!(parse_amount("-25"), None);
    }

    #[test]
    fn test_no_intent_returns_none() {
        assert_eq!(parse_rules("hola, ¿cómo estás?", &ctx()), None);
        assert_eq!(parse_rules("S/25 en comida", &ctx()), None);
    }

    #[test]
    fn test_parse_amount_separators() {
        assert_eq!(parse_amount("25"), Some(25.0));
        assert_eq!(parse_amount("12,50"), Some(12.5));
        assert_eq!(parse_amount("12.5"), Some(12.5));
        assert_eq!(parse_amount("1,500"), Some(1500.0));
        assert_eq!(parse_amount("1.234,56"), Some(1234.56));
        assert_eq!(parse_amount("1,234.56"), Some(1234.56));
        assert_eq!(parse_amount("1.000.000"), Some(1_000_000.0));
        assert_eq!(parse_amount("25."), Some(25.0));
        assert_eq!(parse_amount("0"), None);
        assert_eq!(parse_amount("0,00"), None);
    }

    #[test]
    fn test_canonical_category() {
        assert_eq!(canonical_category("Educación", None), Some("educación"));
        assert_eq!(canonical_category("educacion", None), Some("educación"));
        assert_eq!(canonical_category("chifita", Some(EntryKind::Expense)), Some("comida"));
        assert_eq!(canonical_category("sueldo", Some(EntryKind::Expense)), None);
        assert_eq!(canonical_category("mercado", None), None);
    }

    #[test]
    fn test_fill_category_single_word() {
        let draft = Fragment {
            kind: Some(EntryKind::Expense),
            amount: Some(25.0),
            ..Fragment::default()
        };
        assert_eq!(
            parse_fill("comida", &draft, &[Field::Category], &ctx()),
            Fill::Fields(Fragment {
                category: Some("comida".to_string()),
                ..Fragment::default()
            })
        );
        let Fill::Fields(fill) = parse_fill("Mercado", &draft, &[Field::Category], &ctx()) else {
            panic!("expected fill");
        };
        assert_eq!(fill.category.as_deref(), Some("mercado"));
    }

    #[test]
    fn test_fill_amount() {
        let draft = Fragment {
            kind: Some(EntryKind::Expense),
            category: Some("comida".to_string()),
            ..Fragment::default()
        };
        let Fill::Fields(fill) = parse_fill("S/ 18,90", &draft, &[Field::Amount], &ctx()) else {
            panic!("expected fill");
        };
        assert_eq!(fill.amount, Some(18.9));
    }

    #[test]
    fn test_fill_rejections_and_nothing() {
        let draft = Fragment {
            kind: Some(EntryKind::Expense),
            category: Some("comida".to_string()),
            ..Fragment::default()
        };
        assert_eq!(
            parse_fill("25 dólares", &draft, &[Field::Amount], &ctx()),
            Fill::Rejected(UnsupportedReason::WrongCurrency)
        );
        assert_eq!(
            parse_fill("twenty five please", &draft, &[Field::Amount], &ctx()),
            Fill::Rejected(UnsupportedReason::Language)
        );
        assert_eq!(
            parse_fill("no sé todavía", &draft, &[Field::Amount], &ctx()),
            Fill::Nothing
        );
    }

    #[test]
    fn test_fill_ignores_greetings_and_acknowledgements() {
        let draft = Fragment {
            kind: Some(EntryKind::Expense),
            amount: Some(25.0),
            ..Fragment::default()
        };
        for reply in ["hola", "Gracias", "sí", "ok", "Vale!"] {
            assert_eq!(
                parse_fill(reply, &draft, &[Field::Category], &ctx()),
                Fill::Nothing,
                "{reply}"
            );
        }
    }

    #[test]
    fn test_candidate_result_validation() {
        let ctx = ctx();
        let candidate = AiCandidate {
            kind: Some("gasto".to_string()),
            amount: Some(AiAmount::Text("30,5".to_string())),
            currency: Some("PEN".to_string()),
            category: Some("astrología".to_string()),
            description: Some("lectura de cartas".to_string()),
            date_text: Some("ayer".to_string()),
        };
        let Some(ParseResult::Complete(entry)) = candidate_result(candidate, "texto", &ctx) else {
            panic!("expected complete");
        };
        assert_eq!(entry.amount, 30.5);
        assert_eq!(entry.category, "otros");
        assert_eq!(entry.occurred_at, ctx.now - Duration::days(1));

        let foreign = AiCandidate {
            kind: Some("gasto".to_string()),
            currency: Some("OTHER".to_string()),
            ..AiCandidate::default()
        };
        assert_eq!(
            candidate_result(foreign, "texto", &ctx),
            Some(ParseResult::Unsupported(UnsupportedReason::WrongCurrency))
        );

        assert_eq!(candidate_result(AiCandidate::default(), "texto", &ctx), None);

        let no_amount = AiCandidate {
            kind: Some("ingreso".to_string()),
            amount: Some(AiAmount::Number(-5.0)),
            ..AiCandidate::default()
        };
        let Some(ParseResult::Partial(_, missing)) = candidate_result(no_amount, "texto", &ctx)
        else {
            panic!("expected partial");
        };
        assert_eq!(missing, vec![Field::Amount]);
    }

    #[tokio::test]
    async fn test_language_gate_precedes_everything() {
        let parser = EntryParser::rules_only();
        let result = parser.parse("expense S/25 food today", &ctx()).await;
        assert_eq!(result, ParseResult::Unsupported(UnsupportedReason::Language));
    }

    #[tokio::test]
    async fn test_ai_fallback_only_without_intent() {
        let extractor = Arc::new(StaticExtractor::new(Some(AiCandidate {
            kind: Some("gasto".to_string()),
            amount: Some(AiAmount::Number(30.0)),
            currency: Some("PEN".to_string()),
            category: Some("transporte".to_string()),
            ..AiCandidate::default()
        })));
        let parser = EntryParser::with_fallback(extractor.clone());

        // Rules already judged this partial: the AI is not consulted
        let result = parser.parse("gasto S/25", &ctx()).await;
        assert!(matches!(result, ParseResult::Partial(_, _)));
        assert_eq!(extractor.calls(), 0);

        // No intent: the AI answers
        let result = parser.parse("se me fue un taxi carísimo", &ctx()).await;
        let ParseResult::Complete(entry) = result else {
            panic!("expected complete from AI");
        };
        assert_eq!(entry.amount, 30.0);
        assert_eq!(entry.category, "transporte");
        assert_eq!(extractor.calls(), 1);
    }

    #[tokio::test]
    async fn test_ai_failure_degrades_to_unparseable() {
        let parser = EntryParser::with_fallback(Arc::new(FailingExtractor));
        let result = parser.parse("se me fue un taxi carísimo", &ctx()).await;
        assert_eq!(
            result,
            ParseResult::Unsupported(UnsupportedReason::Unparseable)
        );

        let parser = EntryParser::rules_only();
        let result = parser.parse("hola", &ctx()).await;
        assert_eq!(
            result,
            ParseResult::Unsupported(UnsupportedReason::Unparseable)
        );
    }
}
