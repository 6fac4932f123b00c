//! Report generation business logic.
//!
//! Reports aggregate a user's ledger over a calendar period evaluated in the
//! configured timezone. All functions take the current instant explicitly and
//! return structured data; [`format_summary`] renders it for chat.

use crate::{
    core::{
        entry::{EntryKind, local_midnight},
        ledger,
    },
    errors::Result,
};
use chrono::{DateTime, Datelike, Duration, Months, NaiveDate, Utc};
use chrono_tz::Tz;
use sea_orm::ConnectionTrait;
use std::collections::BTreeMap;

/// Reporting period
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportPeriod {
    /// Monday 00:00 through now
    Weekly,
    /// The whole previous calendar month
    Monthly,
    /// January 1 through now
    Annual,
}

impl ReportPeriod {
    /// Parses `semanal`, `mensual` or `anual` (accents and case ignored).
    #[must_use]
    pub fn from_word(word: &str) -> Option<Self> {
        match crate::core::language::fold(word.trim()).as_str() {
            "semanal" => Some(Self::Weekly),
            "mensual" => Some(Self::Monthly),
            "anual" => Some(Self::Annual),
            _ => None,
        }
    }

    /// Heading used in chat replies
    #[must_use]
    pub const fn title(self) -> &'static str {
        match self {
            Self::Weekly => "📊 Reporte Semanal",
            Self::Monthly => "📊 Reporte Mensual",
            Self::Annual => "📊 Reporte Anual",
        }
    }
}

/// Aggregated ledger activity over one period
#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    /// Period that was requested
    pub period: ReportPeriod,
    /// Inclusive range start
    pub start: DateTime<Utc>,
    /// Inclusive range end
    pub end: DateTime<Utc>,
    /// Sum of income amounts
    pub total_income: f64,
    /// Sum of expense amounts
    pub total_expense: f64,
    /// Income minus expense
    pub net: f64,
    /// Per category: income minus expense; categories without activity are absent
    pub by_category: BTreeMap<String, f64>,
    /// Number of transactions in range
    pub transaction_count: usize,
}

/// Computes the inclusive UTC range for `period` as seen from `now` in `tz`.
#[must_use]
pub fn period_range(
    period: ReportPeriod,
    now: DateTime<Utc>,
    tz: Tz,
) -> (DateTime<Utc>, DateTime<Utc>) {
    let today = now.with_timezone(&tz).date_naive();
    match period {
        ReportPeriod::Weekly => {
            let monday =
                today - Duration::days(i64::from(today.weekday().num_days_from_monday()));
            (local_midnight(tz, monday), now)
        }
        ReportPeriod::Monthly => {
            let this_month = today.with_day(1).unwrap_or(today);
            let last_month = this_month
                .checked_sub_months(Months::new(1))
                .unwrap_or(this_month);
            let end = local_midnight(tz, this_month) - Duration::nanoseconds(1);
            (local_midnight(tz, last_month), end)
        }
        ReportPeriod::Annual => {
            let january_first = NaiveDate::from_ymd_opt(today.year(), 1, 1).unwrap_or(today);
            (local_midnight(tz, january_first), now)
        }
    }
}

/// Builds the summary of `user_id`'s ledger for `period`.
///
/// An empty range yields all-zero totals and an empty category mapping.
pub async fn build_report<C: ConnectionTrait>(
    conn: &C,
    user_id: i64,
    period: ReportPeriod,
    now: DateTime<Utc>,
    tz: Tz,
) -> Result<Summary> {
    let (start, end) = period_range(period, now, tz);
    let transactions = ledger::transactions_in_range(conn, user_id, start, end).await?;

    let mut summary = Summary {
        period,
        start,
        end,
        total_income: 0.0,
        total_expense: 0.0,
        net: 0.0,
        by_category: BTreeMap::new(),
        transaction_count: transactions.len(),
    };

    for transaction in &transactions {
        let signed = match EntryKind::from_db(&transaction.transaction_type) {
            Some(EntryKind::Income) => {
                summary.total_income += transaction.amount;
                transaction.amount
            }
            Some(EntryKind::Expense) => {
                summary.total_expense += transaction.amount;
                -transaction.amount
            }
            None => {
                tracing::warn!(
                    transaction_id = transaction.id,
                    kind = %transaction.transaction_type,
                    "Skipping transaction with unknown type"
                );
                continue;
            }
        };
        *summary
            .by_category
            .entry(transaction.category.clone())
            .or_insert(0.0) += signed;
    }
    summary.net = summary.total_income - summary.total_expense;

    Ok(summary)
}

/// Formats an amount in the base currency, e.g. `S/ 25.00`.
#[must_use]
pub fn format_amount(amount: f64) -> String {
    if amount < 0.0 {
        format!("-S/ {:.2}", amount.abs())
    } else {
        format!("S/ {amount:.2}")
    }
}

/// Renders a summary as a chat message.
#[must_use]
pub fn format_summary(summary: &Summary, tz: Tz) -> String {
    let start = summary.start.with_timezone(&tz).format("%d/%m/%Y");
    let end = summary.end.with_timezone(&tz).format("%d/%m/%Y");
    let balance_marker = if summary.net >= 0.0 { "🟢" } else { "🔴" };

    let mut out = format!(
        "{}\n📅 {start} - {end}\n\n💰 Ingresos: {}\n💸 Gastos: {}\n{balance_marker} Balance: {}",
        summary.period.title(),
        format_amount(summary.total_income),
        format_amount(summary.total_expense),
        format_amount(summary.net),
    );

    if summary.transaction_count == 0 {
        out.push_str("\n\nℹ️ No hay transacciones en este período.");
        return out;
    }

    out.push_str("\n\n📂 Por categoría:");
    for (category, net) in &summary.by_category {
        out.push_str(&format!("\n  • {category}: {}", format_amount(*net)));
    }
    out
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::core::entry::Entry;
    use crate::test_utils::*;
    use chrono::TimeZone;

    const LIMA: Tz = chrono_tz::America::Lima;

    async fn add(
        db: &sea_orm::DatabaseConnection,
        user_id: i64,
        kind: EntryKind,
        amount: f64,
        category: &str,
        occurred_at: DateTime<Utc>,
    ) -> Result<()> {
        let entry = Entry {
            kind,
            amount,
            currency: "PEN".to_string(),
            category: category.to_string(),
            description: None,
            occurred_at,
        };
        ledger::record_transaction(db, user_id, &entry, test_now()).await?;
        Ok(())
    }

    #[test]
    fn test_period_from_word() {
        assert_eq!(ReportPeriod::from_word("Semanal"), Some(ReportPeriod::Weekly));
        assert_eq!(ReportPeriod::from_word("mensual"), Some(ReportPeriod::Monthly));
        assert_eq!(ReportPeriod::from_word("ANUAL"), Some(ReportPeriod::Annual));
        assert_eq!(ReportPeriod::from_word("diario"), None);
    }

    #[test]
    fn test_period_ranges() {
        // Wednesday 14 October 2026, 10:00 in Lima
        let now = test_now();

        let (start, end) = period_range(ReportPeriod::Weekly, now, LIMA);
        assert_eq!(start, Utc.with_ymd_and_hms(2026, 10, 12, 5, 0, 0).unwrap());
        assert_eq!(end, now);

        let (start, end) = period_range(ReportPeriod::Monthly, now, LIMA);
        assert_eq!(start, Utc.with_ymd_and_hms(2026, 9, 1, 5, 0, 0).unwrap());
        assert_eq!(
            end,
            Utc.with_ymd_and_hms(2026, 10, 1, 5, 0, 0).unwrap() - Duration::nanoseconds(1)
        );

        let (start, end) = period_range(ReportPeriod::Annual, now, LIMA);
        assert_eq!(start, Utc.with_ymd_and_hms(2026, 1, 1, 5, 0, 0).unwrap());
        assert_eq!(end, now);
    }

    #[test]
    fn test_monthly_range_in_january() {
        let now = Utc.with_ymd_and_hms(2026, 1, 20, 15, 0, 0).unwrap();
        let (start, end) = period_range(ReportPeriod::Monthly, now, LIMA);
        assert_eq!(start, Utc.with_ymd_and_hms(2025, 12, 1, 5, 0, 0).unwrap());
        assert!(end < Utc.with_ymd_and_hms(2026, 1, 1, 5, 0, 0).unwrap());
    }

    #[test]
    fn test_weekly_range_on_monday_starts_today() {
        // 00:30 on Monday in Lima
        let now = Utc.with_ymd_and_hms(2026, 10, 12, 5, 30, 0).unwrap();
        let (start, _) = period_range(ReportPeriod::Weekly, now, LIMA);
        assert_eq!(start, Utc.with_ymd_and_hms(2026, 10, 12, 5, 0, 0).unwrap());
    }

    #[tokio::test]
    async fn test_weekly_report_boundaries() -> Result<()> {
        let db = setup_test_db().await?;
        let user = create_test_user(&db, "51977777771").await?;

        // Sunday 23:00 Lima, before the week started
        let sunday_night = Utc.with_ymd_and_hms(2026, 10, 12, 4, 0, 0).unwrap();
        add(&db, user.id, EntryKind::Expense, 99.0, "comida", sunday_night).await?;
        // Monday 00:00 Lima, first instant of the week
        let monday = Utc.with_ymd_and_hms(2026, 10, 12, 5, 0, 0).unwrap();
        add(&db, user.id, EntryKind::Expense, 20.0, "comida", monday).await?;
        add(&db, user.id, EntryKind::Income, 100.0, "freelance", test_now()).await?;

        let summary = build_report(&db, user.id, ReportPeriod::Weekly, test_now(), LIMA).await?;
        assert_eq!(summary.total_expense, 20.0);
        assert_eq!(summary.total_income, 100.0);
        assert_eq!(summary.net, 80.0);
        assert_eq!(summary.transaction_count, 2);
        assert_eq!(summary.by_category.get("comida"), Some(&-20.0));
        assert_eq!(summary.by_category.get("freelance"), Some(&100.0));
        Ok(())
    }

    #[tokio::test]
    async fn test_monthly_report_is_previous_month() -> Result<()> {
        let db = setup_test_db().await?;
        let user = create_test_user(&db, "51977777772").await?;

        let august = Utc.with_ymd_and_hms(2026, 8, 31, 12, 0, 0).unwrap();
        let september = Utc.with_ymd_and_hms(2026, 9, 15, 12, 0, 0).unwrap();
        // 23:00 on 30 September in Lima
        let last_evening = Utc.with_ymd_and_hms(2026, 10, 1, 4, 0, 0).unwrap();
        let october = Utc.with_ymd_and_hms(2026, 10, 2, 12, 0, 0).unwrap();

        add(&db, user.id, EntryKind::Expense, 1.0, "ropa", august).await?;
        add(&db, user.id, EntryKind::Expense, 30.0, "ropa", september).await?;
        add(&db, user.id, EntryKind::Income, 2500.0, "salario", last_evening).await?;
        add(&db, user.id, EntryKind::Expense, 7.0, "ropa", october).await?;

        let summary = build_report(&db, user.id, ReportPeriod::Monthly, test_now(), LIMA).await?;
        assert_eq!(summary.total_expense, 30.0);
        assert_eq!(summary.total_income, 2500.0);
        assert_eq!(summary.by_category.len(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_annual_report_excludes_prior_year() -> Result<()> {
        let db = setup_test_db().await?;
        let user = create_test_user(&db, "51977777773").await?;

        // 23:00 on 31 December 2025 in Lima
        let new_years_eve = Utc.with_ymd_and_hms(2026, 1, 1, 4, 0, 0).unwrap();
        let new_year = Utc.with_ymd_and_hms(2026, 1, 1, 5, 0, 0).unwrap();
        add(&db, user.id, EntryKind::Expense, 50.0, "diversión", new_years_eve).await?;
        add(&db, user.id, EntryKind::Expense, 15.0, "diversión", new_year).await?;

        let summary = build_report(&db, user.id, ReportPeriod::Annual, test_now(), LIMA).await?;
        assert_eq!(summary.total_expense, 15.0);
        assert_eq!(summary.by_category.get("diversión"), Some(&-15.0));
        Ok(())
    }

    #[tokio::test]
    async fn test_empty_report() -> Result<()> {
        let db = setup_test_db().await?;
        let user = create_test_user(&db, "51977777774").await?;

        let summary = build_report(&db, user.id, ReportPeriod::Weekly, test_now(), LIMA).await?;
        assert_eq!(summary.total_income, 0.0);
        assert_eq!(summary.total_expense, 0.0);
        assert_eq!(summary.net, 0.0);
        assert!(summary.by_category.is_empty());

        let text = format_summary(&summary, LIMA);
        assert!(text.starts_with("📊 Reporte Semanal\n📅 12/10/2026 - 14/10/2026"));
        assert!(text.contains("🟢 Balance: S/ 0.00"));
        assert!(text.ends_with("ℹ️ No hay transacciones en este período."));
        Ok(())
    }

    #[test]
    fn test_format_summary_lists_categories() {
        let summary = Summary {
            period: ReportPeriod::Monthly,
            start: Utc.with_ymd_and_hms(2026, 9, 1, 5, 0, 0).unwrap(),
            end: Utc.with_ymd_and_hms(2026, 10, 1, 4, 59, 59).unwrap(),
            total_income: 100.0,
            total_expense: 130.5,
            net: -30.5,
            by_category: BTreeMap::from([
                ("comida".to_string(), -130.5),
                ("regalos".to_string(), 100.0),
            ]),
            transaction_count: 3,
        };

        let text = format_summary(&summary, LIMA);
        assert!(text.contains("📅 01/09/2026 - 30/09/2026"));
        assert!(text.contains("💸 Gastos: S/ 130.50"));
        assert!(text.contains("🔴 Balance: -S/ 30.50"));
        assert!(text.contains("  • comida: -S/ 130.50"));
        assert!(text.contains("  • regalos: S/ 100.00"));
    }
}
