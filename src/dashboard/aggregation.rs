//! Totals that the dashboard summarises the ledger with.

use std::ops::RangeInclusive;

use rusqlite::Connection;
use time::{Date, Duration};

use crate::{
    Error,
    account::{AccountKind, get_accounts_by_kind},
};

/// The amount spent in one category.
#[derive(Debug, Clone, PartialEq)]
pub(super) struct CategorySpending {
    pub category: String,
    pub total: f64,
}

/// The summed balance of the accounts of one kind.
#[derive(Debug, Clone, PartialEq)]
pub(super) struct KindBalance {
    pub kind: AccountKind,
    pub account_count: usize,
    pub total: f64,
}

/// The first and last day of the month containing `today`.
pub(super) fn month_to_date_range(today: Date) -> RangeInclusive<Date> {
    let first_day = today - Duration::days(i64::from(today.day()) - 1);
    let days_in_month = today.month().length(today.year());
    let last_day = first_day + Duration::days(i64::from(days_in_month) - 1);

    first_day..=last_day
}

/// Sum expenses per category for the dates in `date_range`.
///
/// Categories are sorted by the amount spent, largest first.
pub(super) fn get_spending_by_category(
    date_range: RangeInclusive<Date>,
    connection: &Connection,
) -> Result<Vec<CategorySpending>, Error> {
    connection
        .prepare(
            "SELECT category, SUM(ABS(amount)) AS total
            FROM transactions
            WHERE type = 'expense' AND date BETWEEN :start AND :end
            GROUP BY category
            ORDER BY total DESC, category ASC",
        )?
        .query_map(
            &[
                (":start", date_range.start()),
                (":end", date_range.end()),
            ],
            |row| {
                Ok(CategorySpending {
                    category: row.get(0)?,
                    total: row.get(1)?,
                })
            },
        )?
        .map(|maybe_spending| maybe_spending.map_err(Error::from))
        .collect()
}

/// Sum account balances per account kind, skipping kinds without accounts.
pub(super) fn get_balances_by_kind(connection: &Connection) -> Result<Vec<KindBalance>, Error> {
    let mut balances = Vec::new();

    for kind in AccountKind::ALL {
        let accounts = get_accounts_by_kind(kind, connection)?;

        if accounts.is_empty() {
            continue;
        }

        balances.push(KindBalance {
            kind,
            account_count: accounts.len(),
            total: accounts.iter().map(|account| account.balance).sum(),
        });
    }

    Ok(balances)
}
