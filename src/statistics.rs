//! Aggregated statistics over the transaction store.
//!
//! Computes per-month income/expense totals, expense breakdowns by category
//! and by day, and the all-time monthly trend series, and serves them as a
//! single JSON payload.

use std::{
    collections::BTreeMap,
    sync::{Arc, Mutex},
};

use axum::{
    Json,
    extract::{FromRef, Path, State},
};
use rusqlite::{Connection, Row};
use serde::Serialize;

use crate::{AppState, Error, transaction::totals_by_type};

// ============================================================================
// MODELS
// ============================================================================

/// The statistics payload for one requested month prefix.
#[derive(Debug, PartialEq, Serialize)]
pub struct Statistics {
    /// Sum of amounts by transaction type within the month filter.
    ///
    /// "income" and "expense" are always present, defaulting to 0. Rows with
    /// any other type string appear under their own key.
    pub totals: BTreeMap<String, f64>,
    /// Expense sums grouped by category within the month filter.
    pub categories: Vec<CategoryTotal>,
    /// Expense sums grouped by exact date within the month filter, ascending.
    pub daily: Vec<DailyTotal>,
    /// Income/expense sums per distinct `YYYY-MM` date prefix over the whole
    /// store, ascending. Not limited by the month filter: this series answers
    /// "all-time trend", not "trend within one month".
    pub monthly: Vec<MonthlyTotal>,
}

/// The total expenses for one category.
#[derive(Debug, PartialEq, Serialize)]
pub struct CategoryTotal {
    /// The category name. May be the empty string.
    pub name: String,
    /// The summed expense amount.
    pub value: f64,
}

/// The total expenses for one date.
#[derive(Debug, PartialEq, Serialize)]
pub struct DailyTotal {
    /// The date, as `YYYY-MM-DD` text.
    pub date: String,
    /// The summed expense amount.
    pub amount: f64,
}

/// The income and expense totals for one `YYYY-MM` month.
#[derive(Debug, PartialEq, Serialize)]
pub struct MonthlyTotal {
    /// The 7-character `YYYY-MM` date prefix.
    pub month: String,
    /// The summed income for the month, 0 if there was none.
    pub income: f64,
    /// The summed expenses for the month, 0 if there was none.
    pub expense: f64,
}

// ============================================================================
// AGGREGATION
// ============================================================================

/// Compute the statistics for transactions whose date starts with `month`.
///
/// The month filter is a literal string prefix, so "2024" covers the whole
/// year. The `monthly` series always spans the entire store.
///
/// # Errors
/// This function will return a [Error::SqlError] if there is some SQL error.
pub fn month_statistics(month: &str, connection: &Connection) -> Result<Statistics, Error> {
    let mut totals = BTreeMap::from([
        ("income".to_owned(), 0.0),
        ("expense".to_owned(), 0.0),
    ]);
    for (kind, sum) in totals_by_type(Some(month), connection)? {
        totals.insert(kind, sum);
    }

    let categories = expense_totals_by_category(month, connection)?;
    let daily = expense_totals_by_date(month, connection)?;
    let monthly = all_time_monthly_totals(connection)?;

    Ok(Statistics {
        totals,
        categories,
        daily,
        monthly,
    })
}

fn expense_totals_by_category(
    month: &str,
    connection: &Connection,
) -> Result<Vec<CategoryTotal>, Error> {
    connection
        .prepare(
            "SELECT category, SUM(amount) FROM \"transaction\"
             WHERE type = 'expense' AND date LIKE :prefix
             GROUP BY category",
        )?
        .query_map(&[(":prefix", &format!("{month}%"))], |row| {
            Ok(CategoryTotal {
                name: row.get(0)?,
                value: row.get(1)?,
            })
        })?
        .map(|maybe_total| maybe_total.map_err(|error| error.into()))
        .collect()
}

fn expense_totals_by_date(month: &str, connection: &Connection) -> Result<Vec<DailyTotal>, Error> {
    connection
        .prepare(
            "SELECT date, SUM(amount) FROM \"transaction\"
             WHERE type = 'expense' AND date LIKE :prefix
             GROUP BY date ORDER BY date",
        )?
        .query_map(&[(":prefix", &format!("{month}%"))], |row| {
            Ok(DailyTotal {
                date: row.get(0)?,
                amount: row.get(1)?,
            })
        })?
        .map(|maybe_total| maybe_total.map_err(|error| error.into()))
        .collect()
}

fn all_time_monthly_totals(connection: &Connection) -> Result<Vec<MonthlyTotal>, Error> {
    let map_row = |row: &Row| -> Result<(String, String, f64), rusqlite::Error> {
        Ok((row.get(0)?, row.get(1)?, row.get(2)?))
    };

    let rows = connection
        .prepare(
            "SELECT substr(date, 1, 7) AS month, type, SUM(amount)
             FROM \"transaction\" GROUP BY month, type ORDER BY month",
        )?
        .query_map([], map_row)?
        .collect::<Result<Vec<_>, _>>()?;

    let mut monthly: BTreeMap<String, MonthlyTotal> = BTreeMap::new();
    for (month, kind, sum) in rows {
        let entry = monthly.entry(month.clone()).or_insert(MonthlyTotal {
            month,
            income: 0.0,
            expense: 0.0,
        });

        // A month that only has rows of some other type still gets an entry,
        // with both sides left at 0.
        match kind.as_str() {
            "income" => entry.income = sum,
            "expense" => entry.expense = sum,
            _ => {}
        }
    }

    Ok(monthly.into_values().collect())
}

// ============================================================================
// ENDPOINT
// ============================================================================

/// The state needed to compute statistics.
#[derive(Debug, Clone)]
pub struct StatisticsState {
    /// The database connection for querying transactions.
    db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for StatisticsState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// A route handler for the statistics of one month prefix.
///
/// # Panics
///
/// Panics if the lock for the database connection is already held by the same thread.
pub async fn get_statistics_endpoint(
    State(state): State<StatisticsState>,
    Path(month): Path<String>,
) -> Result<Json<Statistics>, Error> {
    let connection = state.db_connection.lock().unwrap();

    month_statistics(&month, &connection).map(Json)
}

// ============================================================================
// TESTS
// ============================================================================
