//! Renders transactions and summary totals as a downloadable CSV file.
//!
//! Two layouts are supported: a multi-column layout where the first data row
//! carries the income/expense/balance summary, and a single-column layout
//! where every row is one human-readable string.

use std::sync::{Arc, Mutex};

use axum::{
    extract::{FromRef, Query, State},
    http::header,
    response::{IntoResponse, Response},
};
use rusqlite::Connection;
use serde::Deserialize;

use crate::{
    AppState, Error,
    transaction::{DateOrder, Transaction, totals_by_type, transactions_matching_month},
};

// ============================================================================
// MODELS
// ============================================================================

/// The query parameters accepted by the CSV download endpoint.
#[derive(Debug, Default, Deserialize)]
pub struct ExportParams {
    /// Optional `YYYY-MM` (or `YYYY`) prefix to filter transactions by date.
    /// An empty value means no filter.
    #[serde(default)]
    pub month: Option<String>,
    /// "asc" (default, oldest first) or "desc" date ordering for the
    /// transaction rows.
    #[serde(default)]
    pub order: Option<String>,
    /// Truthy values ("1", "true", "yes", case-insensitive) select the
    /// single-column layout.
    #[serde(default)]
    pub single: Option<String>,
}

impl ExportParams {
    fn month(&self) -> Option<&str> {
        self.month.as_deref().filter(|month| !month.is_empty())
    }

    fn order(&self) -> DateOrder {
        match self.order.as_deref() {
            Some(order) if order.eq_ignore_ascii_case("desc") => DateOrder::Descending,
            _ => DateOrder::Ascending,
        }
    }

    fn single(&self) -> bool {
        matches!(
            self.single.as_deref().map(str::to_lowercase).as_deref(),
            Some("1") | Some("true") | Some("yes")
        )
    }
}

/// The aggregate figures rendered alongside the transaction rows.
#[derive(Debug, PartialEq)]
pub struct Summary {
    /// The summed income over the exported rows, 0 if there was none.
    pub income: f64,
    /// The summed expenses over the exported rows, 0 if there was none.
    pub expense: f64,
}

impl Summary {
    /// The income remaining after expenses.
    pub fn balance(&self) -> f64 {
        self.income - self.expense
    }
}

/// Sum the income and expense amounts for the optional month prefix.
///
/// # Errors
/// This function will return a [Error::SqlError] if there is some SQL error.
pub fn month_summary(month: Option<&str>, connection: &Connection) -> Result<Summary, Error> {
    let mut summary = Summary {
        income: 0.0,
        expense: 0.0,
    };

    for (kind, sum) in totals_by_type(month, connection)? {
        match kind.as_str() {
            "income" => summary.income = sum,
            "expense" => summary.expense = sum,
            // Types outside the two defaults do not take part in the summary.
            _ => {}
        }
    }

    Ok(summary)
}

// ============================================================================
// RENDERING
// ============================================================================

/// Render the multi-column CSV layout.
///
/// The header combines the transaction columns with the three summary
/// columns; row 2 carries only the summary, and each transaction row leaves
/// the summary columns empty. With no transactions, a single row with
/// `Description` set to "No transactions" is emitted with the summary
/// columns still populated.
///
/// # Errors
/// Returns [Error::CsvError] if a record cannot be written.
pub fn render_multi_column(
    transactions: &[Transaction],
    summary: &Summary,
) -> Result<String, Error> {
    let mut writer = csv::Writer::from_writer(Vec::new());

    writer.write_record([
        "ID",
        "Description",
        "Amount",
        "Type",
        "Category",
        "Date",
        "Total Income",
        "Total Expense",
        "Balance",
    ])?;

    let income = format!("{:.2}", summary.income);
    let expense = format!("{:.2}", summary.expense);
    let balance = format!("{:.2}", summary.balance());

    // Summary row: leave the transaction columns empty.
    writer.write_record(["", "", "", "", "", "", &income, &expense, &balance])?;

    if transactions.is_empty() {
        writer.write_record(["", "No transactions", "", "", "", "", &income, &expense, &balance])?;
    } else {
        for transaction in transactions {
            writer.write_record([
                &transaction.id.to_string(),
                &transaction.description,
                &format!("{:.2}", transaction.amount),
                &transaction.kind,
                &transaction.category,
                &transaction.date,
                "",
                "",
                "",
            ])?;
        }
    }

    into_csv_text(writer)
}

/// Render the single-column CSV layout, where each row is one combined
/// human-readable string.
///
/// # Errors
/// Returns [Error::CsvError] if a record cannot be written.
pub fn render_single_column(
    transactions: &[Transaction],
    summary: &Summary,
) -> Result<String, Error> {
    let mut writer = csv::Writer::from_writer(Vec::new());

    writer.write_record(["Data"])?;

    writer.write_record([format!(
        "Total Income: {:.2} | Total Expense: {:.2} | Balance: {:.2}",
        summary.income,
        summary.expense,
        summary.balance()
    )])?;

    if transactions.is_empty() {
        writer.write_record(["No transactions"])?;
        return into_csv_text(writer);
    }

    // A lone empty field would be written quoted, so the blank spacer line
    // goes straight into the buffer instead.
    let mut buffer = writer
        .into_inner()
        .map_err(|error| Error::CsvError(error.to_string()))?;
    buffer.push(b'\n');

    let mut writer = csv::Writer::from_writer(buffer);
    for transaction in transactions {
        writer.write_record([format!(
            "ID:{} | {} | {} {:.2} | Category: {} | Date: {}",
            transaction.id,
            transaction.description,
            capitalize(&transaction.kind),
            transaction.amount,
            transaction.category,
            transaction.date
        )])?;
    }

    into_csv_text(writer)
}

fn into_csv_text(writer: csv::Writer<Vec<u8>>) -> Result<String, Error> {
    let bytes = writer
        .into_inner()
        .map_err(|error| Error::CsvError(error.to_string()))?;

    String::from_utf8(bytes).map_err(|error| Error::CsvError(error.to_string()))
}

/// Uppercase the first character and lowercase the rest, e.g. "expense"
/// becomes "Expense".
fn capitalize(text: &str) -> String {
    let mut chars = text.chars();

    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase(),
        None => String::new(),
    }
}

// ============================================================================
// ENDPOINT
// ============================================================================

/// The state needed to export transactions.
#[derive(Debug, Clone)]
pub struct ExportCsvState {
    /// The database connection for querying transactions.
    db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for ExportCsvState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// A route handler for downloading transactions as a CSV attachment.
///
/// The suggested filename is `transactions_<month>.csv` when a month filter
/// is given, `transactions_all.csv` otherwise.
///
/// # Panics
///
/// Panics if the lock for the database connection is already held by the same thread.
pub async fn download_csv_endpoint(
    State(state): State<ExportCsvState>,
    Query(params): Query<ExportParams>,
) -> Result<Response, Error> {
    let month = params.month();

    let (transactions, summary) = {
        let connection = state.db_connection.lock().unwrap();
        let transactions = transactions_matching_month(month, params.order(), &connection)?;
        let summary = month_summary(month, &connection)?;
        (transactions, summary)
    };

    let body = if params.single() {
        render_single_column(&transactions, &summary)?
    } else {
        render_multi_column(&transactions, &summary)?
    };

    let filename = match month {
        Some(month) => format!("transactions_{month}.csv"),
        None => "transactions_all.csv".to_owned(),
    };

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv".to_owned()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        body,
    )
        .into_response())
}

// ============================================================================
// TESTS
// ============================================================================
