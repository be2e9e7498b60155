//! Defines the core data model and database queries for transactions.

use rusqlite::{Connection, Row};
use serde::{Deserialize, Serialize};

use crate::{Error, database_id::TransactionId};

// ============================================================================
// MODELS
// ============================================================================

/// An expense or income, i.e. an event where money was either spent or earned.
///
/// Transactions are immutable once stored: they are created via
/// [create_transaction] and can only be removed, never updated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// The ID of the transaction.
    pub id: TransactionId,
    /// A text description of what the transaction was for.
    pub description: String,
    /// The amount of money spent or earned in this transaction.
    pub amount: f64,
    /// Whether the transaction is an "income" or an "expense".
    ///
    /// Any other string is accepted and stored as-is; the statistics
    /// queries report such rows under their own key.
    #[serde(rename = "type")]
    pub kind: String,
    /// The category the transaction belongs to. May be the empty string.
    pub category: String,
    /// When the transaction happened, as `YYYY-MM-DD` text.
    ///
    /// Kept as raw text rather than a date type: the month filters match on
    /// string prefixes, so the stored value must round-trip exactly as it
    /// was supplied.
    pub date: String,
}

/// The fields needed to insert a new transaction.
///
/// Field presence and the amount conversion are validated at the HTTP
/// boundary before one of these is constructed.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTransaction {
    /// A text description of what the transaction is for.
    pub description: String,
    /// The amount of money spent or earned.
    pub amount: f64,
    /// Whether the transaction is an "income" or an "expense".
    pub kind: String,
    /// The category the transaction belongs to. May be the empty string.
    pub category: String,
    /// When the transaction happened, as `YYYY-MM-DD` text.
    pub date: String,
}

/// The date ordering for transaction queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DateOrder {
    /// Oldest transactions first.
    #[default]
    Ascending,
    /// Most recent transactions first.
    Descending,
}

impl DateOrder {
    fn sql(self) -> &'static str {
        match self {
            DateOrder::Ascending => "ASC",
            DateOrder::Descending => "DESC",
        }
    }
}

// ============================================================================
// DATABASE FUNCTIONS
// ============================================================================

/// Create a new transaction in the database.
///
/// # Errors
/// This function will return a:
/// - [Error::StoreIntegrity] if a database constraint rejects the row,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn create_transaction(
    new_transaction: NewTransaction,
    connection: &Connection,
) -> Result<Transaction, Error> {
    let transaction = connection
        .prepare(
            "INSERT INTO \"transaction\" (description, amount, type, category, date)
             VALUES (?1, ?2, ?3, ?4, ?5)
             RETURNING id, description, amount, type, category, date",
        )?
        .query_one(
            (
                new_transaction.description,
                new_transaction.amount,
                new_transaction.kind,
                new_transaction.category,
                new_transaction.date,
            ),
            map_transaction_row,
        )?;

    Ok(transaction)
}

/// Retrieve all transactions, most recent date first.
///
/// # Errors
/// This function will return a [Error::SqlError] if there is some SQL error.
pub fn list_transactions(connection: &Connection) -> Result<Vec<Transaction>, Error> {
    connection
        .prepare(
            "SELECT id, description, amount, type, category, date FROM \"transaction\"
             ORDER BY date DESC",
        )?
        .query_map([], map_transaction_row)?
        .map(|maybe_transaction| maybe_transaction.map_err(|error| error.into()))
        .collect()
}

/// Retrieve the transactions whose date starts with `month`, ordered by date.
///
/// The match is a literal string prefix, not a calendar range: a `month` of
/// "2024-03" matches that month, while "2024" matches the whole year.
/// `None` applies no filter.
///
/// # Errors
/// This function will return a [Error::SqlError] if there is some SQL error.
pub fn transactions_matching_month(
    month: Option<&str>,
    order: DateOrder,
    connection: &Connection,
) -> Result<Vec<Transaction>, Error> {
    let rows = match month {
        Some(month) => connection
            .prepare(&format!(
                "SELECT id, description, amount, type, category, date FROM \"transaction\"
                 WHERE date LIKE :prefix ORDER BY date {}",
                order.sql()
            ))?
            .query_map(
                &[(":prefix", &format!("{month}%"))],
                map_transaction_row,
            )?
            .collect::<Result<Vec<_>, _>>()?,
        None => connection
            .prepare(&format!(
                "SELECT id, description, amount, type, category, date FROM \"transaction\"
                 ORDER BY date {}",
                order.sql()
            ))?
            .query_map([], map_transaction_row)?
            .collect::<Result<Vec<_>, _>>()?,
    };

    Ok(rows)
}

/// Sum transaction amounts grouped by type, optionally filtered by a month
/// prefix on the date.
///
/// Only types that occur in the matched rows are returned; callers provide
/// their own defaults for absent types.
///
/// # Errors
/// This function will return a [Error::SqlError] if there is some SQL error.
pub fn totals_by_type(
    month: Option<&str>,
    connection: &Connection,
) -> Result<Vec<(String, f64)>, Error> {
    let map_total = |row: &Row| -> Result<(String, f64), rusqlite::Error> {
        Ok((row.get(0)?, row.get(1)?))
    };

    let totals = match month {
        Some(month) => connection
            .prepare(
                "SELECT type, SUM(amount) FROM \"transaction\"
                 WHERE date LIKE :prefix GROUP BY type",
            )?
            .query_map(&[(":prefix", &format!("{month}%"))], map_total)?
            .collect::<Result<Vec<_>, _>>()?,
        None => connection
            .prepare("SELECT type, SUM(amount) FROM \"transaction\" GROUP BY type")?
            .query_map([], map_total)?
            .collect::<Result<Vec<_>, _>>()?,
    };

    Ok(totals)
}

/// Create the transaction table in the database.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL error.
pub fn create_transaction_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS \"transaction\" (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                description TEXT NOT NULL,
                amount REAL NOT NULL,
                type TEXT NOT NULL,
                category TEXT NOT NULL,
                date TEXT NOT NULL,
                created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
                )",
        (),
    )?;

    // Ensure the sequence starts at 1
    connection.execute(
        "INSERT OR IGNORE INTO sqlite_sequence (name, seq) VALUES ('transaction', 0)",
        (),
    )?;

    // Index used by the month-prefix filters and date ordering.
    connection.execute(
        "CREATE INDEX IF NOT EXISTS idx_transaction_date ON \"transaction\"(date);",
        (),
    )?;

    Ok(())
}

/// Map a database row to a Transaction.
pub fn map_transaction_row(row: &Row) -> Result<Transaction, rusqlite::Error> {
    let id = row.get(0)?;
    let description = row.get(1)?;
    let amount = row.get(2)?;
    let kind = row.get(3)?;
    let category = row.get(4)?;
    let date = row.get(5)?;

    Ok(Transaction {
        id,
        description,
        amount,
        kind,
        category,
        date,
    })
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
pub(crate) fn new_transaction(amount: f64, kind: &str, category: &str, date: &str) -> NewTransaction {
    NewTransaction {
        description: "Test".to_owned(),
        amount,
        kind: kind.to_owned(),
        category: category.to_owned(),
        date: date.to_owned(),
    }
}
