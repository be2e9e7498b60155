//! Defines the endpoint for recording a new transaction.

use std::sync::{Arc, Mutex};

use axum::{
    Json,
    extract::{FromRef, State, rejection::JsonRejection},
    response::IntoResponse,
};
use rusqlite::Connection;
use serde::Deserialize;
use serde_json::{Value, json};

use crate::{
    AppState, Error,
    transaction::{NewTransaction, core::create_transaction},
};

/// The state needed to create a transaction.
#[derive(Debug, Clone)]
pub struct CreateTransactionState {
    /// The database connection for managing transactions.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for CreateTransactionState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// The JSON payload for creating a transaction.
///
/// Every field is optional at the serde level so that absence is reported as
/// [Error::MissingFields] rather than a framework rejection. `amount` stays a
/// raw JSON value because clients send both numbers and numeric strings; the
/// conversion to `f64` happens exactly once, in [validate].
#[derive(Debug, Deserialize)]
pub struct CreateTransactionPayload {
    /// A text description of what the transaction is for.
    #[serde(default)]
    pub description: Option<String>,
    /// The amount of money spent or earned, as a JSON number or a numeric string.
    #[serde(default)]
    pub amount: Option<Value>,
    /// Whether the transaction is an "income" or an "expense".
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    /// The category the transaction belongs to. Defaults to the empty string.
    #[serde(default)]
    pub category: Option<String>,
    /// When the transaction happened, as `YYYY-MM-DD` text.
    #[serde(default)]
    pub date: Option<String>,
}

/// A route handler for creating a new transaction.
///
/// Responds with `{"id": n, "success": true}` on success, or
/// `{"success": false, "error": "..."}` and HTTP 400 when the body is
/// missing or unparseable, a required field is absent, the amount is not
/// convertible to a number, or a database constraint fails.
///
/// # Panics
///
/// Panics if the lock for the database connection is already held by the same thread.
pub async fn create_transaction_endpoint(
    State(state): State<CreateTransactionState>,
    payload: Result<Json<CreateTransactionPayload>, JsonRejection>,
) -> Result<impl IntoResponse, Error> {
    let Json(payload) = payload.map_err(|_| Error::InvalidJson)?;
    let new_transaction = validate(payload)?;

    let connection = state.db_connection.lock().unwrap();
    let transaction = create_transaction(new_transaction, &connection)?;

    Ok(Json(json!({ "id": transaction.id, "success": true })))
}

/// Check field presence and convert the amount, producing a [NewTransaction]
/// ready for insertion. Aggregation logic never sees an unvalidated value.
fn validate(payload: CreateTransactionPayload) -> Result<NewTransaction, Error> {
    let description = payload
        .description
        .filter(|description| !description.is_empty())
        .ok_or(Error::MissingFields)?;
    let amount = payload.amount.ok_or(Error::MissingFields)?;
    let kind = payload
        .kind
        .filter(|kind| !kind.is_empty())
        .ok_or(Error::MissingFields)?;
    let date = payload
        .date
        .filter(|date| !date.is_empty())
        .ok_or(Error::MissingFields)?;

    let amount = parse_amount(&amount)?;

    Ok(NewTransaction {
        description,
        amount,
        kind,
        category: payload.category.unwrap_or_default(),
        date,
    })
}

fn parse_amount(value: &Value) -> Result<f64, Error> {
    match value {
        Value::Number(number) => number.as_f64().ok_or(Error::InvalidAmount),
        Value::String(text) => text.trim().parse().map_err(|_| Error::InvalidAmount),
        _ => Err(Error::InvalidAmount),
    }
}
