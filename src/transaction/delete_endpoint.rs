//! Defines the endpoint for deleting a transaction.

use std::sync::{Arc, Mutex};

use axum::{
    Json,
    extract::{FromRef, Path, State},
    response::IntoResponse,
};
use rusqlite::Connection;
use serde_json::json;

use crate::{AppState, Error, database_id::TransactionId};

/// The state needed to delete a transaction.
#[derive(Debug, Clone)]
pub struct DeleteTransactionState {
    /// The database connection for managing transactions.
    db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for DeleteTransactionState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// A route handler for deleting a transaction.
///
/// Deletion is idempotent: the response is `{"success": true}` whether or
/// not a transaction with the given ID existed.
///
/// # Panics
///
/// Panics if the lock for the database connection is already held by the same thread.
pub async fn delete_transaction_endpoint(
    State(state): State<DeleteTransactionState>,
    Path(transaction_id): Path<TransactionId>,
) -> Result<impl IntoResponse, Error> {
    let connection = state.db_connection.lock().unwrap();

    let rows_affected = delete_transaction(transaction_id, &connection)?;
    if rows_affected == 0 {
        tracing::debug!("delete requested for missing transaction {transaction_id}");
    }

    Ok(Json(json!({ "success": true })))
}

type RowsAffected = usize;

fn delete_transaction(id: TransactionId, connection: &Connection) -> Result<RowsAffected, Error> {
    connection
        .execute(
            "DELETE FROM \"transaction\" WHERE id = :id",
            &[(":id", &id)],
        )
        .map_err(|err| err.into())
}

#[cfg(test)]
mod tests {
    use rusqlite::Connection;

    use crate::{
        db::initialize,
        transaction::{core::list_transactions, create_transaction, new_transaction},
    };

    use super::delete_transaction;

    fn get_test_connection() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();
        conn
    }

    #[test]
    fn test_deletes_transaction() {
        let connection = get_test_connection();
        let transaction =
            create_transaction(new_transaction(1.23, "expense", "", "2025-10-26"), &connection)
                .unwrap();

        let rows_affected = delete_transaction(transaction.id, &connection).unwrap();

        assert_eq!(rows_affected, 1);
        assert!(
            list_transactions(&connection)
                .unwrap()
                .iter()
                .all(|remaining| remaining.id != transaction.id)
        );
    }

    #[test]
    fn test_delete_missing_transaction_is_not_an_error() {
        let connection = get_test_connection();

        let rows_affected = delete_transaction(42, &connection).unwrap();

        assert_eq!(rows_affected, 0);
    }
}
