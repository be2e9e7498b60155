//! Transaction management for the finance tracker.
//!
//! This module contains everything related to transactions:
//! - The `Transaction` model and `NewTransaction` for recording transactions
//! - Database functions for storing, querying, and filtering transactions
//! - The JSON endpoints for listing, creating, and deleting transactions

mod core;
mod create_endpoint;
mod delete_endpoint;
mod list_endpoint;

pub use self::core::{
    DateOrder, NewTransaction, Transaction, create_transaction_table, totals_by_type,
    transactions_matching_month,
};
pub use create_endpoint::create_transaction_endpoint;
pub use delete_endpoint::delete_transaction_endpoint;
pub use list_endpoint::list_transactions_endpoint;

#[cfg(test)]
pub(crate) use self::core::{create_transaction, list_transactions, new_transaction};
