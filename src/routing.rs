//! Application router configuration.

use axum::{
    Router, middleware,
    routing::{delete, get},
};

use crate::{
    AppState, endpoints,
    export::download_csv_endpoint,
    logging::logging_middleware,
    statistics::get_statistics_endpoint,
    transaction::{
        create_transaction_endpoint, delete_transaction_endpoint, list_transactions_endpoint,
    },
};

/// Return a router with all the app's routes.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route(
            endpoints::TRANSACTIONS_API,
            get(list_transactions_endpoint).post(create_transaction_endpoint),
        )
        .route(endpoints::TRANSACTION, delete(delete_transaction_endpoint))
        .route(endpoints::STATISTICS, get(get_statistics_endpoint))
        .route(endpoints::EXPORT_CSV, get(download_csv_endpoint))
        .layer(middleware::from_fn(logging_middleware))
        .with_state(state)
}

#[cfg(test)]
mod router_tests {
    use axum::http::StatusCode;
    use axum_test::TestServer;
    use rusqlite::Connection;
    use serde_json::{Value, json};

    use crate::{AppState, build_router, endpoints, endpoints::format_endpoint};

    fn get_test_server() -> TestServer {
        let db_connection =
            Connection::open_in_memory().expect("Could not open database in memory.");
        let state = AppState::new(db_connection).expect("Could not initialize database.");

        TestServer::try_new(build_router(state)).expect("Could not create test server.")
    }

    async fn post_transaction(server: &TestServer, body: Value) -> Value {
        let response = server.post(endpoints::TRANSACTIONS_API).json(&body).await;

        response.assert_status_ok();
        response.json::<Value>()
    }

    #[tokio::test]
    async fn created_transaction_appears_in_list_exactly_once() {
        let server = get_test_server();

        let created = post_transaction(
            &server,
            json!({
                "description": "Coffee",
                "amount": 4.5,
                "type": "expense",
                "category": "Food",
                "date": "2024-03-05",
            }),
        )
        .await;

        assert_eq!(created["success"], json!(true));
        let id = created["id"].as_i64().expect("expected an integer id");

        let transactions = server
            .get(endpoints::TRANSACTIONS_API)
            .await
            .json::<Vec<Value>>();

        let matches: Vec<_> = transactions
            .iter()
            .filter(|transaction| transaction["id"].as_i64() == Some(id))
            .collect();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0]["description"], json!("Coffee"));
        assert_eq!(matches[0]["type"], json!("expense"));
    }

    #[tokio::test]
    async fn list_is_ordered_most_recent_date_first() {
        let server = get_test_server();
        for date in ["2024-01-10", "2024-03-02", "2024-02-20"] {
            post_transaction(
                &server,
                json!({
                    "description": "Entry",
                    "amount": 1,
                    "type": "expense",
                    "date": date,
                }),
            )
            .await;
        }

        let transactions = server
            .get(endpoints::TRANSACTIONS_API)
            .await
            .json::<Vec<Value>>();

        let dates: Vec<&str> = transactions
            .iter()
            .map(|transaction| transaction["date"].as_str().unwrap())
            .collect();
        assert_eq!(dates, ["2024-03-02", "2024-02-20", "2024-01-10"]);
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let server = get_test_server();
        let created = post_transaction(
            &server,
            json!({
                "description": "Coffee",
                "amount": 4.5,
                "type": "expense",
                "date": "2024-03-05",
            }),
        )
        .await;
        let id = created["id"].as_i64().unwrap();

        let response = server
            .delete(&format_endpoint(endpoints::TRANSACTION, id))
            .await;
        response.assert_status_ok();
        response.assert_json(&json!({ "success": true }));

        // Deleting the same (now missing) ID is still a success.
        let response = server
            .delete(&format_endpoint(endpoints::TRANSACTION, id))
            .await;
        response.assert_status_ok();
        response.assert_json(&json!({ "success": true }));

        let transactions = server
            .get(endpoints::TRANSACTIONS_API)
            .await
            .json::<Vec<Value>>();
        assert!(
            transactions
                .iter()
                .all(|transaction| transaction["id"].as_i64() != Some(id))
        );
    }

    #[tokio::test]
    async fn create_rejects_unparseable_body() {
        let server = get_test_server();

        let response = server
            .post(endpoints::TRANSACTIONS_API)
            .content_type("application/json")
            .text("not json")
            .await;

        response.assert_status(StatusCode::BAD_REQUEST);
        let body = response.json::<Value>();
        assert_eq!(body["success"], json!(false));
        assert_eq!(body["error"], json!("Invalid JSON payload"));
    }

    #[tokio::test]
    async fn create_rejects_missing_fields() {
        let server = get_test_server();

        let response = server
            .post(endpoints::TRANSACTIONS_API)
            .json(&json!({ "description": "Coffee" }))
            .await;

        response.assert_status(StatusCode::BAD_REQUEST);
        let body = response.json::<Value>();
        assert_eq!(body["success"], json!(false));
        assert_eq!(body["error"], json!("Missing required fields"));
    }

    #[tokio::test]
    async fn create_accepts_amount_as_numeric_string() {
        let server = get_test_server();

        let created = post_transaction(
            &server,
            json!({
                "description": "Salary",
                "amount": "3000",
                "type": "income",
                "date": "2024-03-01",
            }),
        )
        .await;

        assert_eq!(created["success"], json!(true));

        let transactions = server
            .get(endpoints::TRANSACTIONS_API)
            .await
            .json::<Vec<Value>>();
        assert_eq!(transactions[0]["amount"], json!(3000.0));
    }

    #[tokio::test]
    async fn statistics_match_worked_example() {
        let server = get_test_server();
        post_transaction(
            &server,
            json!({
                "description": "Coffee",
                "amount": 4.5,
                "type": "expense",
                "category": "Food",
                "date": "2024-03-05",
            }),
        )
        .await;
        post_transaction(
            &server,
            json!({
                "description": "Salary",
                "amount": 3000,
                "type": "income",
                "category": "",
                "date": "2024-03-01",
            }),
        )
        .await;

        let response = server.get("/api/statistics/2024-03").await;
        response.assert_status_ok();
        let statistics = response.json::<Value>();

        assert_eq!(statistics["totals"]["income"], json!(3000.0));
        assert_eq!(statistics["totals"]["expense"], json!(4.5));
        assert_eq!(
            statistics["categories"],
            json!([{ "name": "Food", "value": 4.5 }])
        );
        assert_eq!(
            statistics["daily"],
            json!([{ "date": "2024-03-05", "amount": 4.5 }])
        );
        assert_eq!(
            statistics["monthly"],
            json!([{ "month": "2024-03", "income": 3000.0, "expense": 4.5 }])
        );
    }

    #[tokio::test]
    async fn csv_download_sets_attachment_headers() {
        let server = get_test_server();

        let response = server.get(endpoints::EXPORT_CSV).await;

        response.assert_status_ok();
        response.assert_header("content-type", "text/csv");
        response.assert_header(
            "content-disposition",
            "attachment; filename=\"transactions_all.csv\"",
        );
    }

    #[tokio::test]
    async fn csv_download_filtered_filename_includes_month() {
        let server = get_test_server();

        let response = server
            .get(endpoints::EXPORT_CSV)
            .add_query_param("month", "2024-03")
            .await;

        response.assert_status_ok();
        response.assert_header(
            "content-disposition",
            "attachment; filename=\"transactions_2024-03.csv\"",
        );
    }

    #[tokio::test]
    async fn empty_single_column_download_is_three_rows() {
        let server = get_test_server();

        let response = server
            .get(endpoints::EXPORT_CSV)
            .add_query_param("month", "2024-03")
            .add_query_param("single", "1")
            .await;

        response.assert_status_ok();
        let lines: Vec<String> = response.text().lines().map(str::to_owned).collect();
        assert_eq!(
            lines,
            [
                "Data",
                "Total Income: 0.00 | Total Expense: 0.00 | Balance: 0.00",
                "No transactions",
            ]
        );
    }

    #[tokio::test]
    async fn csv_download_respects_order_parameter() {
        let server = get_test_server();
        for date in ["2024-03-01", "2024-03-10"] {
            post_transaction(
                &server,
                json!({
                    "description": "Entry",
                    "amount": 1,
                    "type": "expense",
                    "date": date,
                }),
            )
            .await;
        }

        let response = server
            .get(endpoints::EXPORT_CSV)
            .add_query_param("order", "desc")
            .await;
        response.assert_status_ok();

        let body = response.text();
        let first_transaction_row = body.lines().nth(2).expect("expected a transaction row");
        assert!(
            first_transaction_row.contains("2024-03-10"),
            "expected most recent date first, got {first_transaction_row}"
        );
    }

    #[tokio::test]
    async fn statistics_year_prefix_matches_whole_year() {
        let server = get_test_server();
        for (amount, date) in [(10, "2024-01-05"), (20, "2024-06-15"), (40, "2023-06-15")] {
            post_transaction(
                &server,
                json!({
                    "description": "Entry",
                    "amount": amount,
                    "type": "expense",
                    "date": date,
                }),
            )
            .await;
        }

        let statistics = server.get("/api/statistics/2024").await.json::<Value>();

        assert_eq!(statistics["totals"]["expense"], json!(30.0));
        // The monthly trend always spans the full store.
        assert_eq!(statistics["monthly"].as_array().unwrap().len(), 3);
    }
}
