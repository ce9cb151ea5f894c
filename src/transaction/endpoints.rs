//! The API endpoints for creating, updating and deleting transactions.

use std::sync::{Arc, Mutex};

use axum::{
    Form,
    extract::{FromRef, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_htmx::HxRedirect;
use rusqlite::Connection;

use crate::{
    AppState, Error,
    alert::Alert,
    endpoints,
    transaction::{
        TransactionId, create_transaction, delete_transaction, form::TransactionForm,
        update_transaction,
    },
};

/// The state needed to change transactions.
#[derive(Debug, Clone)]
pub struct TransactionApiState {
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for TransactionApiState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

fn redirect_to_transactions() -> Response {
    (
        HxRedirect(endpoints::TRANSACTIONS_VIEW.to_owned()),
        StatusCode::SEE_OTHER,
    )
        .into_response()
}

/// A route handler for creating a new transaction, redirects to the transactions view on success.
pub async fn create_transaction_endpoint(
    State(state): State<TransactionApiState>,
    Form(form): Form<TransactionForm>,
) -> Response {
    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_alert_response();
        }
    };

    match create_transaction(&form.into(), &connection) {
        Ok(transaction) => {
            tracing::debug!("Created transaction {}", transaction.id);
            redirect_to_transactions()
        }
        Err(error) => error.into_alert_response(),
    }
}

/// A route handler for updating a transaction, redirects to the transactions view on success.
pub async fn update_transaction_endpoint(
    State(state): State<TransactionApiState>,
    Path(transaction_id): Path<TransactionId>,
    Form(form): Form<TransactionForm>,
) -> Response {
    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_alert_response();
        }
    };

    match update_transaction(transaction_id, &form.into(), &connection) {
        Ok(_) => redirect_to_transactions(),
        Err(error) => {
            tracing::debug!("Could not update transaction {transaction_id}: {error}");
            error.into_alert_response()
        }
    }
}

/// A route handler for deleting a transaction, responds with an alert.
pub async fn delete_transaction_endpoint(
    State(state): State<TransactionApiState>,
    Path(transaction_id): Path<TransactionId>,
) -> Response {
    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_alert_response();
        }
    };

    match delete_transaction(transaction_id, &connection) {
        // The status code has to be 200 OK or HTMX will not delete the list item.
        Ok(()) => Alert::SuccessSimple {
            message: "Transaction deleted successfully".to_owned(),
        }
        .into_response(),
        Err(error) => {
            tracing::debug!("Could not delete transaction {transaction_id}: {error}");
            error.into_alert_response()
        }
    }
}

#[cfg(test)]
mod transaction_endpoint_tests {
    use std::sync::{Arc, Mutex};

    use axum::{
        Router,
        http::StatusCode,
        routing::{post, put},
    };
    use axum_test::TestServer;
    use rusqlite::Connection;
    use time::macros::date;

    use crate::{
        account::{AccountKind, NewAccount, create_account, get_account},
        db::initialize,
        endpoints::{self, format_endpoint},
        transaction::{
            TransactionFilter, TransactionKind, form::TransactionForm, get_transaction,
            query_transactions,
        },
    };

    use super::{
        TransactionApiState, create_transaction_endpoint, delete_transaction_endpoint,
        update_transaction_endpoint,
    };

    fn get_test_server() -> (TestServer, Arc<Mutex<Connection>>) {
        let connection = Connection::open_in_memory().unwrap();
        initialize(&connection).unwrap();
        create_account(
            &NewAccount {
                name: "Checking".to_owned(),
                kind: AccountKind::Bank,
                balance: 0.0,
            },
            &connection,
        )
        .unwrap();
        let db_connection = Arc::new(Mutex::new(connection));

        let app = Router::new()
            .route(endpoints::TRANSACTIONS_API, post(create_transaction_endpoint))
            .route(
                endpoints::TRANSACTION,
                put(update_transaction_endpoint).delete(delete_transaction_endpoint),
            )
            .with_state(TransactionApiState {
                db_connection: db_connection.clone(),
            });

        (
            TestServer::new(app),
            db_connection,
        )
    }

    fn form(amount: f64, category: &str, account_id: i64) -> TransactionForm {
        TransactionForm {
            amount,
            kind: TransactionKind::Expense,
            category: category.to_owned(),
            description: String::new(),
            date: date!(2025 - 05 - 05),
            account_id,
        }
    }

    #[tokio::test]
    async fn create_transaction_redirects_and_updates_balance() {
        let (server, connection) = get_test_server();

        let response = server
            .post(endpoints::TRANSACTIONS_API)
            .form(&form(42.0, "food", 1))
            .await;

        response.assert_status_see_other();
        assert_eq!(response.header("hx-redirect"), endpoints::TRANSACTIONS_VIEW);
        let connection = connection.lock().unwrap();
        let transactions = query_transactions(&TransactionFilter::Account(1), &connection).unwrap();
        assert_eq!(transactions.len(), 1);
        assert_eq!(transactions[0].category, "food");
        assert_eq!(get_account(1, &connection).unwrap().balance, -42.0);
    }

    #[tokio::test]
    async fn create_transaction_with_invalid_account_shows_alert() {
        let (server, _) = get_test_server();

        let response = server
            .post(endpoints::TRANSACTIONS_API)
            .form(&form(42.0, "food", 404))
            .await;

        response.assert_status(StatusCode::BAD_REQUEST);
        assert!(response.text().contains("Invalid account"));
    }

    #[tokio::test]
    async fn create_transaction_with_infinite_amount_shows_alert() {
        let (server, connection) = get_test_server();

        let response = server
            .post(endpoints::TRANSACTIONS_API)
            .form(&[
                ("amount", "inf"),
                ("kind", "expense"),
                ("category", "food"),
                ("date", "2025-05-05"),
                ("account_id", "1"),
            ])
            .await;

        response.assert_status(StatusCode::BAD_REQUEST);
        assert!(response.text().contains("Invalid amount"));
        assert_eq!(get_account(1, &connection.lock().unwrap()).unwrap().balance, 0.0);
    }

    #[tokio::test]
    async fn create_transaction_with_blank_category_shows_alert() {
        let (server, _) = get_test_server();

        let response = server
            .post(endpoints::TRANSACTIONS_API)
            .form(&form(42.0, " ", 1))
            .await;

        response.assert_status(StatusCode::BAD_REQUEST);
        assert!(response.text().contains("Invalid category"));
    }

    #[tokio::test]
    async fn update_transaction_redirects() {
        let (server, connection) = get_test_server();
        server
            .post(endpoints::TRANSACTIONS_API)
            .form(&form(42.0, "food", 1))
            .await;

        let response = server
            .put(&format_endpoint(endpoints::TRANSACTION, 1))
            .form(&form(10.0, "coffee", 1))
            .await;

        response.assert_status_see_other();
        let connection = connection.lock().unwrap();
        let transaction = get_transaction(1, &connection).unwrap();
        assert_eq!(transaction.category, "coffee");
        assert_eq!(get_account(1, &connection).unwrap().balance, -10.0);
    }

    #[tokio::test]
    async fn delete_transaction_responds_with_alert() {
        let (server, connection) = get_test_server();
        server
            .post(endpoints::TRANSACTIONS_API)
            .form(&form(42.0, "food", 1))
            .await;

        let response = server
            .delete(&format_endpoint(endpoints::TRANSACTION, 1))
            .await;

        response.assert_status_ok();
        assert!(response.text().contains("Transaction deleted successfully"));
        assert_eq!(get_account(1, &connection.lock().unwrap()).unwrap().balance, 0.0);
    }

    #[tokio::test]
    async fn delete_missing_transaction_is_not_found() {
        let (server, _) = get_test_server();

        let response = server
            .delete(&format_endpoint(endpoints::TRANSACTION, 1))
            .await;

        response.assert_status_not_found();
    }
}
