//! The API endpoints for creating, updating, deleting and reconciling accounts.

use std::sync::{Arc, Mutex};

use axum::{
    Form,
    extract::{FromRef, Path, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use axum_htmx::HxRedirect;
use maud::html;
use rusqlite::Connection;

use crate::{
    AppState, Error,
    account::{
        AccountId, accounts_page::balance_span, create_account, delete_account,
        form::AccountForm, reconcile_account_balance, update_account,
    },
    alert::Alert,
    auth::Session,
    endpoints,
    feature::{BALANCE_RECONCILIATION, is_unlocked},
    html::format_currency,
};

/// The state needed to change accounts.
#[derive(Debug, Clone)]
pub struct AccountApiState {
    /// The database connection for managing accounts.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for AccountApiState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

fn redirect_to_accounts() -> Response {
    (
        HxRedirect(endpoints::ACCOUNTS_VIEW.to_owned()),
        StatusCode::SEE_OTHER,
    )
        .into_response()
}

/// A route handler for creating a new account, redirects to the accounts view on success.
pub async fn create_account_endpoint(
    State(state): State<AccountApiState>,
    Form(form): Form<AccountForm>,
) -> Response {
    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_alert_response();
        }
    };

    match create_account(&form.clone().into(), &connection) {
        Ok(account) => {
            tracing::info!("Created account {} ({})", account.id, account.name);
            redirect_to_accounts()
        }
        Err(error) => {
            tracing::debug!("Could not create account with {form:?}: {error}");
            error.into_alert_response()
        }
    }
}

/// A route handler for updating an account, redirects to the accounts view on success.
pub async fn update_account_endpoint(
    State(state): State<AccountApiState>,
    Path(account_id): Path<AccountId>,
    Form(form): Form<AccountForm>,
) -> Response {
    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_alert_response();
        }
    };

    match update_account(account_id, &form.into(), &connection) {
        Ok(_) => redirect_to_accounts(),
        Err(error) => {
            tracing::debug!("Could not update account {account_id}: {error}");
            error.into_alert_response()
        }
    }
}

/// A route handler for deleting an account, responds with an alert.
pub async fn delete_account_endpoint(
    State(state): State<AccountApiState>,
    Path(account_id): Path<AccountId>,
) -> Response {
    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_alert_response();
        }
    };

    match delete_account(account_id, &connection) {
        // The status code has to be 200 OK or HTMX will not delete the list item.
        Ok(()) => Alert::SuccessSimple {
            message: "Account deleted successfully".to_owned(),
        }
        .into_response(),
        Err(error) => {
            tracing::debug!("Could not delete account {account_id}: {error}");
            error.into_alert_response()
        }
    }
}

/// A route handler for recomputing an account balance from its transactions.
///
/// Responds with an alert and the new balance swapped out of band. Only
/// users with access to [BALANCE_RECONCILIATION] may use it.
pub async fn reconcile_account_endpoint(
    State(state): State<AccountApiState>,
    session: Session,
    Path(account_id): Path<AccountId>,
) -> Response {
    if !is_unlocked(&BALANCE_RECONCILIATION, &session) {
        return Error::FeatureLocked(BALANCE_RECONCILIATION.id).into_alert_response();
    }

    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_alert_response();
        }
    };

    let reconciliation = match reconcile_account_balance(account_id, &connection) {
        Ok(reconciliation) => reconciliation,
        Err(error) => {
            tracing::debug!("Could not reconcile account {account_id}: {error}");
            return error.into_alert_response();
        }
    };

    let alert = if reconciliation.drift == 0.0 {
        Alert::SuccessSimple {
            message: format!("{} is already up to date", reconciliation.account.name),
        }
    } else {
        Alert::Success {
            message: format!("Corrected the balance of {}", reconciliation.account.name),
            details: format!(
                "The stored balance was off by {}.",
                format_currency(reconciliation.drift)
            ),
        }
    };

    Html(
        html! {
            (alert.into_html())
            (balance_span(&reconciliation.account, true))
        }
        .into_string(),
    )
    .into_response()
}
