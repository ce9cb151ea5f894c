//! The pages for creating and editing a transaction.

use axum::{
    extract::{Path, State},
    response::{IntoResponse, Response},
};
use maud::html;

use crate::{
    Error,
    account::get_all_accounts,
    endpoints::{self, format_endpoint},
    html::FORM_CONTAINER_STYLE,
    layout::layout,
    timezone::get_local_date,
    transaction::{
        TransactionId, TransactionPageState,
        form::{FormMethod, TransactionFormContext, transaction_form},
        get_categories, get_transaction,
    },
};

async fn render_form_page(
    state: TransactionPageState,
    transaction_id: Option<TransactionId>,
) -> Result<Response, Error> {
    let today = get_local_date(&state.local_timezone).ok_or_else(|| {
        tracing::error!("Invalid timezone {}", state.local_timezone);
        Error::InvalidTimezoneError(state.local_timezone.clone())
    })?;

    let (transaction, accounts, categories) = {
        let connection = state
            .db_connection
            .lock()
            .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
            .map_err(|_| Error::DatabaseLockError)?;

        let transaction = transaction_id
            .map(|id| get_transaction(id, &connection))
            .transpose()?;

        (
            transaction,
            get_all_accounts(&connection)?,
            get_categories(&connection)?,
        )
    };

    let update_url = transaction
        .as_ref()
        .map(|transaction| format_endpoint(endpoints::TRANSACTION, transaction.id));
    let (title, active_endpoint, method) = match &update_url {
        Some(url) => (
            "Edit Transaction",
            endpoints::EDIT_TRANSACTION_VIEW,
            FormMethod::Put(url),
        ),
        None => (
            "New Transaction",
            endpoints::NEW_TRANSACTION_VIEW,
            FormMethod::Post(endpoints::TRANSACTIONS_API),
        ),
    };

    let form = transaction_form(&TransactionFormContext {
        method,
        transaction: transaction.as_ref(),
        accounts: &accounts,
        categories: &categories,
        today,
    });
    let content = html! {
        div class=(FORM_CONTAINER_STYLE) { (form) }
    };

    Ok(layout(title, active_endpoint, &state.storage_mode, &[], &content).into_response())
}

/// Renders the page for creating a transaction.
pub async fn get_new_transaction_page(
    State(state): State<TransactionPageState>,
) -> Result<Response, Error> {
    render_form_page(state, None).await
}

/// Renders the page for editing a transaction.
pub async fn get_edit_transaction_page(
    State(state): State<TransactionPageState>,
    Path(transaction_id): Path<TransactionId>,
) -> Result<Response, Error> {
    render_form_page(state, Some(transaction_id)).await
}
