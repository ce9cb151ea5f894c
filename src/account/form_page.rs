//! The pages for creating and editing an account.

use axum::{
    extract::{Path, State},
    response::{IntoResponse, Response},
};
use maud::{Markup, html};

use crate::{
    Error,
    account::{
        AccountId, AccountPageState,
        form::{FormMethod, account_form},
        get_account,
    },
    db::StorageMode,
    endpoints::{self, format_endpoint},
    html::FORM_CONTAINER_STYLE,
    layout::layout,
};

fn form_page(title: &str, active_endpoint: &str, storage_mode: &StorageMode, form: Markup) -> Response {
    let content = html! {
        div class=(FORM_CONTAINER_STYLE) { (form) }
    };

    layout(title, active_endpoint, storage_mode, &[], &content).into_response()
}

/// Renders the page for creating an account.
pub async fn get_new_account_page(State(state): State<AccountPageState>) -> Response {
    form_page(
        "New Account",
        endpoints::NEW_ACCOUNT_VIEW,
        &state.storage_mode,
        account_form(FormMethod::Post(endpoints::ACCOUNTS_API), None),
    )
}

/// Renders the page for editing an account.
pub async fn get_edit_account_page(
    State(state): State<AccountPageState>,
    Path(account_id): Path<AccountId>,
) -> Result<Response, Error> {
    let account = {
        let connection = state
            .db_connection
            .lock()
            .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
            .map_err(|_| Error::DatabaseLockError)?;

        get_account(account_id, &connection).inspect_err(|error| {
            if *error != Error::NotFound {
                tracing::error!("Failed to retrieve account {account_id}: {error}");
            }
        })?
    };

    let update_url = format_endpoint(endpoints::ACCOUNT, account_id);

    Ok(form_page(
        "Edit Account",
        endpoints::EDIT_ACCOUNT_VIEW,
        &state.storage_mode,
        account_form(FormMethod::Put(&update_url), Some(&account)),
    ))
}
