//! Displays accounts and their balances.

use std::sync::{Arc, Mutex};

use axum::{
    extract::{FromRef, State},
    response::{IntoResponse, Response},
};
use maud::{Markup, html};
use rusqlite::Connection;

use crate::{
    AppState, Error,
    account::{Account, get_all_accounts, get_total_account_balance},
    auth::Session,
    db::StorageMode,
    endpoints::{self, format_endpoint},
    feature::{BALANCE_RECONCILIATION, feature_gate},
    html::{CARD_STYLE, LINK_STYLE, PAGE_CONTAINER_STYLE, edit_delete_action_links, format_currency},
    layout::layout,
};

/// The state needed for the account pages.
#[derive(Debug, Clone)]
pub struct AccountPageState {
    pub db_connection: Arc<Mutex<Connection>>,
    pub storage_mode: StorageMode,
}

impl FromRef<AppState> for AccountPageState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            storage_mode: state.storage_mode.clone(),
        }
    }
}

/// The ID of the element holding the balance of the account with `id`, so
/// that it can be replaced after reconciling.
pub fn balance_element_id(id: i64) -> String {
    format!("account-balance-{id}")
}

/// The balance of an account, swapped out of band after reconciling.
pub fn balance_span(account: &Account, out_of_band: bool) -> Markup {
    html! {
        span
            id=(balance_element_id(account.id))
            hx-swap-oob=[out_of_band.then_some("true")]
            class="text-sm tabular-nums text-right"
        {
            (format_currency(account.balance))
        }
    }
}

fn reconcile_button(account: &Account) -> Markup {
    html! {
        button
            type="button"
            hx-post=(format_endpoint(endpoints::RECONCILE_ACCOUNT, account.id))
            hx-swap="none"
            hx-target-error="#alert-container"
            class=(LINK_STYLE)
        {
            "Reconcile"
        }
    }
}

fn account_card(account: &Account, session: &Session) -> Markup {
    let edit_url = format_endpoint(endpoints::EDIT_ACCOUNT_VIEW, account.id);
    let delete_url = format_endpoint(endpoints::ACCOUNT, account.id);
    let confirm_message = format!(
        "Are you sure you want to delete the account '{}'? This cannot be undone.",
        account.name
    );

    html! {
        li class=(CARD_STYLE) data-account-id=(account.id)
        {
            div class="flex items-start justify-between gap-3"
            {
                div
                {
                    div class="text-sm font-semibold text-gray-900 dark:text-white" { (account.name) }
                    div class="text-xs text-gray-500 dark:text-gray-400" { (account.kind.label()) }
                }

                (balance_span(account, false))
            }

            div class="mt-2 flex items-center gap-4 text-sm"
            {
                (edit_delete_action_links(
                    &edit_url,
                    &delete_url,
                    &confirm_message,
                    "closest li",
                    "delete",
                ))

                (feature_gate(&BALANCE_RECONCILIATION, session, reconcile_button(account), None))
            }
        }
    }
}

fn accounts_view(accounts: &[Account], total: f64, session: &Session) -> Markup {
    html! {
        div class=(PAGE_CONTAINER_STYLE)
        {
            section class="w-full max-w-xl space-y-4"
            {
                header class="flex justify-between flex-wrap items-end"
                {
                    h1 class="text-xl font-bold" { "Accounts" }

                    a href=(endpoints::NEW_ACCOUNT_VIEW) class=(LINK_STYLE) { "Add Account" }
                }

                div class="flex justify-between text-sm font-semibold" id="accounts-total"
                {
                    span { "Total" }
                    span class="tabular-nums" { (format_currency(total)) }
                }

                ul class="space-y-4" id="accounts-list"
                {
                    @for account in accounts {
                        (account_card(account, session))
                    }

                    @if accounts.is_empty() {
                        li class="rounded border border-dashed border-gray-300 px-4 py-6 text-center text-sm text-gray-500 dark:border-gray-700 dark:text-gray-400"
                        {
                            "No accounts found. Create an account "
                            a href=(endpoints::NEW_ACCOUNT_VIEW) class=(LINK_STYLE) { "here" }
                            "."
                        }
                    }
                }
            }
        }
    }
}

/// Renders the accounts page showing all accounts.
pub async fn get_accounts_page(
    State(state): State<AccountPageState>,
    session: Session,
) -> Result<Response, Error> {
    let (accounts, total) = {
        let connection = state
            .db_connection
            .lock()
            .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
            .map_err(|_| Error::DatabaseLockError)?;

        let accounts = get_all_accounts(&connection)
            .inspect_err(|error| tracing::error!("could not get all accounts: {error}"))?;
        let total = get_total_account_balance(&connection)?;

        (accounts, total)
    };

    Ok(layout(
        "Accounts",
        endpoints::ACCOUNTS_VIEW,
        &state.storage_mode,
        &[],
        &accounts_view(&accounts, total, &session),
    )
    .into_response())
}

#[cfg(test)]
mod accounts_page_tests {
    use std::sync::{Arc, Mutex};

    use axum::{Extension, Router, routing::get};
    use axum_test::TestServer;
    use rusqlite::Connection;
    use scraper::{Html, Selector};

    use crate::{
        account::{AccountKind, NewAccount, create_account},
        auth::{AuthUser, Session},
        db::{StorageMode, initialize},
        endpoints::{self, format_endpoint},
        test_utils::assert_valid_html,
        user::{SubscriptionTier, UserID},
    };

    use super::{AccountPageState, get_accounts_page};

    fn get_test_server(accounts: &[(&str, f64)], tier: SubscriptionTier) -> TestServer {
        let connection = Connection::open_in_memory().unwrap();
        initialize(&connection).unwrap();
        for (name, balance) in accounts {
            create_account(
                &NewAccount {
                    name: (*name).to_owned(),
                    kind: AccountKind::Bank,
                    balance: *balance,
                },
                &connection,
            )
            .unwrap();
        }

        let mut session = Session::start();
        session.resolve(Some(AuthUser {
            id: UserID::new(1),
            tier,
        }));

        let app = Router::new()
            .route(endpoints::ACCOUNTS_VIEW, get(get_accounts_page))
            .layer(Extension(session))
            .with_state(AccountPageState {
                db_connection: Arc::new(Mutex::new(connection)),
                storage_mode: StorageMode::InMemory,
            });

        TestServer::new(app)
    }

    fn select_count(document: &Html, selector: &str) -> usize {
        document.select(&Selector::parse(selector).unwrap()).count()
    }

    #[tokio::test]
    async fn lists_accounts_with_actions() {
        let server = get_test_server(&[("Checking", 12.0), ("Visa", -3.5)], SubscriptionTier::Free);

        let response = server.get(endpoints::ACCOUNTS_VIEW).await;

        response.assert_status_ok();
        let document = Html::parse_document(&response.text());
        assert_valid_html(&document);
        assert_eq!(select_count(&document, "#accounts-list li[data-account-id]"), 2);

        let first = document
            .select(&Selector::parse("li[data-account-id]").unwrap())
            .next()
            .unwrap();
        let edit = first
            .select(&Selector::parse("a[href]").unwrap())
            .next()
            .unwrap();
        assert_eq!(
            edit.value().attr("href"),
            Some(format_endpoint(endpoints::EDIT_ACCOUNT_VIEW, 1).as_str())
        );
        let delete = first
            .select(&Selector::parse("button[hx-delete]").unwrap())
            .next()
            .unwrap();
        assert_eq!(
            delete.value().attr("hx-delete"),
            Some(format_endpoint(endpoints::ACCOUNT, 1).as_str())
        );

        let total = document
            .select(&Selector::parse("#accounts-total").unwrap())
            .next()
            .unwrap()
            .text()
            .collect::<String>();
        assert!(total.contains("$8.50"), "got total {total:?}");
    }

    #[tokio::test]
    async fn shows_empty_message_without_accounts() {
        let server = get_test_server(&[], SubscriptionTier::Free);

        let response = server.get(endpoints::ACCOUNTS_VIEW).await;

        assert!(response.text().contains("No accounts found"));
    }

    #[tokio::test]
    async fn reconcile_button_requires_premium() {
        let free = get_test_server(&[("Checking", 0.0)], SubscriptionTier::Free);
        let premium = get_test_server(&[("Checking", 0.0)], SubscriptionTier::Premium);

        let free_document = Html::parse_document(&free.get(endpoints::ACCOUNTS_VIEW).await.text());
        let premium_document =
            Html::parse_document(&premium.get(endpoints::ACCOUNTS_VIEW).await.text());

        assert_eq!(select_count(&free_document, "button[hx-post]"), 0);
        assert_eq!(select_count(&premium_document, "button[hx-post]"), 1);
    }
}
