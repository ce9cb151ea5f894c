//! Defines the route handler for the page that lists transactions.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use axum::{
    extract::{FromRef, Query, State},
    response::{IntoResponse, Response},
};
use maud::{Markup, html};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use time::{Date, macros::date};

use crate::{
    AppState, Error,
    account::{Account, AccountId, get_all_accounts},
    db::StorageMode,
    endpoints::{self, format_endpoint},
    html::{
        BUTTON_PRIMARY_STYLE, CARD_STYLE, FORM_LABEL_STYLE, FORM_TEXT_INPUT_STYLE, LINK_STYLE,
        PAGE_CONTAINER_STYLE, edit_delete_action_links, format_currency,
    },
    layout::layout,
    transaction::{
        Transaction, TransactionFilter, TransactionKind, get_all_transactions, get_categories,
        query_transactions,
    },
};

/// The state needed for the transaction pages.
#[derive(Debug, Clone)]
pub struct TransactionPageState {
    /// The local timezone as a canonical timezone name, e.g. "Pacific/Auckland".
    pub local_timezone: String,
    pub db_connection: Arc<Mutex<Connection>>,
    pub storage_mode: StorageMode,
}

impl FromRef<AppState> for TransactionPageState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            local_timezone: state.local_timezone.clone(),
            db_connection: state.db_connection.clone(),
            storage_mode: state.storage_mode.clone(),
        }
    }
}

/// The query parameters for filtering the transactions page.
///
/// Only one filter applies at a time. When several are given, the account
/// wins, then the kind, then the category, then the date range.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionsQuery {
    pub kind: Option<TransactionKind>,
    pub category: Option<String>,
    pub account_id: Option<AccountId>,
    /// The first day of the date range, inclusive.
    pub from: Option<Date>,
    /// The last day of the date range, inclusive.
    pub to: Option<Date>,
}

/// Bounds for a date range with one open end. Dates are stored as
/// `YYYY-MM-DD` text, so the bounds keep four digit, non-negative years.
const EARLIEST_DATE: Date = date!(0000 - 01 - 01);
const LATEST_DATE: Date = date!(9999 - 12 - 31);

impl TransactionsQuery {
    /// The filter selected by the query, or `None` to show every transaction.
    pub fn filter(&self) -> Option<TransactionFilter> {
        if let Some(account_id) = self.account_id {
            return Some(TransactionFilter::Account(account_id));
        }

        if let Some(kind) = self.kind {
            return Some(TransactionFilter::Kind(kind));
        }

        if let Some(category) = self
            .category
            .as_deref()
            .map(str::trim)
            .filter(|category| !category.is_empty())
        {
            return Some(TransactionFilter::Category(category.to_owned()));
        }

        match (self.from, self.to) {
            (None, None) => None,
            (from, to) => Some(TransactionFilter::DateRange {
                from: from.unwrap_or(EARLIEST_DATE),
                to: to.unwrap_or(LATEST_DATE),
            }),
        }
    }
}

fn filter_url(query: &TransactionsQuery) -> String {
    match serde_urlencoded::to_string(query) {
        Ok(query_string) if !query_string.is_empty() => {
            format!("{}?{query_string}", endpoints::TRANSACTIONS_VIEW)
        }
        _ => endpoints::TRANSACTIONS_VIEW.to_owned(),
    }
}

fn describe_filter(filter: &TransactionFilter, account_names: &HashMap<AccountId, &str>) -> String {
    match filter {
        TransactionFilter::Kind(TransactionKind::Expense) => "Expenses".to_owned(),
        TransactionFilter::Kind(TransactionKind::Income) => "Income".to_owned(),
        TransactionFilter::Category(category) => format!("Category: {category}"),
        TransactionFilter::DateRange { from, to } if *from == EARLIEST_DATE => format!("Until {to}"),
        TransactionFilter::DateRange { from, to } if *to == LATEST_DATE => format!("From {from}"),
        TransactionFilter::DateRange { from, to } => format!("{from} to {to}"),
        TransactionFilter::Account(account_id) => match account_names.get(account_id) {
            Some(name) => format!("Account: {name}"),
            None => format!("Account #{account_id}"),
        },
    }
}

/// The signed amount shown to the user, negative for expenses.
fn display_amount(transaction: &Transaction) -> String {
    format_currency(transaction.kind.balance_effect(transaction.amount))
}

fn filter_links(accounts: &[Account], categories: &[String]) -> Markup {
    let chip = |query: TransactionsQuery, label: &str| {
        html! {
            a href=(filter_url(&query)) class="px-2 py-1 rounded border border-gray-300 dark:border-gray-600 text-xs"
            {
                (label)
            }
        }
    };

    html! {
        nav id="transaction-filters" class="flex flex-wrap gap-2" aria-label="Filters"
        {
            (chip(TransactionsQuery::default(), "All"))
            (chip(TransactionsQuery { kind: Some(TransactionKind::Expense), ..Default::default() }, "Expenses"))
            (chip(TransactionsQuery { kind: Some(TransactionKind::Income), ..Default::default() }, "Income"))

            @for account in accounts {
                (chip(TransactionsQuery { account_id: Some(account.id), ..Default::default() }, &account.name))
            }

            @for category in categories {
                (chip(TransactionsQuery { category: Some(category.clone()), ..Default::default() }, category))
            }
        }

        form method="get" action=(endpoints::TRANSACTIONS_VIEW) class="flex flex-wrap items-end gap-2"
        {
            div
            {
                label for="from" class=(FORM_LABEL_STYLE) { "From" }
                input type="date" name="from" id="from" required class=(FORM_TEXT_INPUT_STYLE);
            }

            div
            {
                label for="to" class=(FORM_LABEL_STYLE) { "To" }
                input type="date" name="to" id="to" required class=(FORM_TEXT_INPUT_STYLE);
            }

            div
            {
                button type="submit" class=(BUTTON_PRIMARY_STYLE) { "Filter" }
            }
        }
    }
}

fn transaction_card(transaction: &Transaction, account_names: &HashMap<AccountId, &str>) -> Markup {
    let edit_url = format_endpoint(endpoints::EDIT_TRANSACTION_VIEW, transaction.id);
    let delete_url = format_endpoint(endpoints::TRANSACTION, transaction.id);
    let amount_style = match transaction.kind {
        TransactionKind::Expense => "text-red-700 dark:text-red-400",
        TransactionKind::Income => "text-green-700 dark:text-green-400",
    };

    html! {
        li class=(CARD_STYLE) data-transaction-id=(transaction.id)
        {
            div class="flex items-start justify-between gap-3"
            {
                div
                {
                    div class="text-sm font-semibold" { (transaction.category) }

                    @if !transaction.description.is_empty() {
                        div class="text-sm text-gray-600 dark:text-gray-300" { (transaction.description) }
                    }

                    div class="text-xs text-gray-500 dark:text-gray-400"
                    {
                        time datetime=(transaction.date) { (transaction.date) }
                        " · "
                        (account_names.get(&transaction.account_id).copied().unwrap_or("Unknown account"))
                    }
                }

                span class={"text-sm tabular-nums text-right " (amount_style)}
                {
                    (display_amount(transaction))
                }
            }

            div class="mt-2 flex items-center gap-4 text-sm"
            {
                (edit_delete_action_links(
                    &edit_url,
                    &delete_url,
                    "Are you sure you want to delete this transaction? This cannot be undone.",
                    "closest li",
                    "delete",
                ))
            }
        }
    }
}

fn transactions_view(
    transactions: &[Transaction],
    filter: Option<&TransactionFilter>,
    accounts: &[Account],
    categories: &[String],
) -> Markup {
    let account_names: HashMap<AccountId, &str> = accounts
        .iter()
        .map(|account| (account.id, account.name.as_str()))
        .collect();

    html! {
        div class=(PAGE_CONTAINER_STYLE)
        {
            section class="w-full max-w-xl space-y-4"
            {
                header class="flex justify-between flex-wrap items-end"
                {
                    h1 class="text-xl font-bold" { "Transactions" }

                    a href=(endpoints::NEW_TRANSACTION_VIEW) class=(LINK_STYLE) { "Add Transaction" }
                }

                (filter_links(accounts, categories))

                @if let Some(filter) = filter {
                    p id="active-filter" class="text-sm"
                    {
                        "Showing: " (describe_filter(filter, &account_names)) " "
                        a href=(endpoints::TRANSACTIONS_VIEW) class=(LINK_STYLE) { "Clear" }
                    }
                }

                ul id="transactions-list" class="space-y-4"
                {
                    @for transaction in transactions {
                        (transaction_card(transaction, &account_names))
                    }

                    @if transactions.is_empty() {
                        li class="rounded border border-dashed border-gray-300 px-4 py-6 text-center text-sm text-gray-500 dark:border-gray-700 dark:text-gray-400"
                        {
                            "No transactions found."
                        }
                    }
                }
            }
        }
    }
}

/// Renders the transactions page, filtered by the query parameters.
pub async fn get_transactions_page(
    State(state): State<TransactionPageState>,
    Query(query): Query<TransactionsQuery>,
) -> Result<Response, Error> {
    let filter = query.filter();

    let (transactions, accounts, categories) = {
        let connection = state
            .db_connection
            .lock()
            .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
            .map_err(|_| Error::DatabaseLockError)?;

        let transactions = match &filter {
            Some(filter) => query_transactions(filter, &connection),
            None => get_all_transactions(&connection),
        }
        .inspect_err(|error| tracing::error!("could not query transactions: {error}"))?;

        (
            transactions,
            get_all_accounts(&connection)?,
            get_categories(&connection)?,
        )
    };

    Ok(layout(
        "Transactions",
        endpoints::TRANSACTIONS_VIEW,
        &state.storage_mode,
        &[],
        &transactions_view(&transactions, filter.as_ref(), &accounts, &categories),
    )
    .into_response())
}


#[cfg(test)]
mod transactions_page_tests {
    use std::sync::{Arc, Mutex};

    use axum::{Router, routing::get};
    use axum_test::TestServer;
    use rusqlite::Connection;
    use scraper::{Html, Selector};
    use time::macros::date;

    use crate::{
        account::{AccountKind, NewAccount, create_account},
        db::{StorageMode, initialize},
        endpoints,
        test_utils::assert_valid_html,
        transaction::{NewTransaction, TransactionKind, create_transaction},
    };

    use super::{TransactionPageState, get_transactions_page};

    fn get_test_server() -> TestServer {
        let connection = Connection::open_in_memory().unwrap();
        initialize(&connection).unwrap();
        let checking = create_account(
            &NewAccount {
                name: "Checking".to_owned(),
                kind: AccountKind::Bank,
                balance: 0.0,
            },
            &connection,
        )
        .unwrap();
        let wallet = create_account(
            &NewAccount {
                name: "Wallet".to_owned(),
                kind: AccountKind::Cash,
                balance: 0.0,
            },
            &connection,
        )
        .unwrap();
        for (amount, kind, category, date, account_id) in [
            (42.0, TransactionKind::Expense, "food", date!(2025 - 02 - 03), checking.id),
            (900.0, TransactionKind::Income, "salary", date!(2025 - 02 - 01), checking.id),
            (5.0, TransactionKind::Expense, "coffee", date!(2025 - 03 - 01), wallet.id),
        ] {
            create_transaction(
                &NewTransaction {
                    amount,
                    kind,
                    category: category.to_owned(),
                    description: String::new(),
                    date,
                    account_id,
                },
                &connection,
            )
            .unwrap();
        }

        let app = Router::new()
            .route(endpoints::TRANSACTIONS_VIEW, get(get_transactions_page))
            .with_state(TransactionPageState {
                local_timezone: "Etc/UTC".to_owned(),
                db_connection: Arc::new(Mutex::new(connection)),
                storage_mode: StorageMode::InMemory,
            });

        TestServer::new(app)
    }

    fn transaction_ids(text: &str) -> Vec<String> {
        let document = Html::parse_document(text);
        assert_valid_html(&document);

        document
            .select(&Selector::parse("li[data-transaction-id]").unwrap())
            .filter_map(|item| item.value().attr("data-transaction-id").map(str::to_owned))
            .collect()
    }

    #[tokio::test]
    async fn lists_all_transactions_newest_first() {
        let server = get_test_server();

        let response = server.get(endpoints::TRANSACTIONS_VIEW).await;

        response.assert_status_ok();
        assert_eq!(transaction_ids(&response.text()), ["3", "1", "2"]);
    }

    #[tokio::test]
    async fn filters_by_kind() {
        let server = get_test_server();

        let response = server
            .get(endpoints::TRANSACTIONS_VIEW)
            .add_query_param("kind", "income")
            .await;

        assert_eq!(transaction_ids(&response.text()), ["2"]);
        assert!(response.text().contains("Showing: Income"));
    }

    #[tokio::test]
    async fn filters_by_category() {
        let server = get_test_server();

        let response = server
            .get(endpoints::TRANSACTIONS_VIEW)
            .add_query_param("category", "food")
            .await;

        assert_eq!(transaction_ids(&response.text()), ["1"]);
    }

    #[tokio::test]
    async fn filters_by_account() {
        let server = get_test_server();

        let response = server
            .get(endpoints::TRANSACTIONS_VIEW)
            .add_query_param("account_id", "2")
            .await;

        assert_eq!(transaction_ids(&response.text()), ["3"]);
        assert!(response.text().contains("Account: Wallet"));
    }

    #[tokio::test]
    async fn filters_by_date_range() {
        let server = get_test_server();

        let response = server
            .get(endpoints::TRANSACTIONS_VIEW)
            .add_query_param("from", "2025-02-01")
            .add_query_param("to", "2025-02-28")
            .await;

        assert_eq!(transaction_ids(&response.text()), ["1", "2"]);
    }

    #[tokio::test]
    async fn filters_from_date_without_end() {
        let server = get_test_server();

        let response = server
            .get(endpoints::TRANSACTIONS_VIEW)
            .add_query_param("from", "2025-02-02")
            .await;

        assert_eq!(transaction_ids(&response.text()), ["3", "1"]);
        assert!(response.text().contains("From 2025-02-02"));
    }

    #[tokio::test]
    async fn filters_to_date_without_start() {
        let server = get_test_server();

        let response = server
            .get(endpoints::TRANSACTIONS_VIEW)
            .add_query_param("to", "2025-02-03")
            .await;

        assert_eq!(transaction_ids(&response.text()), ["1", "2"]);
        assert!(response.text().contains("Until 2025-02-03"));
    }

    #[tokio::test]
    async fn invalid_kind_is_rejected() {
        let server = get_test_server();

        let response = server
            .get(endpoints::TRANSACTIONS_VIEW)
            .add_query_param("kind", "transfer")
            .expect_failure()
            .await;

        response.assert_status_bad_request();
    }
}
