//! Dashboard HTTP handler and view rendering.

use std::sync::{Arc, Mutex};

use axum::{
    extract::{FromRef, State},
    response::{IntoResponse, Response},
};
use maud::{Markup, html};
use rusqlite::Connection;

use crate::{
    AppState, Error,
    account::get_total_account_balance,
    auth::Session,
    dashboard::{
        aggregation::{
            CategorySpending, get_balances_by_kind, get_spending_by_category,
            month_to_date_range,
        },
        cards::{balance_cards_view, recent_expenses_view},
        charts::{DashboardChart, chart_view, charts_script, spending_by_category_chart},
    },
    db::StorageMode,
    endpoints,
    feature::{SPENDING_INSIGHTS, feature_gate},
    html::{CARD_STYLE, HeadElement, LINK_STYLE, PAGE_CONTAINER_STYLE},
    layout::layout,
    timezone::get_local_date,
    transaction::{TransactionKind, get_recent_transactions},
};

/// How many expenses the recent expenses card lists.
const RECENT_EXPENSE_COUNT: u32 = 5;

const SPENDING_CHART_ID: &str = "spending-chart";

/// The state needed for displaying the dashboard page.
#[derive(Debug, Clone)]
pub struct DashboardState {
    /// The database connection for reading accounts and transactions.
    pub db_connection: Arc<Mutex<Connection>>,
    /// The local timezone as a canonical timezone name, e.g. "Pacific/Auckland".
    pub local_timezone: String,
    pub storage_mode: StorageMode,
}

impl FromRef<AppState> for DashboardState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            local_timezone: state.local_timezone.clone(),
            storage_mode: state.storage_mode.clone(),
        }
    }
}

/// Display a page with balances, this month's spending and recent expenses.
pub async fn get_dashboard_page(
    State(state): State<DashboardState>,
    session: Session,
) -> Result<Response, Error> {
    let today = get_local_date(&state.local_timezone).ok_or_else(|| {
        tracing::error!("Invalid timezone {}", state.local_timezone);
        Error::InvalidTimezoneError(state.local_timezone.clone())
    })?;

    let (total_balance, balances, spending, recent_expenses) = {
        let connection = state
            .db_connection
            .lock()
            .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
            .map_err(|_| Error::DatabaseLockError)?;

        let total_balance = get_total_account_balance(&connection).inspect_err(|error| {
            tracing::error!("Could not calculate total account balance: {error}")
        })?;
        let balances = get_balances_by_kind(&connection)?;
        let spending = get_spending_by_category(month_to_date_range(today), &connection)
            .inspect_err(|error| tracing::error!("Could not get spending by category: {error}"))?;
        let recent_expenses = get_recent_transactions(
            Some(TransactionKind::Expense),
            RECENT_EXPENSE_COUNT,
            &connection,
        )?;

        (total_balance, balances, spending, recent_expenses)
    };

    let chart = DashboardChart {
        id: SPENDING_CHART_ID,
        options: spending_by_category_chart(&spending).to_string(),
    };
    let insights = feature_gate(
        &SPENDING_INSIGHTS,
        &session,
        spending_view(&spending, &chart),
        Some(insights_locked_view()),
    );

    let content = html! {
        div id="dashboard-content" class=(PAGE_CONTAINER_STYLE)
        {
            div class="w-full space-y-8"
            {
                (balance_cards_view(total_balance, &balances))
                (insights)
                (recent_expenses_view(&recent_expenses))
            }
        }
    };

    let scripts = if spending.is_empty() {
        Vec::new()
    } else {
        vec![
            HeadElement::ScriptLink("/static/echarts.6.0.0.min.js".to_owned()),
            charts_script(&[chart]),
        ]
    };

    Ok(layout(
        "Dashboard",
        endpoints::DASHBOARD_VIEW,
        &state.storage_mode,
        &scripts,
        &content,
    )
    .into_response())
}

fn spending_view(spending: &[CategorySpending], chart: &DashboardChart) -> Markup {
    html! {
        section id="spending-insights" class="w-full"
        {
            h3 class="text-xl font-semibold mb-4" { "Spending this month" }

            @if spending.is_empty() {
                p class="text-sm text-gray-600 dark:text-gray-400"
                {
                    "Charts will show up here once you record some expenses this month."
                }
            } @else {
                (chart_view(chart))
            }
        }
    }
}

fn insights_locked_view() -> Markup {
    html! {
        section id="spending-insights-locked" class=(CARD_STYLE)
        {
            p class="text-sm"
            {
                "Log in to see your spending by category. "
                a href=(endpoints::FEATURES_VIEW) class=(LINK_STYLE) { "See features" }
            }
        }
    }
}

#[cfg(test)]
mod dashboard_tests {
    use std::sync::{Arc, Mutex};

    use axum::{extract::State, http::StatusCode, response::IntoResponse};
    use scraper::Html;

    use crate::{
        Error,
        account::AccountKind,
        auth::{AuthUser, Session},
        db::StorageMode,
        test_utils::{
            assert_valid_html, count_matches, element_text, get_test_connection,
            must_create_account, parse_html_document,
        },
        timezone::get_local_date,
        transaction::{NewTransaction, TransactionKind, create_transaction},
        user::{SubscriptionTier, UserID},
    };

    use super::{DashboardState, get_dashboard_page};

    fn get_state() -> DashboardState {
        DashboardState {
            db_connection: Arc::new(Mutex::new(get_test_connection())),
            local_timezone: "Etc/UTC".to_owned(),
            storage_mode: StorageMode::InMemory,
        }
    }

    fn logged_in() -> Session {
        let mut session = Session::start();
        session.resolve(Some(AuthUser {
            id: UserID::new(1),
            tier: SubscriptionTier::Free,
        }));
        session
    }

    fn logged_out() -> Session {
        let mut session = Session::start();
        session.resolve(None);
        session
    }

    fn seed(state: &DashboardState) {
        let connection = state.db_connection.lock().unwrap();
        let account = must_create_account("Checking", AccountKind::Bank, 100.0, &connection);
        create_transaction(
            &NewTransaction {
                amount: 42.0,
                kind: TransactionKind::Expense,
                category: "food".to_owned(),
                description: "Groceries".to_owned(),
                date: get_local_date("Etc/UTC").unwrap(),
                account_id: account.id,
            },
            &connection,
        )
        .unwrap();
    }

    async fn render(state: DashboardState, session: Session) -> Html {
        let response = get_dashboard_page(State(state), session)
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::OK);

        let document = parse_html_document(response).await;
        assert_valid_html(&document);
        document
    }

    #[tokio::test]
    async fn shows_balances_and_recent_expenses() {
        let state = get_state();
        seed(&state);

        let document = render(state, logged_in()).await;

        assert_eq!(element_text(&document, "#total-balance"), "$58.00");
        assert_eq!(count_matches(&document, "[data-account-kind=bank]"), 1);
        assert_eq!(count_matches(&document, "#recent-expenses li[data-transaction-id]"), 1);
    }

    #[tokio::test]
    async fn shows_spending_chart_when_logged_in() {
        let state = get_state();
        seed(&state);

        let document = render(state, logged_in()).await;

        assert_eq!(count_matches(&document, "#spending-insights #spending-chart"), 1);
        assert_eq!(count_matches(&document, "#spending-insights-locked"), 0);
    }

    #[tokio::test]
    async fn shows_fallback_instead_of_chart_when_logged_out() {
        let state = get_state();
        seed(&state);

        let document = render(state, logged_out()).await;

        assert_eq!(count_matches(&document, "#spending-chart"), 0);
        assert_eq!(count_matches(&document, "#spending-insights-locked"), 1);
    }

    #[tokio::test]
    async fn empty_ledger_shows_prompts() {
        let document = render(get_state(), logged_in()).await;

        assert_eq!(element_text(&document, "#total-balance"), "$0.00");
        assert_eq!(count_matches(&document, "#spending-chart"), 0);
        assert!(element_text(&document, "#recent-expenses").contains("No expenses recorded"));
    }

    #[tokio::test]
    async fn invalid_timezone_is_an_error() {
        let state = DashboardState {
            local_timezone: "Not/AZone".to_owned(),
            ..get_state()
        };

        let result = get_dashboard_page(State(state), logged_in()).await;

        assert_eq!(
            result.err(),
            Some(Error::InvalidTimezoneError("Not/AZone".to_owned()))
        );
    }
}
