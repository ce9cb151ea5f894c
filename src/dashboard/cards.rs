//! Card components for the dashboard: balances and recent expenses.

use maud::{Markup, html};

use crate::{
    dashboard::aggregation::KindBalance,
    endpoints::{self, format_endpoint},
    html::{CARD_STYLE, LINK_STYLE, format_currency},
    transaction::Transaction,
};

/// The total balance across all accounts, with a card per account kind.
pub(super) fn balance_cards_view(total_balance: f64, balances: &[KindBalance]) -> Markup {
    html! {
        section id="balances" class="w-full"
        {
            div class="flex justify-between items-baseline mb-4"
            {
                h3 class="text-xl font-semibold" { "Balances" }
                a href=(endpoints::ACCOUNTS_VIEW) class=(LINK_STYLE) { "Accounts" }
            }

            div class=(CARD_STYLE)
            {
                p class="text-sm text-gray-600 dark:text-gray-400" { "Total" }
                p id="total-balance" class="text-3xl font-bold tabular-nums"
                {
                    (format_currency(total_balance))
                }
            }

            @if balances.is_empty() {
                p class="mt-3 text-sm text-gray-600 dark:text-gray-400"
                {
                    "No accounts yet. "
                    a href=(endpoints::NEW_ACCOUNT_VIEW) class=(LINK_STYLE) { "Add an account" }
                    " to start tracking balances."
                }
            } @else {
                div class="grid grid-cols-2 lg:grid-cols-4 gap-3 mt-3"
                {
                    @for balance in balances {
                        div class=(CARD_STYLE) data-account-kind=(balance.kind.as_str())
                        {
                            p class="text-sm text-gray-600 dark:text-gray-400"
                            {
                                (balance.kind.label())
                                " (" (balance.account_count) ")"
                            }
                            p class="text-lg font-semibold tabular-nums"
                            {
                                (format_currency(balance.total))
                            }
                        }
                    }
                }
            }
        }
    }
}

/// The most recent expenses, newest first.
pub(super) fn recent_expenses_view(expenses: &[Transaction]) -> Markup {
    html! {
        section id="recent-expenses" class="w-full"
        {
            div class="flex justify-between items-baseline mb-4"
            {
                h3 class="text-xl font-semibold" { "Recent expenses" }
                a
                    href={ (endpoints::TRANSACTIONS_VIEW) "?kind=expense" }
                    class=(LINK_STYLE)
                {
                    "See all"
                }
            }

            @if expenses.is_empty() {
                p class="text-sm text-gray-600 dark:text-gray-400"
                {
                    "No expenses recorded. "
                    a href=(endpoints::NEW_TRANSACTION_VIEW) class=(LINK_STYLE) { "Add one" }
                    "."
                }
            } @else {
                ul class="space-y-2"
                {
                    @for expense in expenses {
                        li class=(CARD_STYLE) data-transaction-id=(expense.id)
                        {
                            a
                                href=(format_endpoint(endpoints::EDIT_TRANSACTION_VIEW, expense.id))
                                class="flex justify-between gap-4"
                            {
                                div
                                {
                                    p class="font-medium" { (expense.category) }
                                    p class="text-xs text-gray-500 dark:text-gray-400"
                                    {
                                        (expense.date)
                                        @if !expense.description.is_empty() {
                                            " · " (expense.description)
                                        }
                                    }
                                }
                                span class="tabular-nums text-red-700 dark:text-red-400"
                                {
                                    (format_currency(-expense.amount.abs()))
                                }
                            }
                        }
                    }
                }
            }
        }
    }
}
