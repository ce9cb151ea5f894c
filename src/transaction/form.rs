//! The form shared by the new and edit transaction pages.

use maud::{Markup, html};
use serde::Deserialize;
use time::Date;

use crate::{
    account::{Account, AccountId},
    endpoints,
    html::{
        ALERT_CONTAINER_ID, FORM_LABEL_STYLE, FORM_RADIO_GROUP_STYLE, FORM_RADIO_INPUT_STYLE,
        FORM_RADIO_LABEL_STYLE, FORM_TEXT_INPUT_STYLE, LINK_STYLE, submit_button,
    },
    transaction::{NewTransaction, Transaction, TransactionKind},
};

/// The form data for creating or editing a transaction.
#[derive(Debug, Clone, Deserialize)]
#[cfg_attr(test, derive(serde::Serialize))]
pub struct TransactionForm {
    pub amount: f64,
    pub kind: TransactionKind,
    pub category: String,
    #[serde(default)]
    pub description: String,
    pub date: Date,
    pub account_id: AccountId,
}

impl From<TransactionForm> for NewTransaction {
    fn from(form: TransactionForm) -> Self {
        NewTransaction {
            amount: form.amount,
            kind: form.kind,
            category: form.category,
            description: form.description,
            date: form.date,
            account_id: form.account_id,
        }
    }
}

/// Where and how the form is sent.
pub enum FormMethod<'a> {
    Post(&'a str),
    Put(&'a str),
}

/// The choices and values the form is rendered with.
pub struct TransactionFormContext<'a> {
    pub method: FormMethod<'a>,
    /// The transaction being edited, if any.
    pub transaction: Option<&'a Transaction>,
    pub accounts: &'a [Account],
    /// Categories already in use, suggested while typing.
    pub categories: &'a [String],
    /// Today in the user's timezone. New transactions default to it.
    pub today: Date,
}

fn kind_radio(kind: TransactionKind, label: &str, checked: bool) -> Markup {
    let id = format!("kind-{}", kind.as_str());

    html! {
        div class="flex flex-1 items-center gap-3"
        {
            input
                name="kind"
                id=(id)
                type="radio"
                value=(kind.as_str())
                checked[checked]
                required
                class=(FORM_RADIO_INPUT_STYLE);

            label for=(id) class=(FORM_RADIO_LABEL_STYLE) { (label) }
        }
    }
}

/// Render the transaction form.
///
/// Renders a link to the new account page instead when there are no accounts,
/// since every transaction needs one.
pub fn transaction_form(context: &TransactionFormContext<'_>) -> Markup {
    let (hx_post, hx_put, title, submit_label) = match context.method {
        FormMethod::Post(url) => (Some(url), None, "New Transaction", "Create Transaction"),
        FormMethod::Put(url) => (None, Some(url), "Edit Transaction", "Save Changes"),
    };
    let transaction = context.transaction;
    let kind = transaction
        .map(|transaction| transaction.kind)
        .unwrap_or(TransactionKind::Expense);
    let amount = transaction.map(|transaction| format!("{:.2}", transaction.amount.abs()));
    let date = transaction
        .map(|transaction| transaction.date)
        .unwrap_or(context.today);
    let selected_account = transaction.map(|transaction| transaction.account_id);

    if context.accounts.is_empty() {
        return html! {
            p id="no-accounts" class="text-sm"
            {
                "Transactions belong to an account. "
                a href=(endpoints::NEW_ACCOUNT_VIEW) class=(LINK_STYLE) { "Create an account" }
                " first."
            }
        };
    }

    html! {
        form
            hx-post=[hx_post]
            hx-put=[hx_put]
            hx-target-error={"#" (ALERT_CONTAINER_ID)}
            hx-indicator="#indicator"
            hx-disabled-elt="#submit-button"
            class="w-full space-y-4 md:space-y-6"
        {
            h2 class="text-xl font-bold" { (title) }

            fieldset class="space-y-2"
            {
                legend class=(FORM_LABEL_STYLE) { "Type" }

                div class=(FORM_RADIO_GROUP_STYLE)
                {
                    (kind_radio(TransactionKind::Expense, "Expense", kind == TransactionKind::Expense))
                    (kind_radio(TransactionKind::Income, "Income", kind == TransactionKind::Income))
                }
            }

            div
            {
                label for="amount" class=(FORM_LABEL_STYLE) { "Amount" }

                input
                    name="amount"
                    id="amount"
                    type="number"
                    step="0.01"
                    min="0.01"
                    placeholder="0.00"
                    value=[amount]
                    required
                    autofocus
                    class=(FORM_TEXT_INPUT_STYLE);
            }

            div
            {
                label for="category" class=(FORM_LABEL_STYLE) { "Category" }

                input
                    name="category"
                    id="category"
                    type="text"
                    placeholder="food"
                    list="category-options"
                    value=[transaction.map(|transaction| transaction.category.as_str())]
                    required
                    class=(FORM_TEXT_INPUT_STYLE);

                datalist id="category-options"
                {
                    @for category in context.categories {
                        option value=(category) {}
                    }
                }
            }

            div
            {
                label for="account_id" class=(FORM_LABEL_STYLE) { "Account" }

                select name="account_id" id="account_id" required class=(FORM_TEXT_INPUT_STYLE)
                {
                    @for account in context.accounts {
                        option value=(account.id) selected[Some(account.id) == selected_account]
                        {
                            (account.name)
                        }
                    }
                }
            }

            div
            {
                label for="date" class=(FORM_LABEL_STYLE) { "Date" }

                input
                    name="date"
                    id="date"
                    type="date"
                    value=(date)
                    required
                    class=(FORM_TEXT_INPUT_STYLE);
            }

            div
            {
                label for="description" class=(FORM_LABEL_STYLE) { "Description" }

                input
                    name="description"
                    id="description"
                    type="text"
                    placeholder="Description"
                    value=[transaction.map(|transaction| transaction.description.as_str())]
                    class=(FORM_TEXT_INPUT_STYLE);
            }

            (submit_button(submit_label))
        }
    }
}
