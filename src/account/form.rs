//! The form shared by the new and edit account pages.

use maud::{Markup, html};
use serde::Deserialize;

use crate::{
    account::{Account, AccountKind, NewAccount},
    html::{ALERT_CONTAINER_ID, FORM_LABEL_STYLE, FORM_TEXT_INPUT_STYLE, submit_button},
};

/// The form data for creating or editing an account.
#[derive(Debug, Clone, Deserialize)]
#[cfg_attr(test, derive(serde::Serialize))]
pub struct AccountForm {
    pub name: String,
    pub kind: AccountKind,
    /// The balance in dollars.
    pub balance: f64,
}

impl From<AccountForm> for NewAccount {
    fn from(form: AccountForm) -> Self {
        NewAccount {
            name: form.name,
            kind: form.kind,
            balance: form.balance,
        }
    }
}

/// How the form is sent.
pub enum FormMethod<'a> {
    Post(&'a str),
    Put(&'a str),
}

/// Render the account form, prefilled with `account` when editing.
pub fn account_form(method: FormMethod<'_>, account: Option<&Account>) -> Markup {
    let (hx_post, hx_put, title, submit_label) = match method {
        FormMethod::Post(url) => (Some(url), None, "New Account", "Create Account"),
        FormMethod::Put(url) => (None, Some(url), "Edit Account", "Save Changes"),
    };
    let selected_kind = account.map(|account| account.kind).unwrap_or(AccountKind::Bank);
    let balance = account.map(|account| format!("{:.2}", account.balance));

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

            div
            {
                label for="name" class=(FORM_LABEL_STYLE) { "Name" }

                input
                    name="name"
                    id="name"
                    type="text"
                    placeholder="Checking"
                    value=[account.map(|account| account.name.as_str())]
                    required
                    autofocus
                    class=(FORM_TEXT_INPUT_STYLE);
            }

            div
            {
                label for="kind" class=(FORM_LABEL_STYLE) { "Type" }

                select name="kind" id="kind" required class=(FORM_TEXT_INPUT_STYLE)
                {
                    @for kind in AccountKind::ALL {
                        option value=(kind.as_str()) selected[kind == selected_kind]
                        {
                            (kind.label())
                        }
                    }
                }
            }

            div
            {
                label for="balance" class=(FORM_LABEL_STYLE) { "Balance" }

                input
                    name="balance"
                    id="balance"
                    type="number"
                    step="0.01"
                    placeholder="0.00"
                    value=[balance]
                    required
                    class=(FORM_TEXT_INPUT_STYLE);
            }

            (submit_button(submit_label))
        }
    }
}

#[cfg(test)]
mod account_form_tests {
    use scraper::{Html, Selector};

    use crate::{
        account::{Account, AccountKind},
        test_utils::{assert_form_input, assert_form_input_with_value, must_get_form},
    };

    use super::{FormMethod, account_form};

    #[test]
    fn new_form_posts_and_is_empty() {
        let html = Html::parse_fragment(
            &account_form(FormMethod::Post("/api/accounts"), None).into_string(),
        );

        let form = must_get_form(&html);
        assert_eq!(form.value().attr("hx-post"), Some("/api/accounts"));
        assert_eq!(form.value().attr("hx-put"), None);
        assert_form_input(&form, "name", "text");
        assert_form_input(&form, "balance", "number");
    }

    #[test]
    fn edit_form_puts_and_is_prefilled() {
        let account = Account {
            id: 3,
            name: "Visa".to_owned(),
            kind: AccountKind::Credit,
            balance: -12.5,
        };
        let html = Html::parse_fragment(
            &account_form(FormMethod::Put("/api/accounts/3"), Some(&account)).into_string(),
        );

        let form = must_get_form(&html);
        assert_eq!(form.value().attr("hx-put"), Some("/api/accounts/3"));
        assert_form_input_with_value(&form, "name", "text", "Visa");
        assert_form_input_with_value(&form, "balance", "number", "-12.50");
        let selected = form
            .select(&Selector::parse("option[selected]").unwrap())
            .next()
            .expect("no selected account type");
        assert_eq!(selected.value().attr("value"), Some("credit"));
    }
}
