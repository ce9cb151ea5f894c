//! Accounts hold the money that transactions move in and out of.

mod accounts_page;
mod core;
mod endpoints;
mod form;
mod form_page;

pub use accounts_page::{AccountPageState, get_accounts_page};
pub(crate) use core::{adjust_account_balance, validate_amount};
pub use core::{
    Account, AccountId, AccountKind, NewAccount, create_account, create_account_table,
    delete_account, get_account, get_accounts_by_kind, get_all_accounts,
    get_total_account_balance, reconcile_account_balance, update_account,
};
pub use endpoints::{
    create_account_endpoint, delete_account_endpoint, reconcile_account_endpoint,
    update_account_endpoint,
};
pub use form_page::{get_edit_account_page, get_new_account_page};
