//! Expenses and income, and the pages for recording them.

mod core;
mod endpoints;
mod form;
mod form_page;
mod transactions_page;

pub(crate) use core::sum_balance_effects;
pub use core::{
    NewTransaction, Transaction, TransactionFilter, TransactionId, TransactionKind,
    create_transaction, create_transaction_table, delete_transaction, get_all_transactions,
    get_categories, get_recent_transactions, get_transaction, query_transactions,
    update_transaction,
};
pub use endpoints::{
    create_transaction_endpoint, delete_transaction_endpoint, update_transaction_endpoint,
};
pub use form_page::{get_edit_transaction_page, get_new_transaction_page};
pub use transactions_page::{TransactionPageState, get_transactions_page};
