//! Dashboard module
//!
//! Provides an overview page showing balances, this month's spending by
//! category and the most recent expenses.

mod aggregation;
mod cards;
mod charts;
mod handlers;

pub use handlers::get_dashboard_page;
