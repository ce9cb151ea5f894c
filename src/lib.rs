//! Pocket Ledger is an installable web app for tracking expenses, income and
//! account balances.
//!
//! This library provides the HTTP server that renders every screen as HTML,
//! persists records in a local SQLite database and serves the service worker
//! that keeps the app shell available offline.

#![warn(missing_docs)]

use std::{net::SocketAddr, time::Duration};

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_server::Handle;
use tokio::signal;

mod account;
mod alert;
mod app_state;
mod auth;
mod config;
mod dashboard;
mod db;
mod endpoints;
mod feature;
mod hello;
mod html;
mod internal_server_error;
mod layout;
mod logging;
mod navigation;
mod not_found;
mod password;
mod pwa;
mod routing;
mod timezone;
mod transaction;
pub mod user;

#[cfg(test)]
mod test_utils;

pub use app_state::AppState;
pub use config::Environment;
pub use db::{SCHEMA_VERSION, Storage, StorageMode, initialize as initialize_db, open_storage};
pub use logging::logging_middleware;
pub use password::{PasswordHash, ValidatedPassword};
pub use pwa::{DEFAULT_API_PATTERN, PwaConfig};
pub use routing::build_router;

use crate::{
    account::AccountId,
    alert::Alert,
    internal_server_error::InternalServerError,
    not_found::get_404_not_found_response,
};

/// An async task that waits for either the ctrl+c or terminate signal, whichever comes first, and
/// then signals the server to shut down gracefully.
///
/// `handle` is a handle to an Axum `Server`.
pub async fn graceful_shutdown(handle: Handle<SocketAddr>) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::debug!("Received ctrl+c signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
        _ = terminate => {
            tracing::debug!("Received terminate signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
    }
}

/// The errors that may occur in the application.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// The user provided a password that is too easy to guess.
    #[error("password is too weak: {0}")]
    TooWeak(String),

    /// An unexpected error occurred with the underlying hashing library.
    ///
    /// The error string should only be logged for debugging on the server.
    #[error("hashing failed: {0}")]
    HashingError(String),

    /// The auth cookie is missing from the cookie jar in the request.
    #[error("no auth cookie in the cookie jar")]
    CookieMissing,

    /// The auth cookie could not be decoded into a token.
    #[error("the auth token could not be decoded: {0}")]
    InvalidToken(String),

    /// The auth token has expired.
    #[error("the auth token has expired")]
    ExpiredToken,

    /// The expiry date time of the auth token could not be formatted or
    /// computed.
    #[error("could not compute the auth token expiry: {0}")]
    InvalidDateFormat(String),

    /// The requested resource was not found.
    ///
    /// Internally, this error may occur when a query returns no rows.
    #[error("the requested resource could not be found")]
    NotFound,

    /// An unhandled/unexpected SQL error.
    #[error("an unexpected SQL error occurred: {0}")]
    SqlError(rusqlite::Error),

    /// The database file was written by a newer version of the app.
    #[error("the database schema version {0} is newer than the supported version")]
    UnsupportedSchemaVersion(i64),

    /// Neither the database file nor the in-memory fallback could be opened.
    #[error("storage is unavailable: {0}")]
    StorageUnavailable(String),

    /// An error occurred while getting the local timezone from a canonical timezone string.
    #[error("invalid timezone {0}")]
    InvalidTimezoneError(String),

    /// Could not acquire the database lock
    #[error("could not acquire the database lock")]
    DatabaseLockError,

    /// The specified account name already exists in the database.
    #[error("the account \"{0}\" already exists in the database")]
    DuplicateAccountName(String),

    /// An empty string was used as an account name.
    #[error("account name cannot be empty")]
    EmptyAccountName,

    /// An empty string was used as a transaction category.
    #[error("category cannot be empty")]
    EmptyCategory,

    /// An amount or balance was not a finite number, e.g. `inf` or `NaN`.
    #[error("{0} is not a valid amount")]
    InvalidAmount(f64),

    /// A transaction referenced an account that does not exist.
    #[error("the account {0} does not exist")]
    InvalidAccount(AccountId),

    /// Tried to delete an account that still has transactions.
    #[error("the account {0} still has transactions")]
    AccountHasTransactions(AccountId),

    /// A string could not be parsed as an account kind.
    #[error("\"{0}\" is not a valid account type")]
    InvalidAccountKind(String),

    /// A string could not be parsed as a transaction kind.
    #[error("\"{0}\" is not a valid transaction type")]
    InvalidTransactionKind(String),

    /// A string could not be parsed as a subscription tier.
    #[error("\"{0}\" is not a valid subscription tier")]
    InvalidTier(String),

    /// An error occurred while serializing a struct as JSON
    #[error("could not serialize as JSON: {0}")]
    JSONSerializationError(String),

    /// Tried to update a transaction that does not exist
    #[error("tried to update a transaction that is not in the database")]
    UpdateMissingTransaction,

    /// Tried to delete a transaction that does not exist
    #[error("tried to delete a transaction that is not in the database")]
    DeleteMissingTransaction,

    /// Tried to update an account that does not exist
    #[error("tried to update an account that is not in the database")]
    UpdateMissingAccount,

    /// Tried to delete an account that does not exist
    #[error("tried to delete an account that is not in the database")]
    DeleteMissingAccount,

    /// The user tried to use a feature their subscription does not include.
    #[error("the feature \"{0}\" is locked for this user")]
    FeatureLocked(&'static str),
}

impl From<rusqlite::Error> for Error {
    fn from(value: rusqlite::Error) -> Self {
        match value {
            rusqlite::Error::QueryReturnedNoRows => Error::NotFound,
            error => {
                tracing::error!("an unhandled SQL error occurred: {}", error);
                Error::SqlError(error)
            }
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        match self {
            Error::NotFound => get_404_not_found_response(),
            Error::InvalidTimezoneError(timezone) => InternalServerError {
                description: "Invalid Timezone Settings",
                fix: &format!(
                    "Could not get local timezone \"{timezone}\". Check your server settings and \
                    ensure the timezone has been set to valid, canonical timezone string"
                ),
            }
            .into_response(),
            Error::DatabaseLockError => InternalServerError::default().into_response(),
            // Any errors that are not handled above are not intended to be shown to the client.
            error => {
                tracing::error!("An unexpected error occurred: {}", error);
                InternalServerError::default().into_response()
            }
        }
    }
}

impl Error {
    /// Render the error as an alert fragment for htmx requests.
    fn into_alert_response(self) -> Response {
        let (status, message, details) = match &self {
            Error::EmptyAccountName => (
                StatusCode::BAD_REQUEST,
                "Invalid account name",
                "Account names cannot be empty.".to_owned(),
            ),
            Error::EmptyCategory => (
                StatusCode::BAD_REQUEST,
                "Invalid category",
                "Enter a category such as \"food\" or \"rent\".".to_owned(),
            ),
            Error::DuplicateAccountName(name) => (
                StatusCode::BAD_REQUEST,
                "Duplicate Account Name",
                format!(
                    "The account {name} already exists. \
                    Choose a different account name, or edit or delete the existing account."
                ),
            ),
            Error::InvalidAmount(_) => (
                StatusCode::BAD_REQUEST,
                "Invalid amount",
                "Enter a number such as 12.50.".to_owned(),
            ),
            Error::InvalidAccount(account_id) => (
                StatusCode::BAD_REQUEST,
                "Invalid account",
                format!("Could not find an account with the ID {account_id}."),
            ),
            Error::AccountHasTransactions(_) => (
                StatusCode::CONFLICT,
                "Could not delete account",
                "The account still has transactions. \
                Delete or move its transactions before deleting the account."
                    .to_owned(),
            ),
            Error::UpdateMissingTransaction => (
                StatusCode::NOT_FOUND,
                "Could not update transaction",
                "The transaction could not be found.".to_owned(),
            ),
            Error::DeleteMissingTransaction => (
                StatusCode::NOT_FOUND,
                "Could not delete transaction",
                "The transaction could not be found. \
                Try refreshing the page to see if the transaction has already been deleted."
                    .to_owned(),
            ),
            Error::UpdateMissingAccount => (
                StatusCode::NOT_FOUND,
                "Could not update account",
                "The account could not be found.".to_owned(),
            ),
            Error::DeleteMissingAccount => (
                StatusCode::NOT_FOUND,
                "Could not delete account",
                "The account could not be found. \
                Try refreshing the page to see if the account has already been deleted."
                    .to_owned(),
            ),
            Error::FeatureLocked(_) => (
                StatusCode::FORBIDDEN,
                "Feature locked",
                "Your subscription does not include this feature.".to_owned(),
            ),
            Error::NotFound => (
                StatusCode::NOT_FOUND,
                "Not found",
                "The requested record could not be found.".to_owned(),
            ),
            Error::InvalidTimezoneError(timezone) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Invalid Timezone Settings",
                format!(
                    "Could not get local timezone \"{timezone}\". Check your server settings and \
                    ensure the timezone has been set to valid, canonical timezone string"
                ),
            ),
            error => {
                tracing::error!("An unexpected error occurred: {error}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Something went wrong",
                    "An unexpected error occurred, check the server logs for more details."
                        .to_owned(),
                )
            }
        };

        Alert::Error {
            message: message.to_owned(),
            details,
        }
        .into_response_with_status(status)
    }
}
