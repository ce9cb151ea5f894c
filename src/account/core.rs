//! Account records and the SQL for storing them.
//!
//! An account's `balance` is a cached value. Every account also stores a
//! hidden opening balance, and the cache must always equal the opening
//! balance plus the balance effect of the account's transactions. The
//! transaction functions keep the cache up to date, and
//! [reconcile_account_balance] repairs it if it drifts.

use std::{fmt::Display, str::FromStr};

use rusqlite::{
    Connection, Row, ToSql,
    ffi::{SQLITE_CONSTRAINT_FOREIGNKEY, SQLITE_CONSTRAINT_UNIQUE},
    params,
    types::{FromSql, FromSqlError, FromSqlResult, ToSqlOutput, ValueRef},
};
use serde::{Deserialize, Serialize};

use crate::{Error, transaction::sum_balance_effects};

/// The ID of an account row.
pub type AccountId = i64;

/// What sort of account holds the money.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountKind {
    /// Physical money.
    Cash,
    /// An everyday bank account.
    Bank,
    /// A credit card, usually with a negative balance.
    Credit,
    /// A savings account.
    Savings,
}

impl AccountKind {
    /// Every kind, in the order they are offered in forms.
    pub const ALL: [AccountKind; 4] = [
        AccountKind::Bank,
        AccountKind::Cash,
        AccountKind::Credit,
        AccountKind::Savings,
    ];

    /// The name stored in the database and used in forms.
    pub fn as_str(self) -> &'static str {
        match self {
            AccountKind::Cash => "cash",
            AccountKind::Bank => "bank",
            AccountKind::Credit => "credit",
            AccountKind::Savings => "savings",
        }
    }

    /// The name shown to the user.
    pub fn label(self) -> &'static str {
        match self {
            AccountKind::Cash => "Cash",
            AccountKind::Bank => "Bank",
            AccountKind::Credit => "Credit card",
            AccountKind::Savings => "Savings",
        }
    }
}

impl Display for AccountKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AccountKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cash" => Ok(AccountKind::Cash),
            "bank" => Ok(AccountKind::Bank),
            "credit" => Ok(AccountKind::Credit),
            "savings" => Ok(AccountKind::Savings),
            other => Err(Error::InvalidAccountKind(other.to_owned())),
        }
    }
}

impl ToSql for AccountKind {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(self.as_str().into())
    }
}

impl FromSql for AccountKind {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|error: Error| FromSqlError::Other(Box::new(error)))
    }
}

/// An account that has not been saved yet.
#[derive(Debug, Clone, PartialEq)]
pub struct NewAccount {
    pub name: String,
    pub kind: AccountKind,
    pub balance: f64,
}

/// A saved account.
#[derive(Debug, Clone, PartialEq)]
pub struct Account {
    /// The id for the account.
    pub id: AccountId,
    /// The unique, user facing name of the account.
    pub name: String,
    pub kind: AccountKind,
    /// The amount of money in the account.
    pub balance: f64,
}

/// The result of recomputing an account balance from its transactions.
#[derive(Debug, Clone, PartialEq)]
pub struct Reconciliation {
    /// The account with its corrected balance.
    pub account: Account,
    /// How far the stored balance was from the computed balance. Positive
    /// when the stored balance was too high.
    pub drift: f64,
}

/// Create the accounts table and its indexes.
pub fn create_account_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute_batch(
        "CREATE TABLE IF NOT EXISTS accounts (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            type TEXT NOT NULL CHECK (type IN ('cash', 'bank', 'credit', 'savings')),
            balance REAL NOT NULL,
            opening_balance REAL NOT NULL
        );
        CREATE UNIQUE INDEX IF NOT EXISTS idx_accounts_name ON accounts(name);
        CREATE INDEX IF NOT EXISTS idx_accounts_type ON accounts(type);",
    )
}

const SELECT_ACCOUNT: &str = "SELECT id, name, type, balance FROM accounts";

/// Map a row selected with the columns `id, name, type, balance`.
pub fn map_row_to_account(row: &Row) -> Result<Account, rusqlite::Error> {
    Ok(Account {
        id: row.get(0)?,
        name: row.get(1)?,
        kind: row.get(2)?,
        balance: row.get(3)?,
    })
}

fn validate_name(name: &str) -> Result<&str, Error> {
    let name = name.trim();

    if name.is_empty() {
        Err(Error::EmptyAccountName)
    } else {
        Ok(name)
    }
}

/// Reject amounts SQLite cannot store or sum, such as `inf` and `NaN`.
pub(crate) fn validate_amount(amount: f64) -> Result<f64, Error> {
    if amount.is_finite() {
        Ok(amount)
    } else {
        Err(Error::InvalidAmount(amount))
    }
}

fn map_unique_name_error(error: rusqlite::Error, name: &str) -> Error {
    match error {
        rusqlite::Error::SqliteFailure(error, Some(_))
            if error.extended_code == SQLITE_CONSTRAINT_UNIQUE =>
        {
            Error::DuplicateAccountName(name.to_owned())
        }
        error => error.into(),
    }
}

/// Save `account` and return it with its new ID.
///
/// The entered balance becomes the account's opening balance.
///
/// # Errors
/// - [Error::EmptyAccountName] if the name is empty or only whitespace,
/// - [Error::InvalidAmount] if the balance is not a finite number,
/// - [Error::DuplicateAccountName] if another account has the same name,
/// - [Error::SqlError] for any other SQL error.
pub fn create_account(account: &NewAccount, connection: &Connection) -> Result<Account, Error> {
    let name = validate_name(&account.name)?;
    let balance = validate_amount(account.balance)?;

    connection
        .query_row(
            "INSERT INTO accounts (name, type, balance, opening_balance)
            VALUES (?1, ?2, ?3, ?3)
            RETURNING id, name, type, balance",
            params![name, account.kind, balance],
            map_row_to_account,
        )
        .map_err(|error| map_unique_name_error(error, name))
}

/// Retrieve the account with `id`.
///
/// # Errors
/// Returns [Error::NotFound] if there is no account with `id`.
pub fn get_account(id: AccountId, connection: &Connection) -> Result<Account, Error> {
    connection
        .prepare(&format!("{SELECT_ACCOUNT} WHERE id = :id"))?
        .query_one(&[(":id", &id)], map_row_to_account)
        .map_err(Error::from)
}

/// Retrieve the account called `name`.
///
/// # Errors
/// Returns [Error::NotFound] if there is no account called `name`.
pub fn get_account_by_name(name: &str, connection: &Connection) -> Result<Account, Error> {
    connection
        .prepare(&format!("{SELECT_ACCOUNT} WHERE name = :name"))?
        .query_one(&[(":name", &name.trim())], map_row_to_account)
        .map_err(Error::from)
}

/// Retrieve the accounts of `kind`, ordered by name.
pub fn get_accounts_by_kind(
    kind: AccountKind,
    connection: &Connection,
) -> Result<Vec<Account>, Error> {
    connection
        .prepare(&format!(
            "{SELECT_ACCOUNT} WHERE type = :type ORDER BY name ASC"
        ))?
        .query_map(&[(":type", &kind)], map_row_to_account)?
        .map(|maybe_account| maybe_account.map_err(Error::from))
        .collect()
}

/// Retrieve every account, ordered by name.
pub fn get_all_accounts(connection: &Connection) -> Result<Vec<Account>, Error> {
    connection
        .prepare(&format!("{SELECT_ACCOUNT} ORDER BY name ASC"))?
        .query_map([], map_row_to_account)?
        .map(|maybe_account| maybe_account.map_err(Error::from))
        .collect()
}

/// Replace the name, kind and balance of the account with `id`.
///
/// A changed balance is treated as a correction: the opening balance moves
/// by the same amount so that the balance still equals the opening balance
/// plus the account's transactions.
///
/// # Errors
/// - [Error::EmptyAccountName] if the name is empty or only whitespace,
/// - [Error::InvalidAmount] if the balance is not a finite number,
/// - [Error::DuplicateAccountName] if another account has the same name,
/// - [Error::UpdateMissingAccount] if there is no account with `id`,
/// - [Error::SqlError] for any other SQL error.
pub fn update_account(
    id: AccountId,
    account: &NewAccount,
    connection: &Connection,
) -> Result<Account, Error> {
    let name = validate_name(&account.name)?;
    let balance = validate_amount(account.balance)?;

    // The right hand side of each assignment sees the row before the update.
    connection
        .query_row(
            "UPDATE accounts
            SET name = ?1,
                type = ?2,
                opening_balance = opening_balance + (?3 - balance),
                balance = ?3
            WHERE id = ?4
            RETURNING id, name, type, balance",
            params![name, account.kind, balance, id],
            map_row_to_account,
        )
        .map_err(|error| match error {
            rusqlite::Error::QueryReturnedNoRows => Error::UpdateMissingAccount,
            error => map_unique_name_error(error, name),
        })
}

/// Delete the account with `id`.
///
/// # Errors
/// - [Error::AccountHasTransactions] if any transaction references the account,
/// - [Error::DeleteMissingAccount] if there is no account with `id`,
/// - [Error::SqlError] for any other SQL error.
pub fn delete_account(id: AccountId, connection: &Connection) -> Result<(), Error> {
    let has_transactions: bool = connection.query_row(
        "SELECT EXISTS(SELECT 1 FROM transactions WHERE account_id = ?1)",
        [id],
        |row| row.get(0),
    )?;

    if has_transactions {
        return Err(Error::AccountHasTransactions(id));
    }

    let rows_affected = connection
        .execute("DELETE FROM accounts WHERE id = :id", &[(":id", &id)])
        .map_err(|error| match error {
            rusqlite::Error::SqliteFailure(error, Some(_))
                if error.extended_code == SQLITE_CONSTRAINT_FOREIGNKEY =>
            {
                Error::AccountHasTransactions(id)
            }
            error => error.into(),
        })?;

    match rows_affected {
        0 => Err(Error::DeleteMissingAccount),
        _ => Ok(()),
    }
}

/// Get the total balance across all accounts.
///
/// # Errors
/// Returns [Error::SqlError] if the query fails.
pub fn get_total_account_balance(connection: &Connection) -> Result<f64, Error> {
    connection
        .query_row("SELECT COALESCE(SUM(balance), 0) FROM accounts", [], |row| {
            row.get(0)
        })
        .map_err(Error::from)
}

/// Add `delta` to the cached balance of the account with `id`.
///
/// # Errors
/// Returns [Error::InvalidAccount] if there is no account with `id`.
pub(crate) fn adjust_account_balance(
    id: AccountId,
    delta: f64,
    connection: &Connection,
) -> Result<(), Error> {
    let rows_affected = connection.execute(
        "UPDATE accounts SET balance = balance + ?1 WHERE id = ?2",
        params![delta, id],
    )?;

    match rows_affected {
        0 => Err(Error::InvalidAccount(id)),
        _ => Ok(()),
    }
}

/// Recompute the balance of the account with `id` from its opening balance
/// and transactions, and store the result.
///
/// # Errors
/// - [Error::NotFound] if there is no account with `id`,
/// - [Error::SqlError] for any other SQL error.
pub fn reconcile_account_balance(
    id: AccountId,
    connection: &Connection,
) -> Result<Reconciliation, Error> {
    let transaction = connection.unchecked_transaction()?;

    let (stored_balance, opening_balance): (f64, f64) = transaction.query_row(
        "SELECT balance, opening_balance FROM accounts WHERE id = ?1",
        [id],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )?;

    let expected_balance = opening_balance + sum_balance_effects(id, &transaction)?;

    let account = transaction.query_row(
        "UPDATE accounts SET balance = ?1 WHERE id = ?2 RETURNING id, name, type, balance",
        params![expected_balance, id],
        map_row_to_account,
    )?;

    transaction.commit()?;

    let drift = stored_balance - expected_balance;
    if drift != 0.0 {
        tracing::warn!(
            "Corrected the balance of account {id} from {stored_balance} to {expected_balance}"
        );
    }

    Ok(Reconciliation { account, drift })
}
