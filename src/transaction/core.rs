//! Defines the core data models and database queries for transactions.

use std::{fmt::Display, str::FromStr};

use rusqlite::{
    Connection, Row, ToSql,
    ffi::SQLITE_CONSTRAINT_FOREIGNKEY,
    params,
    types::{FromSql, FromSqlError, FromSqlResult, ToSqlOutput, ValueRef},
};
use serde::{Deserialize, Serialize};
use time::Date;

use crate::{
    Error,
    account::{AccountId, adjust_account_balance, validate_amount},
};

// ============================================================================
// MODELS
// ============================================================================

/// The ID of a transaction row.
pub type TransactionId = i64;

/// Whether money was spent or earned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    Expense,
    Income,
}

impl TransactionKind {
    /// The name stored in the database and used in forms and query strings.
    pub fn as_str(self) -> &'static str {
        match self {
            TransactionKind::Expense => "expense",
            TransactionKind::Income => "income",
        }
    }

    /// How a transaction of this kind for `amount` changes its account's
    /// balance. The sign of `amount` is ignored.
    pub fn balance_effect(self, amount: f64) -> f64 {
        match self {
            TransactionKind::Expense => -amount.abs(),
            TransactionKind::Income => amount.abs(),
        }
    }
}

impl Display for TransactionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "expense" => Ok(TransactionKind::Expense),
            "income" => Ok(TransactionKind::Income),
            other => Err(Error::InvalidTransactionKind(other.to_owned())),
        }
    }
}

impl ToSql for TransactionKind {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(self.as_str().into())
    }
}

impl FromSql for TransactionKind {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|error: Error| FromSqlError::Other(Box::new(error)))
    }
}

/// An expense or income that has not been saved yet.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTransaction {
    /// The amount as entered. The kind decides whether it adds to or takes
    /// from the account balance.
    pub amount: f64,
    pub kind: TransactionKind,
    /// A label such as "food" or "rent".
    pub category: String,
    /// A text description of what the transaction was for.
    pub description: String,
    /// When the transaction happened.
    pub date: Date,
    /// The account the money moved in or out of.
    pub account_id: AccountId,
}

/// A saved expense or income.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// The ID of the transaction.
    pub id: TransactionId,
    pub amount: f64,
    pub kind: TransactionKind,
    pub category: String,
    pub description: String,
    pub date: Date,
    pub account_id: AccountId,
}

/// Selects transactions by one of the indexed columns.
#[derive(Debug, Clone, PartialEq)]
pub enum TransactionFilter {
    Kind(TransactionKind),
    /// An exact category label.
    Category(String),
    /// Transactions dated between `from` and `to`, inclusive.
    DateRange { from: Date, to: Date },
    Account(AccountId),
}

// ============================================================================
// DATABASE FUNCTIONS
// ============================================================================

/// The SQL expression for the balance effect of a transaction row, see
/// [TransactionKind::balance_effect].
const BALANCE_EFFECT: &str = "CASE type WHEN 'income' THEN ABS(amount) ELSE -ABS(amount) END";

const SELECT_TRANSACTION: &str =
    "SELECT id, amount, type, category, description, date, account_id FROM transactions";

/// Create the transaction table and its indexes.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL error.
pub fn create_transaction_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute_batch(
        "CREATE TABLE IF NOT EXISTS transactions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            amount REAL NOT NULL,
            type TEXT NOT NULL CHECK (type IN ('expense', 'income')),
            category TEXT NOT NULL,
            description TEXT NOT NULL,
            date TEXT NOT NULL,
            account_id INTEGER NOT NULL,
            FOREIGN KEY(account_id) REFERENCES accounts(id) ON UPDATE CASCADE ON DELETE RESTRICT
        );
        CREATE INDEX IF NOT EXISTS idx_transactions_type ON transactions(type);
        CREATE INDEX IF NOT EXISTS idx_transactions_category ON transactions(category);
        CREATE INDEX IF NOT EXISTS idx_transactions_date ON transactions(date);
        CREATE INDEX IF NOT EXISTS idx_transactions_account_id ON transactions(account_id);",
    )
}

/// Map a database row to a Transaction.
pub fn map_transaction_row(row: &Row) -> Result<Transaction, rusqlite::Error> {
    Ok(Transaction {
        id: row.get(0)?,
        amount: row.get(1)?,
        kind: row.get(2)?,
        category: row.get(3)?,
        description: row.get(4)?,
        date: row.get(5)?,
        account_id: row.get(6)?,
    })
}

fn validate_category(category: &str) -> Result<&str, Error> {
    let category = category.trim();

    if category.is_empty() {
        Err(Error::EmptyCategory)
    } else {
        Ok(category)
    }
}

fn map_foreign_key_error(error: rusqlite::Error, account_id: AccountId) -> Error {
    match error {
        rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error {
                code: _,
                extended_code: SQLITE_CONSTRAINT_FOREIGNKEY,
            },
            _,
        ) => Error::InvalidAccount(account_id),
        error => error.into(),
    }
}

/// Save `new_transaction` and apply its balance effect to its account.
///
/// The row and the balance change are written in one SQL transaction.
///
/// # Errors
/// This function will return a:
/// - [Error::EmptyCategory] if the category is empty or only whitespace,
/// - or [Error::InvalidAmount] if the amount is not a finite number,
/// - or [Error::InvalidAccount] if the account does not exist,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn create_transaction(
    new_transaction: &NewTransaction,
    connection: &Connection,
) -> Result<Transaction, Error> {
    let category = validate_category(&new_transaction.category)?;
    validate_amount(new_transaction.amount)?;
    let sql_transaction = connection.unchecked_transaction()?;

    let transaction = sql_transaction
        .prepare(
            "INSERT INTO transactions (amount, type, category, description, date, account_id)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             RETURNING id, amount, type, category, description, date, account_id",
        )?
        .query_row(
            params![
                new_transaction.amount,
                new_transaction.kind,
                category,
                new_transaction.description,
                new_transaction.date,
                new_transaction.account_id,
            ],
            map_transaction_row,
        )
        .map_err(|error| map_foreign_key_error(error, new_transaction.account_id))?;

    adjust_account_balance(
        transaction.account_id,
        transaction.kind.balance_effect(transaction.amount),
        &sql_transaction,
    )?;

    sql_transaction.commit()?;

    Ok(transaction)
}

/// Retrieve a transaction from the database by its `id`.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if `id` does not refer to a valid transaction,
/// - or [Error::SqlError] there is some other SQL error.
pub fn get_transaction(id: TransactionId, connection: &Connection) -> Result<Transaction, Error> {
    let transaction = connection
        .prepare(&format!("{SELECT_TRANSACTION} WHERE id = :id"))?
        .query_one(&[(":id", &id)], map_transaction_row)?;

    Ok(transaction)
}

fn select_transactions(
    condition: &str,
    parameters: &[&dyn ToSql],
    limit: Option<u32>,
    connection: &Connection,
) -> Result<Vec<Transaction>, Error> {
    let limit = limit
        .map(|limit| format!(" LIMIT {limit}"))
        .unwrap_or_default();

    connection
        .prepare(&format!(
            "{SELECT_TRANSACTION} WHERE {condition} ORDER BY date DESC, id DESC{limit}"
        ))?
        .query_map(parameters, map_transaction_row)?
        .map(|maybe_transaction| maybe_transaction.map_err(Error::from))
        .collect()
}

/// Retrieve the transactions matching `filter`, newest first.
///
/// # Errors
/// This function will return a [Error::SqlError] there is some SQL error.
pub fn query_transactions(
    filter: &TransactionFilter,
    connection: &Connection,
) -> Result<Vec<Transaction>, Error> {
    match filter {
        TransactionFilter::Kind(kind) => select_transactions("type = ?1", &[kind], None, connection),
        TransactionFilter::Category(category) => {
            select_transactions("category = ?1", &[&category.trim()], None, connection)
        }
        TransactionFilter::DateRange { from, to } => {
            select_transactions("date BETWEEN ?1 AND ?2", &[from, to], None, connection)
        }
        TransactionFilter::Account(account_id) => {
            select_transactions("account_id = ?1", &[account_id], None, connection)
        }
    }
}

/// Retrieve every transaction, newest first.
///
/// # Errors
/// This function will return a [Error::SqlError] there is some SQL error.
pub fn get_all_transactions(connection: &Connection) -> Result<Vec<Transaction>, Error> {
    select_transactions("1 = 1", &[], None, connection)
}

/// Retrieve up to `limit` of the newest transactions, optionally only those of `kind`.
///
/// # Errors
/// This function will return a [Error::SqlError] there is some SQL error.
pub fn get_recent_transactions(
    kind: Option<TransactionKind>,
    limit: u32,
    connection: &Connection,
) -> Result<Vec<Transaction>, Error> {
    match kind {
        Some(kind) => select_transactions("type = ?1", &[&kind], Some(limit), connection),
        None => select_transactions("1 = 1", &[], Some(limit), connection),
    }
}

/// Replace the transaction with `id` by `new_transaction`.
///
/// The balance effect of the old values is reverted and the effect of the
/// new values applied, so moving a transaction to another account updates
/// both accounts.
///
/// # Errors
/// This function will return a:
/// - [Error::EmptyCategory] if the category is empty or only whitespace,
/// - or [Error::InvalidAmount] if the amount is not a finite number,
/// - or [Error::UpdateMissingTransaction] if there is no transaction with `id`,
/// - or [Error::InvalidAccount] if the new account does not exist,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn update_transaction(
    id: TransactionId,
    new_transaction: &NewTransaction,
    connection: &Connection,
) -> Result<Transaction, Error> {
    let category = validate_category(&new_transaction.category)?;
    validate_amount(new_transaction.amount)?;
    let sql_transaction = connection.unchecked_transaction()?;

    let old = match get_transaction(id, &sql_transaction) {
        Ok(old) => old,
        Err(Error::NotFound) => return Err(Error::UpdateMissingTransaction),
        Err(error) => return Err(error),
    };

    let updated = sql_transaction
        .prepare(
            "UPDATE transactions
             SET amount = ?1, type = ?2, category = ?3, description = ?4, date = ?5, account_id = ?6
             WHERE id = ?7
             RETURNING id, amount, type, category, description, date, account_id",
        )?
        .query_row(
            params![
                new_transaction.amount,
                new_transaction.kind,
                category,
                new_transaction.description,
                new_transaction.date,
                new_transaction.account_id,
                id,
            ],
            map_transaction_row,
        )
        .map_err(|error| map_foreign_key_error(error, new_transaction.account_id))?;

    adjust_account_balance(
        old.account_id,
        -old.kind.balance_effect(old.amount),
        &sql_transaction,
    )?;
    adjust_account_balance(
        updated.account_id,
        updated.kind.balance_effect(updated.amount),
        &sql_transaction,
    )?;

    sql_transaction.commit()?;

    Ok(updated)
}

/// Delete the transaction with `id` and revert its balance effect.
///
/// # Errors
/// This function will return a:
/// - [Error::DeleteMissingTransaction] if there is no transaction with `id`,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn delete_transaction(id: TransactionId, connection: &Connection) -> Result<(), Error> {
    let sql_transaction = connection.unchecked_transaction()?;

    let deleted = sql_transaction
        .prepare(
            "DELETE FROM transactions WHERE id = :id
             RETURNING id, amount, type, category, description, date, account_id",
        )?
        .query_one(&[(":id", &id)], map_transaction_row)
        .map_err(|error| match error {
            rusqlite::Error::QueryReturnedNoRows => Error::DeleteMissingTransaction,
            error => error.into(),
        })?;

    adjust_account_balance(
        deleted.account_id,
        -deleted.kind.balance_effect(deleted.amount),
        &sql_transaction,
    )?;

    sql_transaction.commit()?;

    Ok(())
}

/// The sum of the balance effects of every transaction in the account with `account_id`.
///
/// # Errors
/// This function will return a [Error::SqlError] there is some SQL error.
pub(crate) fn sum_balance_effects(
    account_id: AccountId,
    connection: &Connection,
) -> Result<f64, Error> {
    connection
        .query_row(
            &format!("SELECT COALESCE(SUM({BALANCE_EFFECT}), 0) FROM transactions WHERE account_id = ?1"),
            [account_id],
            |row| row.get(0),
        )
        .map_err(Error::from)
}

/// The distinct categories in use, alphabetically.
///
/// # Errors
/// This function will return a [Error::SqlError] there is some SQL error.
pub fn get_categories(connection: &Connection) -> Result<Vec<String>, Error> {
    connection
        .prepare("SELECT DISTINCT category FROM transactions ORDER BY category ASC")?
        .query_map([], |row| row.get(0))?
        .map(|maybe_category| maybe_category.map_err(Error::from))
        .collect()
}

// ============================================================================
// TESTS
// ============================================================================


#[cfg(test)]
mod database_tests {
    use rusqlite::Connection;
    use time::macros::date;

    use crate::{
        Error,
        account::{Account, AccountKind, NewAccount, create_account, get_account},
        test_utils::get_test_connection,
    };

    use super::{
        NewTransaction, Transaction, TransactionFilter, TransactionKind, create_transaction,
        delete_transaction, get_categories, get_recent_transactions, get_transaction,
        query_transactions, update_transaction,
    };

    #[track_caller]
    fn must_create_account(name: &str, balance: f64, connection: &Connection) -> Account {
        create_account(
            &NewAccount {
                name: name.to_owned(),
                kind: AccountKind::Bank,
                balance,
            },
            connection,
        )
        .expect("could not create test account")
    }

    fn new_transaction(
        amount: f64,
        kind: TransactionKind,
        category: &str,
        account_id: i64,
    ) -> NewTransaction {
        NewTransaction {
            amount,
            kind,
            category: category.to_owned(),
            description: String::new(),
            date: date!(2025 - 03 - 10),
            account_id,
        }
    }

    #[test]
    fn create_rejects_non_finite_amounts() {
        let conn = get_test_connection();
        let checking = must_create_account("Checking", 0.0, &conn);

        for amount in [f64::INFINITY, f64::NEG_INFINITY, f64::NAN] {
            let result = create_transaction(
                &new_transaction(amount, TransactionKind::Expense, "food", checking.id),
                &conn,
            );

            assert!(
                matches!(result, Err(Error::InvalidAmount(_))),
                "want InvalidAmount for {amount}, got {result:?}"
            );
        }
        assert_eq!(get_account(checking.id, &conn).unwrap().balance, 0.0);

        create_transaction(
            &new_transaction(10.0, TransactionKind::Income, "salary", checking.id),
            &conn,
        )
        .unwrap();
        assert_eq!(get_account(checking.id, &conn).unwrap().balance, 10.0);
    }

    #[test]
    fn update_rejects_non_finite_amounts() {
        let conn = get_test_connection();
        let checking = must_create_account("Checking", 0.0, &conn);
        let created = create_transaction(
            &new_transaction(5.0, TransactionKind::Expense, "food", checking.id),
            &conn,
        )
        .unwrap();

        let result = update_transaction(
            created.id,
            &new_transaction(f64::INFINITY, TransactionKind::Expense, "food", checking.id),
            &conn,
        );

        assert!(matches!(result, Err(Error::InvalidAmount(_))));
        assert_eq!(get_transaction(created.id, &conn), Ok(created));
        assert_eq!(get_account(checking.id, &conn).unwrap().balance, -5.0);
    }

    #[test]
    fn create_and_query_by_account() {
        let conn = get_test_connection();
        let checking = must_create_account("Checking", 0.0, &conn);

        let created = create_transaction(
            &new_transaction(42.0, TransactionKind::Expense, "food", checking.id),
            &conn,
        )
        .unwrap();

        let got = query_transactions(&TransactionFilter::Account(checking.id), &conn).unwrap();
        assert_eq!(got.len(), 1);
        assert_eq!(got[0], created);
        assert!(got[0].id > 0);
        assert_eq!(got[0].amount, 42.0);
        assert_eq!(got[0].kind, TransactionKind::Expense);
        assert_eq!(got[0].category, "food");
        assert_eq!(got[0].account_id, checking.id);
    }

    #[test]
    fn create_then_get_by_id_returns_input_with_id() {
        let conn = get_test_connection();
        let account = must_create_account("Checking", 0.0, &conn);
        let input = NewTransaction {
            description: "Weekly shop".to_owned(),
            ..new_transaction(12.3, TransactionKind::Expense, "groceries", account.id)
        };

        let created = create_transaction(&input, &conn).unwrap();

        let want = Transaction {
            id: created.id,
            amount: input.amount,
            kind: input.kind,
            category: input.category,
            description: input.description,
            date: input.date,
            account_id: input.account_id,
        };
        assert_eq!(get_transaction(created.id, &conn), Ok(want));
    }

    #[test]
    fn create_fails_on_invalid_account() {
        let conn = get_test_connection();

        let result = create_transaction(
            &new_transaction(1.0, TransactionKind::Expense, "food", 404),
            &conn,
        );

        assert_eq!(result, Err(Error::InvalidAccount(404)));
        assert_eq!(get_transaction(1, &conn), Err(Error::NotFound));
    }

    #[test]
    fn create_fails_on_empty_category() {
        let conn = get_test_connection();
        let account = must_create_account("Checking", 0.0, &conn);

        let result = create_transaction(
            &new_transaction(1.0, TransactionKind::Expense, "  ", account.id),
            &conn,
        );

        assert_eq!(result, Err(Error::EmptyCategory));
    }

    #[test]
    fn ids_increase_and_are_not_reused_after_delete() {
        let conn = get_test_connection();
        let account = must_create_account("Checking", 0.0, &conn);
        let new = new_transaction(1.0, TransactionKind::Expense, "food", account.id);

        let first = create_transaction(&new, &conn).unwrap();
        let second = create_transaction(&new, &conn).unwrap();
        delete_transaction(second.id, &conn).unwrap();
        let third = create_transaction(&new, &conn).unwrap();

        assert!(first.id < second.id);
        assert!(second.id < third.id);
    }

    #[test]
    fn query_by_kind_category_and_date() {
        let conn = get_test_connection();
        let account = must_create_account("Checking", 0.0, &conn);
        let food = create_transaction(
            &new_transaction(5.0, TransactionKind::Expense, "food", account.id),
            &conn,
        )
        .unwrap();
        let salary = create_transaction(
            &NewTransaction {
                date: date!(2025 - 04 - 01),
                ..new_transaction(100.0, TransactionKind::Income, "salary", account.id)
            },
            &conn,
        )
        .unwrap();

        assert_eq!(
            query_transactions(&TransactionFilter::Kind(TransactionKind::Income), &conn),
            Ok(vec![salary.clone()])
        );
        assert_eq!(
            query_transactions(&TransactionFilter::Category("food".to_owned()), &conn),
            Ok(vec![food.clone()])
        );
        assert_eq!(
            query_transactions(
                &TransactionFilter::DateRange {
                    from: date!(2025 - 03 - 01),
                    to: date!(2025 - 03 - 31),
                },
                &conn
            ),
            Ok(vec![food])
        );
        assert_eq!(
            query_transactions(
                &TransactionFilter::DateRange {
                    from: date!(2025 - 04 - 01),
                    to: date!(2025 - 04 - 01),
                },
                &conn
            ),
            Ok(vec![salary])
        );
    }

    #[test]
    fn recent_transactions_are_newest_first_and_limited() {
        let conn = get_test_connection();
        let account = must_create_account("Checking", 0.0, &conn);
        for day in 1..=5 {
            create_transaction(
                &NewTransaction {
                    date: time::Date::from_calendar_date(2025, time::Month::May, day).unwrap(),
                    ..new_transaction(1.0, TransactionKind::Expense, "food", account.id)
                },
                &conn,
            )
            .unwrap();
        }
        create_transaction(
            &new_transaction(1.0, TransactionKind::Income, "gift", account.id),
            &conn,
        )
        .unwrap();

        let got = get_recent_transactions(Some(TransactionKind::Expense), 3, &conn).unwrap();

        let days: Vec<u8> = got.iter().map(|transaction| transaction.date.day()).collect();
        assert_eq!(days, [5, 4, 3]);
    }

    #[test]
    fn balance_follows_create_update_and_delete() {
        let conn = get_test_connection();
        let account = must_create_account("Checking", 100.0, &conn);

        let expense = create_transaction(
            &new_transaction(42.0, TransactionKind::Expense, "food", account.id),
            &conn,
        )
        .unwrap();
        assert_eq!(get_account(account.id, &conn).unwrap().balance, 58.0);

        update_transaction(
            expense.id,
            &new_transaction(50.0, TransactionKind::Income, "refund", account.id),
            &conn,
        )
        .unwrap();
        assert_eq!(get_account(account.id, &conn).unwrap().balance, 150.0);

        delete_transaction(expense.id, &conn).unwrap();
        assert_eq!(get_account(account.id, &conn).unwrap().balance, 100.0);
    }

    #[test]
    fn moving_transaction_updates_both_accounts() {
        let conn = get_test_connection();
        let from = must_create_account("From", 0.0, &conn);
        let to = must_create_account("To", 0.0, &conn);
        let transaction = create_transaction(
            &new_transaction(10.0, TransactionKind::Expense, "food", from.id),
            &conn,
        )
        .unwrap();

        update_transaction(
            transaction.id,
            &new_transaction(10.0, TransactionKind::Expense, "food", to.id),
            &conn,
        )
        .unwrap();

        assert_eq!(get_account(from.id, &conn).unwrap().balance, 0.0);
        assert_eq!(get_account(to.id, &conn).unwrap().balance, -10.0);
    }

    #[test]
    fn update_to_invalid_account_changes_nothing() {
        let conn = get_test_connection();
        let account = must_create_account("Checking", 0.0, &conn);
        let transaction = create_transaction(
            &new_transaction(10.0, TransactionKind::Expense, "food", account.id),
            &conn,
        )
        .unwrap();

        let result = update_transaction(
            transaction.id,
            &new_transaction(10.0, TransactionKind::Expense, "food", 999),
            &conn,
        );

        assert_eq!(result, Err(Error::InvalidAccount(999)));
        assert_eq!(get_transaction(transaction.id, &conn), Ok(transaction));
        assert_eq!(get_account(account.id, &conn).unwrap().balance, -10.0);
    }

    #[test]
    fn update_missing_transaction_fails() {
        let conn = get_test_connection();
        let account = must_create_account("Checking", 0.0, &conn);

        let result = update_transaction(
            1,
            &new_transaction(10.0, TransactionKind::Expense, "food", account.id),
            &conn,
        );

        assert_eq!(result, Err(Error::UpdateMissingTransaction));
    }

    #[test]
    fn delete_missing_transaction_fails() {
        let conn = get_test_connection();

        assert_eq!(delete_transaction(1, &conn), Err(Error::DeleteMissingTransaction));
    }

    #[test]
    fn categories_are_distinct_and_sorted() {
        let conn = get_test_connection();
        let account = must_create_account("Checking", 0.0, &conn);
        for category in ["rent", "food", "rent"] {
            create_transaction(
                &new_transaction(1.0, TransactionKind::Expense, category, account.id),
                &conn,
            )
            .unwrap();
        }

        assert_eq!(
            get_categories(&conn),
            Ok(vec!["food".to_owned(), "rent".to_owned()])
        );
    }
}
