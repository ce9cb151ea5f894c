//! Code for creating the user table and fetching users from the database.

use std::{fmt::Display, str::FromStr};

use rusqlite::{
    Connection,
    types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef},
};
use serde::{Deserialize, Serialize};

use crate::{Error, PasswordHash};

/// A newtype wrapper for integer user IDs.
///
/// This helps disambiguate user IDs from other types of IDs, leading to better compile time
/// errors.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Hash)]
pub struct UserID(i64);

impl UserID {
    /// Create a new user ID.
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    /// Cast the user ID to a 64 bit integer.
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl Display for UserID {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// The subscription level of a user, which decides whether premium features
/// are unlocked.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionTier {
    /// The default tier for a registered user.
    #[default]
    Free,
    /// Unlocks features that require the premium access level.
    Premium,
}

impl SubscriptionTier {
    /// The string stored in the database for this tier.
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionTier::Free => "free",
            SubscriptionTier::Premium => "premium",
        }
    }
}

impl Display for SubscriptionTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SubscriptionTier {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "free" => Ok(SubscriptionTier::Free),
            "premium" => Ok(SubscriptionTier::Premium),
            other => Err(Error::InvalidTier(other.to_owned())),
        }
    }
}

impl ToSql for SubscriptionTier {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for SubscriptionTier {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|error: Error| FromSqlError::Other(Box::new(error)))
    }
}

/// A user of the application.
///
/// The caller should ensure that `id` is unique.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// The user's ID in the application database.
    pub id: UserID,
    /// The user's password hash.
    pub password_hash: PasswordHash,
    /// The user's subscription tier.
    pub tier: SubscriptionTier,
}

/// Create the user table.
///
/// # Errors
///
/// This function will return an error if the SQL query failed.
pub fn create_user_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS user (
                id INTEGER PRIMARY KEY,
                password TEXT NOT NULL,
                tier TEXT NOT NULL DEFAULT 'free' CHECK (tier IN ('free', 'premium'))
                )",
        (),
    )?;

    Ok(())
}

/// Create and insert a new user on the free tier into the database.
///
/// # Errors
///
/// Returns a [Error::SqlError] if an SQL related error occurred.
pub fn create_user(password_hash: PasswordHash, connection: &Connection) -> Result<User, Error> {
    connection.execute(
        "INSERT INTO user (password, tier) VALUES (?1, ?2)",
        (password_hash.as_ref(), SubscriptionTier::Free),
    )?;

    let id = UserID::new(connection.last_insert_rowid());

    Ok(User {
        id,
        password_hash,
        tier: SubscriptionTier::Free,
    })
}

/// Get the user from the database with an ID equal to `user_id`.
///
/// # Errors
///
/// This function will return an error if:
/// - `user_id` does not belong to a registered user.
/// - there was an error trying to access the store.
pub fn get_user_by_id(user_id: UserID, connection: &Connection) -> Result<User, Error> {
    connection
        .prepare("SELECT id, password, tier FROM user WHERE id = :id")?
        .query_row(&[(":id", &user_id.as_i64())], |row| {
            let raw_password_hash: String = row.get(1)?;

            Ok(User {
                id: UserID::new(row.get(0)?),
                password_hash: PasswordHash::new_unchecked(&raw_password_hash),
                tier: row.get(2)?,
            })
        })
        .map_err(Error::from)
}

/// Get the number of registered users.
///
/// # Errors
///
/// Returns a [Error::SqlError] if an SQL related error occurred.
pub fn count_users(connection: &Connection) -> Result<usize, Error> {
    let count: i64 = connection.query_row("SELECT COUNT(id) FROM user", [], |row| row.get(0))?;

    usize::try_from(count)
        .map_err(|_| Error::SqlError(rusqlite::Error::IntegralValueOutOfRange(0, count)))
}

/// Change the subscription tier of the user with `user_id`.
///
/// # Errors
///
/// Returns [Error::NotFound] if there is no user with `user_id`.
pub fn set_user_tier(
    user_id: UserID,
    tier: SubscriptionTier,
    connection: &Connection,
) -> Result<(), Error> {
    let rows_affected = connection.execute(
        "UPDATE user SET tier = ?1 WHERE id = ?2",
        (tier, user_id.as_i64()),
    )?;

    if rows_affected == 0 {
        return Err(Error::NotFound);
    }

    Ok(())
}

#[cfg(test)]
mod user_tests {
    use rusqlite::Connection;

    use crate::{Error, PasswordHash, ValidatedPassword};

    use super::{
        SubscriptionTier, UserID, count_users, create_user, create_user_table, get_user_by_id,
        set_user_tier,
    };

    fn get_test_connection() -> Connection {
        let connection = Connection::open_in_memory().unwrap();
        create_user_table(&connection).unwrap();
        connection
    }

    fn test_password_hash() -> PasswordHash {
        PasswordHash::new(ValidatedPassword::new_unchecked("test"), 4).unwrap()
    }

    #[test]
    fn create_user_starts_on_free_tier() {
        let connection = get_test_connection();

        let user = create_user(test_password_hash(), &connection).unwrap();

        assert_eq!(user.tier, SubscriptionTier::Free);
        assert_eq!(get_user_by_id(user.id, &connection), Ok(user));
    }

    #[test]
    fn get_missing_user_returns_not_found() {
        let connection = get_test_connection();

        assert_eq!(
            get_user_by_id(UserID::new(42), &connection),
            Err(Error::NotFound)
        );
    }

    #[test]
    fn count_users_counts_created_users() {
        let connection = get_test_connection();
        assert_eq!(count_users(&connection), Ok(0));

        create_user(test_password_hash(), &connection).unwrap();

        assert_eq!(count_users(&connection), Ok(1));
    }

    #[test]
    fn set_user_tier_updates_tier() {
        let connection = get_test_connection();
        let user = create_user(test_password_hash(), &connection).unwrap();

        set_user_tier(user.id, SubscriptionTier::Premium, &connection).unwrap();

        let got = get_user_by_id(user.id, &connection).unwrap();
        assert_eq!(got.tier, SubscriptionTier::Premium);
    }

    #[test]
    fn set_user_tier_fails_for_missing_user() {
        let connection = get_test_connection();

        assert_eq!(
            set_user_tier(UserID::new(7), SubscriptionTier::Premium, &connection),
            Err(Error::NotFound)
        );
    }

    #[test]
    fn tier_parses_from_database_strings() {
        assert_eq!("free".parse::<SubscriptionTier>(), Ok(SubscriptionTier::Free));
        assert_eq!(
            "premium".parse::<SubscriptionTier>(),
            Ok(SubscriptionTier::Premium)
        );
        assert_eq!(
            "gold".parse::<SubscriptionTier>(),
            Err(Error::InvalidTier("gold".to_owned()))
        );
    }
}
