use rusqlite::Connection;

use crate::{
    account::{Account, AccountKind, NewAccount, create_account},
    db::initialize,
};

/// An initialised in-memory database.
#[track_caller]
pub(crate) fn get_test_connection() -> Connection {
    let connection = Connection::open_in_memory().expect("Could not open in-memory database");
    initialize(&connection).expect("Could not initialize test database");
    connection
}

#[track_caller]
pub(crate) fn must_create_account(
    name: &str,
    kind: AccountKind,
    balance: f64,
    connection: &Connection,
) -> Account {
    create_account(
        &NewAccount {
            name: name.to_owned(),
            kind,
            balance,
        },
        connection,
    )
    .expect("Could not create test account")
}
