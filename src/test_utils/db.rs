use rusqlite::Connection;

use crate::{
    AppState,
    auth::{PasswordHash, UserID, ValidatedPassword, create_user},
};

/// The password of every user created by [insert_test_user].
pub(crate) const TEST_PASSWORD: &str = "averysecuretestpassword1";

/// Register a user with [TEST_PASSWORD] and return their ID.
///
/// Uses the lowest bcrypt cost so tests stay fast.
#[track_caller]
pub(crate) fn insert_test_user(connection: &Connection, email: &str) -> UserID {
    let password_hash = PasswordHash::new(ValidatedPassword::new_unchecked(TEST_PASSWORD), 4)
        .expect("Could not hash test password");

    create_user(email, password_hash, connection)
        .expect("Could not create test user")
        .id
}

/// An [AppState] over a fresh in-memory database in the UTC timezone.
#[track_caller]
pub(crate) fn get_test_app_state() -> AppState {
    let connection =
        Connection::open_in_memory().expect("Could not open in-memory SQLite database");

    AppState::new(connection, "foobar", "Etc/UTC").expect("Could not create app state")
}
