//! Creates the tables for the application's domain models.

use rusqlite::Connection;

use crate::{
    Error, auth::create_user_table, expense::create_expense_table,
    preferences::create_preference_table,
};

/// Create all the tables needed by the application.
///
/// Safe to call on an existing database, tables that already exist are left untouched.
///
/// # Errors
/// Returns an error if a table cannot be created or if there is an SQL error.
pub fn initialize(connection: &Connection) -> Result<(), Error> {
    connection.execute_batch("PRAGMA foreign_keys = ON;")?;

    let transaction = connection.unchecked_transaction()?;

    create_user_table(&transaction)?;
    create_expense_table(&transaction)?;
    create_preference_table(&transaction)?;

    transaction.commit()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use rusqlite::Connection;

    use super::initialize;

    #[test]
    fn initialize_creates_tables() {
        let connection = Connection::open_in_memory().unwrap();

        initialize(&connection).unwrap();

        let mut tables = connection
            .prepare("SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get::<_, String>(0))
            .unwrap()
            .collect::<Result<Vec<_>, _>>()
            .unwrap();
        tables.retain(|name| name != "sqlite_sequence");

        assert_eq!(tables, vec!["expense", "preference", "user"]);
    }

    #[test]
    fn initialize_is_idempotent() {
        let connection = Connection::open_in_memory().unwrap();

        initialize(&connection).unwrap();

        assert!(initialize(&connection).is_ok());
    }
}
