//! Defines the expense model and the database queries behind the expense store.

use std::{fmt::Display, str::FromStr};

use rusqlite::{Connection, Row, types::Value};
use serde::{Deserialize, Serialize};
use time::{Date, format_description::BorrowedFormatItem, macros::format_description};

use crate::{auth::UserID, database_id::ExpenseId};

/// The format dates are stored and displayed in, e.g. "2024-01-05".
pub const DATE_FORMAT: &[BorrowedFormatItem] =
    format_description!("[year]-[month repr:numerical padding:zero]-[day padding:zero]");

// ============================================================================
// MODELS
// ============================================================================

/// What an expense was spent on.
///
/// The declaration order is the order the categories are offered in the
/// add-expense form.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    /// Groceries, eating out and snacks.
    #[default]
    Food,
    /// Fares, fuel and trips.
    Travel,
    /// Clothes, gadgets and other purchases.
    Shopping,
    /// Rent, utilities and subscriptions.
    Bills,
    /// Medicine and doctor visits.
    Health,
    /// Movies, games and outings.
    Entertainment,
    /// Anything else.
    Other,
}

impl Category {
    /// Every category, in form order.
    pub const ALL: [Category; 7] = [
        Category::Food,
        Category::Travel,
        Category::Shopping,
        Category::Bills,
        Category::Health,
        Category::Entertainment,
        Category::Other,
    ];

    /// The category's display name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Food => "Food",
            Category::Travel => "Travel",
            Category::Shopping => "Shopping",
            Category::Bills => "Bills",
            Category::Health => "Health",
            Category::Entertainment => "Entertainment",
            Category::Other => "Other",
        }
    }
}

impl Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The text was not one of the known category names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownCategory(pub String);

impl FromStr for Category {
    type Err = UnknownCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .into_iter()
            .find(|category| category.as_str() == s)
            .ok_or_else(|| UnknownCategory(s.to_owned()))
    }
}

/// A single expense recorded by a user.
///
/// `date` is `None` when the stored date is missing or malformed.
#[derive(Debug, Clone, PartialEq)]
pub struct Expense {
    /// The ID the store assigned to the expense.
    pub id: ExpenseId,
    /// How much was spent.
    pub amount: f64,
    /// What the money was spent on.
    pub category: Category,
    /// When the money was spent.
    pub date: Option<Date>,
}

/// The fields needed to record a new expense, the store assigns the ID.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NewExpense {
    /// How much was spent.
    pub amount: f64,
    /// What the money was spent on.
    pub category: Category,
    /// When the money was spent.
    pub date: Date,
}

// ============================================================================
// DATABASE FUNCTIONS
// ============================================================================

/// Create the expense table in the database.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL error.
pub fn create_expense_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS expense (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL,
                amount REAL NOT NULL,
                category TEXT NOT NULL,
                date TEXT,
                FOREIGN KEY(user_id) REFERENCES user(id) ON UPDATE CASCADE ON DELETE CASCADE
                )",
        (),
    )?;

    connection.execute(
        "CREATE INDEX IF NOT EXISTS idx_expense_user ON expense(user_id);",
        (),
    )?;

    Ok(())
}

/// Insert `expense` into `user_id`'s collection.
pub(super) fn insert_expense(
    user_id: UserID,
    expense: NewExpense,
    connection: &Connection,
) -> Result<Expense, rusqlite::Error> {
    let date = expense
        .date
        .format(DATE_FORMAT)
        .map_err(|error| rusqlite::Error::ToSqlConversionFailure(Box::new(error)))?;

    connection.execute(
        "INSERT INTO expense (user_id, amount, category, date) VALUES (?1, ?2, ?3, ?4)",
        (user_id.as_i64(), expense.amount, expense.category.as_str(), date),
    )?;

    Ok(Expense {
        id: connection.last_insert_rowid(),
        amount: expense.amount,
        category: expense.category,
        date: Some(expense.date),
    })
}

/// Delete the expense `id` from `user_id`'s collection.
///
/// Returns the number of rows deleted, zero if the expense does not exist or
/// belongs to another user.
pub(super) fn delete_expense(
    user_id: UserID,
    id: ExpenseId,
    connection: &Connection,
) -> Result<usize, rusqlite::Error> {
    connection.execute(
        "DELETE FROM expense WHERE id = ?1 AND user_id = ?2",
        (id, user_id.as_i64()),
    )
}

/// Get every expense in `user_id`'s collection in insertion order.
pub(super) fn get_expenses(
    user_id: UserID,
    connection: &Connection,
) -> Result<Vec<Expense>, rusqlite::Error> {
    connection
        .prepare("SELECT id, amount, category, date FROM expense WHERE user_id = ?1 ORDER BY id")?
        .query_map([user_id.as_i64()], map_expense_row)?
        .collect()
}

/// Map a database row to an [Expense].
///
/// Rows written by older clients may hold text amounts or free-form dates, so
/// amounts that are not numbers become zero, unknown categories become
/// [Category::Other] and dates that do not parse become `None`.
fn map_expense_row(row: &Row) -> Result<Expense, rusqlite::Error> {
    let id = row.get(0)?;
    let amount = coerce_amount(row.get(1)?);
    let raw_category: String = row.get(2)?;
    let raw_date: Value = row.get(3)?;

    let category = raw_category.parse().unwrap_or_else(|UnknownCategory(name)| {
        tracing::warn!("expense {id} has unknown category {name:?}, using Other");
        Category::Other
    });
    let date = match raw_date {
        Value::Text(text) => Date::parse(text.trim(), DATE_FORMAT).ok(),
        _ => None,
    };

    Ok(Expense {
        id,
        amount,
        category,
        date,
    })
}

fn coerce_amount(value: Value) -> f64 {
    match value {
        Value::Real(amount) => amount,
        Value::Integer(amount) => amount as f64,
        Value::Text(text) => text.trim().parse().unwrap_or(0.0),
        Value::Null | Value::Blob(_) => 0.0,
    }
}

// ============================================================================
// TESTS
// ============================================================================
