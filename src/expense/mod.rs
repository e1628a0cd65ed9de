//! Expense records and the store that keeps each user's collection.
//!
//! This module contains:
//! - The `Expense` model and its `Category`
//! - Database functions for storing and querying a user's expenses
//! - The `ExpenseStore` trait with live subscriptions to a user's collection

mod core;
mod store;
mod subscription;

pub use core::{Category, DATE_FORMAT, Expense, NewExpense, create_expense_table};
pub use store::{ExpenseStore, SQLiteExpenseStore};
pub use subscription::{ExpenseSubscription, Snapshot};
