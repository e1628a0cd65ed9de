//! The expense store: CRUD against a user's collection plus live snapshots.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use rusqlite::Connection;
use tokio::sync::watch;

use crate::{
    Error,
    auth::UserID,
    database_id::ExpenseId,
    expense::{
        Expense, NewExpense,
        core::{delete_expense, get_expenses, insert_expense},
        subscription::{Channels, ExpenseSubscription, Registration, Snapshot},
    },
};

/// Handles the creation, deletion and observation of a user's expenses.
///
/// Every operation is scoped to one user, no user can see or change another
/// user's collection.
pub trait ExpenseStore {
    /// Open a live subscription to `user_id`'s collection.
    ///
    /// The subscription yields the current snapshot first and then a new
    /// snapshot after every change, including changes made through this store.
    fn subscribe(&self, user_id: UserID) -> Result<ExpenseSubscription, Error>;

    /// Add `expense` to `user_id`'s collection and return it with its new ID.
    fn create(&self, user_id: UserID, expense: NewExpense) -> Result<Expense, Error>;

    /// Remove the expense `id` from `user_id`'s collection.
    ///
    /// # Errors
    /// Returns [Error::DeleteMissingExpense] if the collection has no expense `id`.
    fn delete(&self, user_id: UserID, id: ExpenseId) -> Result<(), Error>;
}

/// An [ExpenseStore] backed by SQLite that publishes snapshots over watch channels.
#[derive(Debug, Clone)]
pub struct SQLiteExpenseStore {
    connection: Arc<Mutex<Connection>>,
    channels: Channels,
}

impl SQLiteExpenseStore {
    /// Create a store that reads and writes through `connection`.
    ///
    /// The expense table must already exist.
    pub fn new(connection: Arc<Mutex<Connection>>) -> Self {
        Self {
            connection,
            channels: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// The number of open subscriptions to `user_id`'s collection.
    pub fn subscriber_count(&self, user_id: UserID) -> usize {
        self.channels
            .lock()
            .map(|channels| {
                channels
                    .get(&user_id)
                    .map_or(0, |sender| sender.receiver_count())
            })
            .unwrap_or(0)
    }

    fn load_snapshot(&self, user_id: UserID) -> Result<Snapshot, Error> {
        let connection = self
            .connection
            .lock()
            .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
            .map_err(|_| Error::DatabaseLockError)?;

        let expenses = get_expenses(user_id, &connection)?;

        Ok(expenses.into())
    }

    /// Push a fresh snapshot to `user_id`'s subscribers, if there are any.
    fn publish(&self, user_id: UserID) {
        let channels = match self.channels.lock() {
            Ok(channels) => channels,
            Err(error) => {
                tracing::error!("could not acquire subscription lock: {error}");
                return;
            }
        };

        let Some(sender) = channels.get(&user_id) else {
            return;
        };

        match self.load_snapshot(user_id) {
            Ok(snapshot) => {
                sender.send_replace(snapshot);
            }
            Err(error) => {
                tracing::error!("could not load users/{user_id}/expenses for subscribers: {error}")
            }
        }
    }
}

impl ExpenseStore for SQLiteExpenseStore {
    fn subscribe(&self, user_id: UserID) -> Result<ExpenseSubscription, Error> {
        let mut channels = self
            .channels
            .lock()
            .inspect_err(|error| tracing::error!("could not acquire subscription lock: {error}"))
            .map_err(|_| Error::DatabaseLockError)?;

        let receiver = match channels.get(&user_id) {
            Some(sender) => sender.subscribe(),
            None => {
                let (sender, receiver) = watch::channel(self.load_snapshot(user_id)?);
                channels.insert(user_id, sender);
                tracing::debug!("opened live subscription to users/{user_id}/expenses");
                receiver
            }
        };

        Ok(ExpenseSubscription::new(
            receiver,
            Registration::new(user_id, self.channels.clone()),
        ))
    }

    fn create(&self, user_id: UserID, expense: NewExpense) -> Result<Expense, Error> {
        let expense = {
            let connection = self
                .connection
                .lock()
                .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
                .map_err(|_| Error::DatabaseLockError)?;

            insert_expense(user_id, expense, &connection)?
        };

        tracing::debug!("added expense {} to users/{user_id}/expenses", expense.id);
        self.publish(user_id);

        Ok(expense)
    }

    fn delete(&self, user_id: UserID, id: ExpenseId) -> Result<(), Error> {
        let rows_affected = {
            let connection = self
                .connection
                .lock()
                .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
                .map_err(|_| Error::DatabaseLockError)?;

            delete_expense(user_id, id, &connection)?
        };

        if rows_affected == 0 {
            return Err(Error::DeleteMissingExpense);
        }

        tracing::debug!("deleted expense {id} from users/{user_id}/expenses");
        self.publish(user_id);

        Ok(())
    }
}
