//! Each user's dark mode preference.
//!
//! Every change is written to the database before it is announced, so open
//! pages and the database never disagree.

use std::sync::{Arc, Mutex};

use axum::{
    Extension,
    extract::{FromRef, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_htmx::HxRefresh;
use rusqlite::{Connection, OptionalExtension};
use tokio::sync::broadcast;
use tokio_stream::{
    Stream, StreamExt,
    wrappers::{BroadcastStream, errors::BroadcastStreamRecvError},
};

use crate::{AppState, Error, auth::UserID};

/// The key the dark mode flag is stored under.
const DARK_MODE_KEY: &str = "darkMode";

/// How many unread changes a slow subscriber may fall behind by.
const CHANGE_CAPACITY: usize = 64;

/// Create the preference table in the database.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL error.
pub fn create_preference_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS preference (
                user_id INTEGER NOT NULL,
                key TEXT NOT NULL,
                value TEXT NOT NULL,
                PRIMARY KEY(user_id, key),
                FOREIGN KEY(user_id) REFERENCES user(id) ON UPDATE CASCADE ON DELETE CASCADE
                )",
        (),
    )?;

    Ok(())
}

fn get_dark_mode(user_id: UserID, connection: &Connection) -> Result<bool, rusqlite::Error> {
    let value: Option<String> = connection
        .query_row(
            "SELECT value FROM preference WHERE user_id = ?1 AND key = ?2",
            (user_id.as_i64(), DARK_MODE_KEY),
            |row| row.get(0),
        )
        .optional()?;

    Ok(value.is_some_and(|value| value == "true"))
}

fn save_dark_mode(
    user_id: UserID,
    is_dark: bool,
    connection: &Connection,
) -> Result<(), rusqlite::Error> {
    connection.execute(
        "INSERT INTO preference (user_id, key, value) VALUES (?1, ?2, ?3)
            ON CONFLICT(user_id, key) DO UPDATE SET value = excluded.value",
        (
            user_id.as_i64(),
            DARK_MODE_KEY,
            if is_dark { "true" } else { "false" },
        ),
    )?;

    Ok(())
}

#[derive(Debug, Clone, Copy)]
struct ThemeChange {
    user_id: UserID,
    is_dark: bool,
}

/// The dark mode flag of every user, persisted in SQLite.
///
/// Changes are announced to the pages the user has open.
#[derive(Debug, Clone)]
pub struct ThemePreference {
    connection: Arc<Mutex<Connection>>,
    changes: broadcast::Sender<ThemeChange>,
}

impl ThemePreference {
    /// Create a preference store that reads and writes through `connection`.
    ///
    /// The preference table must already exist.
    pub fn new(connection: Arc<Mutex<Connection>>) -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CAPACITY);

        Self {
            connection,
            changes,
        }
    }

    /// Whether `user_id`'s pages should be rendered in dark mode.
    ///
    /// Users who never chose a theme get light mode.
    ///
    /// # Errors
    /// Returns an error if the database lock is poisoned or the query fails.
    pub fn is_dark(&self, user_id: UserID) -> Result<bool, Error> {
        let connection = self
            .connection
            .lock()
            .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
            .map_err(|_| Error::DatabaseLockError)?;

        Ok(get_dark_mode(user_id, &connection)?)
    }

    /// The values `user_id`'s preference changes to from now on.
    pub fn changes(&self, user_id: UserID) -> impl Stream<Item = bool> + Send + 'static + use<> {
        BroadcastStream::new(self.changes.subscribe()).filter_map(move |change| match change {
            Ok(change) if change.user_id == user_id => Some(change.is_dark),
            Ok(_) => None,
            Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                tracing::warn!("theme subscriber for user {user_id} missed {skipped} changes");
                None
            }
        })
    }

    /// Save `user_id`'s preference and announce it.
    ///
    /// # Errors
    /// Returns [Error::PreferenceSaveError] if the preference could not be saved,
    /// nothing is announced in that case.
    pub fn set_dark(&self, user_id: UserID, is_dark: bool) -> Result<(), Error> {
        self.update(user_id, |_| is_dark).map(|_| ())
    }

    /// Flip `user_id`'s preference and return the new value.
    ///
    /// # Errors
    /// Returns [Error::PreferenceSaveError] if the preference could not be saved.
    pub fn toggle(&self, user_id: UserID) -> Result<bool, Error> {
        self.update(user_id, |is_dark| !is_dark)
    }

    /// Read, change, save and announce the preference under one lock so that
    /// concurrent updates are applied one after the other.
    fn update(&self, user_id: UserID, change: impl FnOnce(bool) -> bool) -> Result<bool, Error> {
        let connection = self
            .connection
            .lock()
            .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
            .map_err(|_| Error::DatabaseLockError)?;

        let is_dark = get_dark_mode(user_id, &connection)
            .and_then(|current| {
                let is_dark = change(current);
                save_dark_mode(user_id, is_dark, &connection)?;
                Ok(is_dark)
            })
            .map_err(|error| {
                tracing::error!("could not save dark mode preference for user {user_id}: {error}");
                Error::PreferenceSaveError
            })?;

        // Sending only fails when no page is listening.
        let _ = self.changes.send(ThemeChange { user_id, is_dark });

        Ok(is_dark)
    }
}

impl FromRef<AppState> for ThemePreference {
    fn from_ref(state: &AppState) -> Self {
        state.theme.clone()
    }
}

/// A route handler that flips the user's dark mode and asks htmx to refresh the page.
pub async fn toggle_dark_mode_endpoint(
    State(theme): State<ThemePreference>,
    Extension(user_id): Extension<UserID>,
) -> Response {
    match theme.toggle(user_id) {
        Ok(is_dark) => {
            tracing::info!("dark mode for user {user_id} set to {is_dark}");
            (HxRefresh(true), StatusCode::OK).into_response()
        }
        Err(error) => error.into_alert_response(),
    }
}
