//! Streams re-rendered dashboard fragments to the browser with Server-Sent Events.
//!
//! Each connection holds one subscription to the user's expenses and one to
//! their theme preference. Every change is rendered for the connection's month
//! and budget and sent as a named event that htmx swaps into the page:
//! `snapshot` carries the live content and `theme` carries a script that
//! switches the page between light and dark mode.
//!
//! The stream ends when the session expires or the user logs out. A log-out
//! first sends a `session` event that reloads the page, so the reload goes
//! through the auth guard like any other request.

use std::convert::Infallible;

use axum::{
    Extension,
    extract::{Query, State},
    response::sse::{Event, KeepAlive, Sse},
};
use time::{Date, OffsetDateTime};
use tokio::time::Instant;
use tokio_stream::{Stream, StreamExt};

use crate::{
    Error,
    aggregation::aggregate,
    auth::{SessionExpiry, UserID},
    dashboard::{
        handlers::{DashboardState, Filter, FilterQuery},
        view::{live_content, reload_script, theme_script},
    },
    expense::{ExpenseStore, ExpenseSubscription, Snapshot},
    timezone::local_today,
};

const SNAPSHOT_EVENT: &str = "snapshot";
const THEME_EVENT: &str = "theme";
const SESSION_EVENT: &str = "session";

#[derive(Debug)]
enum LiveUpdate {
    Snapshot(Snapshot),
    Theme(bool),
    LoggedOut,
    Closed,
}

/// A route handler that streams the user's dashboard as it changes.
pub async fn get_live_expenses(
    State(state): State<DashboardState>,
    Extension(user_id): Extension<UserID>,
    Extension(SessionExpiry(expires_at)): Extension<SessionExpiry>,
    Query(query): Query<FilterQuery>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, Error> {
    let filter = query.resolve(&state.local_timezone)?;
    let subscription = state.expense_store.subscribe(user_id)?;
    let local_timezone = state.local_timezone;

    tracing::debug!("opened live stream for user {user_id} until {expires_at}");

    let events = live_updates(
        subscription,
        state.theme.changes(user_id),
        state.log_outs.next_log_out(user_id),
        deadline_from_expiry(expires_at, OffsetDateTime::now_utc()),
    )
    .filter_map(move |update| render_update(update, &filter, &local_timezone))
    .map(|(name, data)| Ok(Event::default().event(name).data(data)));

    Ok(Sse::new(events).keep_alive(KeepAlive::default()))
}

/// Merge the user's snapshots with theme changes until `deadline` or the
/// user logs out, whichever comes first.
///
/// The first item is always the current snapshot. `themes` should only yield
/// changes made after the stream opened. A log-out is passed on before the
/// stream ends.
fn live_updates(
    subscription: ExpenseSubscription,
    themes: impl Stream<Item = bool>,
    log_out: impl Stream<Item = ()>,
    deadline: Instant,
) -> impl Stream<Item = LiveUpdate> {
    let snapshots = subscription
        .into_stream(Some(deadline))
        .map(LiveUpdate::Snapshot)
        .chain(tokio_stream::once(LiveUpdate::Closed));
    let themes = themes.map(LiveUpdate::Theme);
    let log_out = log_out
        .map(|()| LiveUpdate::LoggedOut)
        .chain(tokio_stream::once(LiveUpdate::Closed));

    snapshots
        .merge(themes)
        .merge(log_out)
        .take_while(|update| !matches!(update, LiveUpdate::Closed))
}

/// Render `update` as an event name and its HTML payload.
fn render_update(
    update: LiveUpdate,
    filter: &Filter,
    local_timezone: &str,
) -> Option<(&'static str, String)> {
    match update {
        LiveUpdate::Snapshot(snapshot) => {
            let aggregation = aggregate(
                &snapshot,
                filter.month,
                &filter.budget,
                today_or_utc(local_timezone),
            );

            Some((SNAPSHOT_EVENT, live_content(&aggregation).into_string()))
        }
        LiveUpdate::Theme(is_dark) => Some((THEME_EVENT, theme_script(is_dark).into_string())),
        LiveUpdate::LoggedOut => Some((SESSION_EVENT, reload_script().into_string())),
        LiveUpdate::Closed => None,
    }
}

fn today_or_utc(local_timezone: &str) -> Date {
    local_today(local_timezone).unwrap_or_else(|error| {
        tracing::error!("could not get local date, using UTC: {error}");
        OffsetDateTime::now_utc().date()
    })
}

/// The instant `expires_at` falls on, or `now` if it has already passed.
fn deadline_from_expiry(expires_at: OffsetDateTime, now: OffsetDateTime) -> Instant {
    let remaining = std::time::Duration::try_from(expires_at - now).unwrap_or_default();

    Instant::now() + remaining
}
