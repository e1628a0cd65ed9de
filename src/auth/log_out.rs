//! Ends the session and sends the user back to the log-in page.

use axum::{
    extract::{FromRef, State},
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::PrivateCookieJar;
use tokio::sync::broadcast;
use tokio_stream::{
    Stream, StreamExt,
    wrappers::{BroadcastStream, errors::BroadcastStreamRecvError},
};

use crate::{
    AppState,
    auth::{UserID, cookie::get_token_from_cookies, invalidate_auth_cookie},
    endpoints,
};

const LOG_OUT_CAPACITY: usize = 64;

/// Tells open live streams that their user has logged out.
#[derive(Debug, Clone)]
pub struct LogOutSignal {
    sender: broadcast::Sender<UserID>,
}

impl Default for LogOutSignal {
    fn default() -> Self {
        let (sender, _) = broadcast::channel(LOG_OUT_CAPACITY);

        Self { sender }
    }
}

impl LogOutSignal {
    /// Announce that `user_id` has logged out.
    pub fn notify(&self, user_id: UserID) {
        if self.sender.send(user_id).is_err() {
            tracing::debug!("no live streams open for user {user_id}");
        }
    }

    /// Yields once the next time `user_id` logs out.
    ///
    /// A subscriber that falls behind cannot tell whether it missed a log-out,
    /// so it yields as well.
    pub fn next_log_out(&self, user_id: UserID) -> impl Stream<Item = ()> + Send + 'static + use<> {
        BroadcastStream::new(self.sender.subscribe())
            .filter_map(move |log_out| match log_out {
                Ok(logged_out) if logged_out == user_id => Some(()),
                Ok(_) => None,
                Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                    tracing::warn!("log-out subscriber for user {user_id} missed {skipped} events");
                    Some(())
                }
            })
            .take(1)
    }
}

impl FromRef<AppState> for LogOutSignal {
    fn from_ref(state: &AppState) -> Self {
        state.log_outs.clone()
    }
}

/// Invalidate the auth cookie and redirect the client to the log-in page.
///
/// The user's open live streams are closed. Works with or without a session,
/// so logging out twice is harmless.
pub async fn get_log_out(State(log_outs): State<LogOutSignal>, jar: PrivateCookieJar) -> Response {
    if let Ok(token) = get_token_from_cookies(&jar) {
        tracing::info!("user {} logged out", token.user_id);
        log_outs.notify(token.user_id);
    }

    let jar = invalidate_auth_cookie(jar);

    (jar, Redirect::to(endpoints::LOG_IN_VIEW)).into_response()
}
