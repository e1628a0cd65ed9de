//! Authentication middleware that validates cookies, extends sessions, and handles redirects.

use axum::{
    extract::{FromRef, FromRequestParts, Request, State},
    http::{StatusCode, header::SET_COOKIE},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::{PrivateCookieJar, cookie::Key};
use axum_htmx::HxRedirect;
use time::{Duration, OffsetDateTime};

use crate::{
    AppState,
    auth::{
        cookie::{extend_auth_cookie_duration_if_needed, get_token_from_cookies},
        redirect::{build_log_in_redirect_url, build_log_in_redirect_url_from_target},
    },
    endpoints,
    timezone::get_local_offset,
};

/// How far each authenticated request pushes out the session expiry.
const SESSION_EXTENSION: Duration = Duration::minutes(5);

/// When the current session ends, taking the extension for this request into account.
///
/// Inserted into the request extensions next to the [UserID](crate::UserID).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SessionExpiry(pub OffsetDateTime);

/// The state needed for the auth middleware
#[derive(Clone)]
pub struct AuthState {
    /// The key to be used for signing and encrypting private cookies.
    pub cookie_key: Key,
    /// The local timezone as a canonical timezone name, e.g. "Asia/Kolkata".
    pub local_timezone: String,
}

impl FromRef<AppState> for AuthState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            cookie_key: state.cookie_key.clone(),
            local_timezone: state.local_timezone.clone(),
        }
    }
}

impl FromRef<AuthState> for Key {
    fn from_ref(state: &AuthState) -> Self {
        state.cookie_key.clone()
    }
}

/// Checks for a valid session token cookie.
///
/// On success the [UserID](crate::UserID) and [SessionExpiry] are placed in
/// the request extensions, the request runs, and the refreshed cookie is
/// appended to the response. Otherwise `get_redirect` builds the response
/// that sends the client to the log-in page.
#[inline]
async fn auth_guard_internal(
    state: AuthState,
    request: Request,
    next: Next,
    get_redirect: impl Fn(&str) -> Response,
) -> Response {
    let log_in_redirect_url = build_log_in_redirect_url(&request).unwrap_or_else(|| {
        if request.uri().path().starts_with("/api") {
            tracing::warn!(
                "Missing or invalid HTMX headers for /api request. Falling back to dashboard."
            );
        } else {
            tracing::warn!("Invalid redirect URL from request URI. Falling back to dashboard.");
        }

        build_log_in_redirect_url_from_target(endpoints::DASHBOARD_VIEW)
            .unwrap_or_else(|| endpoints::LOG_IN_VIEW.to_owned())
    });
    let Some(local_offset) = get_local_offset(&state.local_timezone) else {
        tracing::error!("Error getting local timezone. Redirecting to log in page.");
        return get_redirect(&log_in_redirect_url);
    };

    let (mut parts, body) = request.into_parts();
    let jar = match PrivateCookieJar::from_request_parts(&mut parts, &state).await {
        Ok(jar) => jar,
        Err(error) => {
            tracing::error!("Error getting cookie jar: {error:?}. Redirecting to log in page.");
            return get_redirect(&log_in_redirect_url);
        }
    };
    let token = match get_token_from_cookies(&jar) {
        Ok(token) => token,
        Err(error) => {
            tracing::debug!("Rejected session: {error}");
            return get_redirect(&log_in_redirect_url);
        }
    };

    let jar = match extend_auth_cookie_duration_if_needed(
        jar.clone(),
        SESSION_EXTENSION,
        local_offset,
    ) {
        Ok(updated_jar) => updated_jar,
        Err(error) => {
            tracing::error!("Error extending cookie duration: {error:?}. Rolling back cookie jar.");
            jar
        }
    };
    let expires_at = get_token_from_cookies(&jar)
        .map(|extended| extended.expires_at)
        .unwrap_or(token.expires_at);

    parts.extensions.insert(token.user_id);
    parts.extensions.insert(SessionExpiry(expires_at));
    let request = Request::from_parts(parts, body);
    let response = next.run(request).await;

    let (mut parts, body) = response.into_parts();
    for (key, value) in jar.into_response().headers().iter() {
        if key == SET_COOKIE {
            parts.headers.append(key, value.to_owned());
        }
    }

    Response::from_parts(parts, body)
}

/// Middleware for pages: redirects to the log-in page when there is no valid session.
///
/// Handlers receive the user with `Extension(user_id): Extension<UserID>`.
pub async fn auth_guard(State(state): State<AuthState>, request: Request, next: Next) -> Response {
    auth_guard_internal(state, request, next, |redirect_url| {
        Redirect::to(redirect_url).into_response()
    })
    .await
}

/// Middleware for htmx requests: like [auth_guard] but redirects with the
/// `HX-Redirect` header.
pub async fn auth_guard_hx(
    State(state): State<AuthState>,
    request: Request,
    next: Next,
) -> Response {
    auth_guard_internal(state, request, next, |redirect_url| {
        (HxRedirect(redirect_url.to_owned()), StatusCode::OK).into_response()
    })
    .await
}
