//! Where to send the user after they log in.
//!
//! Only same-origin paths are accepted so that `redirect_url` cannot be used
//! as an open redirect.

use axum::{extract::Request, http::Uri};
use tracing::{error, warn};

use crate::endpoints;

fn is_safe_redirect_path(path_and_query: &str) -> bool {
    if !path_and_query.starts_with('/') || path_and_query.starts_with("//") {
        return false;
    }

    let path = path_and_query
        .split_once('?')
        .map_or(path_and_query, |(path, _)| path);

    path != endpoints::LOG_IN_VIEW
}

fn safe_path_and_query(uri: &Uri) -> Option<String> {
    let path_and_query = uri.path_and_query()?.as_str();

    is_safe_redirect_path(path_and_query).then(|| path_and_query.to_owned())
}

/// Parse a user supplied redirect target, rejecting absolute URLs.
pub fn normalize_redirect_url(raw_url: &str) -> Option<String> {
    let uri = raw_url.parse::<Uri>().ok()?;
    if uri.scheme().is_some() || uri.authority().is_some() {
        return None;
    }

    safe_path_and_query(&uri)
}

/// The log-in page URL that returns the user to where `request` was headed.
///
/// Page requests return to their own URI. htmx requests under `/api` return
/// to the page they were sent from, read from the `HX-Current-URL` header.
pub fn build_log_in_redirect_url(request: &Request) -> Option<String> {
    let target = if request.uri().path().starts_with("/api") {
        hx_current_page(request)?
    } else {
        safe_path_and_query(request.uri())?
    };

    build_log_in_redirect_url_from_target(&target)
}

pub(super) fn build_log_in_redirect_url_from_target(target: &str) -> Option<String> {
    match serde_urlencoded::to_string([("redirect_url", target)]) {
        Ok(query) => Some(format!("{}?{}", endpoints::LOG_IN_VIEW, query)),
        Err(error) => {
            error!("Could not encode redirect URL {target}: {error}");
            None
        }
    }
}

fn hx_current_page(request: &Request) -> Option<String> {
    let headers = request.headers();
    let is_hx_request = headers
        .get("hx-request")
        .and_then(|header| header.to_str().ok())
        .is_some_and(|header| header.eq_ignore_ascii_case("true"));

    if !is_hx_request {
        warn!("Missing HX-Request header for /api request.");
        return None;
    }

    let Some(current_url) = headers
        .get("hx-current-url")
        .and_then(|header| header.to_str().ok())
    else {
        warn!("Missing HX-Current-URL header for /api request.");
        return None;
    };

    // The header holds the full URL, so only the path and query are kept.
    let redirect_url = current_url
        .parse::<Uri>()
        .ok()
        .and_then(|uri| safe_path_and_query(&uri));
    if redirect_url.is_none() {
        warn!("Invalid HX-Current-URL header value: {current_url}");
    }

    redirect_url
}
