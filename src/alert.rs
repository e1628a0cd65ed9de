//! Alerts for showing errors from htmx requests.
//!
//! Alerts are rendered as HTML fragments that htmx swaps into the
//! `#alert-container` element of the base page.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use maud::{Markup, html};

const ERROR_ALERT_STYLE: &str = "p-4 mb-4 text-sm text-red-800 rounded-lg bg-red-50 \
    dark:bg-gray-800 dark:text-red-400";

/// A dismissable error message shown at the bottom of the page.
#[derive(Debug, Clone)]
pub struct Alert<'a> {
    pub message: &'a str,
    pub details: &'a str,
}

impl<'a> Alert<'a> {
    /// Create a new error alert
    pub fn error(message: &'a str, details: &'a str) -> Self {
        Self { message, details }
    }

    pub fn into_html(self) -> Markup {
        html! {
            div
                id="alert"
                role="alert"
                class=(ERROR_ALERT_STYLE)
                onclick="this.remove()"
            {
                span class="font-medium" { (self.message) }

                @if !self.details.is_empty() {
                    " " (self.details)
                }
            }
        }
    }

    /// Render the alert with `status_code`.
    ///
    /// The alert is retargeted to the alert container so that it works from any form.
    pub fn into_response_with_status(self, status_code: StatusCode) -> Response {
        (
            status_code,
            [("HX-Retarget", "#alert-container"), ("HX-Reswap", "innerHTML")],
            self.into_html(),
        )
            .into_response()
    }
}
