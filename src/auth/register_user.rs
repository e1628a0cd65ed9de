//! The sign-up page and the handler that creates new users.

use std::{
    str::FromStr,
    sync::{Arc, Mutex},
};

use axum::{
    Form,
    extract::{FromRef, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_extra::extract::{PrivateCookieJar, cookie::Key};
use axum_htmx::HxRedirect;
use email_address::EmailAddress;
use maud::{Markup, html};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use time::Duration;

use crate::{
    AppState, Error,
    auth::{
        PasswordHash, ValidatedPassword, create_user, password::MIN_PASSWORD_LENGTH,
        set_auth_cookie,
    },
    endpoints,
    html::{
        BUTTON_PRIMARY_STYLE, base, email_input, link, loading_spinner, log_in_register,
        password_input,
    },
    timezone::get_local_offset,
};

const INTERNAL_ERROR_MESSAGE: &str = "An internal error occurred. Please try again later.";

/// Error messages shown next to the fields of the sign-up form.
#[derive(Default)]
struct RegistrationErrors<'a> {
    email: Option<&'a str>,
    password: Option<&'a str>,
    confirm_password: Option<&'a str>,
}

fn registration_form(email: &str, errors: RegistrationErrors) -> Markup {
    html! {
        form
            hx-post=(endpoints::USERS)
            hx-indicator="#indicator"
            hx-disabled-elt="#email, #password, #confirm_password, #submit-button"
            class="space-y-4 md:space-y-6"
        {
            (email_input(email, errors.email))
            (password_input("password", "Password", "", MIN_PASSWORD_LENGTH, errors.password))
            (password_input(
                "confirm_password",
                "Confirm Password",
                "",
                MIN_PASSWORD_LENGTH,
                errors.confirm_password,
            ))

            button type="submit" id="submit-button" tabindex="0" class=(BUTTON_PRIMARY_STYLE)
            {
                span class="inline htmx-indicator" id="indicator"
                {
                    (loading_spinner())
                }
                "Sign up"
            }

            p class="text-sm font-light text-gray-500 dark:text-gray-400"
            {
                "Already have an account? "
                (link(endpoints::LOG_IN_VIEW, "Log in here"))
            }
        }
    }
}

/// Display the sign-up page in the light theme.
pub async fn get_register_page() -> Response {
    let form = registration_form("", RegistrationErrors::default());
    let content = log_in_register("Create an account", &form);

    base("Sign Up", false, &[], &content).into_response()
}

/// The state needed for creating a new user.
#[derive(Debug, Clone)]
pub struct RegistrationState {
    /// The key to be used for signing and encrypting private cookies.
    pub cookie_key: Key,
    /// The duration for which cookies used for authentication are valid.
    pub cookie_duration: Duration,
    /// The local timezone as a canonical timezone name, e.g. "Asia/Kolkata".
    pub local_timezone: String,
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for RegistrationState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            cookie_key: state.cookie_key.clone(),
            cookie_duration: state.cookie_duration,
            local_timezone: state.local_timezone.clone(),
            db_connection: state.db_connection.clone(),
        }
    }
}

impl FromRef<RegistrationState> for Key {
    fn from_ref(state: &RegistrationState) -> Self {
        state.cookie_key.clone()
    }
}

#[derive(Serialize, Deserialize)]
pub struct RegisterForm {
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

/// Create a user from the sign-up form and log them in.
///
/// Validation problems re-render the form with the email kept and a message
/// next to the offending field. On success the auth cookie is set and the
/// client is redirected to the dashboard.
pub async fn register_user(
    State(state): State<RegistrationState>,
    jar: PrivateCookieJar,
    Form(user_data): Form<RegisterForm>,
) -> Response {
    let raw_email = user_data.email.trim();

    let email_address = match EmailAddress::from_str(raw_email) {
        Ok(email) => email,
        Err(error) => {
            tracing::debug!("rejected email \"{raw_email}\": {error}");
            let message = Error::InvalidEmail(raw_email.to_owned()).to_string();
            return registration_form(
                raw_email,
                RegistrationErrors {
                    email: Some(&message),
                    ..Default::default()
                },
            )
            .into_response();
        }
    };
    let email = email_address.as_str();

    let validated_password = match ValidatedPassword::new(&user_data.password, &[email]) {
        Ok(password) => password,
        Err(error) => {
            let message = error.to_string();
            return registration_form(
                email,
                RegistrationErrors {
                    password: Some(&message),
                    ..Default::default()
                },
            )
            .into_response();
        }
    };

    if user_data.password != user_data.confirm_password {
        return registration_form(
            email,
            RegistrationErrors {
                confirm_password: Some("Passwords do not match"),
                ..Default::default()
            },
        )
        .into_response();
    }

    let password_hash = match PasswordHash::new(validated_password, PasswordHash::DEFAULT_COST) {
        Ok(hash) => hash,
        Err(error) => {
            tracing::error!("an error occurred while hashing a password: {error}");
            return registration_form(
                email,
                RegistrationErrors {
                    password: Some(INTERNAL_ERROR_MESSAGE),
                    ..Default::default()
                },
            )
            .into_response();
        }
    };

    let Some(local_offset) = get_local_offset(&state.local_timezone) else {
        return Error::InvalidTimezoneError(state.local_timezone).into_response();
    };

    let user = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)
        .and_then(|connection| create_user(email, password_hash, &connection));

    let user = match user {
        Ok(user) => user,
        Err(Error::DuplicateEmail) => {
            let message = Error::DuplicateEmail.to_string();
            return registration_form(
                email,
                RegistrationErrors {
                    email: Some(&message),
                    ..Default::default()
                },
            )
            .into_response();
        }
        Err(error) => {
            tracing::error!("An unhandled error occurred while inserting a new user: {error}");
            return registration_form(
                email,
                RegistrationErrors {
                    email: Some(INTERNAL_ERROR_MESSAGE),
                    ..Default::default()
                },
            )
            .into_response();
        }
    };

    tracing::info!("Registered user {} with email {}", user.id, user.email);

    match set_auth_cookie(jar, user.id, state.cookie_duration, local_offset) {
        Ok(jar) => (
            HxRedirect(endpoints::DASHBOARD_VIEW.to_owned()),
            jar,
            StatusCode::SEE_OTHER,
        )
            .into_response(),
        Err(error) => {
            tracing::error!("An error occurred while setting the auth cookie: {error}");
            (
                HxRedirect(endpoints::LOG_IN_VIEW.to_owned()),
                StatusCode::SEE_OTHER,
            )
                .into_response()
        }
    }
}
