//! Reads and writes the encrypted session token cookie.

use axum_extra::extract::{
    PrivateCookieJar,
    cookie::{Cookie, SameSite},
};
use time::{Duration, OffsetDateTime, UtcOffset};

use crate::{
    Error,
    auth::{Token, UserID},
};

pub(crate) const COOKIE_TOKEN: &str = "token";
/// The default duration for which auth cookies are valid.
pub const DEFAULT_COOKIE_DURATION: Duration = Duration::minutes(5);

/// Add a session token for `user_id` to `jar` that expires `duration` from now.
///
/// The expiry is recorded in `local_offset` so that it reads naturally in logs.
///
/// # Errors
///
/// Returns an [Error::InvalidDateFormat] if the expiry overflows or an
/// [Error::JSONSerializationError] if the token cannot be serialized.
pub fn set_auth_cookie(
    jar: PrivateCookieJar,
    user_id: UserID,
    duration: Duration,
    local_offset: UtcOffset,
) -> Result<PrivateCookieJar, Error> {
    let expires_at = expiry_from_now(duration, local_offset)?;

    set_token_cookie(
        jar,
        Token {
            user_id,
            expires_at,
        },
    )
}

/// Get the session token from `jar`.
///
/// # Errors
///
/// Returns:
/// - [Error::CookieMissing] if there is no token cookie,
/// - [Error::InvalidCredentials] if the cookie does not hold a token,
/// - [Error::TokenExpired] if the token's expiry has passed.
pub(crate) fn get_token_from_cookies(jar: &PrivateCookieJar) -> Result<Token, Error> {
    let cookie = jar.get(COOKIE_TOKEN).ok_or(Error::CookieMissing)?;
    let token: Token =
        serde_json::from_str(cookie.value_trimmed()).map_err(|_| Error::InvalidCredentials)?;

    if token.is_expired_at(OffsetDateTime::now_utc()) {
        return Err(Error::TokenExpired);
    }

    Ok(token)
}

/// Push the token's expiry out to `duration` from now unless it already
/// expires later.
///
/// # Errors
///
/// Returns the errors of [get_token_from_cookies] and [set_auth_cookie]. The
/// jar is not modified on error.
pub(crate) fn extend_auth_cookie_duration_if_needed(
    jar: PrivateCookieJar,
    duration: Duration,
    local_offset: UtcOffset,
) -> Result<PrivateCookieJar, Error> {
    let token = get_token_from_cookies(&jar)?;
    let new_expiry = expiry_from_now(duration, local_offset)?;

    if new_expiry <= token.expires_at {
        return Ok(jar);
    }

    set_token_cookie(
        jar,
        Token {
            expires_at: new_expiry,
            ..token
        },
    )
}

/// Overwrite the token cookie with an expired placeholder so the browser deletes it.
pub fn invalidate_auth_cookie(jar: PrivateCookieJar) -> PrivateCookieJar {
    jar.add(
        Cookie::build((COOKIE_TOKEN, "deleted"))
            .expires(OffsetDateTime::UNIX_EPOCH)
            .max_age(Duration::ZERO)
            .http_only(true)
            .same_site(SameSite::Strict)
            .secure(true),
    )
}

fn expiry_from_now(duration: Duration, local_offset: UtcOffset) -> Result<OffsetDateTime, Error> {
    OffsetDateTime::now_utc()
        .to_offset(local_offset)
        .checked_add(duration)
        .ok_or_else(|| Error::InvalidDateFormat(format!("now plus {duration} overflows")))
}

fn set_token_cookie(jar: PrivateCookieJar, token: Token) -> Result<PrivateCookieJar, Error> {
    let token_string = serde_json::to_string(&token)
        .map_err(|error| Error::JSONSerializationError(error.to_string()))?;

    Ok(jar.add(
        Cookie::build((COOKIE_TOKEN, token_string))
            .expires(token.expires_at)
            .http_only(true)
            .same_site(SameSite::Strict)
            .secure(true),
    ))
}

#[cfg(test)]
mod cookie_tests {
    use axum_extra::extract::{
        PrivateCookieJar,
        cookie::{Cookie, Key},
    };
    use sha2::{Digest, Sha512};
    use time::{Duration, OffsetDateTime, UtcOffset};

    use crate::{
        Error,
        auth::{
            Token, UserID,
            cookie::{
                COOKIE_TOKEN, DEFAULT_COOKIE_DURATION, extend_auth_cookie_duration_if_needed,
                get_token_from_cookies, invalidate_auth_cookie, set_auth_cookie,
                set_token_cookie,
            },
        },
    };

    fn get_jar() -> PrivateCookieJar {
        let hash = Sha512::digest(b"foobar");

        PrivateCookieJar::new(Key::from(&hash))
    }

    #[track_caller]
    fn assert_date_time_close(left: OffsetDateTime, right: OffsetDateTime) {
        assert!(
            (left - right).abs() < Duration::seconds(1),
            "got date time {left:?}, want {right:?}"
        );
    }

    #[test]
    fn set_cookie_stores_token() {
        let user_id = UserID::new(1);

        let jar = set_auth_cookie(get_jar(), user_id, DEFAULT_COOKIE_DURATION, UtcOffset::UTC)
            .unwrap();
        let token = get_token_from_cookies(&jar).unwrap();

        assert_eq!(token.user_id, user_id);
        assert_date_time_close(
            token.expires_at,
            OffsetDateTime::now_utc() + DEFAULT_COOKIE_DURATION,
        );
        let cookie = jar.get(COOKIE_TOKEN).unwrap();
        assert_eq!(cookie.expires_datetime(), Some(token.expires_at));
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.secure(), Some(true));
    }

    #[test]
    fn missing_cookie_is_an_error() {
        assert_eq!(get_token_from_cookies(&get_jar()), Err(Error::CookieMissing));
    }

    #[test]
    fn garbage_cookie_is_invalid() {
        let jar = get_jar().add(Cookie::build((COOKIE_TOKEN, "FOOBAR")));

        assert_eq!(
            get_token_from_cookies(&jar),
            Err(Error::InvalidCredentials)
        );
    }

    #[test]
    fn expired_token_is_rejected() {
        let jar = set_token_cookie(
            get_jar(),
            Token {
                user_id: UserID::new(1),
                expires_at: OffsetDateTime::now_utc() - Duration::seconds(1),
            },
        )
        .unwrap();

        assert_eq!(get_token_from_cookies(&jar), Err(Error::TokenExpired));
    }

    #[test]
    fn extend_pushes_expiry_out() {
        let jar =
            set_auth_cookie(get_jar(), UserID::new(1), Duration::seconds(5), UtcOffset::UTC)
                .unwrap();

        let jar =
            extend_auth_cookie_duration_if_needed(jar, Duration::minutes(10), UtcOffset::UTC)
                .unwrap();

        let token = get_token_from_cookies(&jar).unwrap();
        assert_date_time_close(
            token.expires_at,
            OffsetDateTime::now_utc() + Duration::minutes(10),
        );
        assert_date_time_close(
            jar.get(COOKIE_TOKEN).unwrap().expires_datetime().unwrap(),
            token.expires_at,
        );
    }

    #[test]
    fn extend_keeps_later_expiry() {
        let jar = set_auth_cookie(get_jar(), UserID::new(1), Duration::days(7), UtcOffset::UTC)
            .unwrap();
        let want = get_token_from_cookies(&jar).unwrap().expires_at;

        let jar = extend_auth_cookie_duration_if_needed(jar, Duration::minutes(5), UtcOffset::UTC)
            .unwrap();

        assert_eq!(get_token_from_cookies(&jar).unwrap().expires_at, want);
    }

    #[test]
    fn invalidated_cookie_is_not_a_session() {
        let jar = set_auth_cookie(
            get_jar(),
            UserID::new(1),
            DEFAULT_COOKIE_DURATION,
            UtcOffset::UTC,
        )
        .unwrap();

        let jar = invalidate_auth_cookie(jar);
        let cookie = jar.get(COOKIE_TOKEN).unwrap();

        assert_eq!(cookie.value(), "deleted");
        assert_eq!(cookie.expires_datetime(), Some(OffsetDateTime::UNIX_EPOCH));
        assert_eq!(cookie.max_age(), Some(Duration::ZERO));
        assert_eq!(
            get_token_from_cookies(&jar),
            Err(Error::InvalidCredentials)
        );
    }
}
