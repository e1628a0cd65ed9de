use time::{Date, OffsetDateTime, UtcOffset};
use time_tz::{Offset, TimeZone};

use crate::{Error, month::YearMonth};

/// Get the UTC offset for a canonical timezone name, e.g. "Asia/Kolkata".
///
/// Returns `None` if the timezone is not known.
pub fn get_local_offset(canonical_timezone: &str) -> Option<UtcOffset> {
    time_tz::timezones::get_by_name(canonical_timezone)
        .map(|tz| tz.get_offset_utc(&OffsetDateTime::now_utc()).to_utc())
}

/// Today's date in `canonical_timezone`.
///
/// # Errors
/// Returns [Error::InvalidTimezoneError] if the timezone is not known.
pub fn local_today(canonical_timezone: &str) -> Result<Date, Error> {
    let offset = get_local_offset(canonical_timezone)
        .ok_or_else(|| Error::InvalidTimezoneError(canonical_timezone.to_owned()))?;

    Ok(OffsetDateTime::now_utc().to_offset(offset).date())
}

/// The month that today falls in for `canonical_timezone`.
///
/// # Errors
/// Returns [Error::InvalidTimezoneError] if the timezone is not known.
pub fn current_month(canonical_timezone: &str) -> Result<YearMonth, Error> {
    local_today(canonical_timezone).map(YearMonth::from_date)
}

#[cfg(test)]
mod tests {
    use crate::{
        Error,
        timezone::{get_local_offset, local_today},
    };

    #[test]
    fn utc_has_zero_offset() {
        let offset = get_local_offset("Etc/UTC").unwrap();

        assert!(offset.is_utc());
    }

    #[test]
    fn unknown_timezone_is_an_error() {
        assert_eq!(
            local_today("Not/AZone"),
            Err(Error::InvalidTimezoneError("Not/AZone".to_owned()))
        );
    }
}
