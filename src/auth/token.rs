//! The session token stored, encrypted, in the auth cookie.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::auth::UserID;

mod expiry_format {
    //! Serializes [time::OffsetDateTime] with zero padded hours.
    //!
    //! The default format writes midnight as "0:00:00.0", which the matching
    //! parser rejects because it expects two digit hours.
    use serde::{Deserialize, Deserializer, Serializer};
    use time::{
        OffsetDateTime, format_description::BorrowedFormatItem, macros::format_description,
    };

    /// e.g. "2021-01-01 00:00:00.0 +00:00:00".
    const EXPIRY_FORMAT: &[BorrowedFormatItem] = format_description!(
        "[year]-[month]-[day] [hour]:[minute]:[second].[subsecond] [offset_hour \
             sign:mandatory]:[offset_minute]:[offset_second]"
    );

    pub fn serialize<S>(expiry: &OffsetDateTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let formatted = expiry
            .format(EXPIRY_FORMAT)
            .map_err(serde::ser::Error::custom)?;

        serializer.serialize_str(&formatted)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<OffsetDateTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let text = String::deserialize(deserializer)?;

        OffsetDateTime::parse(&text, EXPIRY_FORMAT).map_err(serde::de::Error::custom)
    }
}

/// Who is signed in and until when.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct Token {
    pub user_id: UserID,

    #[serde(with = "expiry_format")]
    pub expires_at: OffsetDateTime,
}

impl Token {
    /// Whether the session has ended at `now`.
    pub fn is_expired_at(&self, now: OffsetDateTime) -> bool {
        self.expires_at <= now
    }
}
