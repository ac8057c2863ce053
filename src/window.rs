//! Minute-granularity window keys.
//!
//! A bucket is identified by its UTC minute formatted as `YYYYMMDDHHmm`.
//! Every field is zero-padded to a fixed width, so two timestamps in the same
//! minute map to the same key and lexicographic order of keys is
//! chronological order.

use std::fmt;

use chrono::{DateTime, Utc};

/// Prefix of the store key holding a bucket's call events.
pub const CALL_SET_PREFIX: &str = "logins_";

/// Store key of the (unbucketed) verification set.
pub const VERIFICATION_SET_KEY: &str = "verify_phoneNumber";

const MILLIS_PER_MINUTE: i64 = 60_000;

/// A `YYYYMMDDHHmm` bucket identifier.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WindowKey(String);

impl WindowKey {
    /// The bucket containing `timestamp_ms`.
    ///
    /// Timestamps chrono cannot represent fall back to the Unix epoch bucket;
    /// recorders reject such timestamps before they get here.
    pub fn from_millis(timestamp_ms: i64) -> Self {
        Self::from_datetime(DateTime::<Utc>::from_timestamp_millis(timestamp_ms).unwrap_or_default())
    }

    /// The bucket evaluated at `now_ms` with a lag of `lag_minutes`, or `None`
    /// when the lagged instant is outside chrono's range.
    pub fn lagged(now_ms: i64, lag_minutes: u32) -> Option<Self> {
        let lag_ms = i64::from(lag_minutes) * MILLIS_PER_MINUTE;
        let target = DateTime::<Utc>::from_timestamp_millis(now_ms.checked_sub(lag_ms)?)?;
        Some(Self::from_datetime(target))
    }

    fn from_datetime(instant: DateTime<Utc>) -> Self {
        Self(instant.format("%Y%m%d%H%M").to_string())
    }

    /// The store key of this bucket's call set.
    pub fn call_set_key(&self) -> String {
        format!("{CALL_SET_PREFIX}{}", self.0)
    }

    /// The raw `YYYYMMDDHHmm` string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WindowKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Maps a timestamp to its bucket string.
pub fn bucket_key(timestamp_ms: i64) -> String {
    WindowKey::from_millis(timestamp_ms).0
}
