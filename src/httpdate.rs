//! Lenient HTTP-date handling.
//!
//! Clients are not consistent in the date format they send in conditional
//! headers, so parsing tries every format that HTTP/1.1 says a recipient
//! should accept, and then a generic RFC 2822 date with a numeric zone.
use std::time::SystemTime;

use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};

const FORMAT_RFC1123: &str = "%a, %d %b %Y %H:%M:%S GMT";
const FORMAT_RFC850: &str = "%A, %d-%b-%y %H:%M:%S GMT";
const FORMAT_ASCTIME: &str = "%a %b %e %H:%M:%S %Y";
const FORMAT_ASCTIME_TZ: &str = "%a %b %e %H:%M:%S %Y %z";

/// Parse an HTTP-date into a UTC unix timestamp.
///
/// Returns `None` if the value matches none of the accepted formats.
pub(crate) fn parse_http_date(s: &str) -> Option<i64> {
    let s = s.trim();
    for fmt in [FORMAT_RFC1123, FORMAT_RFC850, FORMAT_ASCTIME] {
        if let Ok(tm) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(tm.and_utc().timestamp());
        }
    }
    if let Ok(tm) = DateTime::parse_from_str(s, FORMAT_ASCTIME_TZ) {
        return Some(tm.timestamp());
    }
    DateTime::parse_from_rfc2822(s).ok().map(|tm| tm.timestamp())
}

/// Seconds since the epoch, truncated. Times before the epoch are negative.
pub(crate) fn systemtime_to_timestamp(t: SystemTime) -> i64 {
    DateTime::<Utc>::from(t).timestamp()
}

pub(crate) fn systemtime_to_httpdate(t: SystemTime) -> String {
    DateTime::<Utc>::from(t).format(FORMAT_RFC1123).to_string()
}

pub(crate) fn timestamp_to_httpdate(ts: i64) -> Option<String> {
    DateTime::<Utc>::from_timestamp(ts, 0).map(|t| t.format(FORMAT_RFC1123).to_string())
}

pub(crate) fn systemtime_to_rfc3339(t: SystemTime) -> String {
    DateTime::<Utc>::from(t).to_rfc3339_opts(SecondsFormat::Secs, true)
}
