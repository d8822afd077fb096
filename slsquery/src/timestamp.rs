//! Normalizes the timestamp encodings seen in log rows into instants.
//!
//! Three encodings are accepted: epoch seconds, epoch milliseconds (exactly
//! 13 characters) and a `YYYY?MM?DD?hh?mm?ss` calendar pattern where each `?`
//! is any single separator character. Calendar times are read in the fixed
//! reference zone of the log service (Asia/Shanghai, UTC+08:00).

use once_cell::sync::Lazy;
use regex::Regex;
use time::{macros::offset, Date, Month, OffsetDateTime, PrimitiveDateTime, Time, UtcOffset};

/// Width of an epoch timestamp in milliseconds.
const MILLIS_WIDTH: usize = 13;

/// Offset of Asia/Shanghai, which has not observed DST since 1991.
pub const REFERENCE_OFFSET: UtcOffset = offset!(+8);

/// Returned by [`normalize`] for tokens that cannot be parsed.
pub const SENTINEL: OffsetDateTime = OffsetDateTime::UNIX_EPOCH;

static DATE_TIME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\d{4})\S(\d{2})\S(\d{2})[\s\S](\d{2})\S(\d{2})\S(\d{2})")
        .expect("BUG: invalid date/time pattern")
});

/// Parses `token` into an instant, truncated to whole seconds.
pub fn parse(token: &str) -> Option<OffsetDateTime> {
    match token.parse::<f64>() {
        Ok(v) => {
            if !v.is_finite() {
                return None;
            }
            let secs = if token.len() == MILLIS_WIDTH {
                v as i64 / 1000
            } else {
                v as i64
            };
            OffsetDateTime::from_unix_timestamp(secs).ok()
        }
        Err(_) => parse_calendar(token),
    }
}

/// Like [`parse`], but degrades to [`SENTINEL`] and logs the offending token.
pub fn normalize(token: &str) -> OffsetDateTime {
    parse(token).unwrap_or_else(|| {
        tracing::warn!(token, "unrecognized timestamp, using epoch");
        SENTINEL
    })
}

/// Numeric value of the instant `token` encodes, in seconds.
///
/// Unlike [`parse`] the fraction of numeric tokens is kept, so ordering by
/// this key agrees with ordering by the raw numbers.
pub fn sort_key(token: &str) -> Option<f64> {
    match token.parse::<f64>() {
        Ok(v) if v.is_finite() => Some(if token.len() == MILLIS_WIDTH {
            v / 1000.0
        } else {
            v
        }),
        Ok(_) => None,
        Err(_) => parse_calendar(token).map(|t| t.unix_timestamp() as f64),
    }
}

fn parse_calendar(token: &str) -> Option<OffsetDateTime> {
    let caps = DATE_TIME.captures(token)?;
    let num = |i: usize| caps[i].parse::<u16>().ok();
    let month = Month::try_from(num(2)? as u8).ok()?;
    let date = Date::from_calendar_date(i32::from(num(1)?), month, num(3)? as u8).ok()?;
    let time = Time::from_hms(num(4)? as u8, num(5)? as u8, num(6)? as u8).ok()?;
    Some(PrimitiveDateTime::new(date, time).assume_offset(REFERENCE_OFFSET))
}
