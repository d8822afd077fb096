//! Placeholders accepted in query text, expanded before the query is sent.
//!
//! - `$<n><unit>` with unit `s`, `m`, `h` or `d` becomes a number of seconds,
//!   so `$5m` reads as `300`.
//! - `#time_begin` and `#time_end` become the bounds of the query's time
//!   range in unix seconds.

use std::borrow::Cow;

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use time::OffsetDateTime;

const TIME_BEGIN: &str = "#time_begin";
const TIME_END: &str = "#time_end";

static DURATION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$(\d+)([smhd])").expect("BUG: invalid duration pattern"));

pub fn expand(query: &str, from: OffsetDateTime, to: OffsetDateTime) -> String {
    let query = DURATION.replace_all(query, |caps: &Captures| {
        let unit = match &caps[2] {
            "s" => 1,
            "m" => 60,
            "h" => 60 * 60,
            _ => 24 * 60 * 60,
        };
        match caps[1].parse::<u64>() {
            Ok(n) => n.saturating_mul(unit).to_string(),
            // too large to be a duration, leave it alone
            Err(_) => caps[0].to_string(),
        }
    });
    let query = replace(query, TIME_BEGIN, from.unix_timestamp());
    replace(query, TIME_END, to.unix_timestamp()).into_owned()
}

fn replace<'a>(query: Cow<'a, str>, name: &str, secs: i64) -> Cow<'a, str> {
    if query.contains(name) {
        Cow::Owned(query.replace(name, &secs.to_string()))
    } else {
        query
    }
}
