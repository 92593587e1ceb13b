//! Common utilities and helper functions
//!
//! This module provides small parsing helpers shared by the extractors.

pub mod error;

/// Seconds in one civil day
pub const SECONDS_PER_DAY: u32 = 86_400;

/// Sentinel the transit API uses for a missing time
pub const UNDEFINED_TIME: &str = "Undefined";

/// Convert an `HH:MM:SS` string to seconds since midnight
///
/// Returns `None` for an empty string, the `Undefined` sentinel, or anything
/// that is not three numeric fields, or whose hour overflows a `u32` second
/// count. Service days that run past midnight (`25:10:00`) wrap back into
/// `0..86400`.
pub fn time_to_seconds(text: &str) -> Option<u32> {
    let text = text.trim();
    if text.is_empty() || text == UNDEFINED_TIME {
        return None;
    }

    let mut parts = text.split(':');
    let hh: u32 = parts.next()?.trim().parse().ok()?;
    let mm: u32 = parts.next()?.trim().parse().ok()?;
    let ss: u32 = parts.next()?.trim().parse().ok()?;
    if parts.next().is_some() || mm >= 60 || ss >= 60 {
        return None;
    }

    let total = hh.checked_mul(3600)?.checked_add(mm * 60 + ss)?;
    Some(total % SECONDS_PER_DAY)
}

/// Parse an integer written with `.` as thousands separator (`1.234.567`)
///
/// Like a lenient integer parse, only the leading digits are read, so
/// `"12 (p)"` gives 12 and a cell without digits gives `None`.
pub fn parse_grouped_int(text: &str) -> Option<i64> {
    let cleaned: String = text.trim().chars().filter(|c| *c != '.').collect();
    parse_leading_int(&cleaned)
}

/// Parse the leading optional sign and digits of a string
pub fn parse_leading_int(text: &str) -> Option<i64> {
    let text = text.trim_start();
    let (negative, rest) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text.strip_prefix('+').unwrap_or(text)),
    };

    let digits: String = rest.chars().take_while(char::is_ascii_digit).collect();
    if digits.is_empty() {
        return None;
    }

    let value: i64 = digits.parse().ok()?;
    Some(if negative { -value } else { value })
}
