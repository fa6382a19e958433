//! Human-readable time parsing and formatting
//!
//! Stoppable windows and seek targets are plain milliseconds internally, but
//! people type `4.3s` or `1:02.5` far more readily than `4300` and `62500`.
//! This module converts between the two.

use crate::{Error, Result};

/// Format selection thresholds (milliseconds)
const SHORT_FORMAT_MAX: u64 = 100_000; // < 100s → X.XXs
const MEDIUM_FORMAT_MAX: u64 = 6_000_000; // < 100m → M:SS.XXs
                                          // >= 100m → H:MM:SS

/// Format milliseconds as human-readable time.
///
/// - Short format (`X.XXs`): below 100 seconds
/// - Medium format (`M:SS.XXs`): 100 seconds to 100 minutes
/// - Long format (`H:MM:SS`): 100 minutes and above
///
/// # Examples
///
/// ```
/// use ultra_common::human_time::format_millis;
///
/// assert_eq!(format_millis(4300), "4.30s");
/// assert_eq!(format_millis(125_500), "2:05.50s");
/// assert_eq!(format_millis(7_200_000), "2:00:00");
/// assert_eq!(format_millis(-250), "-0.25s");
/// ```
pub fn format_millis(ms: i64) -> String {
    let is_negative = ms < 0;
    let abs_ms = ms.unsigned_abs();

    let formatted = if abs_ms < SHORT_FORMAT_MAX {
        format!("{}.{:02}s", abs_ms / 1000, (abs_ms % 1000) / 10)
    } else if abs_ms < MEDIUM_FORMAT_MAX {
        let minutes = abs_ms / 60_000;
        let secs = (abs_ms % 60_000) / 1000;
        let hundredths = (abs_ms % 1000) / 10;
        format!("{}:{:02}.{:02}s", minutes, secs, hundredths)
    } else {
        let total_secs = abs_ms / 1000;
        let hours = total_secs / 3600;
        let mins = (total_secs % 3600) / 60;
        let secs = total_secs % 60;
        format!("{}:{:02}:{:02}", hours, mins, secs)
    };

    if is_negative {
        format!("-{}", formatted)
    } else {
        formatted
    }
}

/// Parse a human-entered time into milliseconds.
///
/// Accepted forms:
/// - `4300` or `4300ms`: milliseconds
/// - `4.3s`: seconds with optional fraction
/// - `1:02.5`: minutes and seconds
/// - `1:02:03.25`: hours, minutes and seconds
///
/// A leading `-` negates the value.
///
/// # Examples
///
/// ```
/// use ultra_common::human_time::parse_millis;
///
/// assert_eq!(parse_millis("4300").unwrap(), 4300);
/// assert_eq!(parse_millis("4.3s").unwrap(), 4300);
/// assert_eq!(parse_millis("1:02.5").unwrap(), 62_500);
/// assert!(parse_millis("soon").is_err());
/// ```
pub fn parse_millis(input: &str) -> Result<i64> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(Error::InvalidInput("empty time value".to_string()));
    }

    let (negative, body) = match trimmed.strip_prefix('-') {
        Some(rest) => (true, rest.trim_start()),
        None => (false, trimmed),
    };

    let ms = if let Some(digits) = body.strip_suffix("ms") {
        parse_whole(digits, input)?
    } else if let Some(secs) = body.strip_suffix('s') {
        if secs.contains(':') {
            parse_clock(secs, input)?
        } else {
            parse_seconds(secs, input)?
        }
    } else if body.contains(':') {
        parse_clock(body, input)?
    } else {
        parse_whole(body, input)?
    };

    Ok(if negative { -ms } else { ms })
}

fn invalid(input: &str) -> Error {
    Error::InvalidInput(format!("unrecognized time value '{}'", input))
}

fn parse_whole(digits: &str, input: &str) -> Result<i64> {
    let digits = digits.trim();
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid(input));
    }
    digits.parse::<i64>().map_err(|_| invalid(input))
}

/// Parse `S[.fff]` into milliseconds without going through floating point.
fn parse_seconds(text: &str, input: &str) -> Result<i64> {
    let text = text.trim();
    let (whole, frac) = match text.split_once('.') {
        Some((whole, frac)) => (whole, frac),
        None => (text, ""),
    };

    let whole_ms = if whole.is_empty() {
        0
    } else {
        parse_whole(whole, input)?
            .checked_mul(1000)
            .ok_or_else(|| invalid(input))?
    };

    if whole.is_empty() && frac.is_empty() {
        return Err(invalid(input));
    }
    if !frac.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid(input));
    }

    // Only millisecond precision is kept
    let mut frac_ms = 0;
    for (i, digit) in frac.bytes().take(3).enumerate() {
        frac_ms += i64::from(digit - b'0') * 10_i64.pow(2 - i as u32);
    }

    Ok(whole_ms + frac_ms)
}

fn parse_clock(text: &str, input: &str) -> Result<i64> {
    let parts: Vec<&str> = text.split(':').collect();
    let (hours, minutes, seconds) = match parts.as_slice() {
        [m, s] => ("0", *m, *s),
        [h, m, s] => (*h, *m, *s),
        _ => return Err(invalid(input)),
    };

    let hours = parse_whole(hours, input)?;
    let minutes = parse_whole(minutes, input)?;
    let seconds_ms = parse_seconds(seconds, input)?;

    if parts.len() == 3 && minutes >= 60 {
        return Err(invalid(input));
    }
    if seconds_ms >= 60_000 {
        return Err(invalid(input));
    }

    Ok(hours * 3_600_000 + minutes * 60_000 + seconds_ms)
}
