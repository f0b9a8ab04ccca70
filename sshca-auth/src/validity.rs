//! Certificate validity window.
//!
//! Bounds are absolute UTC times. User input is either an RFC 3339
//! timestamp or a signed duration relative to "now" (`5m`, `+1h30m`, `-10s`).

use chrono::{DateTime, SecondsFormat, TimeDelta, Utc};

/// Errors produced while parsing a validity bound.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid time or duration '{0}'")]
pub struct TimeParseError(pub String);

/// Requested `validAfter` / `validBefore` bounds.
///
/// `None` leaves the bound to the authority's defaults.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ValidityWindow {
    pub valid_after: Option<DateTime<Utc>>,
    pub valid_before: Option<DateTime<Utc>>,
}

impl ValidityWindow {
    /// Both bounds set and `valid_before` not after `valid_after`.
    #[must_use]
    pub fn is_empty_range(&self) -> bool {
        matches!(
            (self.valid_after, self.valid_before),
            (Some(after), Some(before)) if before <= after
        )
    }
}

/// Wire form of a bound: RFC 3339 in UTC, or an empty string when unset.
#[must_use]
pub fn format_bound(bound: Option<DateTime<Utc>>) -> String {
    bound
        .map(|t| t.to_rfc3339_opts(SecondsFormat::Secs, true))
        .unwrap_or_default()
}

/// Parse an RFC 3339 time or a duration relative to `now`.
///
/// Empty input means "not set".
///
/// # Errors
///
/// Returns `TimeParseError` if the text is neither form.
pub fn parse_time_or_duration(
    text: &str,
    now: DateTime<Utc>,
) -> Result<Option<DateTime<Utc>>, TimeParseError> {
    let text = text.trim();
    if text.is_empty() {
        return Ok(None);
    }

    if let Ok(time) = DateTime::parse_from_rfc3339(text) {
        return Ok(Some(time.with_timezone(&Utc)));
    }

    parse_duration(text)
        .and_then(|delta| now.checked_add_signed(delta))
        .map(Some)
        .ok_or_else(|| TimeParseError(text.to_string()))
}

/// Parse `[+-]<n><unit>...` with units `h`, `m` and `s`. A bare `0` is allowed.
fn parse_duration(text: &str) -> Option<TimeDelta> {
    let (negative, rest) = match text.as_bytes().first()? {
        b'-' => (true, &text[1..]),
        b'+' => (false, &text[1..]),
        _ => (false, text),
    };

    if rest == "0" {
        return Some(TimeDelta::zero());
    }
    if rest.is_empty() {
        return None;
    }

    let mut total: i64 = 0;
    let mut digits = String::new();
    for c in rest.chars() {
        if c.is_ascii_digit() {
            digits.push(c);
            continue;
        }

        let unit = match c {
            'h' => 3600,
            'm' => 60,
            's' => 1,
            _ => return None,
        };
        if digits.is_empty() {
            return None;
        }
        let value: i64 = digits.parse().ok()?;
        total = total.checked_add(value.checked_mul(unit)?)?;
        digits.clear();
    }

    // Trailing number without a unit
    if !digits.is_empty() {
        return None;
    }

    let total = if negative { -total } else { total };
    TimeDelta::try_seconds(total)
}
