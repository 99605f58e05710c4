//! Parsing of user-supplied dates and times.
//!
//! Input is interpreted in local time (that is how people schedule things)
//! and converted to UTC at the edge.

use anyhow::{Context, Result, anyhow};
use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, TimeZone, Utc};

/// Parse a calendar day (YYYY-MM-DD).
pub fn parse_day(input: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(input, "%Y-%m-%d")
        .with_context(|| format!("Invalid day '{input}' (expected YYYY-MM-DD)"))
}

/// Parse a month (YYYY-MM), returning its first day.
pub fn parse_month(input: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(&format!("{input}-01"), "%Y-%m-%d")
        .with_context(|| format!("Invalid month '{input}' (expected YYYY-MM)"))
}

/// Parse a date/time, accepting the datetime-local format
/// ("2025-03-20T15:00"), a plain day (midnight), or a fuzzy phrase
/// ("tomorrow 9am").
pub fn parse_when(input: &str) -> Result<DateTime<Utc>> {
    let exact = NaiveDateTime::parse_from_str(input, "%Y-%m-%dT%H:%M")
        .or_else(|_| NaiveDateTime::parse_from_str(input, "%Y-%m-%d %H:%M"))
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(input, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        });

    let naive = match exact {
        Some(naive) => naive,
        None => fuzzydate::parse(input)
            .map_err(|e| anyhow!("Invalid date/time '{input}': {e:?}"))?,
    };

    Local
        .from_local_datetime(&naive)
        .single()
        .ok_or_else(|| anyhow!("Ambiguous local time '{input}'"))
        .map(|local| local.with_timezone(&Utc))
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_days_and_months() {
        assert_eq!(
            parse_day("2025-03-20").unwrap(),
            NaiveDate::from_ymd_opt(2025, 3, 20).unwrap()
        );
        assert_eq!(
            parse_month("2025-03").unwrap(),
            NaiveDate::from_ymd_opt(2025, 3, 1).unwrap()
        );
        assert!(parse_day("20.03.2025").is_err());
        assert!(parse_month("March").is_err());
    }

    #[test]
    fn parses_datetime_local_input_as_local_time() {
        let parsed = parse_when("2025-03-20T15:00").unwrap();
        let expected = Local
            .with_ymd_and_hms(2025, 3, 20, 15, 0, 0)
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(parsed, expected);
    }

    #[test]
    fn plain_day_means_local_midnight() {
        let parsed = parse_when("2025-03-20").unwrap();
        let expected = Local
            .with_ymd_and_hms(2025, 3, 20, 0, 0, 0)
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(parsed, expected);
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_when("whenever").is_err());
    }
}
