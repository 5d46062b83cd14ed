//! Shared utilities for CLI commands.

use anyhow::Context;
use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use chrono_tz::Tz;
use wt_core::wall_clock_to_utc;

/// Parses a datetime as RFC 3339 or as wall-clock time in `tz`.
///
/// Supports:
/// - RFC 3339: "2025-01-28T10:30:00Z", "2025-01-28T11:30:00+01:00"
/// - Wall clock: "2025-01-28 11:30", "2025-01-28T11:30"
pub fn parse_datetime(s: &str, tz: Tz) -> anyhow::Result<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }

    let wall = ["%Y-%m-%d %H:%M", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(s, format).ok())
        .with_context(|| {
            format!("Invalid datetime: {s}. Use RFC 3339 (e.g., 2025-01-28T10:30:00Z) or 'YYYY-MM-DD HH:MM'")
        })?;
    wall_clock_to_utc(tz, wall).with_context(|| format!("{s} does not exist in {tz}"))
}

/// Today's date in `tz`.
pub fn today_in(tz: Tz) -> NaiveDate {
    Utc::now().with_timezone(&tz).date_naive()
}

/// From local midnight `days` days before `today` to the last second of `today`.
pub fn lookback_range(
    today: NaiveDate,
    days: u32,
    tz: Tz,
) -> anyhow::Result<(DateTime<Utc>, DateTime<Utc>)> {
    let first = today - Duration::days(i64::from(days));
    let start = wall_clock_to_utc(tz, first.and_time(NaiveTime::MIN))
        .with_context(|| format!("no midnight on {first} in {tz}"))?;
    let last_second = NaiveTime::from_hms_opt(23, 59, 59).unwrap_or(NaiveTime::MIN);
    let end = wall_clock_to_utc(tz, today.and_time(last_second))
        .with_context(|| format!("no end of day on {today} in {tz}"))?;
    Ok((start, end))
}
