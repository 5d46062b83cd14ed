//! Half-open wall-clock intervals.
//!
//! Every comparison in this module is made on the wall-clock value in the
//! configured zone, never on the absolute instant. A day that contains a DST
//! transition is therefore still a 09:00 to 20:00 day for the rules, which is
//! what a person reading their timesheet expects.

use std::fmt;

use chrono::{DateTime, Duration, LocalResult, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use serde::Serialize;
use thiserror::Error;

/// Errors raised when building or converting an interval.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IntervalError {
    /// The end is not strictly after the start.
    #[error("interval end {end} is not after start {start}")]
    EndNotAfterStart {
        start: NaiveDateTime,
        end: NaiveDateTime,
    },

    /// The wall-clock time cannot be mapped to an instant in the zone.
    #[error("{wall} does not exist in {tz}")]
    NonexistentLocalTime { wall: NaiveDateTime, tz: Tz },
}

/// An immutable half-open range `[start, end)` of wall-clock time in one zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimeInterval {
    start: NaiveDateTime,
    end: NaiveDateTime,
    timezone: Tz,
}

impl TimeInterval {
    /// Creates an interval from wall-clock endpoints.
    pub fn new(start: NaiveDateTime, end: NaiveDateTime, timezone: Tz) -> Result<Self, IntervalError> {
        if end <= start {
            return Err(IntervalError::EndNotAfterStart { start, end });
        }
        Ok(Self {
            start,
            end,
            timezone,
        })
    }

    /// Creates an interval from absolute instants, viewed in `timezone`.
    ///
    /// Inside a DST fall-back the wall clock runs backwards, so a positive
    /// span can end before it starts on the wall. Such an interval keeps its
    /// wall start and its real length.
    pub fn from_utc(
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        timezone: Tz,
    ) -> Result<Self, IntervalError> {
        let start_wall = start.with_timezone(&timezone).naive_local();
        let mut end_wall = end.with_timezone(&timezone).naive_local();
        if end > start && end_wall <= start_wall {
            end_wall = start_wall + (end - start);
        }
        Self::new(start_wall, end_wall, timezone)
    }

    /// Wall-clock start (inclusive).
    pub const fn start(&self) -> NaiveDateTime {
        self.start
    }

    /// Wall-clock end (exclusive).
    pub const fn end(&self) -> NaiveDateTime {
        self.end
    }

    pub const fn timezone(&self) -> Tz {
        self.timezone
    }

    /// Wall-clock length of the interval.
    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    /// Whether the two intervals share any instant. Touching endpoints do not.
    pub fn overlaps(&self, other: &Self) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// The overlapping portion of both intervals, if any.
    pub fn intersect_clip(&self, other: &Self) -> Option<Self> {
        let start = self.start.max(other.start);
        let end = self.end.min(other.end);
        (start < end).then_some(Self {
            start,
            end,
            timezone: self.timezone,
        })
    }

    /// The part of the interval that falls on `day`, from midnight to midnight.
    pub fn within_day(&self, day: NaiveDate) -> Option<Self> {
        let next = day.succ_opt()?;
        let whole_day = Self {
            start: day.and_time(NaiveTime::MIN),
            end: next.and_time(NaiveTime::MIN),
            timezone: self.timezone,
        };
        self.intersect_clip(&whole_day)
    }

    /// Removes `window` from the interval, leaving at most two pieces in order.
    pub fn subtract(&self, window: &Self) -> Vec<Self> {
        if !self.overlaps(window) {
            return vec![*self];
        }

        let mut pieces = Vec::with_capacity(2);
        if self.start < window.start {
            pieces.push(Self {
                start: self.start,
                end: window.start,
                timezone: self.timezone,
            });
        }
        if window.end < self.end {
            pieces.push(Self {
                start: window.end,
                end: self.end,
                timezone: self.timezone,
            });
        }
        pieces
    }

    /// The last calendar day containing part of the interval.
    ///
    /// An interval ending exactly at midnight does not touch the following day.
    pub fn last_day(&self) -> NaiveDate {
        let end_day = self.end.date();
        if self.end.time() == NaiveTime::MIN && end_day > self.start.date() {
            end_day.pred_opt().unwrap_or(end_day)
        } else {
            end_day
        }
    }

    /// Calendar days the interval touches, in chronological order.
    pub fn days(&self) -> impl Iterator<Item = NaiveDate> + use<> {
        let last = self.last_day();
        self.start
            .date()
            .iter_days()
            .take_while(move |day| *day <= last)
    }

    /// The start as an absolute instant.
    pub fn start_utc(&self) -> Result<DateTime<Utc>, IntervalError> {
        wall_clock_to_utc(self.timezone, self.start)
    }

    /// The end as an absolute instant.
    pub fn end_utc(&self) -> Result<DateTime<Utc>, IntervalError> {
        wall_clock_to_utc(self.timezone, self.end)
    }
}

impl fmt::Display for TimeInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.start.format("%a %Y-%m-%d %H:%M"))?;
        if self.end.date() == self.start.date() {
            write!(f, "..{}", self.end.format("%H:%M"))
        } else {
            write!(f, "..{}", self.end.format("%a %Y-%m-%d %H:%M"))
        }
    }
}

/// Maps a wall-clock time in `tz` to an instant.
///
/// Ambiguous times (DST fall-back) take the earlier instant. Times inside a
/// spring-forward gap are moved one hour later, past the gap.
pub fn wall_clock_to_utc(tz: Tz, wall: NaiveDateTime) -> Result<DateTime<Utc>, IntervalError> {
    match tz.from_local_datetime(&wall) {
        LocalResult::Single(dt) | LocalResult::Ambiguous(dt, _) => Ok(dt.with_timezone(&Utc)),
        LocalResult::None => tz
            .from_local_datetime(&(wall + Duration::hours(1)))
            .earliest()
            .map(|dt| dt.with_timezone(&Utc))
            .ok_or(IntervalError::NonexistentLocalTime { wall, tz }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono_tz::Europe::Paris;

    fn at(date: &str, time: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(&format!("{date} {time}"), "%Y-%m-%d %H:%M").unwrap()
    }

    fn interval(start: NaiveDateTime, end: NaiveDateTime) -> TimeInterval {
        TimeInterval::new(start, end, Paris).unwrap()
    }

    #[test]
    fn rejects_end_before_or_equal_start() {
        let t = at("2025-01-28", "10:00");
        assert!(matches!(
            TimeInterval::new(t, t, Paris),
            Err(IntervalError::EndNotAfterStart { .. })
        ));
        assert!(TimeInterval::new(t, at("2025-01-28", "09:00"), Paris).is_err());
    }

    #[test]
    fn from_utc_inside_repeated_fall_back_hour_keeps_real_length() {
        // 02:50 CEST to 02:10 CET on 2025-10-26
        let span = TimeInterval::from_utc(
            "2025-10-26T00:50:00Z".parse().unwrap(),
            "2025-10-26T01:10:00Z".parse().unwrap(),
            Paris,
        )
        .unwrap();
        assert_eq!(span.start(), at("2025-10-26", "02:50"));
        assert_eq!(span.end(), at("2025-10-26", "03:10"));
        assert_eq!(span.duration(), Duration::minutes(20));
    }

    #[test]
    fn from_utc_still_rejects_reversed_instants() {
        let result = TimeInterval::from_utc(
            "2025-10-26T01:10:00Z".parse().unwrap(),
            "2025-10-26T00:50:00Z".parse().unwrap(),
            Paris,
        );
        assert!(matches!(result, Err(IntervalError::EndNotAfterStart { .. })));
    }

    #[test]
    fn wall_clock_to_utc_resolves_dst_edges() {
        // Ambiguous 02:30 on fall-back takes the CEST instant
        assert_eq!(
            wall_clock_to_utc(Paris, at("2025-10-26", "02:30")).unwrap(),
            "2025-10-26T00:30:00Z".parse::<DateTime<Utc>>().unwrap()
        );
        // 02:30 on spring-forward does not exist and moves to 03:30 CEST
        assert_eq!(
            wall_clock_to_utc(Paris, at("2025-03-30", "02:30")).unwrap(),
            "2025-03-30T01:30:00Z".parse::<DateTime<Utc>>().unwrap()
        );
    }

    #[test]
    fn touching_intervals_do_not_overlap() {
        let morning = interval(at("2025-01-28", "09:00"), at("2025-01-28", "12:00"));
        let lunch = interval(at("2025-01-28", "12:00"), at("2025-01-28", "12:30"));
        assert!(!morning.overlaps(&lunch));
        assert!(!lunch.overlaps(&morning));
        assert!(morning.intersect_clip(&lunch).is_none());
    }

    #[test]
    fn intersect_clip_returns_common_part() {
        let a = interval(at("2025-01-28", "09:00"), at("2025-01-28", "13:00"));
        let b = interval(at("2025-01-28", "12:00"), at("2025-01-28", "15:00"));
        let common = a.intersect_clip(&b).unwrap();
        assert_eq!(common.start(), at("2025-01-28", "12:00"));
        assert_eq!(common.end(), at("2025-01-28", "13:00"));
    }

    #[test]
    fn subtract_splits_around_inner_window() {
        let work = interval(at("2025-01-28", "11:45"), at("2025-01-28", "12:45"));
        let lunch = interval(at("2025-01-28", "12:00"), at("2025-01-28", "12:30"));
        let pieces = work.subtract(&lunch);
        assert_eq!(
            pieces,
            vec![
                interval(at("2025-01-28", "11:45"), at("2025-01-28", "12:00")),
                interval(at("2025-01-28", "12:30"), at("2025-01-28", "12:45")),
            ]
        );
    }

    #[test]
    fn subtract_covering_window_leaves_nothing() {
        let work = interval(at("2025-01-28", "12:05"), at("2025-01-28", "12:20"));
        let lunch = interval(at("2025-01-28", "12:00"), at("2025-01-28", "12:30"));
        assert!(work.subtract(&lunch).is_empty());
    }

    #[test]
    fn within_day_clips_to_midnight_boundaries() {
        let span = interval(at("2025-01-27", "18:00"), at("2025-01-29", "10:00"));
        let middle = span
            .within_day(NaiveDate::from_ymd_opt(2025, 1, 28).unwrap())
            .unwrap();
        assert_eq!(middle.start(), at("2025-01-28", "00:00"));
        assert_eq!(middle.end(), at("2025-01-29", "00:00"));
        assert!(
            span.within_day(NaiveDate::from_ymd_opt(2025, 1, 30).unwrap())
                .is_none()
        );
    }

    #[test]
    fn days_excludes_day_starting_at_exclusive_end() {
        let span = interval(at("2025-01-27", "18:00"), at("2025-01-29", "00:00"));
        let days: Vec<_> = span.days().collect();
        assert_eq!(
            days,
            vec![
                NaiveDate::from_ymd_opt(2025, 1, 27).unwrap(),
                NaiveDate::from_ymd_opt(2025, 1, 28).unwrap(),
            ]
        );
    }

    #[test]
    fn from_utc_views_instants_in_zone() {
        let start = "2025-01-28T10:45:00Z".parse::<DateTime<Utc>>().unwrap();
        let end = "2025-01-28T11:45:00Z".parse::<DateTime<Utc>>().unwrap();
        let span = TimeInterval::from_utc(start, end, Paris).unwrap();
        assert_eq!(span.start(), at("2025-01-28", "11:45"));
        assert_eq!(span.start_utc().unwrap(), start);
        assert_eq!(span.end_utc().unwrap(), end);
    }

    #[test]
    fn wall_clock_in_spring_gap_moves_past_gap() {
        // 2025-03-30 02:30 does not exist in Paris
        let span = interval(at("2025-03-30", "02:30"), at("2025-03-30", "04:00"));
        let start = span.start_utc().unwrap();
        assert_eq!(start, "2025-03-30T01:30:00Z".parse::<DateTime<Utc>>().unwrap());
    }

    #[test]
    fn ambiguous_wall_clock_takes_earlier_instant() {
        // 02:30 happens twice on 2025-10-26 in Paris
        let span = interval(at("2025-10-26", "02:30"), at("2025-10-26", "04:00"));
        let start = span.start_utc().unwrap();
        assert_eq!(start, "2025-10-26T00:30:00Z".parse::<DateTime<Utc>>().unwrap());
    }

    #[test]
    fn display_shortens_same_day_end() {
        let span = interval(at("2025-01-28", "11:45"), at("2025-01-28", "12:00"));
        assert_eq!(span.to_string(), "Tue 2025-01-28 11:45..12:00");

        let overnight = interval(at("2025-01-27", "18:00"), at("2025-01-28", "10:00"));
        assert_eq!(
            overnight.to_string(),
            "Mon 2025-01-27 18:00..Tue 2025-01-28 10:00"
        );
    }
}
