//! Recurring exclusion windows.
//!
//! Every literal boundary of the working day (20:00, 09:00, 12:00, 12:30) lives
//! here. Segmentation asks the rule set for the windows of a given day and
//! never builds one itself.

use chrono::{Datelike, NaiveDate, NaiveTime, Weekday};
use chrono_tz::Tz;
use thiserror::Error;

use crate::interval::TimeInterval;

/// Invalid rule configuration.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RuleError {
    /// A window starts and ends at the same wall-clock time.
    #[error("{rule} window cannot start and end at {at}")]
    EmptyWindow { rule: &'static str, at: NaiveTime },

    /// The lunch window wraps past midnight.
    #[error("lunch window {start}-{end} crosses midnight")]
    LunchCrossesMidnight { start: NaiveTime, end: NaiveTime },

    /// The lunch window overlaps the night window.
    #[error("lunch window {lunch_start}-{lunch_end} is outside working hours {day_start}-{day_end}")]
    LunchOutsideWorkingHours {
        lunch_start: NaiveTime,
        lunch_end: NaiveTime,
        day_start: NaiveTime,
        day_end: NaiveTime,
    },
}

/// A daily wall-clock window. When `end <= start` it runs into the next day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DailyWindow {
    start: NaiveTime,
    end: NaiveTime,
}

impl DailyWindow {
    /// Creates a window; `rule` names it in errors.
    pub fn new(rule: &'static str, start: NaiveTime, end: NaiveTime) -> Result<Self, RuleError> {
        if start == end {
            return Err(RuleError::EmptyWindow { rule, at: start });
        }
        Ok(Self { start, end })
    }

    pub const fn start(&self) -> NaiveTime {
        self.start
    }

    pub const fn end(&self) -> NaiveTime {
        self.end
    }

    /// Whether the window wraps past midnight.
    pub fn crosses_midnight(&self) -> bool {
        self.end <= self.start
    }

    fn on(&self, day: NaiveDate, tz: Tz) -> Option<TimeInterval> {
        let end_day = if self.crosses_midnight() {
            day.succ_opt()?
        } else {
            day
        };
        TimeInterval::new(day.and_time(self.start), end_day.and_time(self.end), tz).ok()
    }
}

/// The set of windows stripped from recorded work.
///
/// Weekend days are excluded whole. The night window starts on one day and
/// ends on the next; the lunch window sits inside the working day between
/// them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExclusionRuleSet {
    timezone: Tz,
    weekend_days: Vec<Weekday>,
    night: Option<DailyWindow>,
    lunch: Option<DailyWindow>,
}

impl ExclusionRuleSet {
    /// Builds a rule set, validating that lunch falls inside working hours.
    pub fn new(
        timezone: Tz,
        weekend_days: impl IntoIterator<Item = Weekday>,
        night: Option<DailyWindow>,
        lunch: Option<DailyWindow>,
    ) -> Result<Self, RuleError> {
        let mut days: Vec<Weekday> = Vec::new();
        for day in weekend_days {
            if !days.contains(&day) {
                days.push(day);
            }
        }

        if let Some(lunch) = lunch {
            if lunch.crosses_midnight() {
                return Err(RuleError::LunchCrossesMidnight {
                    start: lunch.start,
                    end: lunch.end,
                });
            }
            if let Some(night) = night {
                let inside = if night.crosses_midnight() {
                    lunch.start >= night.end && lunch.end <= night.start
                } else {
                    // Night confined to one day: lunch must avoid it entirely
                    lunch.end <= night.start || lunch.start >= night.end
                };
                if !inside {
                    return Err(RuleError::LunchOutsideWorkingHours {
                        lunch_start: lunch.start,
                        lunch_end: lunch.end,
                        day_start: night.end,
                        day_end: night.start,
                    });
                }
            }
        }

        Ok(Self {
            timezone,
            weekend_days: days,
            night,
            lunch,
        })
    }

    /// Saturday and Sunday off, nights from 20:00 to 09:00, lunch 12:00 to 12:30.
    pub fn standard(timezone: Tz) -> Self {
        Self {
            timezone,
            weekend_days: vec![Weekday::Sat, Weekday::Sun],
            night: Some(DailyWindow {
                start: hm(20, 0),
                end: hm(9, 0),
            }),
            lunch: Some(DailyWindow {
                start: hm(12, 0),
                end: hm(12, 30),
            }),
        }
    }

    /// Only the standard lunch break.
    pub fn lunch_only(timezone: Tz) -> Self {
        Self {
            weekend_days: Vec::new(),
            night: None,
            ..Self::standard(timezone)
        }
    }

    pub const fn timezone(&self) -> Tz {
        self.timezone
    }

    pub fn weekend_days(&self) -> &[Weekday] {
        &self.weekend_days
    }

    pub const fn night(&self) -> Option<DailyWindow> {
        self.night
    }

    pub const fn lunch(&self) -> Option<DailyWindow> {
        self.lunch
    }

    pub fn is_weekend(&self, day: NaiveDate) -> bool {
        self.weekend_days.contains(&day.weekday())
    }

    /// The night window starting on `day`, e.g. `[day 20:00, day+1 09:00)`.
    pub fn night_window_for(&self, day: NaiveDate) -> Option<TimeInterval> {
        self.night.and_then(|window| window.on(day, self.timezone))
    }

    /// The lunch window of `day`, e.g. `[day 12:00, day 12:30)`.
    pub fn lunch_window_for(&self, day: NaiveDate) -> Option<TimeInterval> {
        self.lunch.and_then(|window| window.on(day, self.timezone))
    }
}

fn hm(hour: u32, minute: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(hour, minute, 0).unwrap_or(NaiveTime::MIN)
}
