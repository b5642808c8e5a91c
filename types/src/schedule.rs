//! Weekly comfort schedules.
//!
//! A [`Schedule`] maps each [`Weekday`] to the time windows during which a room
//! should be held at its comfort temperature. Windows are written `HH:MM-HH:MM`
//! and are evaluated against local wall-clock time.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{Datelike, NaiveDateTime, NaiveTime, Weekday as ChronoWeekday};
use serde::{Deserialize, Serialize};
use thiserror::Error;

const TIME_FORMAT: &str = "%H:%M";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Weekday {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

const WEEKDAY_VALUES: &[&str] = &[
    "monday",
    "tuesday",
    "wednesday",
    "thursday",
    "friday",
    "saturday",
    "sunday",
];

impl Weekday {
    pub fn parse(value: &str) -> Result<Self, ScheduleError> {
        match value.trim().to_ascii_lowercase().as_str() {
            "monday" => Ok(Self::Monday),
            "tuesday" => Ok(Self::Tuesday),
            "wednesday" => Ok(Self::Wednesday),
            "thursday" => Ok(Self::Thursday),
            "friday" => Ok(Self::Friday),
            "saturday" => Ok(Self::Saturday),
            "sunday" => Ok(Self::Sunday),
            _ => Err(ScheduleError::UnknownWeekday {
                raw: value.to_string(),
                expected: WEEKDAY_VALUES,
            }),
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Monday => "monday",
            Self::Tuesday => "tuesday",
            Self::Wednesday => "wednesday",
            Self::Thursday => "thursday",
            Self::Friday => "friday",
            Self::Saturday => "saturday",
            Self::Sunday => "sunday",
        }
    }
}

impl From<ChronoWeekday> for Weekday {
    fn from(value: ChronoWeekday) -> Self {
        match value {
            ChronoWeekday::Mon => Self::Monday,
            ChronoWeekday::Tue => Self::Tuesday,
            ChronoWeekday::Wed => Self::Wednesday,
            ChronoWeekday::Thu => Self::Thursday,
            ChronoWeekday::Fri => Self::Friday,
            ChronoWeekday::Sat => Self::Saturday,
            ChronoWeekday::Sun => Self::Sunday,
        }
    }
}

impl fmt::Display for Weekday {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScheduleError {
    #[error("invalid weekday '{raw}'; expected one of: {expected:?}")]
    UnknownWeekday {
        raw: String,
        expected: &'static [&'static str],
    },
    #[error("time window '{0}' must have the form HH:MM-HH:MM")]
    MalformedWindow(String),
    #[error("invalid time '{time}' in window '{window}'")]
    InvalidTime { window: String, time: String },
}

/// A daily time window, `start` and `end` both exclusive.
///
/// Windows do not wrap past midnight: when `end` is not after `start` the
/// window never contains any time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TimeWindow {
    start: NaiveTime,
    end: NaiveTime,
}

impl TimeWindow {
    #[must_use]
    pub const fn new(start: NaiveTime, end: NaiveTime) -> Self {
        Self { start, end }
    }

    pub fn parse(raw: &str) -> Result<Self, ScheduleError> {
        let (start, end) = raw
            .split_once('-')
            .ok_or_else(|| ScheduleError::MalformedWindow(raw.to_string()))?;
        if end.contains('-') {
            return Err(ScheduleError::MalformedWindow(raw.to_string()));
        }

        let parse_time = |time: &str| {
            NaiveTime::parse_from_str(time.trim(), TIME_FORMAT).map_err(|_| {
                ScheduleError::InvalidTime {
                    window: raw.to_string(),
                    time: time.trim().to_string(),
                }
            })
        };

        Ok(Self {
            start: parse_time(start)?,
            end: parse_time(end)?,
        })
    }

    #[must_use]
    pub const fn start(&self) -> NaiveTime {
        self.start
    }

    #[must_use]
    pub const fn end(&self) -> NaiveTime {
        self.end
    }

    #[must_use]
    pub fn contains(&self, time: NaiveTime) -> bool {
        self.start < time && time < self.end
    }
}

impl fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-{}",
            self.start.format(TIME_FORMAT),
            self.end.format(TIME_FORMAT)
        )
    }
}

impl TryFrom<String> for TimeWindow {
    type Error = ScheduleError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<TimeWindow> for String {
    fn from(value: TimeWindow) -> Self {
        value.to_string()
    }
}

/// Returns true when `now` lies strictly between `start` and `end` (`HH:MM`).
///
/// Unparsable bounds are treated as "not in range".
#[must_use]
pub fn time_in_range(start: &str, end: &str, now: NaiveTime) -> bool {
    let parse = |time: &str| NaiveTime::parse_from_str(time.trim(), TIME_FORMAT);
    match (parse(start), parse(end)) {
        (Ok(start), Ok(end)) => TimeWindow::new(start, end).contains(now),
        _ => false,
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Schedule(BTreeMap<Weekday, Vec<TimeWindow>>);

impl Schedule {
    #[must_use]
    pub fn new(days: BTreeMap<Weekday, Vec<TimeWindow>>) -> Self {
        Self(days)
    }

    #[must_use]
    pub fn windows_for(&self, day: Weekday) -> Option<&[TimeWindow]> {
        self.0.get(&day).map(Vec::as_slice)
    }

    /// Whether any window of `now`'s weekday contains `now`'s time of day.
    #[must_use]
    pub fn is_active(&self, now: NaiveDateTime) -> bool {
        self.windows_for(now.weekday().into())
            .is_some_and(|windows| windows.iter().any(|w| w.contains(now.time())))
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.values().all(Vec::is_empty)
    }
}
