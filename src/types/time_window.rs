use chrono::{DateTime, Datelike, FixedOffset, Local, NaiveDateTime, Timelike, Utc};
use chrono_tz::Tz;
use thiserror::Error;
use tracing::warn;

use super::message::{Message, fields};

/// Attribute names accepted as time-window checks on a condition.
pub const TIME_ATTRIBUTES: &[&str] = &[
    "year",
    "yday",
    "mon",
    "mday",
    "week",
    "mweek",
    "wday",
    "hour",
    "minute",
    "minute-of-day",
    "time-of-day",
    "date-time",
];

const WEEKDAY_NAMES: [&str; 7] = ["sun", "mon", "tue", "wed", "thu", "fri", "sat"];

/// Outcome of checking a condition's time window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeMatch {
    Matched,
    NotMatched,
    /// The condition carries no time window.
    NotApplicable,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimeWindowError {
    #[error("unknown time attribute '{0}'")]
    UnknownAttribute(String),

    #[error("invalid value '{value}' for time attribute '{attribute}'")]
    InvalidValue { attribute: String, value: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DatePart {
    Year,
    YearDay,
    Month,
    MonthDay,
    Week,
    MonthWeek,
    WeekDay,
    Hour,
    Minute,
    MinuteOfDay,
}

impl DatePart {
    fn from_attribute(name: &str) -> Option<Self> {
        Some(match name {
            "year" => DatePart::Year,
            "yday" => DatePart::YearDay,
            "mon" => DatePart::Month,
            "mday" => DatePart::MonthDay,
            "week" => DatePart::Week,
            "mweek" => DatePart::MonthWeek,
            "wday" => DatePart::WeekDay,
            "hour" => DatePart::Hour,
            "minute" => DatePart::Minute,
            "minute-of-day" => DatePart::MinuteOfDay,
            _ => return None,
        })
    }

    fn bounds(self) -> (u32, u32) {
        match self {
            DatePart::Year => (0, 9999),
            DatePart::YearDay => (1, 366),
            DatePart::Month => (1, 12),
            DatePart::MonthDay => (1, 31),
            DatePart::Week => (1, 53),
            DatePart::MonthWeek => (1, 6),
            DatePart::WeekDay => (1, 7),
            DatePart::Hour => (0, 23),
            DatePart::Minute => (0, 59),
            DatePart::MinuteOfDay => (1, 1440),
        }
    }

    #[allow(clippy::cast_sign_loss)]
    fn extract(self, t: &NaiveDateTime) -> u32 {
        let wday = t.weekday().num_days_from_sunday() + 1;
        match self {
            DatePart::Year => t.year().max(0) as u32,
            DatePart::YearDay => t.ordinal(),
            DatePart::Month => t.month(),
            DatePart::MonthDay => t.day(),
            DatePart::Week => t.ordinal0() / 7 + 1,
            DatePart::MonthWeek => {
                let first_of_month = (wday - 1 + 35 - t.day0()) % 7;
                (t.day0() + first_of_month) / 7 + 1
            }
            DatePart::WeekDay => wday,
            DatePart::Hour => t.hour(),
            DatePart::Minute => t.minute(),
            DatePart::MinuteOfDay => t.hour() * 60 + t.minute() + 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Check {
    Part { part: DatePart, ranges: Vec<(u32, u32)> },
    TimeOfDay(Vec<(u32, u32)>),
    DateTime(Vec<(NaiveDateTime, NaiveDateTime)>),
}

impl Check {
    fn matches(&self, t: &NaiveDateTime) -> bool {
        match self {
            Check::Part { part, ranges } => {
                let value = part.extract(t);
                ranges.iter().any(|&(lo, hi)| in_range(value, lo, hi))
            }
            Check::TimeOfDay(ranges) => {
                let secs = t.num_seconds_from_midnight();
                ranges.iter().any(|&(lo, hi)| in_range(secs, lo, hi))
            }
            Check::DateTime(ranges) => ranges.iter().any(|(lo, hi)| lo <= t && t <= hi),
        }
    }
}

/// Inclusive range; `lo > hi` wraps around (e.g. `fri-mon`, `22:00-06:00`).
fn in_range(value: u32, lo: u32, hi: u32) -> bool {
    if lo <= hi {
        lo <= value && value <= hi
    } else {
        value >= lo || value <= hi
    }
}

/// A parsed date/time window. Every check must pass for the window to match.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeWindow {
    attributes: Vec<(String, String)>,
    checks: Vec<Check>,
}

impl TimeWindow {
    /// Parse `(attribute, value)` pairs. Returns `Ok(None)` when `attributes`
    /// is empty.
    ///
    /// # Errors
    ///
    /// Returns [`TimeWindowError`] for unknown attribute names or values that
    /// do not parse.
    pub fn parse(attributes: &[(String, String)]) -> Result<Option<Self>, TimeWindowError> {
        if attributes.is_empty() {
            return Ok(None);
        }
        let checks = attributes
            .iter()
            .map(|(name, value)| parse_check(name, value))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Some(Self {
            attributes: attributes.to_vec(),
            checks,
        }))
    }

    /// The attributes this window was parsed from, in source order.
    #[must_use]
    pub fn attributes(&self) -> &[(String, String)] {
        &self.attributes
    }

    /// `true` if every check passes for the given wall-clock time.
    #[must_use]
    pub fn matches(&self, local: &NaiveDateTime) -> bool {
        self.checks.iter().all(|c| c.matches(local))
    }
}

/// Evaluate an optional window at `now`, honoring the message's timezone
/// override.
#[must_use]
pub fn check_window(
    window: Option<&TimeWindow>,
    message: &Message,
    now: DateTime<Utc>,
) -> TimeMatch {
    let Some(window) = window else {
        return TimeMatch::NotApplicable;
    };
    let local = match resolve_zone(message) {
        Some(zone) => zone.local(now),
        None => now.with_timezone(&Local).naive_local(),
    };
    if window.matches(&local) {
        TimeMatch::Matched
    } else {
        TimeMatch::NotMatched
    }
}

/// Zone a time window is evaluated in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Zone {
    Fixed(FixedOffset),
    /// IANA zone; follows daylight saving.
    Named(Tz),
}

impl Zone {
    /// Wall-clock time in this zone at `now`.
    #[must_use]
    pub fn local(&self, now: DateTime<Utc>) -> NaiveDateTime {
        match self {
            Zone::Fixed(offset) => now.with_timezone(offset).naive_local(),
            Zone::Named(tz) => now.with_timezone(tz).naive_local(),
        }
    }
}

/// Timezone override carried by the message: a numeric `tod_tz_offset`
/// (hours) wins over a named `timezone`. `None` means local time.
#[must_use]
pub fn resolve_zone(message: &Message) -> Option<Zone> {
    let offset = message
        .get(fields::TOD_TZ_OFFSET)
        .and_then(|v| v.trim().parse::<i32>().ok())
        .and_then(|hours| FixedOffset::east_opt(hours.checked_mul(3600)?));
    if let Some(offset) = offset {
        return Some(Zone::Fixed(offset));
    }
    let name = message.get(fields::TIMEZONE).filter(|v| !v.trim().is_empty())?;
    let zone = named_zone(name);
    if zone.is_none() {
        warn!(timezone = name, "unknown timezone, using local time");
    }
    zone
}

/// Resolve a zone name: an IANA name (`America/New_York`), then `UTC`,
/// `±HH[:MM]`, `GMT±H`, or a common abbreviation.
#[must_use]
pub fn named_zone(name: &str) -> Option<Zone> {
    let name = name.trim();
    if let Ok(tz) = name.parse::<Tz>() {
        return Some(Zone::Named(tz));
    }
    fixed_zone(name).map(Zone::Fixed)
}

fn fixed_zone(name: &str) -> Option<FixedOffset> {
    let upper = name.to_ascii_uppercase();
    let minutes = match upper.as_str() {
        "UTC" | "GMT" | "UCT" | "Z" | "ETC/UTC" | "ETC/GMT" => 0,
        "EST" => -300,
        "EDT" | "AST" => -240,
        "CST" => -360,
        "CDT" => -300,
        "MST" => -420,
        "MDT" => -360,
        "PST" => -480,
        "PDT" => -420,
        "CET" | "BST" | "WAT" => 60,
        "CEST" | "EET" | "SAST" => 120,
        "EEST" | "MSK" => 180,
        "IST" => 330,
        "CST8" | "HKT" | "SGT" | "AWST" => 480,
        "JST" | "KST" => 540,
        "AEST" => 600,
        other => {
            let rest = other
                .strip_prefix("UTC")
                .or_else(|| other.strip_prefix("GMT"))
                .unwrap_or(other);
            parse_signed_offset(rest)?
        }
    };
    FixedOffset::east_opt(minutes * 60)
}

/// `+5`, `-03`, `+05:30`, `+0530` → minutes east of UTC.
fn parse_signed_offset(s: &str) -> Option<i32> {
    let (sign, digits) = match s.as_bytes().first()? {
        b'+' => (1, &s[1..]),
        b'-' => (-1, &s[1..]),
        _ => return None,
    };
    let (hours, minutes) = match digits.split_once(':') {
        Some((h, m)) => (h, m),
        None if digits.len() == 4 => digits.split_at(2),
        None => (digits, "0"),
    };
    let hours: i32 = hours.parse().ok()?;
    let minutes: i32 = minutes.parse().ok()?;
    if hours > 14 || minutes >= 60 {
        return None;
    }
    Some(sign * (hours * 60 + minutes))
}

fn parse_check(name: &str, value: &str) -> Result<Check, TimeWindowError> {
    let invalid = || TimeWindowError::InvalidValue {
        attribute: name.to_owned(),
        value: value.to_owned(),
    };
    match name {
        "time-of-day" => value
            .split(',')
            .map(|r| parse_tod_range(r).ok_or_else(invalid))
            .collect::<Result<_, _>>()
            .map(Check::TimeOfDay),
        "date-time" => value
            .split(',')
            .map(|r| parse_datetime_range(r).ok_or_else(invalid))
            .collect::<Result<_, _>>()
            .map(Check::DateTime),
        other => {
            let part = DatePart::from_attribute(other)
                .ok_or_else(|| TimeWindowError::UnknownAttribute(other.to_owned()))?;
            let ranges = value
                .split(',')
                .map(|r| parse_part_range(part, r).ok_or_else(invalid))
                .collect::<Result<_, _>>()?;
            Ok(Check::Part { part, ranges })
        }
    }
}

fn parse_part_range(part: DatePart, range: &str) -> Option<(u32, u32)> {
    let range = range.trim();
    let (lo, hi) = match range.split_once('-') {
        Some((lo, hi)) => (lo, hi),
        None => (range, range),
    };
    let lo = parse_part_value(part, lo)?;
    let hi = parse_part_value(part, hi)?;
    let (min, max) = part.bounds();
    ((min..=max).contains(&lo) && (min..=max).contains(&hi)).then_some((lo, hi))
}

fn parse_part_value(part: DatePart, token: &str) -> Option<u32> {
    let token = token.trim();
    if part == DatePart::WeekDay {
        let lower = token.to_ascii_lowercase();
        if let Some(idx) = WEEKDAY_NAMES
            .iter()
            .position(|d| lower.len() >= 3 && lower.starts_with(d))
        {
            return u32::try_from(idx + 1).ok();
        }
    }
    token.parse().ok()
}

fn parse_tod_range(range: &str) -> Option<(u32, u32)> {
    let (lo, hi) = range.trim().split_once('-')?;
    Some((parse_clock(lo)?, parse_clock(hi)?))
}

fn parse_clock(s: &str) -> Option<u32> {
    let mut parts = s.trim().split(':');
    let h: u32 = parts.next()?.parse().ok()?;
    let m: u32 = parts.next()?.parse().ok()?;
    let sec: u32 = parts.next().map_or(Some(0), |p| p.parse().ok())?;
    if parts.next().is_some() || h > 23 || m > 59 || sec > 59 {
        return None;
    }
    Some(h * 3600 + m * 60 + sec)
}

fn parse_datetime_range(range: &str) -> Option<(NaiveDateTime, NaiveDateTime)> {
    let (lo, hi) = range.split_once('~')?;
    Some((parse_datetime(lo)?, parse_datetime(hi)?))
}

fn parse_datetime(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M"))
        .ok()
}
