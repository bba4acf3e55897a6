use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

pub const DEFAULT_REFERENCE_DATE: &str = "2025-02-10";

const DATE_TIME_FORMATS: &[&str] = &[
    "%Y/%m/%d %H:%M:%S%.f",
    "%Y/%m/%d %H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y.%m.%d %H:%M:%S%.f",
];

const DATE_FORMATS: &[&str] = &["%Y/%m/%d", "%Y-%m-%d", "%Y.%m.%d"];

pub fn has_calendar_date(text: &str) -> bool {
    let bytes = text.as_bytes();
    bytes.windows(10).any(|w| {
        w[..4].iter().all(u8::is_ascii_digit)
            && w[5..7].iter().all(u8::is_ascii_digit)
            && w[8..10].iter().all(u8::is_ascii_digit)
    })
}

/// Raw timestamp text alongside its normalized instant.
///
/// Unparseable text keeps `instant == None`; such timestamps order after all
/// parsed ones and never match anything.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timestamp {
    pub raw: String,
    pub instant: Option<NaiveDateTime>,
}

impl Timestamp {
    pub fn is_valid(&self) -> bool {
        self.instant.is_some()
    }

    pub fn cmp_instant(&self, other: &Self) -> Ordering {
        match (self.instant, other.instant) {
            (Some(a), Some(b)) => a.cmp(&b),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        }
    }

    pub fn abs_diff(&self, other: &Self) -> Option<Duration> {
        let (a, b) = (self.instant?, other.instant?);
        Some(if a >= b { a - b } else { b - a })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimestampParser {
    reference_date: NaiveDate,
}

impl Default for TimestampParser {
    fn default() -> Self {
        Self {
            reference_date: NaiveDate::from_ymd_opt(2025, 2, 10).unwrap_or(NaiveDate::MIN),
        }
    }
}

impl TimestampParser {
    pub fn new(reference_date: NaiveDate) -> Self {
        Self { reference_date }
    }

    pub fn reference_date(&self) -> NaiveDate {
        self.reference_date
    }

    /// Apply the normalization rule: text without a calendar date is
    /// prefixed with the reference date.
    pub fn widen(&self, raw: &str) -> String {
        let trimmed = raw.trim();
        if has_calendar_date(trimmed) {
            trimmed.to_string()
        } else {
            format!("{} {}", self.reference_date.format("%Y/%m/%d"), trimmed)
        }
    }

    pub fn parse(&self, raw: &str) -> Option<NaiveDateTime> {
        if raw.trim().is_empty() {
            return None;
        }
        let text = self.widen(raw);
        DATE_TIME_FORMATS
            .iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(&text, fmt).ok())
            .or_else(|| {
                DateTime::parse_from_rfc3339(&text)
                    .ok()
                    .map(|dt| dt.naive_local())
            })
            .or_else(|| {
                DATE_FORMATS
                    .iter()
                    .find_map(|fmt| NaiveDate::parse_from_str(&text, fmt).ok())
                    .and_then(|d| d.and_hms_opt(0, 0, 0))
            })
    }

    pub fn normalize(&self, raw: &str) -> Timestamp {
        Timestamp {
            raw: raw.to_string(),
            instant: self.parse(raw),
        }
    }
}
