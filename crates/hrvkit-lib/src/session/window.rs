use super::{
    records::HrvRecord,
    timestamp::{Timestamp, TimestampParser},
};
use crate::metrics::stats::{mean, welch_t_test};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum WindowError {
    #[error("window {0} bound is empty")]
    MissingBound(&'static str),
    #[error("cannot parse window bound {0:?}")]
    Unparseable(String),
}

/// Inclusive time range `[start, end]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl TimeWindow {
    /// Parse both bounds with the same normalization applied to records.
    pub fn parse(start: &str, end: &str, parser: &TimestampParser) -> Result<Self, WindowError> {
        let bound = |text: &str, which: &'static str| {
            if text.trim().is_empty() {
                return Err(WindowError::MissingBound(which));
            }
            parser
                .parse(text)
                .ok_or_else(|| WindowError::Unparseable(text.to_string()))
        };
        Ok(Self {
            start: bound(start, "start")?,
            end: bound(end, "end")?,
        })
    }

    pub fn contains(&self, ts: &Timestamp) -> bool {
        ts.instant
            .map_or(false, |t| self.start <= t && t <= self.end)
    }
}

pub fn filter_window<'a>(records: &'a [HrvRecord], window: &TimeWindow) -> Vec<&'a HrvRecord> {
    records
        .iter()
        .filter(|rec| window.contains(&rec.timestamp))
        .collect()
}

/// Welch's test of one metric between two windows.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricComparison {
    pub n1: usize,
    pub n2: usize,
    pub mean1: f64,
    pub mean2: f64,
    pub t: f64,
    pub df: f64,
    pub p_value: f64,
}

impl MetricComparison {
    fn between(a: &[f64], b: &[f64]) -> Option<Self> {
        let test = welch_t_test(a, b)?;
        Some(Self {
            n1: a.len(),
            n2: b.len(),
            mean1: mean(a),
            mean2: mean(b),
            t: test.t,
            df: test.df,
            p_value: test.p_value,
        })
    }

    pub fn formatted_p(&self) -> String {
        format!("{:.5}", self.p_value)
    }
}

/// Outcome of comparing two windows of HRV records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum WindowComparison {
    /// One of the windows holds fewer than two records.
    Insufficient { n1: usize, n2: usize },
    Compared {
        sdnn: MetricComparison,
        rmssd: MetricComparison,
    },
}

fn column(records: &[&HrvRecord], metric: fn(&HrvRecord) -> f64) -> Vec<f64> {
    records.iter().map(|r| metric(*r)).collect()
}

pub fn compare_windows(
    records: &[HrvRecord],
    first: &TimeWindow,
    second: &TimeWindow,
) -> WindowComparison {
    let w1 = filter_window(records, first);
    let w2 = filter_window(records, second);
    let sdnn = MetricComparison::between(&column(&w1, |r| r.sdnn), &column(&w2, |r| r.sdnn));
    let rmssd = MetricComparison::between(&column(&w1, |r| r.rmssd), &column(&w2, |r| r.rmssd));
    match (sdnn, rmssd) {
        (Some(sdnn), Some(rmssd)) => WindowComparison::Compared { sdnn, rmssd },
        _ => WindowComparison::Insufficient {
            n1: w1.len(),
            n2: w2.len(),
        },
    }
}
