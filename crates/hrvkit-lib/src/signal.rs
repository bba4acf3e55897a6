use serde::{Deserialize, Serialize};
use std::fmt;

/// Measurement phase an interval arrives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    /// Fixed-duration reference window at the start of a session.
    Baseline,
    /// Everything recorded after the baseline window closed.
    Post,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Baseline => write!(f, "baseline"),
            Phase::Post => write!(f, "post"),
        }
    }
}

/// RR intervals (milliseconds), in arrival order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RRSeries {
    pub rr: Vec<f64>,
}

impl RRSeries {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_millis(rr: Vec<f64>) -> Self {
        Self { rr }
    }

    pub fn push(&mut self, interval_ms: f64) {
        self.rr.push(interval_ms);
    }

    pub fn clear(&mut self) {
        self.rr.clear();
    }

    pub fn len(&self) -> usize {
        self.rr.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rr.is_empty()
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.rr
    }

    /// Total covered duration in milliseconds.
    pub fn duration_ms(&self) -> f64 {
        self.rr.iter().sum()
    }
}
