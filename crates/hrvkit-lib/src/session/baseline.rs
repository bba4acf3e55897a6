use super::records::Row;
use crate::metrics::hrv::HRVTime;
use serde::{Deserialize, Serialize};

pub const PARAMETER_COLUMN: &str = "Parameter";
pub const VALUE_COLUMN: &str = "Value";

/// One `Parameter,Value` line of a baseline results file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaselineEntry {
    pub parameter: String,
    pub value: String,
}

impl BaselineEntry {
    pub fn new(parameter: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            parameter: parameter.into(),
            value: value.into(),
        }
    }

    pub fn from_row(row: &Row) -> Option<Self> {
        let parameter = row.get(PARAMETER_COLUMN)?.trim();
        if parameter.is_empty() {
            return None;
        }
        let value = row.get(VALUE_COLUMN).map(|v| v.trim()).unwrap_or("");
        Some(Self::new(parameter, value))
    }
}

/// Baseline summary rows; metric values use two decimals. BPM is included
/// when a heart rate was observed during the baseline.
pub fn baseline_entries(metrics: &HRVTime, mean_bpm: Option<f64>) -> Vec<BaselineEntry> {
    let mut out = Vec::with_capacity(3);
    if let Some(bpm) = mean_bpm {
        out.push(BaselineEntry::new("BPM", format!("{:.2}", bpm)));
    }
    out.push(BaselineEntry::new("SDNN (ms)", format!("{:.2}", metrics.sdnn)));
    out.push(BaselineEntry::new("RMSSD (ms)", format!("{:.2}", metrics.rmssd)));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::hrv::compute_metrics;

    #[test]
    fn entries_format_two_decimals() {
        let metrics = compute_metrics(&[800.0, 820.0, 790.0, 810.0]);
        let entries = baseline_entries(&metrics, Some(72.0));
        assert_eq!(
            entries,
            vec![
                BaselineEntry::new("BPM", "72.00"),
                BaselineEntry::new("SDNN (ms)", "11.18"),
                BaselineEntry::new("RMSSD (ms)", "23.80"),
            ]
        );
        assert_eq!(baseline_entries(&metrics, None).len(), 2);
    }

    #[test]
    fn rows_without_parameter_are_dropped() {
        let mut row = Row::new();
        row.insert("Value".into(), "1".into());
        assert!(BaselineEntry::from_row(&row).is_none());
        row.insert("Parameter".into(), " BPM ".into());
        assert_eq!(BaselineEntry::from_row(&row), Some(BaselineEntry::new("BPM", "1")));
    }
}
