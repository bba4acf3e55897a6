use super::timestamp::{Timestamp, TimestampParser};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub type Row = HashMap<String, String>;

pub const HRV_TIME_COLUMN: &str = "DateTime";
pub const HRV_BPM_COLUMN: &str = "BPM";
pub const HRV_SDNN_COLUMN: &str = "SDNN (ms)";
pub const HRV_RMSSD_COLUMN: &str = "RMSSD (ms)";
pub const AFFECT_TIME_COLUMN: &str = "Time";
pub const AFFECT_AROUSAL_COLUMN: &str = "arousal";
pub const AFFECT_PLEASURE_COLUMN: &str = "pleasure";

pub const MERGED_COLUMNS: [&str; 6] = ["dateTime", "bpm", "sdnn", "rmssd", "arousal", "pleasure"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordKind {
    Hrv,
    Affect,
}

/// Best-effort float parse: the longest numeric prefix of the trimmed text,
/// or `0.0` when there is none. `"72bpm"` gives `72.0`, `"n/a"` gives `0.0`.
pub fn lenient_f64(text: &str) -> f64 {
    let trimmed = text.trim_start();
    let prefix_len = trimmed
        .char_indices()
        .take_while(|(_, c)| c.is_ascii_digit() || matches!(c, '+' | '-' | '.' | 'e' | 'E'))
        .map(|(i, c)| i + c.len_utf8())
        .last()
        .unwrap_or(0);
    (1..=prefix_len)
        .rev()
        .find_map(|end| trimmed[..end].parse::<f64>().ok())
        .filter(|v| v.is_finite())
        .unwrap_or(0.0)
}

fn field<'a>(row: &'a Row, column: &str) -> &'a str {
    row.get(column).map(String::as_str).unwrap_or("")
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HrvRecord {
    pub timestamp: Timestamp,
    pub bpm: f64,
    pub sdnn: f64,
    pub rmssd: f64,
}

impl HrvRecord {
    pub fn from_row(row: &Row, parser: &TimestampParser) -> Self {
        Self {
            timestamp: parser.normalize(field(row, HRV_TIME_COLUMN)),
            bpm: lenient_f64(field(row, HRV_BPM_COLUMN)),
            sdnn: lenient_f64(field(row, HRV_SDNN_COLUMN)),
            rmssd: lenient_f64(field(row, HRV_RMSSD_COLUMN)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AffectRecord {
    pub timestamp: Timestamp,
    pub arousal: f64,
    pub pleasure: f64,
}

impl AffectRecord {
    pub fn from_row(row: &Row, parser: &TimestampParser) -> Self {
        Self {
            timestamp: parser.normalize(field(row, AFFECT_TIME_COLUMN)),
            arousal: lenient_f64(field(row, AFFECT_AROUSAL_COLUMN)),
            pleasure: lenient_f64(field(row, AFFECT_PLEASURE_COLUMN)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergedRecord {
    #[serde(rename = "dateTime")]
    pub date_time: String,
    pub bpm: f64,
    pub sdnn: f64,
    pub rmssd: f64,
    pub arousal: Option<f64>,
    pub pleasure: Option<f64>,
}

impl MergedRecord {
    pub fn new(hrv: &HrvRecord, affect: Option<&AffectRecord>) -> Self {
        Self {
            date_time: hrv.timestamp.raw.clone(),
            bpm: hrv.bpm,
            sdnn: hrv.sdnn,
            rmssd: hrv.rmssd,
            arousal: affect.map(|a| a.arousal),
            pleasure: affect.map(|a| a.pleasure),
        }
    }

    pub fn to_cells(&self) -> [String; 6] {
        let opt = |v: Option<f64>| v.map(|x| x.to_string()).unwrap_or_default();
        [
            self.date_time.clone(),
            self.bpm.to_string(),
            self.sdnn.to_string(),
            self.rmssd.to_string(),
            opt(self.arousal),
            opt(self.pleasure),
        ]
    }
}
