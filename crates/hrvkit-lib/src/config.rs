use crate::session::{timestamp::DEFAULT_REFERENCE_DATE, FileMarkers, TimestampParser};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("parsing config {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
    #[error("reference_date {0:?} is not a YYYY-MM-DD date")]
    ReferenceDate(String),
    #[error("baseline_minutes must be at least 1")]
    BaselineMinutes,
}

/// Toolkit settings, loaded from TOML. Every field is optional.
///
/// ```toml
/// reference_date = "2025-02-10"
/// baseline_minutes = 5
///
/// [markers]
/// hrv = ["-HRV", "_HRV"]
/// affect = ["AffectiveSlider"]
/// baseline = ["BaselineResults"]
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolkitConfig {
    pub reference_date: String,
    pub baseline_minutes: u64,
    pub markers: FileMarkers,
}

impl Default for ToolkitConfig {
    fn default() -> Self {
        Self {
            reference_date: DEFAULT_REFERENCE_DATE.to_string(),
            baseline_minutes: 5,
            markers: FileMarkers::default(),
        }
    }
}

impl ToolkitConfig {
    pub fn from_toml_str(text: &str, origin: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text).map_err(|source| ConfigError::Parse {
            path: origin.to_string(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&text, &path.display().to_string())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.reference_date()?;
        if self.baseline_minutes < 1 {
            return Err(ConfigError::BaselineMinutes);
        }
        Ok(())
    }

    pub fn reference_date(&self) -> Result<NaiveDate, ConfigError> {
        NaiveDate::parse_from_str(self.reference_date.trim(), "%Y-%m-%d")
            .map_err(|_| ConfigError::ReferenceDate(self.reference_date.clone()))
    }

    pub fn parser(&self) -> Result<TimestampParser, ConfigError> {
        Ok(TimestampParser::new(self.reference_date()?))
    }
}
