use serde::{Deserialize, Serialize};
use std::path::Path;

/// What a session file contains, judged from its name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionFileKind {
    Hrv,
    Affect,
    Baseline,
    Unknown,
}

/// File-name substrings identifying each kind of session export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileMarkers {
    pub hrv: Vec<String>,
    pub affect: Vec<String>,
    pub baseline: Vec<String>,
}

impl Default for FileMarkers {
    fn default() -> Self {
        Self {
            hrv: vec!["-HRV".into(), "_HRV".into()],
            affect: vec!["AffectiveSlider".into()],
            baseline: vec!["BaselineResults".into()],
        }
    }
}

impl FileMarkers {
    /// Classify by file name. HRV markers win over affect markers, which win
    /// over baseline markers.
    pub fn classify(&self, file_name: &str) -> SessionFileKind {
        let hit = |markers: &[String]| markers.iter().any(|m| file_name.contains(m.as_str()));
        if hit(&self.hrv) {
            SessionFileKind::Hrv
        } else if hit(&self.affect) {
            SessionFileKind::Affect
        } else if hit(&self.baseline) {
            SessionFileKind::Baseline
        } else {
            SessionFileKind::Unknown
        }
    }

    pub fn classify_path(&self, path: &Path) -> SessionFileKind {
        path.file_name()
            .and_then(|name| name.to_str())
            .map(|name| self.classify(name))
            .unwrap_or(SessionFileKind::Unknown)
    }
}
