use crate::io::heart_rate::{decode_hex_measurement, HeartRateMeasurement};
use anyhow::{Context, Result};
use std::path::Path;
use std::time::Duration;

fn content_lines(text: &str) -> impl Iterator<Item = (usize, &str)> {
    text.lines()
        .enumerate()
        .map(|(idx, line)| (idx + 1, line.trim()))
        .filter(|(_, line)| !line.is_empty() && !line.starts_with('#'))
}

/// Parse RR intervals (milliseconds), one per line or comma separated,
/// ignoring blank/comment lines.
pub fn parse_rr_millis(text: &str) -> Result<Vec<f64>> {
    let mut out = Vec::new();
    for (line_no, line) in content_lines(text) {
        for field in line.split(',').map(str::trim).filter(|f| !f.is_empty()) {
            let val: f64 = field
                .parse()
                .with_context(|| format!("line {} is not an interval in ms: {}", line_no, field))?;
            out.push(val);
        }
    }
    if out.is_empty() {
        anyhow::bail!("no RR intervals found");
    }
    Ok(out)
}

pub fn read_rr_millis(path: &Path) -> Result<Vec<f64>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    parse_rr_millis(&text)
}

/// A recorded notification: time since capture start plus the decoded payload.
#[derive(Debug, Clone, PartialEq)]
pub struct TimedMeasurement {
    pub elapsed: Duration,
    pub measurement: HeartRateMeasurement,
}

/// Parse a recorded notification stream, one `<elapsed_seconds> <hex payload>` per line.
pub fn parse_measurement_stream(text: &str) -> Result<Vec<TimedMeasurement>> {
    let mut out = Vec::new();
    for (line_no, line) in content_lines(text) {
        let (elapsed, payload) = line
            .split_once(char::is_whitespace)
            .with_context(|| format!("line {} needs `<seconds> <hex payload>`", line_no))?;
        let secs: f64 = elapsed
            .parse()
            .with_context(|| format!("line {} has a bad elapsed time: {}", line_no, elapsed))?;
        if !secs.is_finite() || secs < 0.0 {
            anyhow::bail!("line {} has a negative or non-finite elapsed time", line_no);
        }
        let Ok(elapsed) = Duration::try_from_secs_f64(secs) else {
            anyhow::bail!("line {} has an out-of-range elapsed time", line_no);
        };
        let measurement = decode_hex_measurement(payload.trim())
            .with_context(|| format!("line {} payload", line_no))?;
        out.push(TimedMeasurement {
            elapsed,
            measurement,
        });
    }
    Ok(out)
}

pub fn read_measurement_stream(path: &Path) -> Result<Vec<TimedMeasurement>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    parse_measurement_stream(&text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_rr_lines_and_csv() {
        let rr = parse_rr_millis("# session 3\n800\n820, 790\n\n810\n").unwrap();
        assert_eq!(rr, vec![800.0, 820.0, 790.0, 810.0]);
    }

    #[test]
    fn rejects_bad_rr() {
        let err = parse_rr_millis("800\nabc\n").unwrap_err();
        assert!(err.to_string().contains("line 2"));
        assert!(parse_rr_millis("# nothing\n").is_err());
    }

    #[test]
    fn parses_notification_stream() {
        let stream = parse_measurement_stream("0.0 10 48 00 04\n1.5 10480003\n").unwrap();
        assert_eq!(stream.len(), 2);
        assert_eq!(stream[1].elapsed, Duration::from_millis(1500));
        assert_eq!(stream[1].measurement.rr_intervals_ms, vec![750.0]);
    }

    #[test]
    fn stream_reports_line_numbers() {
        let err = parse_measurement_stream("0.0 1048\nnope\n").unwrap_err();
        assert!(err.to_string().contains("line 2"));
        assert!(parse_measurement_stream("-1 1048").is_err());
        let err = parse_measurement_stream("0.0 1048\n1e20 10 48 00 04\n").unwrap_err();
        assert!(err.to_string().contains("line 2"));
        assert!(err.to_string().contains("out-of-range"));
    }
}
