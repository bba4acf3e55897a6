use crate::session::{records::AffectRecord, HrvRecord, Timestamp};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Axis {
    pub label: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Style {
    pub width: f32,
    pub color: Color,
}

/// `0xRRGGBB`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Color(pub u32);

impl Color {
    pub fn rgb(self) -> (u8, u8, u8) {
        (
            ((self.0 >> 16) & 0xFF) as u8,
            ((self.0 >> 8) & 0xFF) as u8,
            (self.0 & 0xFF) as u8,
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineSeries {
    pub name: String,
    pub points: Vec<[f64; 2]>,
    pub style: Style,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Series {
    Line(LineSeries),
}

impl Series {
    pub fn points(&self) -> &[[f64; 2]] {
        match self {
            Series::Line(line) => &line.points,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Figure {
    pub title: Option<String>,
    pub x: Axis,
    pub y: Axis,
    pub series: Vec<Series>,
}

impl Figure {
    pub fn new(title: impl Into<Option<String>>) -> Self {
        Self {
            title: title.into(),
            x: Axis { label: None },
            y: Axis { label: None },
            series: Vec::new(),
        }
    }

    pub fn add_series(&mut self, series: Series) {
        self.series.push(series);
    }

    /// `(x_min, x_max, y_min, y_max)` over all points, `None` when empty.
    pub fn bounds(&self) -> Option<(f64, f64, f64, f64)> {
        let mut points = self.series.iter().flat_map(|s| s.points().iter());
        let first = points.next()?;
        Some(points.fold(
            (first[0], first[0], first[1], first[1]),
            |(x0, x1, y0, y1), p| (x0.min(p[0]), x1.max(p[0]), y0.min(p[1]), y1.max(p[1])),
        ))
    }
}

pub trait PlotBackend {
    fn draw(&mut self, fig: &Figure) -> anyhow::Result<()>;
}

pub fn decimate_points(points: &[[f64; 2]], max_points: usize) -> Vec<[f64; 2]> {
    if points.len() <= max_points {
        return points.to_vec();
    }
    let bucket_size = points.len() as f64 / max_points as f64;
    let mut result = Vec::with_capacity(max_points);
    for i in 0..max_points {
        let start = (i as f64 * bucket_size).floor() as usize;
        if start >= points.len() {
            break;
        }
        result.push(points[start]);
    }
    result
}

/// Seconds since the first parseable timestamp; unparseable rows are dropped.
fn elapsed_points<T>(
    records: &[T],
    time: impl Fn(&T) -> &Timestamp,
    value: impl Fn(&T) -> f64,
) -> Vec<[f64; 2]> {
    let Some(origin) = records.iter().find_map(|r| time(r).instant) else {
        return Vec::new();
    };
    records
        .iter()
        .filter_map(|r| {
            let t = time(r).instant?;
            let secs = (t - origin).num_milliseconds() as f64 / 1000.0;
            Some([secs, value(r)])
        })
        .collect()
}

fn line(name: &str, points: Vec<[f64; 2]>, color: u32, max_points: usize) -> Series {
    Series::Line(LineSeries {
        name: name.into(),
        points: decimate_points(&points, max_points),
        style: Style {
            width: 1.6,
            color: Color(color),
        },
    })
}

pub fn figure_from_hrv(records: &[HrvRecord], max_points: usize) -> Figure {
    let mut fig = Figure::new(Some("HRV session".into()));
    fig.x.label = Some("time (s)".into());
    fig.y.label = Some("BPM / ms".into());
    let bpm = elapsed_points(records, |r| &r.timestamp, |r| r.bpm);
    let sdnn = elapsed_points(records, |r| &r.timestamp, |r| r.sdnn);
    let rmssd = elapsed_points(records, |r| &r.timestamp, |r| r.rmssd);
    fig.add_series(line("BPM", bpm, 0xD62728, max_points));
    fig.add_series(line("SDNN", sdnn, 0x1F77B4, max_points));
    fig.add_series(line("RMSSD", rmssd, 0x2CA02C, max_points));
    fig
}

pub fn figure_from_affect(records: &[AffectRecord], max_points: usize) -> Figure {
    let mut fig = Figure::new(Some("Affective slider".into()));
    fig.x.label = Some("time (s)".into());
    let arousal = elapsed_points(records, |r| &r.timestamp, |r| r.arousal);
    let pleasure = elapsed_points(records, |r| &r.timestamp, |r| r.pleasure);
    fig.add_series(line("arousal", arousal, 0xFF7F0E, max_points));
    fig.add_series(line("pleasure", pleasure, 0x9467BD, max_points));
    fig
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{records::Row, TimestampParser};

    fn hrv(time: &str, bpm: &str) -> HrvRecord {
        let row: Row = [("DateTime", time), ("BPM", bpm), ("SDNN (ms)", "50"), ("RMSSD (ms)", "40")]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        HrvRecord::from_row(&row, &TimestampParser::default())
    }

    #[test]
    fn decimation_caps_points() {
        let points: Vec<[f64; 2]> = (0..1000).map(|i| [i as f64, 0.0]).collect();
        let out = decimate_points(&points, 100);
        assert_eq!(out.len(), 100);
        assert_eq!(out[1][0], 10.0);
        assert_eq!(decimate_points(&points[..5], 100).len(), 5);
    }

    #[test]
    fn hrv_figure_uses_elapsed_seconds() {
        let records = vec![
            hrv("10:30:00", "70"),
            hrv("10:30:01.5", "72"),
            hrv("bad", "99"),
        ];
        let fig = figure_from_hrv(&records, 1024);
        assert_eq!(fig.series.len(), 3);
        assert_eq!(fig.series[0].points(), &[[0.0, 70.0], [1.5, 72.0]]);
        assert_eq!(fig.bounds(), Some((0.0, 1.5, 40.0, 72.0)));
    }

    #[test]
    fn empty_records_give_empty_figure() {
        let fig = figure_from_affect(&[], 16);
        assert!(fig.series.iter().all(|s| s.points().is_empty()));
        assert_eq!(fig.bounds(), None);
        assert_eq!(Color(0x1F77B4).rgb(), (0x1F, 0x77, 0xB4));
    }
}
