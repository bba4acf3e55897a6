use super::{
    records::{AffectRecord, HrvRecord, MergedRecord, RecordKind, Row},
    timestamp::{Timestamp, TimestampParser},
};
use chrono::{Duration, NaiveDateTime};
use log::debug;
use std::cmp::Ordering;

#[derive(Debug, Clone, Default)]
pub struct SessionStore {
    parser: TimestampParser,
    hrv: Vec<HrvRecord>,
    affect: Vec<AffectRecord>,
    hrv_loaded: bool,
    affect_loaded: bool,
}

impl SessionStore {
    pub fn new(parser: TimestampParser) -> Self {
        Self {
            parser,
            ..Self::default()
        }
    }

    pub fn parser(&self) -> &TimestampParser {
        &self.parser
    }

    pub fn hrv(&self) -> &[HrvRecord] {
        &self.hrv
    }

    pub fn affect(&self) -> &[AffectRecord] {
        &self.affect
    }

    pub fn is_ready(&self) -> bool {
        self.hrv_loaded && self.affect_loaded
    }

    pub fn load_rows(&mut self, kind: RecordKind, rows: &[Row]) -> usize {
        match kind {
            RecordKind::Hrv => {
                self.hrv
                    .extend(rows.iter().map(|row| HrvRecord::from_row(row, &self.parser)));
                sort_by_timestamp(&mut self.hrv, |r| &r.timestamp);
                self.hrv_loaded = true;
            }
            RecordKind::Affect => {
                self.affect
                    .extend(rows.iter().map(|row| AffectRecord::from_row(row, &self.parser)));
                sort_by_timestamp(&mut self.affect, |r| &r.timestamp);
                self.affect_loaded = true;
            }
        }
        debug!(
            "loaded {} {:?} row(s); totals hrv={} affect={}",
            rows.len(),
            kind,
            self.hrv.len(),
            self.affect.len()
        );
        rows.len()
    }

    pub fn merge(&self) -> Vec<MergedRecord> {
        merge(&self.hrv, &self.affect)
    }
}

pub fn sort_by_timestamp<T>(records: &mut [T], key: impl Fn(&T) -> &Timestamp) {
    records.sort_by(|a, b| key(a).cmp_instant(key(b)));
}

fn is_sorted(affect: &[AffectRecord]) -> bool {
    affect
        .windows(2)
        .all(|w| w[0].timestamp.cmp_instant(&w[1].timestamp) != Ordering::Greater)
}

/// Join each HRV record with the affect record closest in time.
///
/// Output has exactly one row per HRV record, in HRV order. Ties go to the
/// affect record that comes first in `affect`. Sorted affect input (as kept
/// by [`SessionStore`]) is searched by bisection; anything else falls back to
/// a linear scan with the same result.
pub fn merge(hrv: &[HrvRecord], affect: &[AffectRecord]) -> Vec<MergedRecord> {
    let sorted = is_sorted(affect);
    let merged: Vec<MergedRecord> = hrv
        .iter()
        .map(|rec| {
            let best = if sorted {
                nearest_sorted(affect, &rec.timestamp)
            } else {
                nearest_linear(affect, &rec.timestamp)
            };
            MergedRecord::new(rec, best)
        })
        .collect();
    debug!(
        "merged {} hrv row(s) against {} affect row(s) ({} unmatched)",
        hrv.len(),
        affect.len(),
        merged.iter().filter(|m| m.arousal.is_none()).count()
    );
    merged
}

pub fn nearest_linear<'a>(affect: &'a [AffectRecord], ts: &Timestamp) -> Option<&'a AffectRecord> {
    let mut best: Option<(&AffectRecord, Duration)> = None;
    for candidate in affect {
        let Some(diff) = ts.abs_diff(&candidate.timestamp) else {
            continue;
        };
        if best.map_or(true, |(_, min)| diff < min) {
            best = Some((candidate, diff));
        }
    }
    best.map(|(rec, _)| rec)
}

fn starts_before(t: NaiveDateTime) -> impl Fn(&AffectRecord) -> bool {
    move |a| a.timestamp.instant.map_or(false, |v| v < t)
}

fn nearest_sorted<'a>(affect: &'a [AffectRecord], ts: &Timestamp) -> Option<&'a AffectRecord> {
    let t = ts.instant?;
    let valid = affect.partition_point(|a| a.timestamp.is_valid());
    let affect = &affect[..valid];

    // First record at or after `t`; it is also the first of its equal-time run.
    let upper = affect.partition_point(starts_before(t));
    // First record of the equal-time run just before `t`.
    let lower = upper.checked_sub(1).and_then(|i| {
        let run_time = affect[i].timestamp.instant?;
        Some(affect.partition_point(starts_before(run_time)))
    });

    let above = affect.get(upper).and_then(|a| Some((a, a.timestamp.instant? - t)));
    let below = lower.and_then(|i| Some((&affect[i], t - affect[i].timestamp.instant?)));
    match (below, above) {
        (Some((b, db)), Some((a, da))) => Some(if db <= da { b } else { a }),
        (Some((b, _)), None) => Some(b),
        (None, Some((a, _))) => Some(a),
        (None, None) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, Rng, SeedableRng};

    fn row(pairs: &[(&str, &str)]) -> Row {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn hrv_row(time: &str, bpm: &str) -> Row {
        row(&[
            ("DateTime", time),
            ("BPM", bpm),
            ("SDNN (ms)", "50"),
            ("RMSSD (ms)", "40"),
        ])
    }

    fn affect_row(time: &str, arousal: &str, pleasure: &str) -> Row {
        row(&[("Time", time), ("arousal", arousal), ("pleasure", pleasure)])
    }

    #[test]
    fn picks_closest_affect_sample() {
        let mut store = SessionStore::default();
        store.load_rows(RecordKind::Hrv, &[hrv_row("2025/02/10 10:30:00", "72")]);
        store.load_rows(
            RecordKind::Affect,
            &[affect_row("10:29:58", "34", "46"), affect_row("10:30:05", "60", "20")],
        );
        let merged = store.merge();
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].date_time, "2025/02/10 10:30:00");
        assert_eq!(merged[0].bpm, 72.0);
        assert_eq!(merged[0].arousal, Some(34.0));
        assert_eq!(merged[0].pleasure, Some(46.0));
    }

    #[test]
    fn empty_affect_keeps_every_row() {
        let mut store = SessionStore::default();
        store.load_rows(
            RecordKind::Hrv,
            &[hrv_row("10:30:00", "70"), hrv_row("10:30:01", "71"), hrv_row("10:30:02", "72")],
        );
        assert!(!store.is_ready());
        let merged = store.merge();
        assert_eq!(merged.len(), 3);
        assert!(merged.iter().all(|m| m.arousal.is_none() && m.pleasure.is_none()));
    }

    #[test]
    fn ties_prefer_earlier_sample() {
        let mut store = SessionStore::default();
        store.load_rows(RecordKind::Hrv, &[hrv_row("10:30:00", "70")]);
        store.load_rows(
            RecordKind::Affect,
            &[
                affect_row("10:30:02", "2", "2"),
                affect_row("10:29:58", "1", "1"),
                affect_row("10:29:58", "3", "3"),
            ],
        );
        assert_eq!(store.merge()[0].arousal, Some(1.0));
    }

    #[test]
    fn affect_samples_can_be_reused() {
        let mut store = SessionStore::default();
        store.load_rows(
            RecordKind::Hrv,
            &[hrv_row("10:00:00", "60"), hrv_row("10:00:01", "61"), hrv_row("10:00:02", "62")],
        );
        store.load_rows(RecordKind::Affect, &[affect_row("10:00:01", "9", "8")]);
        assert!(store.is_ready());
        assert!(store.merge().iter().all(|m| m.arousal == Some(9.0)));
    }

    #[test]
    fn loading_sorts_and_appends() {
        let mut store = SessionStore::default();
        store.load_rows(RecordKind::Hrv, &[hrv_row("10:00:05", "1"), hrv_row("10:00:01", "2")]);
        store.load_rows(RecordKind::Hrv, &[hrv_row("2025/02/10 10:00:03", "3")]);
        let bpms: Vec<f64> = store.hrv().iter().map(|r| r.bpm).collect();
        assert_eq!(bpms, vec![2.0, 3.0, 1.0]);

        let before = store.hrv().to_vec();
        let mut again = before.clone();
        sort_by_timestamp(&mut again, |r| &r.timestamp);
        assert_eq!(again, before);
    }

    #[test]
    fn unparseable_timestamps_never_match() {
        let mut store = SessionStore::default();
        store.load_rows(RecordKind::Hrv, &[hrv_row("garbage", "70"), hrv_row("10:00:00", "71")]);
        store.load_rows(
            RecordKind::Affect,
            &[affect_row("???", "5", "5"), affect_row("10:00:10", "6", "6")],
        );
        assert_eq!(store.hrv()[1].timestamp.raw, "garbage");
        let merged = store.merge();
        assert_eq!(merged[0].arousal, Some(6.0));
        assert_eq!(merged[1].arousal, None);
    }

    #[test]
    fn bisection_agrees_with_linear_scan() {
        let parser = TimestampParser::default();
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..100 {
            let mut affect: Vec<AffectRecord> = (0..rng.gen_range(0..20))
                .map(|i| {
                    let secs = rng.gen_range(0..120);
                    AffectRecord::from_row(
                        &affect_row(&format!("10:{:02}:{:02}", secs / 60, secs % 60), &i.to_string(), "0"),
                        &parser,
                    )
                })
                .collect();
            sort_by_timestamp(&mut affect, |r| &r.timestamp);
            for _ in 0..20 {
                let secs = rng.gen_range(0..150);
                let hrv = HrvRecord::from_row(
                    &hrv_row(&format!("10:{:02}:{:02}", secs / 60, secs % 60), "60"),
                    &parser,
                );
                let fast = nearest_sorted(&affect, &hrv.timestamp).map(|a| a.arousal);
                let slow = nearest_linear(&affect, &hrv.timestamp).map(|a| a.arousal);
                assert_eq!(fast, slow, "at {}", hrv.timestamp.raw);
            }
        }
    }

    #[test]
    fn unsorted_affect_uses_stored_order() {
        let parser = TimestampParser::default();
        let hrv = vec![HrvRecord::from_row(&hrv_row("10:00:00", "60"), &parser)];
        let affect = vec![
            AffectRecord::from_row(&affect_row("10:00:03", "1", "0"), &parser),
            AffectRecord::from_row(&affect_row("09:59:57", "2", "0"), &parser),
        ];
        assert_eq!(merge(&hrv, &affect)[0].arousal, Some(1.0));
    }
}
