use super::aggregator::StreamingAggregator;
use crate::{
    io::heart_rate::HeartRateMeasurement,
    metrics::hrv::HRVTime,
    session::baseline::{baseline_entries, BaselineEntry},
    signal::Phase,
};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LiveError {
    #[error("baseline duration must be at least 1 minute, got {0}")]
    BaselineTooShort(u64),
    #[error("baseline duration of {0} minutes is too long")]
    BaselineTooLong(u64),
    #[error("session has not been started")]
    NotStarted,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BaselineResult {
    pub metrics: HRVTime,
    pub mean_bpm: Option<f64>,
}

impl BaselineResult {
    pub fn entries(&self) -> Vec<BaselineEntry> {
        baseline_entries(&self.metrics, self.mean_bpm)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiveUpdate {
    pub elapsed_s: f64,
    pub phase: Phase,
    pub heart_rate: u16,
    pub baseline: Option<BaselineResult>,
    pub realtime: Option<HRVTime>,
}

#[derive(Debug, Clone)]
pub struct LiveSession {
    aggregator: StreamingAggregator,
    baseline_duration: Duration,
    deadline: Option<Duration>,
    baseline_finished: bool,
    baseline_bpm_sum: f64,
    baseline_bpm_count: usize,
    baseline: Option<BaselineResult>,
}

impl LiveSession {
    pub fn new(baseline_minutes: u64) -> Result<Self, LiveError> {
        if baseline_minutes < 1 {
            return Err(LiveError::BaselineTooShort(baseline_minutes));
        }
        let secs = baseline_minutes
            .checked_mul(60)
            .ok_or(LiveError::BaselineTooLong(baseline_minutes))?;
        Ok(Self {
            aggregator: StreamingAggregator::new(),
            baseline_duration: Duration::from_secs(secs),
            deadline: None,
            baseline_finished: false,
            baseline_bpm_sum: 0.0,
            baseline_bpm_count: 0,
            baseline: None,
        })
    }

    pub fn baseline_duration(&self) -> Duration {
        self.baseline_duration
    }

    pub fn aggregator(&self) -> &StreamingAggregator {
        &self.aggregator
    }

    pub fn baseline(&self) -> Option<&BaselineResult> {
        self.baseline.as_ref()
    }

    pub fn is_baseline_finished(&self) -> bool {
        self.baseline_finished
    }

    /// Reset all buffers and start the baseline timer at `now`. A deadline
    /// past `Duration::MAX` saturates, so that baseline never closes.
    pub fn start(&mut self, now: Duration) {
        self.aggregator.start_baseline();
        self.deadline = Some(now.saturating_add(self.baseline_duration));
        self.baseline_finished = false;
        self.baseline_bpm_sum = 0.0;
        self.baseline_bpm_count = 0;
        self.baseline = None;
        info!(
            "baseline started at {:.1}s for {}s",
            now.as_secs_f64(),
            self.baseline_duration.as_secs()
        );
    }

    pub fn tick(&mut self, now: Duration) -> Option<BaselineResult> {
        let deadline = self.deadline?;
        if self.baseline_finished || now < deadline {
            return None;
        }
        let metrics = self.aggregator.finish_baseline();
        let mean_bpm = (self.baseline_bpm_count > 0)
            .then(|| self.baseline_bpm_sum / self.baseline_bpm_count as f64);
        let result = BaselineResult { metrics, mean_bpm };
        self.baseline_finished = true;
        self.baseline = Some(result.clone());
        info!(
            "baseline finished: n={} sdnn={:.2} rmssd={:.2}",
            metrics.n, metrics.sdnn, metrics.rmssd
        );
        Some(result)
    }

    pub fn on_measurement(
        &mut self,
        now: Duration,
        measurement: &HeartRateMeasurement,
    ) -> Result<LiveUpdate, LiveError> {
        if self.deadline.is_none() {
            return Err(LiveError::NotStarted);
        }
        let closed = self.tick(now);
        let phase = self.aggregator.phase();
        if phase == Phase::Baseline {
            self.baseline_bpm_sum += measurement.bpm as f64;
            self.baseline_bpm_count += 1;
        }
        for &rr in &measurement.rr_intervals_ms {
            self.aggregator.record_interval(rr, phase);
        }
        debug!(
            "{:.1}s hr={} rr={:?} phase={}",
            now.as_secs_f64(),
            measurement.bpm,
            measurement.rr_intervals_ms,
            phase
        );
        let realtime = if self.baseline_finished {
            Some(self.aggregator.metrics(Phase::Post)).filter(HRVTime::is_sufficient)
        } else {
            None
        };
        Ok(LiveUpdate {
            elapsed_s: now.as_secs_f64(),
            phase,
            heart_rate: measurement.bpm,
            baseline: closed,
            realtime,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::heart_rate::SensorContact;

    fn beat(bpm: u16, rr: &[f64]) -> HeartRateMeasurement {
        HeartRateMeasurement {
            bpm,
            sensor_contact: SensorContact::Detected,
            energy_expended: None,
            rr_intervals_ms: rr.to_vec(),
        }
    }

    #[test]
    fn rejects_short_baseline() {
        assert_eq!(LiveSession::new(0).unwrap_err(), LiveError::BaselineTooShort(0));
    }

    #[test]
    fn rejects_overflowing_baseline() {
        let minutes = u64::MAX / 10;
        assert_eq!(
            LiveSession::new(minutes).unwrap_err(),
            LiveError::BaselineTooLong(minutes)
        );
        let longest = u64::MAX / 60;
        let mut session = LiveSession::new(longest).unwrap();
        session.start(Duration::from_secs(u64::MAX / 2));
        assert!(session.tick(Duration::from_secs(u64::MAX)).is_none());
        assert!(!session.is_baseline_finished());
    }

    #[test]
    fn requires_start() {
        let mut session = LiveSession::new(1).unwrap();
        assert_eq!(
            session.on_measurement(Duration::ZERO, &beat(70, &[800.0])),
            Err(LiveError::NotStarted)
        );
    }

    #[test]
    fn baseline_then_realtime() {
        let mut session = LiveSession::new(1).unwrap();
        session.start(Duration::ZERO);
        for (i, rr) in [800.0, 820.0, 790.0, 810.0].into_iter().enumerate() {
            let update = session
                .on_measurement(Duration::from_secs(i as u64 * 10), &beat(72, &[rr]))
                .unwrap();
            assert_eq!(update.phase, Phase::Baseline);
            assert!(update.realtime.is_none());
        }

        let first_post = session
            .on_measurement(Duration::from_secs(60), &beat(70, &[700.0]))
            .unwrap();
        let baseline = first_post.baseline.expect("baseline closes at deadline");
        assert_eq!(baseline.metrics.n, 4);
        assert_eq!(baseline.mean_bpm, Some(72.0));
        assert_eq!(
            baseline.metrics.formatted(),
            Some(("11.18".to_string(), "23.80".to_string()))
        );
        assert_eq!(first_post.phase, Phase::Post);
        assert!(first_post.realtime.is_none(), "one post sample is not enough");

        let second_post = session
            .on_measurement(Duration::from_secs(61), &beat(70, &[720.0]))
            .unwrap();
        assert!(second_post.baseline.is_none());
        let rt = second_post.realtime.unwrap();
        assert_eq!(rt.n, 2);
        assert!((rt.rmssd - 20.0).abs() < 1e-9);
        assert_eq!(session.aggregator().buffer(Phase::Baseline).len(), 4);
    }

    #[test]
    fn restart_clears_previous_run() {
        let mut session = LiveSession::new(1).unwrap();
        session.start(Duration::ZERO);
        session
            .on_measurement(Duration::from_secs(90), &beat(70, &[700.0, 710.0]))
            .unwrap();
        assert!(session.is_baseline_finished());
        session.start(Duration::from_secs(100));
        assert!(!session.is_baseline_finished());
        assert!(session.baseline().is_none());
        assert!(session.aggregator().buffer(Phase::Post).is_empty());
        assert!(session.tick(Duration::from_secs(159)).is_none());
        assert!(session.tick(Duration::from_secs(160)).is_some());
        assert!(session.tick(Duration::from_secs(161)).is_none());
    }
}
