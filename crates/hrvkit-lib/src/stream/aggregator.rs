use crate::{
    metrics::hrv::{compute_metrics, HRVTime},
    signal::{Phase, RRSeries},
};

/// Two-phase RR buffer with on-demand SDNN/RMSSD.
///
/// Each interval lands in exactly one buffer, chosen by the phase current at
/// arrival. Starting a new baseline clears both buffers.
#[derive(Debug, Clone)]
pub struct StreamingAggregator {
    phase: Phase,
    baseline: RRSeries,
    post: RRSeries,
}

impl Default for StreamingAggregator {
    fn default() -> Self {
        Self::new()
    }
}

impl StreamingAggregator {
    pub fn new() -> Self {
        Self {
            phase: Phase::Baseline,
            baseline: RRSeries::new(),
            post: RRSeries::new(),
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn start_baseline(&mut self) {
        self.baseline.clear();
        self.post.clear();
        self.phase = Phase::Baseline;
    }

    pub fn finish_baseline(&mut self) -> HRVTime {
        self.phase = Phase::Post;
        self.metrics(Phase::Baseline)
    }

    pub fn record_interval(&mut self, interval_ms: f64, phase: Phase) {
        self.buffer_mut(phase).push(interval_ms);
    }

    pub fn record(&mut self, interval_ms: f64) {
        self.record_interval(interval_ms, self.phase);
    }

    pub fn buffer(&self, phase: Phase) -> &RRSeries {
        match phase {
            Phase::Baseline => &self.baseline,
            Phase::Post => &self.post,
        }
    }

    fn buffer_mut(&mut self, phase: Phase) -> &mut RRSeries {
        match phase {
            Phase::Baseline => &mut self.baseline,
            Phase::Post => &mut self.post,
        }
    }

    pub fn metrics(&self, phase: Phase) -> HRVTime {
        compute_metrics(self.buffer(phase).as_slice())
    }

    pub fn current_metrics(&self) -> HRVTime {
        self.metrics(self.phase)
    }
}
