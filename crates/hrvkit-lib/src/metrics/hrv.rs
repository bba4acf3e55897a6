use crate::signal::RRSeries;
use serde::{Deserialize, Serialize};

pub const MIN_SAMPLES: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HRVTime {
    pub n: usize,
    pub sdnn: f64,
    pub rmssd: f64,
}

impl HRVTime {
    pub fn empty(n: usize) -> Self {
        Self {
            n,
            sdnn: 0.0,
            rmssd: 0.0,
        }
    }

    pub fn is_sufficient(&self) -> bool {
        self.n >= MIN_SAMPLES
    }

    pub fn formatted(&self) -> Option<(String, String)> {
        self.is_sufficient()
            .then(|| (format!("{:.2}", self.sdnn), format!("{:.2}", self.rmssd)))
    }
}

/// SDNN and RMSSD over `rr` (milliseconds).
///
/// SDNN uses the population divisor `n`; RMSSD divides the squared successive
/// differences by `n - 1`. Fewer than two samples yields `{0, 0}`.
pub fn compute_metrics(rr: &[f64]) -> HRVTime {
    let n = rr.len();
    if n < MIN_SAMPLES {
        return HRVTime::empty(n);
    }
    let mean = rr.iter().sum::<f64>() / n as f64;
    let variance = rr.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n as f64;
    let sum_sq_diff = rr.windows(2).map(|w| (w[1] - w[0]).powi(2)).sum::<f64>();
    HRVTime {
        n,
        sdnn: variance.sqrt(),
        rmssd: (sum_sq_diff / (n as f64 - 1.0)).sqrt(),
    }
}

pub fn hrv_time(rr: &RRSeries) -> HRVTime {
    compute_metrics(rr.as_slice())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, Rng, SeedableRng};

    fn assert_close(actual: f64, expected: f64, tol: f64) {
        let diff = (actual - expected).abs();
        assert!(
            diff <= tol,
            "expected {expected}, got {actual} (diff {diff} > tol {tol})"
        );
    }

    #[test]
    fn reference_buffer() {
        let m = compute_metrics(&[800.0, 820.0, 790.0, 810.0]);
        assert_eq!(m.n, 4);
        // deviations -5, 15, -15, 5; successive differences 20, -30, 20
        assert_close(m.sdnn, 125.0_f64.sqrt(), 1e-12);
        assert_close(m.rmssd, (1700.0_f64 / 3.0).sqrt(), 1e-12);
        assert_eq!(
            m.formatted(),
            Some(("11.18".to_string(), "23.80".to_string()))
        );
    }

    #[test]
    fn short_buffers_are_degenerate() {
        assert_eq!(compute_metrics(&[]), HRVTime::empty(0));
        let one = compute_metrics(&[812.0]);
        assert_eq!((one.sdnn, one.rmssd), (0.0, 0.0));
        assert!(!one.is_sufficient());
        assert!(one.formatted().is_none());
    }

    #[test]
    fn constant_buffer_has_no_variability() {
        let m = compute_metrics(&[750.0; 16]);
        assert_eq!(m.sdnn, 0.0);
        assert_eq!(m.rmssd, 0.0);
    }

    #[test]
    fn metrics_are_non_negative() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..200 {
            let len = rng.gen_range(2..64);
            let rr: Vec<f64> = (0..len).map(|_| rng.gen_range(300.0..1500.0)).collect();
            let m = hrv_time(&RRSeries::from_millis(rr));
            assert!(m.sdnn >= 0.0 && m.sdnn.is_finite());
            assert!(m.rmssd >= 0.0 && m.rmssd.is_finite());
        }
    }
}
