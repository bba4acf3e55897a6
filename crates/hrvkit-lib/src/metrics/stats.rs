use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WelchTest {
    pub t: f64,
    pub df: f64,
    pub p_value: f64,
}

pub fn mean(data: &[f64]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }
    data.iter().sum::<f64>() / data.len() as f64
}

pub fn sample_variance(data: &[f64]) -> f64 {
    let n = data.len();
    if n < 2 {
        return 0.0;
    }
    let m = mean(data);
    data.iter().map(|x| (x - m).powi(2)).sum::<f64>() / (n as f64 - 1.0)
}

pub fn welch_t_test(a: &[f64], b: &[f64]) -> Option<WelchTest> {
    let (n1, n2) = (a.len(), b.len());
    if n1 < 2 || n2 < 2 {
        return None;
    }
    let (m1, m2) = (mean(a), mean(b));
    let q1 = sample_variance(a) / n1 as f64;
    let q2 = sample_variance(b) / n2 as f64;
    let se2 = q1 + q2;
    if se2 <= 0.0 {
        // Both samples constant: either identical or separated with certainty.
        let diff = m1 - m2;
        return Some(WelchTest {
            t: if diff == 0.0 { 0.0 } else { diff.signum() * f64::INFINITY },
            df: (n1 + n2 - 2) as f64,
            p_value: if diff == 0.0 { 1.0 } else { 0.0 },
        });
    }
    let t = (m1 - m2) / se2.sqrt();
    let df = se2 * se2 / (q1 * q1 / (n1 as f64 - 1.0) + q2 * q2 / (n2 as f64 - 1.0));
    Some(WelchTest {
        t,
        df,
        p_value: student_t_two_sided(t, df),
    })
}

/// Two-sided tail probability `P(|T| >= |t|)` of Student's t with `df` degrees of freedom.
pub fn student_t_two_sided(t: f64, df: f64) -> f64 {
    if t.is_nan() || df.is_nan() || df <= 0.0 {
        return f64::NAN;
    }
    if t.is_infinite() {
        return 0.0;
    }
    let x = df / (df + t * t);
    regularized_incomplete_beta(x, df / 2.0, 0.5).clamp(0.0, 1.0)
}

pub fn regularized_incomplete_beta(x: f64, a: f64, b: f64) -> f64 {
    if x <= 0.0 {
        return 0.0;
    }
    if x >= 1.0 {
        return 1.0;
    }
    let ln_front = ln_gamma(a + b) - ln_gamma(a) - ln_gamma(b) + a * x.ln() + b * (1.0 - x).ln();
    let front = ln_front.exp();
    if x < (a + 1.0) / (a + b + 2.0) {
        front * beta_continued_fraction(x, a, b) / a
    } else {
        1.0 - front * beta_continued_fraction(1.0 - x, b, a) / b
    }
}

fn beta_continued_fraction(x: f64, a: f64, b: f64) -> f64 {
    const MAX_ITER: usize = 300;
    const EPS: f64 = 1e-15;
    const TINY: f64 = 1e-300;

    let guard = |v: f64| if v.abs() < TINY { TINY } else { v };
    let qab = a + b;
    let qap = a + 1.0;
    let qam = a - 1.0;
    let mut c = 1.0;
    let mut d = 1.0 / guard(1.0 - qab * x / qap);
    let mut h = d;
    for m in 1..=MAX_ITER {
        let m = m as f64;
        let m2 = 2.0 * m;
        let aa = m * (b - m) * x / ((qam + m2) * (a + m2));
        d = 1.0 / guard(1.0 + aa * d);
        c = guard(1.0 + aa / c);
        h *= d * c;
        let aa = -(a + m) * (qab + m) * x / ((a + m2) * (qap + m2));
        d = 1.0 / guard(1.0 + aa * d);
        c = guard(1.0 + aa / c);
        let delta = d * c;
        h *= delta;
        if (delta - 1.0).abs() < EPS {
            break;
        }
    }
    h
}

/// Natural log of the gamma function (Lanczos, g = 7).
pub fn ln_gamma(x: f64) -> f64 {
    const COEFFS: [f64; 9] = [
        0.999_999_999_999_809_9,
        676.520_368_121_885_1,
        -1_259.139_216_722_402_8,
        771.323_428_777_653_1,
        -176.615_029_162_140_6,
        12.507_343_278_686_905,
        -0.138_571_095_265_720_12,
        9.984_369_578_019_572e-6,
        1.505_632_735_149_311_6e-7,
    ];
    if x < 0.5 {
        return (PI / (PI * x).sin()).ln() - ln_gamma(1.0 - x);
    }
    let x = x - 1.0;
    let mut acc = COEFFS[0];
    for (i, c) in COEFFS.iter().enumerate().skip(1) {
        acc += c / (x + i as f64);
    }
    let t = x + 7.5;
    0.5 * (2.0 * PI).ln() + (x + 0.5) * t.ln() - t + acc.ln()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(actual: f64, expected: f64, tol: f64) {
        let diff = (actual - expected).abs();
        assert!(
            diff <= tol,
            "expected {expected}, got {actual} (diff {diff} > tol {tol})"
        );
    }

    #[test]
    fn ln_gamma_matches_factorials() {
        assert_close(ln_gamma(1.0), 0.0, 1e-12);
        assert_close(ln_gamma(5.0), 24.0_f64.ln(), 1e-12);
        assert_close(ln_gamma(0.5), PI.sqrt().ln(), 1e-12);
    }

    #[test]
    fn student_t_reference_values() {
        // Cauchy: P(|T| >= 1) = 0.5
        assert_close(student_t_two_sided(1.0, 1.0), 0.5, 1e-9);
        assert_close(student_t_two_sided(0.0, 12.0), 1.0, 1e-12);
        // Two-sided 5% critical value for df = 10.
        assert_close(student_t_two_sided(2.228_138_851_986_27, 10.0), 0.05, 1e-6);
        assert_close(student_t_two_sided(-2.228_138_851_986_27, 10.0), 0.05, 1e-6);
    }

    #[test]
    fn welch_reference_case() {
        let a = [27.5, 21.0, 19.0, 23.6, 17.0, 17.9, 16.9, 20.1, 21.9, 22.6, 23.1, 19.6, 19.0, 21.7, 21.4];
        let b = [27.1, 22.0, 20.8, 23.4, 23.4, 23.5, 25.8, 22.0, 24.8, 20.2, 21.9, 22.1, 22.9, 20.5, 24.4];
        let res = welch_t_test(&a, &b).unwrap();
        assert_close(res.t, -2.455_356, 1e-5);
        assert_close(res.df, 24.988_529, 1e-5);
        assert_close(res.p_value, 0.021_378, 1e-5);
    }

    #[test]
    fn welch_needs_two_samples_each() {
        assert!(welch_t_test(&[1.0], &[1.0, 2.0]).is_none());
        assert!(welch_t_test(&[1.0, 2.0], &[]).is_none());
    }

    #[test]
    fn welch_constant_samples() {
        let same = welch_t_test(&[40.0, 40.0], &[40.0, 40.0, 40.0]).unwrap();
        assert_eq!(same.p_value, 1.0);
        let apart = welch_t_test(&[40.0, 40.0], &[55.0, 55.0]).unwrap();
        assert_eq!(apart.p_value, 0.0);
    }
}
