use crate::errors::{EngineResult, PricingError};

/// Streaming mean/variance accumulator (Welford).
///
/// On each observation x:
///   n    += 1
///   d     = x - mean
///   mean += d / n
///   M2   += d * (x - mean)
///
/// Two accumulators merge exactly (Chan et al.), so workers can each own one
/// and the orchestrator combines them without replaying samples:
///   n  = na + nb,  d = mean_b - mean_a
///   mean = mean_a + d * nb / n
///   M2   = M2a + M2b + d^2 * na * nb / n
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
}

impl RunningStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one observation. Non-finite input (or overflow of the running
    /// sums) fails immediately and leaves the accumulator unchanged.
    #[inline]
    pub fn push(&mut self, x: f64) -> EngineResult<()> {
        if !x.is_finite() {
            return Err(PricingError::NumericalInstability(format!(
                "non-finite payoff {x} at sample {}",
                self.count + 1
            )));
        }

        let count = self.count + 1;
        let delta = x - self.mean;
        let mean = self.mean + delta / count as f64;
        let m2 = self.m2 + delta * (x - mean);

        if !mean.is_finite() || !m2.is_finite() {
            return Err(PricingError::NumericalInstability(format!(
                "running variance overflowed at sample {count}"
            )));
        }

        self.count = count;
        self.mean = mean;
        self.m2 = m2;
        Ok(())
    }

    /// Fold `other` into `self`.
    pub fn merge(&mut self, other: &RunningStats) {
        if other.count == 0 {
            return;
        }
        if self.count == 0 {
            *self = *other;
            return;
        }

        let na = self.count as f64;
        let nb = other.count as f64;
        let n = na + nb;
        let delta = other.mean - self.mean;

        self.mean += delta * nb / n;
        self.m2 += other.m2 + delta * delta * na * nb / n;
        self.count += other.count;
    }

    #[inline]
    pub fn count(&self) -> u64 {
        self.count
    }

    #[inline]
    pub fn mean(&self) -> f64 {
        self.mean
    }

    /// Unbiased (n - 1) sample variance. Zero when fewer than two samples.
    #[inline]
    pub fn sample_variance(&self) -> f64 {
        if self.count < 2 {
            return 0.0;
        }
        (self.m2 / (self.count - 1) as f64).max(0.0)
    }

    #[inline]
    pub fn sample_std_dev(&self) -> f64 {
        self.sample_variance().sqrt()
    }

    /// Standard error of the mean, sd / sqrt(n).
    ///
    /// With a single sample the unbiased variance is undefined; this reports
    /// 0 rather than NaN, which must not be read as "no uncertainty".
    #[inline]
    pub fn standard_error(&self) -> f64 {
        if self.count < 2 {
            return 0.0;
        }
        self.sample_std_dev() / (self.count as f64).sqrt()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn accumulate(xs: &[f64]) -> RunningStats {
        let mut s = RunningStats::new();
        for &x in xs {
            s.push(x).unwrap();
        }
        s
    }

    #[test]
    fn test_known_variance() {
        let s = accumulate(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]);
        assert_eq!(s.count(), 8);
        assert!((s.mean() - 5.0).abs() < 1e-12);
        assert!((s.sample_variance() - 32.0 / 7.0).abs() < 1e-12, "var={}", s.sample_variance());
        let se = (32.0f64 / 7.0).sqrt() / 8f64.sqrt();
        assert!((s.standard_error() - se).abs() < 1e-12);
    }

    #[test]
    fn test_single_sample_zero_error() {
        let s = accumulate(&[3.5]);
        assert_eq!(s.mean(), 3.5);
        assert_eq!(s.standard_error(), 0.0);
    }

    #[test]
    fn test_merge_matches_sequential() {
        let xs: Vec<f64> = (0..1000).map(|i| ((i * 37) % 101) as f64 * 0.25 + 1e6).collect();
        let whole = accumulate(&xs);

        let mut merged = RunningStats::new();
        for chunk in xs.chunks(77) {
            merged.merge(&accumulate(chunk));
        }

        assert_eq!(merged.count(), whole.count());
        assert!((merged.mean() - whole.mean()).abs() < 1e-6);
        let rel = (merged.sample_variance() - whole.sample_variance()).abs() / whole.sample_variance();
        assert!(rel < 1e-9, "variance drift {rel}");
    }

    #[test]
    fn test_merge_with_empty() {
        let a = accumulate(&[1.0, 2.0, 3.0]);
        let mut b = RunningStats::new();
        b.merge(&a);
        assert_eq!(b, a);
        let mut c = a;
        c.merge(&RunningStats::new());
        assert_eq!(c, a);
    }

    #[test]
    fn test_constant_stream_has_zero_variance() {
        let s = accumulate(&[7.25; 100]);
        assert_eq!(s.mean(), 7.25);
        assert_eq!(s.sample_variance(), 0.0);
    }

    #[test]
    fn test_non_finite_rejected() {
        let mut s = accumulate(&[1.0, 2.0]);
        assert!(matches!(s.push(f64::NAN), Err(PricingError::NumericalInstability(_))));
        assert!(matches!(s.push(f64::INFINITY), Err(PricingError::NumericalInstability(_))));
        assert_eq!(s.count(), 2, "failed push must not count");
    }
}
