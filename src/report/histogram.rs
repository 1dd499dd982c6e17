use crate::models::ModelParams;

/// Log-space half-width of the bucket range, in standard deviations of ln(S_T).
const RANGE_SIGMAS: f64 = 4.0;

/// Relative half-width used when S_T cannot move (expired option).
const DEGENERATE_HALF_WIDTH: f64 = 0.01;

/// Fixed-width histogram of terminal prices.
///
/// The range is set before any sample is seen, from the lognormal law of
/// S_T, so per-worker histograms share edges and merge by adding counts.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Histogram {
    pub lower: f64,
    pub upper: f64,
    pub bucket_width: f64,
    pub counts: Vec<u64>,
    /// Samples below `lower`
    pub underflow: u64,
    /// Samples at or above `upper`
    pub overflow: u64,
}

impl Histogram {
    pub fn for_params(params: &ModelParams, buckets: usize) -> Self {
        let buckets = buckets.max(1);
        let (lower, upper) = if params.is_expired() || params.diffusion <= 0.0 {
            (
                params.spot * (1.0 - DEGENERATE_HALF_WIDTH),
                params.spot * (1.0 + DEGENERATE_HALF_WIDTH),
            )
        } else {
            let center = params.spot.ln() + params.drift;
            let half = RANGE_SIGMAS * params.diffusion;
            ((center - half).exp(), (center + half).exp())
        };
        Self::with_range(lower, upper, buckets)
    }

    pub fn with_range(lower: f64, upper: f64, buckets: usize) -> Self {
        let buckets = buckets.max(1);
        Self {
            lower,
            upper,
            bucket_width: (upper - lower) / buckets as f64,
            counts: vec![0; buckets],
            underflow: 0,
            overflow: 0,
        }
    }

    #[inline]
    pub fn record(&mut self, value: f64) {
        if value < self.lower {
            self.underflow += 1;
            return;
        }
        if value >= self.upper || !value.is_finite() {
            self.overflow += 1;
            return;
        }
        let idx = ((value - self.lower) / self.bucket_width) as usize;
        // Rounding can land exactly on the top edge
        let idx = idx.min(self.counts.len() - 1);
        self.counts[idx] += 1;
    }

    /// Add `other`'s counts. Both must come from the same parameters.
    pub fn merge(&mut self, other: &Histogram) {
        debug_assert_eq!(self.counts.len(), other.counts.len());
        for (a, b) in self.counts.iter_mut().zip(&other.counts) {
            *a += b;
        }
        self.underflow += other.underflow;
        self.overflow += other.overflow;
    }

    pub fn total(&self) -> u64 {
        self.counts.iter().sum::<u64>() + self.underflow + self.overflow
    }
}
