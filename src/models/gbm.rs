use crate::models::rng::SampleRng;
use crate::models::{ModelParams, PathGenerator};
use rand::Rng;
use rand_distr::StandardNormal;

/// Exact one-step GBM terminal price sampler.
///
/// S_T = S0 * exp((r - sigma^2/2) * T + sigma * sqrt(T) * Z),  Z ~ N(0, 1)
///
/// Samples are produced lazily; nothing is buffered.
#[derive(Debug, Clone, Copy, Default)]
pub struct GbmGenerator;

impl GbmGenerator {
    pub fn new() -> Self {
        Self
    }
}

impl PathGenerator for GbmGenerator {
    #[inline]
    fn name(&self) -> &'static str {
        "GBM"
    }

    fn terminal_prices(
        &self,
        params: &ModelParams,
        rng: SampleRng,
        count: u64,
    ) -> Box<dyn Iterator<Item = f64> + Send> {
        Box::new(TerminalPrices::new(params, rng, count))
    }
}

/// Iterator over `remaining` terminal prices.
pub struct TerminalPrices {
    rng: SampleRng,
    spot: f64,
    drift: f64,
    diffusion: f64,
    expired: bool,
    remaining: u64,
}

impl TerminalPrices {
    pub fn new(params: &ModelParams, rng: SampleRng, count: u64) -> Self {
        Self {
            rng,
            spot: params.spot,
            drift: params.drift,
            diffusion: params.diffusion,
            expired: params.is_expired(),
            remaining: count,
        }
    }
}

impl Iterator for TerminalPrices {
    type Item = f64;

    #[inline]
    fn next(&mut self) -> Option<f64> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;

        // No time left: the price cannot move, and no draw is consumed
        if self.expired {
            return Some(self.spot);
        }

        let z: f64 = self.rng.sample(StandardNormal);
        Some(self.spot * (self.drift + self.diffusion * z).exp())
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = usize::try_from(self.remaining).unwrap_or(usize::MAX);
        (n, Some(n))
    }
}
