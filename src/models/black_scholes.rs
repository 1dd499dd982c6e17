use crate::models::{ModelParams, OptionType};
use statrs::distribution::{ContinuousCDF, Normal};

/// Black-Scholes closed form for a European vanilla.
///
/// call = S * Phi(d1) - K * e^{-rT} * Phi(d2)
/// put  = K * e^{-rT} * Phi(-d2) - S * Phi(-d1)
///
/// where d1 = (ln(S/K) + (r + sigma^2/2)*T) / (sigma * sqrt(T)), d2 = d1 - sigma * sqrt(T).
///
/// Used as the analytic reference reported next to the Monte Carlo estimate.
pub struct BlackScholes {
    /// Standard normal distribution (created once, reused)
    normal: Normal,
}

impl BlackScholes {
    pub fn new() -> Self {
        Self {
            normal: Normal::standard(),
        }
    }

    pub fn price(&self, params: &ModelParams) -> f64 {
        let forward_strike = params.strike * params.discount;

        // No diffusion left: the option is worth its discounted forward intrinsic
        if params.diffusion < 1e-12 || params.is_expired() {
            let forward_spot = params.spot;
            return match params.option_type {
                OptionType::Call => (forward_spot - forward_strike).max(0.0),
                OptionType::Put => (forward_strike - forward_spot).max(0.0),
            };
        }

        let d1 = ((params.spot / params.strike).ln()
            + (params.rate + 0.5 * params.sigma * params.sigma) * params.ttl_years)
            / params.diffusion;
        let d2 = d1 - params.diffusion;

        match params.option_type {
            OptionType::Call => {
                params.spot * self.normal.cdf(d1) - forward_strike * self.normal.cdf(d2)
            }
            OptionType::Put => {
                forward_strike * self.normal.cdf(-d2) - params.spot * self.normal.cdf(-d1)
            }
        }
    }
}

impl Default for BlackScholes {
    fn default() -> Self {
        Self::new()
    }
}
