pub mod black_scholes;
pub mod gbm;
pub mod payoff;
pub mod rng;

use crate::models::rng::SampleRng;

/// Option payoff direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptionType {
    #[default]
    Call,
    Put,
}

impl std::fmt::Display for OptionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Call => write!(f, "call"),
            Self::Put => write!(f, "put"),
        }
    }
}

/// All terminal-price generators implement this trait.
/// Output must depend only on `params`, the supplied `rng` and `count`.
/// Send + Sync required for use across worker threads.
pub trait PathGenerator: Send + Sync {
    fn name(&self) -> &'static str;

    /// Lazily yield `count` simulated terminal prices drawn from `rng`.
    fn terminal_prices(
        &self,
        params: &ModelParams,
        rng: SampleRng,
        count: u64,
    ) -> Box<dyn Iterator<Item = f64> + Send>;
}

// ── Precomputed model parameters (stack, no alloc) ──

/// Decimal-unit inputs for one pricing run, with the GBM and discount
/// terms precomputed once.
#[derive(Debug, Clone, Copy, PartialEq)]
#[repr(C)]
pub struct ModelParams {
    pub spot: f64,
    pub strike: f64,
    pub ttl_years: f64,
    pub sigma: f64,
    pub rate: f64,
    pub option_type: OptionType,
    // Precomputed
    /// (r - sigma^2/2) * T
    pub drift: f64,
    /// sigma * sqrt(T)
    pub diffusion: f64,
    /// exp(-r * T)
    pub discount: f64,
}

impl ModelParams {
    #[inline]
    pub fn new(
        spot: f64,
        strike: f64,
        ttl_years: f64,
        sigma: f64,
        rate: f64,
        option_type: OptionType,
    ) -> Self {
        let drift = (rate - 0.5 * sigma * sigma) * ttl_years;
        let diffusion = sigma * ttl_years.sqrt();
        let discount = (-rate * ttl_years).exp();
        Self {
            spot,
            strike,
            ttl_years,
            sigma,
            rate,
            option_type,
            drift,
            diffusion,
            discount,
        }
    }

    /// True when no time remains and every sample collapses to the spot.
    #[inline]
    pub fn is_expired(&self) -> bool {
        self.ttl_years <= 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_precomputed_terms() {
        let p = ModelParams::new(100.0, 100.0, 1.0, 0.2, 0.05, OptionType::Call);
        assert!((p.drift - 0.03).abs() < 1e-12, "drift={}", p.drift);
        assert!((p.diffusion - 0.2).abs() < 1e-12);
        assert!((p.discount - (-0.05f64).exp()).abs() < 1e-15);
    }

    #[test]
    fn test_zero_ttl_has_unit_discount() {
        let p = ModelParams::new(100.0, 90.0, 0.0, 0.2, 0.05, OptionType::Call);
        assert!(p.is_expired());
        assert_eq!(p.discount, 1.0);
        assert_eq!(p.diffusion, 0.0);
    }

    #[test]
    fn test_option_type_wire_names() {
        let put: OptionType = serde_json::from_str("\"put\"").unwrap();
        assert_eq!(put, OptionType::Put);
        assert_eq!(serde_json::to_string(&OptionType::Call).unwrap(), "\"call\"");
    }
}
