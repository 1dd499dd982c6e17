use crate::models::{ModelParams, OptionType};

/// Undiscounted payoff at expiry.
///
/// call: max(S_T - K, 0)    put: max(K - S_T, 0)
///
/// NaN input stays NaN so the estimator can reject it; `f64::max` would
/// silently turn it into 0.
#[inline]
pub fn intrinsic(option_type: OptionType, terminal: f64, strike: f64) -> f64 {
    let moneyness = match option_type {
        OptionType::Call => terminal - strike,
        OptionType::Put => strike - terminal,
    };
    if moneyness > 0.0 {
        moneyness
    } else if moneyness.is_nan() {
        f64::NAN
    } else {
        0.0
    }
}

/// Present value of the payoff for one simulated terminal price.
#[inline]
pub fn discounted_payoff(params: &ModelParams, terminal: f64) -> f64 {
    params.discount * intrinsic(params.option_type, terminal, params.strike)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_call_and_put_intrinsic() {
        assert_eq!(intrinsic(OptionType::Call, 110.0, 100.0), 10.0);
        assert_eq!(intrinsic(OptionType::Call, 90.0, 100.0), 0.0);
        assert_eq!(intrinsic(OptionType::Put, 90.0, 100.0), 10.0);
        assert_eq!(intrinsic(OptionType::Put, 110.0, 100.0), 0.0);
    }

    #[test]
    fn test_never_negative() {
        for s in [0.0, 1e-9, 50.0, 100.0, 1e12] {
            assert!(intrinsic(OptionType::Call, s, 100.0) >= 0.0);
            assert!(intrinsic(OptionType::Put, s, 100.0) >= 0.0);
        }
    }

    #[test]
    fn test_nan_propagates() {
        assert!(intrinsic(OptionType::Call, f64::NAN, 100.0).is_nan());
    }

    #[test]
    fn test_discounting() {
        let params = ModelParams::new(100.0, 100.0, 1.0, 0.2, 0.05, OptionType::Call);
        let pv = discounted_payoff(&params, 120.0);
        assert!((pv - 20.0 * (-0.05f64).exp()).abs() < 1e-12, "pv={pv}");
    }
}
