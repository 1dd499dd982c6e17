use crate::models::ModelParams;
use rand::Rng;
use rand_distr::StandardNormal;

/// Log-price bounds that still exponentiate to a finite, non-negative price.
const MIN_LN_PRICE: f64 = -708.0;
const MAX_LN_PRICE: f64 = 709.0;

/// Draw a GBM path from the spot to a given terminal price.
///
/// Conditioned on both endpoints, ln S_t is a Brownian bridge with
/// volatility sigma. Stepping from (t_i, x_i) towards (T, x_T):
///
///   mean = x_i + dt / (T - t_i) * (x_T - x_i)
///   var  = sigma^2 * dt * (T - t_{i+1}) / (T - t_i)
///
/// Returns `steps + 1` prices; the first is the spot and the last is
/// exactly `terminal`. Interior points stay finite even when `terminal`
/// has underflowed to zero.
pub fn bridge_path<R: Rng + ?Sized>(
    params: &ModelParams,
    terminal: f64,
    steps: usize,
    rng: &mut R,
) -> Vec<f64> {
    let steps = steps.max(1);
    let mut path = Vec::with_capacity(steps + 1);
    path.push(params.spot);

    if params.is_expired() {
        path.resize(steps + 1, params.spot);
        return path;
    }

    let total = params.ttl_years;
    let dt = total / steps as f64;
    let sigma_sq = params.sigma * params.sigma;
    let target = terminal.ln().clamp(MIN_LN_PRICE, MAX_LN_PRICE);
    let mut x = params.spot.ln();

    for i in 0..steps - 1 {
        let remaining = total - i as f64 * dt;
        let mean = x + dt / remaining * (target - x);
        let var = (sigma_sq * dt * (remaining - dt) / remaining).max(0.0);
        let z: f64 = rng.sample(StandardNormal);
        x = (mean + var.sqrt() * z).clamp(MIN_LN_PRICE, MAX_LN_PRICE);
        path.push(x.exp());
    }
    path.push(terminal);
    path
}

/// Times (in years) matching each point of a `bridge_path`.
pub fn path_times(ttl_years: f64, steps: usize) -> Vec<f64> {
    let steps = steps.max(1);
    (0..=steps)
        .map(|i| ttl_years * i as f64 / steps as f64)
        .collect()
}
