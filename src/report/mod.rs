pub mod bridge;
pub mod convergence;
pub mod histogram;
pub mod reservoir;

use crate::models::OptionType;
use convergence::ConvergenceCurve;
use histogram::Histogram;

/// z-score of the two-sided 95% interval
const Z_95: f64 = 1.959_963_984_540_054;

/// Bounded chart data. Size depends only on configuration, never on the
/// number of iterations.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlotData {
    /// Uniform sample of simulated terminal prices
    pub terminal_sample: Vec<f64>,
    /// Shared time axis (years) for `paths`
    pub path_times: Vec<f64>,
    /// One bridge path per sampled terminal price
    pub paths: Vec<Vec<f64>>,
    pub histogram: Histogram,
    pub convergence: ConvergenceCurve,
}

#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct Interval {
    pub low: f64,
    pub high: f64,
}

/// Everything a pricing run returns. Immutable once built.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationReport {
    pub option_price: f64,
    pub standard_error: f64,
    pub confidence_interval: Interval,
    /// Closed-form Black-Scholes value for the same inputs
    pub analytic_price: f64,
    pub option_type: OptionType,
    pub iterations: u64,
    /// Seed that reproduces this run
    pub seed: u64,
    pub plot: PlotData,
}

impl SimulationReport {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        option_price: f64,
        standard_error: f64,
        analytic_price: f64,
        option_type: OptionType,
        iterations: u64,
        seed: u64,
        terminal_sample: Vec<f64>,
        path_times: Vec<f64>,
        paths: Vec<Vec<f64>>,
        histogram: Histogram,
    ) -> Self {
        let half_width = Z_95 * standard_error;
        Self {
            option_price,
            standard_error,
            confidence_interval: Interval {
                low: option_price - half_width,
                high: option_price + half_width,
            },
            analytic_price,
            option_type,
            iterations,
            seed,
            plot: PlotData {
                terminal_sample,
                path_times,
                paths,
                histogram,
                convergence: ConvergenceCurve::from_estimate(option_price, standard_error),
            },
        }
    }
}
