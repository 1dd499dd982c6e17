use statrs::distribution::{Continuous, Normal};

/// Points sampled across [mean - 3 SE, mean + 3 SE].
const CURVE_POINTS: usize = 121;

/// Sampling distribution of the Monte Carlo estimate, N(price, SE^2),
/// ready to draw as a shaded density with the 1-SE band highlighted.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConvergenceCurve {
    pub center: f64,
    pub one_se: [f64; 2],
    pub three_se: [f64; 2],
    pub x: Vec<f64>,
    pub density: Vec<f64>,
}

impl ConvergenceCurve {
    /// Empty series when `standard_error` is zero; there is no spread to draw.
    pub fn from_estimate(price: f64, standard_error: f64) -> Self {
        let one_se = [price - standard_error, price + standard_error];
        let three_se = [price - 3.0 * standard_error, price + 3.0 * standard_error];

        let normal = match Normal::new(price, standard_error) {
            Ok(n) if standard_error > 0.0 => n,
            _ => {
                return Self {
                    center: price,
                    one_se,
                    three_se,
                    x: Vec::new(),
                    density: Vec::new(),
                }
            }
        };

        let step = (three_se[1] - three_se[0]) / (CURVE_POINTS - 1) as f64;
        let x: Vec<f64> = (0..CURVE_POINTS)
            .map(|i| three_se[0] + step * i as f64)
            .collect();
        let density = x.iter().map(|&v| normal.pdf(v)).collect();

        Self {
            center: price,
            one_se,
            three_se,
            x,
            density,
        }
    }
}
