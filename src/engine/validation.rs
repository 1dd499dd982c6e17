use crate::errors::{EngineResult, FieldError, FieldErrors, PricingError};
use crate::models::{ModelParams, OptionType};

/// Calendar days per year used to convert `timeToExpiry`.
pub const DAYS_PER_YEAR: f64 = 365.0;

/// Request body exactly as received. Every field is optional here so that
/// missing and malformed fields are reported together, by name.
#[derive(Debug, Clone, Default, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawPricingRequest {
    pub ticker: Option<String>,
    pub stock_price: Option<f64>,
    pub strike_price: Option<f64>,
    /// Days
    pub time_to_expiry: Option<f64>,
    /// Percent
    pub volatility: Option<f64>,
    /// Percent
    pub risk_free_rate: Option<f64>,
    pub iterations: Option<f64>,
    pub option_type: Option<OptionType>,
    pub seed: Option<u64>,
}

/// A request that passed validation. Wire units are kept; `model_params`
/// does the unit conversion.
#[derive(Debug, Clone, PartialEq)]
pub struct PricingRequest {
    pub ticker: Option<String>,
    pub stock_price: f64,
    pub strike_price: f64,
    pub time_to_expiry_days: f64,
    pub volatility_pct: f64,
    pub risk_free_rate_pct: f64,
    pub iterations: u64,
    pub option_type: OptionType,
    pub seed: Option<u64>,
}

impl PricingRequest {
    /// Years, decimal vol and decimal rate.
    pub fn model_params(&self) -> ModelParams {
        ModelParams::new(
            self.stock_price,
            self.strike_price,
            self.time_to_expiry_days / DAYS_PER_YEAR,
            self.volatility_pct / 100.0,
            self.risk_free_rate_pct / 100.0,
            self.option_type,
        )
    }
}

/// Check every field, then the iteration cap.
///
/// All field problems are collected before returning; the cap is only
/// checked once the request is otherwise well formed.
pub fn validate(raw: &RawPricingRequest, max_iterations: u64) -> EngineResult<PricingRequest> {
    let mut errors = FieldErrors::new();

    let stock_price = positive(&mut errors, "stockPrice", raw.stock_price);
    let strike_price = positive(&mut errors, "strikePrice", raw.strike_price);
    let time_to_expiry_days = non_negative(&mut errors, "timeToExpiry", raw.time_to_expiry);
    let volatility_pct = positive(&mut errors, "volatility", raw.volatility);
    let risk_free_rate_pct = finite(&mut errors, "riskFreeRate", raw.risk_free_rate);
    let iterations = iteration_count(&mut errors, raw.iterations);

    if !errors.is_empty() {
        return Err(PricingError::Validation(errors));
    }

    if iterations > max_iterations as f64 {
        return Err(PricingError::CapacityExceeded {
            requested: iterations as u64,
            cap: max_iterations,
        });
    }

    let ticker = raw
        .ticker
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_uppercase);

    Ok(PricingRequest {
        ticker,
        stock_price,
        strike_price,
        time_to_expiry_days,
        volatility_pct,
        risk_free_rate_pct,
        iterations: iterations as u64,
        option_type: raw.option_type.unwrap_or_default(),
        seed: raw.seed,
    })
}

fn finite(errors: &mut FieldErrors, field: &'static str, value: Option<f64>) -> f64 {
    match value {
        None => {
            errors.push(FieldError::new(field, "is required"));
            0.0
        }
        Some(v) if !v.is_finite() => {
            errors.push(FieldError::new(field, "must be a finite number"));
            0.0
        }
        Some(v) => v,
    }
}

fn positive(errors: &mut FieldErrors, field: &'static str, value: Option<f64>) -> f64 {
    let before = errors.len();
    let v = finite(errors, field, value);
    if errors.len() == before && v <= 0.0 {
        errors.push(FieldError::new(field, "must be greater than 0"));
    }
    v
}

fn non_negative(errors: &mut FieldErrors, field: &'static str, value: Option<f64>) -> f64 {
    let before = errors.len();
    let v = finite(errors, field, value);
    if errors.len() == before && v < 0.0 {
        errors.push(FieldError::new(field, "must not be negative"));
    }
    v
}

fn iteration_count(errors: &mut FieldErrors, value: Option<f64>) -> f64 {
    let before = errors.len();
    let v = positive(errors, "iterations", value);
    if errors.len() == before && v.fract() != 0.0 {
        errors.push(FieldError::new("iterations", "must be an integer"));
    }
    v
}
