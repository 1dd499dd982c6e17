use crate::errors::{EngineResult, PricingError};
use crate::estimator::RunningStats;
use chrono::NaiveDate;
use std::collections::HashMap;
use std::path::Path;

/// Trading days per year used to annualize daily volatility
const TRADING_DAYS: f64 = 252.0;

/// Closes used for the historical volatility estimate
const VOL_WINDOW: usize = 30;

/// Spot and annualized historical volatility (percent) for a ticker.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    pub ticker: String,
    pub price: f64,
    pub volatility: f64,
    pub as_of: Option<NaiveDate>,
}

/// Source of pricing inputs for a ticker. Lookups either return a full
/// quote or fail; partial data is never returned.
pub trait QuoteProvider: Send + Sync {
    fn name(&self) -> &'static str;

    fn quote(&self, ticker: &str) -> EngineResult<Quote>;
}

// Quotes file format:
// {
//   "AAPL": { "asOf": "2026-10-15", "closes": [221.3, 222.8, 224.1] },
//   "MSFT": { "closes": [410.2, 412.9, 409.5] }
// }
// Closes are oldest first; at least three are needed for a volatility.

#[derive(Debug, Clone, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuoteHistory {
    #[serde(default)]
    as_of: Option<NaiveDate>,
    closes: Vec<f64>,
}

/// Manually maintained closing prices loaded once from a JSON file.
#[derive(Debug, Clone, Default)]
pub struct FileQuoteProvider {
    histories: HashMap<String, QuoteHistory>,
}

impl FileQuoteProvider {
    pub fn load(path: &Path) -> EngineResult<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            PricingError::UpstreamData(format!("read {}: {e}", path.display()))
        })?;
        let provider = Self::from_json(&raw)?;
        tracing::info!(
            path = %path.display(),
            tickers = provider.histories.len(),
            "quote file loaded"
        );
        Ok(provider)
    }

    pub fn from_json(raw: &str) -> EngineResult<Self> {
        let parsed: HashMap<String, QuoteHistory> = serde_json::from_str(raw)?;
        let histories = parsed
            .into_iter()
            .map(|(ticker, history)| (ticker.trim().to_uppercase(), history))
            .collect();
        Ok(Self { histories })
    }
}

impl QuoteProvider for FileQuoteProvider {
    fn name(&self) -> &'static str {
        "file"
    }

    fn quote(&self, ticker: &str) -> EngineResult<Quote> {
        let key = ticker.trim().to_uppercase();
        let history = self
            .histories
            .get(&key)
            .ok_or_else(|| PricingError::UpstreamData(format!("no data for ticker {key}")))?;

        let price = *history
            .closes
            .last()
            .ok_or_else(|| PricingError::UpstreamData(format!("no closes for {key}")))?;
        if price <= 0.0 || !price.is_finite() {
            return Err(PricingError::UpstreamData(format!("invalid close {price} for {key}")));
        }

        let volatility = historical_volatility(&history.closes)?;

        Ok(Quote {
            ticker: key,
            price,
            volatility,
            as_of: history.as_of,
        })
    }
}

/// Annualized volatility in percent from the last `VOL_WINDOW` closes:
/// sample std dev of daily percentage changes * sqrt(252) * 100.
/// Needs two returns, i.e. three closes.
pub fn historical_volatility(closes: &[f64]) -> EngineResult<f64> {
    let window = &closes[closes.len().saturating_sub(VOL_WINDOW)..];
    let mut stats = RunningStats::new();

    for pair in window.windows(2) {
        let (prev, next) = (pair[0], pair[1]);
        if prev <= 0.0 {
            return Err(PricingError::UpstreamData(format!("invalid close {prev}")));
        }
        stats
            .push(next / prev - 1.0)
            .map_err(|e| PricingError::UpstreamData(e.to_string()))?;
    }

    if stats.count() < 2 {
        return Err(PricingError::UpstreamData(
            "not enough closes to estimate volatility".into(),
        ));
    }

    Ok(stats.sample_std_dev() * TRADING_DAYS.sqrt() * 100.0)
}
