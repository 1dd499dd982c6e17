use crate::engine::{CancelFlag, RawPricingRequest};
use crate::errors::PricingError;
use crate::report::SimulationReport;
use crate::state::{AppState, CounterSnapshot, PerfCounters};
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::response::Json;
use portable_atomic::Ordering;
use std::sync::Arc;
use std::time::Instant;

/// GET / -- liveness
pub async fn home() -> &'static str {
    "Option Pricer API is running!"
}

/// POST /option-pricing -- validate, simulate, report.
///
/// The simulation runs on the blocking pool. If the request times out or
/// the client goes away (this future is dropped), the cancel flag stops
/// further chunks from starting.
pub async fn price_option(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<RawPricingRequest>, JsonRejection>,
) -> Result<Json<SimulationReport>, PricingError> {
    PerfCounters::bump(&state.counters.requests_received);
    let request_id = uuid::Uuid::new_v4();

    let raw = match payload {
        Ok(Json(raw)) => raw,
        Err(rejection) => {
            let err = PricingError::invalid("body", rejection.body_text());
            return Err(record_failure(&state, request_id, err));
        }
    };

    let request = state
        .pricer
        .validate(&raw)
        .map_err(|e| record_failure(&state, request_id, e))?;

    tracing::info!(
        %request_id,
        ticker = request.ticker.as_deref().unwrap_or("-"),
        iterations = request.iterations,
        option_type = %request.option_type,
        seed = ?request.seed,
        "pricing request accepted"
    );

    let cancel = CancelFlag::new();
    let guard = cancel.guard();
    let pricer = state.pricer.clone();
    let worker_cancel = cancel.clone();
    let started = Instant::now();

    let task = tokio::task::spawn_blocking(move || pricer.price(&request, &worker_cancel));
    let timeout = state.config.request_timeout;

    let outcome = match tokio::time::timeout(timeout, task).await {
        Ok(joined) => joined.map_err(PricingError::from).and_then(|result| result),
        Err(_) => {
            tracing::warn!(%request_id, timeout_ms = timeout.as_millis() as u64, "pricing timed out");
            cancel.cancel();
            Err(PricingError::Cancelled)
        }
    };
    guard.disarm();

    let report = outcome.map_err(|e| record_failure(&state, request_id, e))?;

    PerfCounters::bump(&state.counters.requests_completed);
    state
        .counters
        .samples_simulated
        .fetch_add(report.iterations, Ordering::Relaxed);

    tracing::info!(
        %request_id,
        option_price = report.option_price,
        standard_error = report.standard_error,
        seed = report.seed,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "pricing completed"
    );

    Ok(Json(report))
}

/// GET /stock-data/{ticker} -- spot and historical vol for the input form.
/// Failure is reported as `success: false`, never as partial data.
pub async fn stock_data(
    State(state): State<Arc<AppState>>,
    Path(ticker): Path<String>,
) -> Json<serde_json::Value> {
    PerfCounters::bump(&state.counters.quote_lookups);

    let result = match &state.quotes {
        Some(provider) => provider.quote(&ticker),
        None => Err(PricingError::UpstreamData("no quote source configured".into())),
    };

    match result {
        Ok(quote) => Json(serde_json::json!({
            "success": true,
            "ticker": quote.ticker,
            "price": quote.price,
            "volatility": quote.volatility,
            "asOf": quote.as_of,
        })),
        Err(e) => {
            PerfCounters::bump(&state.counters.quote_failures);
            tracing::warn!(ticker = %ticker, error = %e, "quote lookup failed");
            Json(serde_json::json!({ "success": false, "error": e.to_string() }))
        }
    }
}

/// GET /api/counters -- request counters (lock-free reads)
pub async fn get_counters(State(state): State<Arc<AppState>>) -> Json<CounterSnapshot> {
    Json(state.counters.snapshot())
}

fn record_failure(state: &AppState, request_id: uuid::Uuid, err: PricingError) -> PricingError {
    let counters = &state.counters;
    match &err {
        PricingError::Validation(_) => {
            PerfCounters::bump(&counters.validation_failures);
            tracing::warn!(%request_id, error = %err, "pricing request rejected");
        }
        PricingError::CapacityExceeded { .. } => {
            PerfCounters::bump(&counters.capacity_rejections);
            tracing::warn!(%request_id, error = %err, "pricing request over capacity");
        }
        PricingError::Cancelled => {
            PerfCounters::bump(&counters.cancellations);
            tracing::warn!(%request_id, "pricing request cancelled");
        }
        PricingError::NumericalInstability(_) => {
            PerfCounters::bump(&counters.numerical_failures);
            tracing::error!(%request_id, error = %err, "pricing failed");
        }
        _ => {
            PerfCounters::bump(&counters.internal_errors);
            tracing::error!(%request_id, error = %err, "pricing failed");
        }
    }
    err
}
