use crate::config::AppConfig;
use crate::engine::PricingService;
use crate::feeds::quotes::QuoteProvider;
use portable_atomic::{AtomicU64, Ordering};
use std::sync::Arc;

// ── Performance Counters (lock-free) ──

pub struct PerfCounters {
    pub requests_received: AtomicU64,
    pub requests_completed: AtomicU64,
    pub validation_failures: AtomicU64,
    pub capacity_rejections: AtomicU64,
    pub numerical_failures: AtomicU64,
    pub cancellations: AtomicU64,
    pub internal_errors: AtomicU64,
    pub samples_simulated: AtomicU64,
    pub quote_lookups: AtomicU64,
    pub quote_failures: AtomicU64,
}

impl PerfCounters {
    pub fn new() -> Self {
        Self {
            requests_received: AtomicU64::new(0),
            requests_completed: AtomicU64::new(0),
            validation_failures: AtomicU64::new(0),
            capacity_rejections: AtomicU64::new(0),
            numerical_failures: AtomicU64::new(0),
            cancellations: AtomicU64::new(0),
            internal_errors: AtomicU64::new(0),
            samples_simulated: AtomicU64::new(0),
            quote_lookups: AtomicU64::new(0),
            quote_failures: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> CounterSnapshot {
        use Ordering::Relaxed;
        CounterSnapshot {
            requests_received: self.requests_received.load(Relaxed),
            requests_completed: self.requests_completed.load(Relaxed),
            validation_failures: self.validation_failures.load(Relaxed),
            capacity_rejections: self.capacity_rejections.load(Relaxed),
            numerical_failures: self.numerical_failures.load(Relaxed),
            cancellations: self.cancellations.load(Relaxed),
            internal_errors: self.internal_errors.load(Relaxed),
            samples_simulated: self.samples_simulated.load(Relaxed),
            quote_lookups: self.quote_lookups.load(Relaxed),
            quote_failures: self.quote_failures.load(Relaxed),
        }
    }
}

impl Default for PerfCounters {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct CounterSnapshot {
    pub requests_received: u64,
    pub requests_completed: u64,
    pub validation_failures: u64,
    pub capacity_rejections: u64,
    pub numerical_failures: u64,
    pub cancellations: u64,
    pub internal_errors: u64,
    pub samples_simulated: u64,
    pub quote_lookups: u64,
    pub quote_failures: u64,
}

// ── Application shared state (no locks: immutable service + atomics) ──

pub struct AppState {
    pub config: AppConfig,
    pub pricer: Arc<PricingService>,
    /// None when no quote source is configured; lookups then fail cleanly
    pub quotes: Option<Arc<dyn QuoteProvider>>,
    pub counters: PerfCounters,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        pricer: PricingService,
        quotes: Option<Arc<dyn QuoteProvider>>,
    ) -> Arc<Self> {
        Arc::new(Self {
            config,
            pricer: Arc::new(pricer),
            quotes,
            counters: PerfCounters::new(),
        })
    }
}
