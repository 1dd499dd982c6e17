pub mod cancel;
pub mod service;
pub mod validation;
pub mod worker;

pub use cancel::CancelFlag;
pub use service::PricingService;
pub use validation::RawPricingRequest;

// ── Request State Machine ──

/// Lifecycle of one pricing request. Only success or failure is visible to
/// the caller; phases show up in logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestPhase {
    Received,
    Validated,
    ValidationFailed,
    Simulating,
    Aggregating,
    Completed,
}

impl std::fmt::Display for RequestPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Received => write!(f, "received"),
            Self::Validated => write!(f, "validated"),
            Self::ValidationFailed => write!(f, "validation_failed"),
            Self::Simulating => write!(f, "simulating"),
            Self::Aggregating => write!(f, "aggregating"),
            Self::Completed => write!(f, "completed"),
        }
    }
}
