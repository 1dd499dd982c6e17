use smallvec::SmallVec;

/// A single rejected request field.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct FieldError {
    pub field: &'static str,
    pub reason: String,
}

impl FieldError {
    pub fn new(field: &'static str, reason: impl Into<String>) -> Self {
        Self {
            field,
            reason: reason.into(),
        }
    }
}

/// Most requests carry at most a handful of bad fields.
pub type FieldErrors = SmallVec<[FieldError; 4]>;

/// Domain-specific error types for the pricing engine.
/// Every variant maps to one of three caller actions:
/// - fix the input
/// - try again later
/// - report an internal fault
#[derive(Debug, thiserror::Error)]
pub enum PricingError {
    #[error("invalid request: {}", describe_fields(.0))]
    Validation(FieldErrors),

    #[error("numerical instability: {0}")]
    NumericalInstability(String),

    #[error("requested {requested} iterations exceeds the cap of {cap}")]
    CapacityExceeded { requested: u64, cap: u64 },

    #[error("upstream data error: {0}")]
    UpstreamData(String),

    #[error("pricing request cancelled")]
    Cancelled,

    #[error("config error: {0}")]
    Config(String),

    #[error("internal error: {0}")]
    Internal(String),
}

/// What the caller should do about an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorClass {
    InvalidInput,
    RetryLater,
    Internal,
}

impl PricingError {
    pub fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        let mut fields = FieldErrors::new();
        fields.push(FieldError::new(field, reason));
        PricingError::Validation(fields)
    }

    /// Stable machine-readable name for the variant.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::NumericalInstability(_) => "numerical_instability",
            Self::CapacityExceeded { .. } => "capacity_exceeded",
            Self::UpstreamData(_) => "upstream_data",
            Self::Cancelled => "cancelled",
            Self::Config(_) => "config",
            Self::Internal(_) => "internal",
        }
    }

    pub fn class(&self) -> ErrorClass {
        match self {
            Self::Validation(_) | Self::CapacityExceeded { .. } => ErrorClass::InvalidInput,
            Self::UpstreamData(_) | Self::Cancelled => ErrorClass::RetryLater,
            Self::NumericalInstability(_) | Self::Config(_) | Self::Internal(_) => {
                ErrorClass::Internal
            }
        }
    }

    /// Offending fields, empty for non-validation errors.
    pub fn fields(&self) -> &[FieldError] {
        match self {
            Self::Validation(fields) => fields,
            _ => &[],
        }
    }
}

fn describe_fields(fields: &FieldErrors) -> String {
    fields
        .iter()
        .map(|f| format!("{} {}", f.field, f.reason))
        .collect::<Vec<_>>()
        .join("; ")
}

impl From<serde_json::Error> for PricingError {
    fn from(e: serde_json::Error) -> Self {
        PricingError::UpstreamData(format!("parse: {e}"))
    }
}

impl From<std::io::Error> for PricingError {
    fn from(e: std::io::Error) -> Self {
        PricingError::UpstreamData(e.to_string())
    }
}

impl From<rayon::ThreadPoolBuildError> for PricingError {
    fn from(e: rayon::ThreadPoolBuildError) -> Self {
        PricingError::Config(format!("worker pool: {e}"))
    }
}

impl From<tokio::task::JoinError> for PricingError {
    fn from(e: tokio::task::JoinError) -> Self {
        PricingError::Internal(format!("simulation task failed: {e}"))
    }
}

pub type EngineResult<T> = Result<T, PricingError>;
