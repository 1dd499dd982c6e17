use crate::errors::{PricingError, EngineResult};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server_port: u16,
    /// Per-request simulation budget; the work is cancelled past it
    pub request_timeout: Duration,
    pub quotes_file: Option<PathBuf>,
    pub engine: EngineConfig,
}

/// Limits and sizing for the simulation engine.
#[derive(Debug, Clone, Copy)]
pub struct EngineConfig {
    /// Hard cap on iterations per request
    pub max_iterations: u64,
    /// Samples per worker chunk (fixes the RNG stream partition)
    pub chunk_size: u64,
    /// Worker threads; 0 = one per available core
    pub worker_threads: usize,
    /// Max terminal prices (and bridge paths) in the plot
    pub plot_sample_size: usize,
    pub plot_path_steps: usize,
    pub histogram_buckets: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_iterations: 1_000_000,
            chunk_size: 16_384,
            worker_threads: 0,
            plot_sample_size: 200,
            plot_path_steps: 24,
            histogram_buckets: 50,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> EngineResult<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup; `from_env` passes the process environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> EngineResult<Self> {
        let server_port = parse_or(&lookup, "SERVER_PORT", 3001u16)?;
        let request_timeout_secs = parse_or(&lookup, "REQUEST_TIMEOUT_SECS", 30u64)?;

        let defaults = EngineConfig::default();
        let engine = EngineConfig {
            max_iterations: parse_or(&lookup, "MAX_ITERATIONS", defaults.max_iterations)?,
            chunk_size: parse_or(&lookup, "SIM_CHUNK_SIZE", defaults.chunk_size)?,
            worker_threads: parse_or(&lookup, "WORKER_THREADS", defaults.worker_threads)?,
            plot_sample_size: parse_or(&lookup, "PLOT_SAMPLE_SIZE", defaults.plot_sample_size)?,
            plot_path_steps: parse_or(&lookup, "PLOT_PATH_STEPS", defaults.plot_path_steps)?,
            histogram_buckets: parse_or(&lookup, "HISTOGRAM_BUCKETS", defaults.histogram_buckets)?,
        };

        require_nonzero("MAX_ITERATIONS", engine.max_iterations)?;
        require_nonzero("SIM_CHUNK_SIZE", engine.chunk_size)?;
        require_nonzero("PLOT_PATH_STEPS", engine.plot_path_steps as u64)?;
        require_nonzero("HISTOGRAM_BUCKETS", engine.histogram_buckets as u64)?;
        require_nonzero("REQUEST_TIMEOUT_SECS", request_timeout_secs)?;

        let quotes_file = lookup("QUOTES_FILE")
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from);

        Ok(Self {
            server_port,
            request_timeout: Duration::from_secs(request_timeout_secs),
            quotes_file,
            engine,
        })
    }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> EngineResult<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| PricingError::Config(format!("{key}: {e}"))),
        None => Ok(default),
    }
}

fn require_nonzero(key: &str, value: u64) -> EngineResult<()> {
    if value == 0 {
        return Err(PricingError::Config(format!("{key} must be greater than 0")));
    }
    Ok(())
}
