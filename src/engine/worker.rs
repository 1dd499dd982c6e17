use crate::config::EngineConfig;
use crate::errors::{EngineResult, PricingError};
use crate::estimator::RunningStats;
use crate::models::payoff;
use crate::models::rng::{stream_rng, StreamKind};
use crate::models::{ModelParams, PathGenerator};
use crate::report::histogram::Histogram;
use crate::report::reservoir::Reservoir;

/// Everything one chunk contributes to the request. All three parts merge
/// without revisiting samples.
#[derive(Debug, Clone)]
pub struct ChunkOutcome {
    pub stats: RunningStats,
    pub reservoir: Reservoir,
    pub histogram: Histogram,
}

/// Simulate `len` samples on chunk `index`'s private streams.
/// Each terminal price lives only for its loop iteration.
pub fn run_chunk<G: PathGenerator + ?Sized>(
    generator: &G,
    params: &ModelParams,
    seed: u64,
    index: u64,
    len: u64,
    config: &EngineConfig,
) -> EngineResult<ChunkOutcome> {
    let mut stats = RunningStats::new();
    let mut reservoir = Reservoir::new(config.plot_sample_size);
    let mut histogram = Histogram::for_params(params, config.histogram_buckets);
    let mut pick_rng = stream_rng(seed, StreamKind::Reservoir, index);

    let samples = generator.terminal_prices(params, stream_rng(seed, StreamKind::Terminal, index), len);

    for terminal in samples {
        if !terminal.is_finite() {
            return Err(PricingError::NumericalInstability(format!(
                "non-finite terminal price {terminal} in chunk {index}"
            )));
        }
        stats.push(payoff::discounted_payoff(params, terminal))?;
        reservoir.offer(terminal, &mut pick_rng);
        histogram.record(terminal);
    }

    Ok(ChunkOutcome {
        stats,
        reservoir,
        histogram,
    })
}
