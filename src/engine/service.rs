use crate::config::EngineConfig;
use crate::engine::cancel::CancelFlag;
use crate::engine::validation::{self, PricingRequest, RawPricingRequest};
use crate::engine::worker::{self, ChunkOutcome};
use crate::engine::RequestPhase;
use crate::errors::{EngineResult, PricingError};
use crate::estimator::RunningStats;
use crate::models::black_scholes::BlackScholes;
use crate::models::gbm::GbmGenerator;
use crate::models::rng::{fresh_seed, stream_rng, StreamKind};
use crate::models::{ModelParams, PathGenerator};
use crate::report::bridge;
use crate::report::histogram::Histogram;
use crate::report::reservoir::Reservoir;
use crate::report::SimulationReport;
use rayon::prelude::*;

/// Chunks simulated between merges.
const MERGE_BATCH_CHUNKS: usize = 64;

/// Monte Carlo pricer. Holds only configuration, the generator and the
/// worker pool; nothing from one request survives into the next.
pub struct PricingService<G: PathGenerator = GbmGenerator> {
    config: EngineConfig,
    generator: G,
    pool: rayon::ThreadPool,
    analytic: BlackScholes,
}

impl PricingService<GbmGenerator> {
    pub fn new(config: EngineConfig) -> EngineResult<Self> {
        Self::with_generator(config, GbmGenerator::new())
    }
}

impl<G: PathGenerator> PricingService<G> {
    pub fn with_generator(config: EngineConfig, generator: G) -> EngineResult<Self> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.worker_threads)
            .thread_name(|i| format!("mc-worker-{i}"))
            .build()?;

        tracing::info!(
            generator = generator.name(),
            threads = pool.current_num_threads(),
            max_iterations = config.max_iterations,
            chunk_size = config.chunk_size,
            "pricing service ready"
        );

        Ok(Self {
            config,
            generator,
            pool,
            analytic: BlackScholes::new(),
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    #[cfg(test)]
    pub fn generator(&self) -> &G {
        &self.generator
    }

    /// Received -> Validated, or Received -> ValidationFailed.
    pub fn validate(&self, raw: &RawPricingRequest) -> EngineResult<PricingRequest> {
        tracing::debug!(phase = %RequestPhase::Received, "received");
        let validated = validation::validate(raw, self.config.max_iterations);
        let phase = if validated.is_ok() {
            RequestPhase::Validated
        } else {
            RequestPhase::ValidationFailed
        };
        tracing::debug!(phase = %phase, "validation finished");
        validated
    }

    /// Validate and price in one call. No simulation work happens unless
    /// validation passes.
    pub fn price_raw(
        &self,
        raw: &RawPricingRequest,
        cancel: &CancelFlag,
    ) -> EngineResult<SimulationReport> {
        let request = self.validate(raw)?;
        self.price(&request, cancel)
    }

    /// Validated -> Simulating -> Aggregating -> Completed.
    ///
    /// Draws are split into fixed-size chunks; chunk `i` always uses stream
    /// `i`, and chunk results are merged in index order, so a given seed
    /// reproduces bit-identical output for any thread count.
    pub fn price(
        &self,
        request: &PricingRequest,
        cancel: &CancelFlag,
    ) -> EngineResult<SimulationReport> {
        let seed = request.seed.unwrap_or_else(fresh_seed);
        let params = request.model_params();
        let n = request.iterations;
        let chunk_size = self.config.chunk_size;
        let chunks = usize::try_from(n.div_ceil(chunk_size))
            .map_err(|_| PricingError::Internal(format!("{n} iterations cannot be partitioned")))?;

        tracing::debug!(phase = %RequestPhase::Simulating, iterations = n, chunks, seed, "simulating");

        let mut stats = RunningStats::new();
        let mut reservoir = Reservoir::new(self.config.plot_sample_size);
        let mut histogram = Histogram::for_params(&params, self.config.histogram_buckets);
        let mut plot_rng = stream_rng(seed, StreamKind::Plot, 0);
        let mut cancelled = false;

        // Batches bound the chunk results held at once; the batch size is
        // fixed so the merge order never depends on the thread count.
        let mut batch_start = 0;
        while batch_start < chunks && !cancelled {
            let batch_end = chunks.min(batch_start + MERGE_BATCH_CHUNKS);
            let outcomes: Vec<EngineResult<ChunkOutcome>> = self.pool.install(|| {
                (batch_start..batch_end)
                    .into_par_iter()
                    .map(|index| self.simulate_chunk(&params, seed, index as u64, n, cancel))
                    .collect()
            });

            for outcome in outcomes {
                match outcome {
                    Ok(chunk) => {
                        stats.merge(&chunk.stats);
                        histogram.merge(&chunk.histogram);
                        reservoir = reservoir.merge(chunk.reservoir, &mut plot_rng);
                    }
                    // A real failure outranks the cancellations it triggered
                    Err(PricingError::Cancelled) => cancelled = true,
                    Err(e) => return Err(e),
                }
            }
            batch_start = batch_end;
        }

        tracing::debug!(phase = %RequestPhase::Aggregating, "aggregating");

        if cancelled {
            return Err(PricingError::Cancelled);
        }
        if stats.count() != n || histogram.total() != n || reservoir.seen() != n {
            return Err(PricingError::Internal(format!(
                "merged {} of {n} samples",
                stats.count()
            )));
        }
        tracing::debug!(
            samples = n,
            sampled = reservoir.len(),
            histogram_total = histogram.total(),
            "chunks merged"
        );

        let option_price = stats.mean();
        let standard_error = stats.standard_error();
        if !option_price.is_finite() || !standard_error.is_finite() {
            return Err(PricingError::NumericalInstability(format!(
                "estimate not finite: price={option_price} se={standard_error}"
            )));
        }

        let terminal_sample = reservoir.into_items();
        let steps = self.config.plot_path_steps;
        let paths = terminal_sample
            .iter()
            .map(|&terminal| bridge::bridge_path(&params, terminal, steps, &mut plot_rng))
            .collect();

        tracing::debug!(phase = %RequestPhase::Completed, option_price, standard_error, "completed");

        Ok(SimulationReport::new(
            option_price,
            standard_error,
            self.analytic.price(&params),
            params.option_type,
            n,
            seed,
            terminal_sample,
            bridge::path_times(params.ttl_years, steps),
            paths,
            histogram,
        ))
    }

    fn simulate_chunk(
        &self,
        params: &ModelParams,
        seed: u64,
        index: u64,
        total: u64,
        cancel: &CancelFlag,
    ) -> EngineResult<ChunkOutcome> {
        if cancel.is_cancelled() {
            return Err(PricingError::Cancelled);
        }
        let chunk_size = self.config.chunk_size;
        let len = chunk_size.min(total - index * chunk_size);
        let outcome = worker::run_chunk(&self.generator, params, seed, index, len, &self.config);
        if outcome.is_err() {
            // No point simulating the rest of a failed request
            cancel.cancel();
        }
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::rng::SampleRng;
    use crate::models::OptionType;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Counts how often the service asks for samples.
    struct SpyGenerator {
        inner: GbmGenerator,
        calls: AtomicUsize,
    }

    impl SpyGenerator {
        fn new() -> Self {
            Self {
                inner: GbmGenerator::new(),
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl PathGenerator for SpyGenerator {
        fn name(&self) -> &'static str {
            "spy"
        }

        fn terminal_prices(
            &self,
            params: &ModelParams,
            rng: SampleRng,
            count: u64,
        ) -> Box<dyn Iterator<Item = f64> + Send> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.terminal_prices(params, rng, count)
        }
    }

    fn config() -> EngineConfig {
        EngineConfig {
            chunk_size: 4_096,
            worker_threads: 2,
            ..EngineConfig::default()
        }
    }

    fn raw(iterations: f64, seed: u64) -> RawPricingRequest {
        RawPricingRequest {
            ticker: None,
            stock_price: Some(100.0),
            strike_price: Some(100.0),
            time_to_expiry: Some(40.0),
            volatility: Some(20.0),
            risk_free_rate: Some(2.5),
            iterations: Some(iterations),
            option_type: None,
            seed: Some(seed),
        }
    }

    fn price(service: &PricingService, raw: &RawPricingRequest) -> SimulationReport {
        service.price_raw(raw, &CancelFlag::new()).unwrap()
    }

    #[test]
    fn test_expired_equals_intrinsic() {
        let service = PricingService::new(config()).unwrap();
        for iterations in [1.0, 2.0, 10_000.0] {
            let mut r = raw(iterations, 5);
            r.time_to_expiry = Some(0.0);
            r.stock_price = Some(112.5);
            let report = price(&service, &r);
            assert_eq!(report.option_price, 12.5, "N={iterations}");
            assert_eq!(report.standard_error, 0.0, "N={iterations}");
        }

        let mut otm = raw(500.0, 5);
        otm.time_to_expiry = Some(0.0);
        otm.stock_price = Some(90.0);
        assert_eq!(price(&service, &otm).option_price, 0.0);
    }

    #[test]
    fn test_single_iteration_zero_error() {
        let service = PricingService::new(config()).unwrap();
        let report = price(&service, &raw(1.0, 3));
        assert_eq!(report.iterations, 1);
        assert_eq!(report.standard_error, 0.0);
        assert!(report.option_price >= 0.0);
    }

    #[test]
    fn test_seed_replay_bit_identical() {
        let service = PricingService::new(config()).unwrap();
        let a = price(&service, &raw(50_000.0, 42));
        let b = price(&service, &raw(50_000.0, 42));
        assert_eq!(a.option_price.to_bits(), b.option_price.to_bits());
        assert_eq!(a.standard_error.to_bits(), b.standard_error.to_bits());
        assert_eq!(a, b, "plot data must replay too");
    }

    #[test]
    fn test_thread_count_does_not_change_result() {
        let one = PricingService::new(EngineConfig { worker_threads: 1, ..config() }).unwrap();
        let four = PricingService::new(EngineConfig { worker_threads: 4, ..config() }).unwrap();
        let a = price(&one, &raw(30_000.0, 9));
        let b = price(&four, &raw(30_000.0, 9));
        assert_eq!(a, b);
    }

    #[test]
    fn test_many_batches_merge_in_order() {
        let small = |threads| EngineConfig {
            chunk_size: 16,
            worker_threads: threads,
            ..config()
        };
        let one = PricingService::new(small(1)).unwrap();
        let three = PricingService::new(small(3)).unwrap();
        // 313 chunks, several merge batches
        let a = price(&one, &raw(5_000.0, 17));
        let b = price(&three, &raw(5_000.0, 17));
        assert_eq!(a, b);
        assert_eq!(a.plot.histogram.total(), 5_000);
        assert_eq!(a.plot.terminal_sample.len(), config().plot_sample_size);
    }

    #[test]
    fn test_different_seeds_differ() {
        let service = PricingService::new(config()).unwrap();
        let a = price(&service, &raw(10_000.0, 1));
        let b = price(&service, &raw(10_000.0, 2));
        assert_ne!(a.option_price, b.option_price);
    }

    #[test]
    fn test_missing_seed_is_reported() {
        let service = PricingService::new(config()).unwrap();
        let mut r = raw(2_000.0, 0);
        r.seed = None;
        let first = price(&service, &r);
        r.seed = Some(first.seed);
        let replay = price(&service, &r);
        assert_eq!(first.option_price, replay.option_price);
    }

    #[test]
    fn test_matches_black_scholes() {
        // S0=100, K=100, T=40/365, sigma=20%, r=2.5%, N=100k
        let service = PricingService::new(config()).unwrap();
        let report = price(&service, &raw(100_000.0, 20_240_101));
        let diff = (report.option_price - report.analytic_price).abs();
        assert!(
            diff < 4.0 * report.standard_error,
            "mc={} bs={} se={}",
            report.option_price,
            report.analytic_price,
            report.standard_error
        );
        assert!((report.analytic_price - 2.776).abs() < 0.01);
    }

    #[test]
    fn test_standard_error_shrinks_with_sqrt_n() {
        let service = PricingService::new(config()).unwrap();
        let mut ratios = Vec::new();
        for seed in 0..5u64 {
            let small = price(&service, &raw(20_000.0, 100 + seed));
            let large = price(&service, &raw(80_000.0, 200 + seed));
            ratios.push(large.standard_error / small.standard_error);
            // Same expected value either way
            let tolerance = 4.0 * (small.standard_error + large.standard_error);
            assert!((small.option_price - large.option_price).abs() < tolerance);
        }
        let mean_ratio = ratios.iter().sum::<f64>() / ratios.len() as f64;
        assert!((mean_ratio - 0.5).abs() < 0.05, "SE(4N)/SE(N) = {mean_ratio}");
    }

    #[test]
    fn test_put_call_parity_same_draws() {
        let service = PricingService::new(config()).unwrap();
        let call_raw = raw(60_000.0, 77);
        let put_raw = RawPricingRequest {
            option_type: Some(OptionType::Put),
            ..call_raw.clone()
        };
        let call = price(&service, &call_raw);
        let put = price(&service, &put_raw);

        // Same seed -> same terminal prices
        assert_eq!(call.plot.terminal_sample, put.plot.terminal_sample);

        let params = service.validate(&call_raw).unwrap().model_params();
        let forward = params.spot - params.strike * params.discount;
        let diff = call.option_price - put.option_price;
        // C - P = mean(disc * S_T) - K disc; sd(S_T) ~ 6.6 here, so SE ~ 0.03
        assert!((diff - forward).abs() < 0.15, "C-P={diff} S-Kdf={forward}");
    }

    #[test]
    fn test_deep_out_of_the_money() {
        let service = PricingService::new(config()).unwrap();
        let mut r = raw(50_000.0, 8);
        r.strike_price = Some(1_000.0);
        let report = price(&service, &r);
        assert!(report.option_price < 1e-9, "price={}", report.option_price);
        assert!(report.standard_error < 1e-9, "se={}", report.standard_error);
    }

    #[test]
    fn test_validation_failure_does_no_work() {
        let service = PricingService::with_generator(config(), SpyGenerator::new()).unwrap();
        let mut r = raw(1_000.0, 1);
        r.stock_price = Some(-5.0);
        let err = service.price_raw(&r, &CancelFlag::new()).unwrap_err();
        match err {
            PricingError::Validation(fields) => assert_eq!(fields[0].field, "stockPrice"),
            other => panic!("expected validation error, got {other:?}"),
        }
        assert_eq!(service.generator().calls.load(Ordering::SeqCst), 0);

        // Sanity: a valid request does reach the generator, once per chunk
        service.price_raw(&raw(10_000.0, 1), &CancelFlag::new()).unwrap();
        assert_eq!(service.generator().calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_capacity_cap_enforced() {
        let service = PricingService::with_generator(
            EngineConfig { max_iterations: 5_000, ..config() },
            SpyGenerator::new(),
        )
        .unwrap();
        let err = service.price_raw(&raw(5_001.0, 1), &CancelFlag::new()).unwrap_err();
        assert!(matches!(err, PricingError::CapacityExceeded { cap: 5_000, .. }));
        assert_eq!(service.generator().calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_cancelled_request_fails() {
        let service = PricingService::with_generator(config(), SpyGenerator::new()).unwrap();
        let cancel = CancelFlag::new();
        cancel.cancel();
        let err = service.price_raw(&raw(100_000.0, 1), &cancel).unwrap_err();
        assert!(matches!(err, PricingError::Cancelled));
        assert_eq!(service.generator().calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_numerical_instability_surfaces() {
        let service = PricingService::new(config()).unwrap();
        let mut r = raw(20_000.0, 1);
        r.risk_free_rate = Some(100_000.0);
        r.time_to_expiry = Some(365.0);
        let err = service.price_raw(&r, &CancelFlag::new()).unwrap_err();
        assert!(matches!(err, PricingError::NumericalInstability(_)), "got {err:?}");
    }

    #[test]
    fn test_plot_is_bounded() {
        let service = PricingService::new(config()).unwrap();
        let report = price(&service, &raw(100_000.0, 4));
        let cfg = service.config();
        assert_eq!(report.plot.terminal_sample.len(), cfg.plot_sample_size);
        assert_eq!(report.plot.paths.len(), cfg.plot_sample_size);
        assert_eq!(report.plot.path_times.len(), cfg.plot_path_steps + 1);
        assert_eq!(report.plot.histogram.total(), 100_000);
        assert_eq!(report.plot.histogram.counts.len(), cfg.histogram_buckets);
        for (path, &terminal) in report.plot.paths.iter().zip(&report.plot.terminal_sample) {
            assert_eq!(path[0], 100.0);
            assert_eq!(*path.last().unwrap(), terminal);
        }
    }

    #[test]
    fn test_underflowed_terminals_give_finite_paths() {
        let service = PricingService::new(config()).unwrap();
        let mut r = raw(1_000.0, 1);
        r.time_to_expiry = Some(365.0);
        r.volatility = Some(5_000.0);
        r.option_type = Some(OptionType::Put);
        let report = price(&service, &r);
        assert!(report.option_price.is_finite());
        assert!(!report.plot.paths.is_empty());
        for path in &report.plot.paths {
            assert_eq!(path[0], 100.0);
            assert!(
                path.iter().all(|s| s.is_finite() && *s >= 0.0),
                "non-finite point in {path:?}"
            );
        }
    }

    #[test]
    fn test_small_run_keeps_every_sample() {
        let service = PricingService::new(config()).unwrap();
        let report = price(&service, &raw(50.0, 4));
        assert_eq!(report.plot.terminal_sample.len(), 50);
    }
}
