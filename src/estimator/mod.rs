pub mod welford;

pub use welford::RunningStats;
