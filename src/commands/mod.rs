mod compare;
mod metrics;
mod stats;

pub use compare::{run_compare, CompareArgs};
pub use metrics::run_metrics;
pub use stats::{run_stats, StatsArgs};
