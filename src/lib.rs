pub mod api_client;
pub mod config;
pub mod error;
pub mod fetcher;
pub mod metrics;
pub mod output;
pub mod session;
pub mod source;
pub mod types;

pub use api_client::{build_api_url, ApiAuth, ApiClient, ApiClientOptions};
pub use config::Config;
pub use error::{ErrorCategory, ErrorPayload, H2hError, Result};
pub use fetcher::StatFetcher;
pub use metrics::{
    aggregate, all_metrics, compute_breakdown, compute_score, default_enabled, parse_metric_keys,
    MetricDefinition, MetricKey, Polarity,
};
pub use output::{
    CompareOutput, ErrorOutput, H2hOutput, MetricInfo, MetricsOutput, SideReport, StatsOutput,
    Summary, H2H_OUTPUT_VERSION,
};
pub use session::{
    ComparisonSelection, ComparisonSession, ComparisonView, RefreshOutcome, SelectionPhase, Slot,
};
pub use source::{FixtureStatSource, StatSource};
pub use types::{
    ComparableEntity, CompositeScore, EntityId, EntityKind, EntityRef, MetricContribution,
    StatQuery, StatRecord, StatScope,
};
