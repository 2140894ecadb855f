//! Data types used throughout the h2h library.
//!
//! This module is organized by domain:
//! - [`entity`] - Driver/constructor identity and display metadata
//! - [`scope`] - Career and multi-season scopes, backend queries
//! - [`stats`] - Typed statistics records and lenient payload decoding
//! - [`score`] - Composite score results

pub mod entity;
pub mod scope;
pub mod score;
pub mod stats;

pub use entity::{ComparableEntity, EntityId, EntityKind, EntityRef};
pub use scope::{Season, StatQuery, StatScope};
pub use score::{CompositeScore, MetricContribution};
pub use stats::StatRecord;
