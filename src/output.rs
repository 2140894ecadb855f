//! Serializable command output.
//!
//! Every command writes exactly one [`H2hOutput`] document, tagged by
//! `mode`, so pipelines can dispatch on a single field.

use serde::{Deserialize, Serialize};

use crate::error::ErrorPayload;
use crate::metrics::{MetricDefinition, MetricKey, Polarity};
use crate::session::SelectionPhase;
use crate::types::{
    ComparableEntity, CompositeScore, EntityId, EntityKind, MetricContribution, StatRecord,
};

pub const H2H_OUTPUT_VERSION: &str = "1";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum H2hOutput {
    Compare(CompareOutput),
    Stats(StatsOutput),
    Metrics(MetricsOutput),
    Error(ErrorOutput),
}

/// One side of a comparison as reported.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SideReport {
    pub id: EntityId,
    pub scope: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity: Option<ComparableEntity>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stats: Option<StatRecord>,
}

impl SideReport {
    pub fn display_name(&self) -> String {
        self.entity
            .as_ref()
            .map(|e| e.name.clone())
            .unwrap_or_else(|| format!("#{}", self.id))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompareOutput {
    pub version: String,
    pub kind: EntityKind,
    pub phase: SelectionPhase,
    pub side1: SideReport,
    pub side2: SideReport,
    pub metrics: Vec<MetricKey>,
    pub score: CompositeScore,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub breakdown: Vec<MetricContribution>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<Summary>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub highlights: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsOutput {
    pub version: String,
    pub kind: EntityKind,
    pub id: EntityId,
    pub scope: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity: Option<ComparableEntity>,
    pub stats: StatRecord,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricInfo {
    pub key: MetricKey,
    pub label: String,
    pub polarity: Polarity,
}

impl From<&MetricDefinition> for MetricInfo {
    fn from(def: &MetricDefinition) -> Self {
        Self {
            key: def.key,
            label: def.label.to_string(),
            polarity: def.polarity,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsOutput {
    pub version: String,
    pub metrics: Vec<MetricInfo>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorOutput {
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub error: ErrorPayload,
}
