use serde::{Deserialize, Serialize};

use crate::metrics::MetricKey;

/// Composite 0-100 score per side; both `None` when there is no basis
/// for comparison.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompositeScore {
    pub score1: Option<f64>,
    pub score2: Option<f64>,
}

impl CompositeScore {
    pub fn new(score1: f64, score2: f64) -> Self {
        Self {
            score1: Some(score1),
            score2: Some(score2),
        }
    }

    pub fn insufficient() -> Self {
        Self::default()
    }

    pub fn is_available(&self) -> bool {
        self.score1.is_some() && self.score2.is_some()
    }

    pub fn swapped(self) -> Self {
        Self {
            score1: self.score2,
            score2: self.score1,
        }
    }
}

/// How one enabled metric contributed to each side's score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricContribution {
    pub key: MetricKey,
    pub value1: f64,
    pub value2: f64,
    pub score1: f64,
    pub score2: f64,
}
