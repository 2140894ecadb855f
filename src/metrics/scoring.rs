use std::collections::BTreeSet;

use crate::metrics::{MetricKey, Polarity};
use crate::types::{CompositeScore, MetricContribution, StatRecord};

const MAX_SCORE: f64 = 100.0;

/// Normalize one metric for both sides into [0, 100].
///
/// Values are relative to the pair: the better side of a metric always
/// scores 100. A pair whose maximum is zero scores 0 on both sides.
fn normalize_pair(polarity: Polarity, value1: f64, value2: f64) -> (f64, f64) {
    let v1 = sanitize(value1);
    let v2 = sanitize(value2);
    let max = v1.max(v2);
    if max <= 0.0 {
        return (0.0, 0.0);
    }

    match polarity {
        Polarity::HigherIsBetter => (v1 / max * MAX_SCORE, v2 / max * MAX_SCORE),
        Polarity::LowerIsBetter => {
            let min = v1.min(v2);
            let score = |v: f64| {
                if v <= 0.0 {
                    MAX_SCORE
                } else {
                    min / v * MAX_SCORE
                }
            };
            (score(v1), score(v2))
        }
    }
}

fn sanitize(value: f64) -> f64 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        0.0
    }
}

/// Per-metric contributions for every enabled metric, in registry order.
pub fn compute_breakdown(
    record1: &StatRecord,
    record2: &StatRecord,
    enabled: &BTreeSet<MetricKey>,
) -> Vec<MetricContribution> {
    enabled
        .iter()
        .map(|&key| {
            let value1 = record1.get(key);
            let value2 = record2.get(key);
            let (score1, score2) = normalize_pair(key.polarity(), value1, value2);
            MetricContribution {
                key,
                value1,
                value2,
                score1,
                score2,
            }
        })
        .collect()
}

/// Composite score per side: the mean of the enabled metrics' normalized
/// contributions. No enabled metrics yields `{None, None}`.
pub fn compute_score(
    record1: &StatRecord,
    record2: &StatRecord,
    enabled: &BTreeSet<MetricKey>,
) -> CompositeScore {
    score_from_breakdown(&compute_breakdown(record1, record2, enabled))
}

pub fn score_from_breakdown(breakdown: &[MetricContribution]) -> CompositeScore {
    if breakdown.is_empty() {
        return CompositeScore::insufficient();
    }

    let count = breakdown.len() as f64;
    let (sum1, sum2) = breakdown
        .iter()
        .fold((0.0, 0.0), |(a, b), c| (a + c.score1, b + c.score2));

    CompositeScore::new(
        (sum1 / count).clamp(0.0, MAX_SCORE),
        (sum2 / count).clamp(0.0, MAX_SCORE),
    )
}
