//! Comparable statistics and how they are judged.
//!
//! The registry is a static table: every [`MetricKey`] has exactly one
//! [`MetricDefinition`] carrying its display label and [`Polarity`].

pub mod aggregate;
pub mod scoring;

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub use aggregate::aggregate;
pub use scoring::{compute_breakdown, compute_score};

/// Identifier of a comparable statistic.
///
/// The derived ordering is the registry order and drives every iteration
/// over enabled metrics, which keeps scoring deterministic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricKey {
    Wins,
    Podiums,
    Poles,
    FastestLaps,
    Points,
    Dnfs,
    Races,
}

/// Whether a larger raw value is the better one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Polarity {
    HigherIsBetter,
    LowerIsBetter,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricDefinition {
    pub key: MetricKey,
    pub label: &'static str,
    pub polarity: Polarity,
}

pub const REGISTRY: [MetricDefinition; 7] = [
    MetricDefinition {
        key: MetricKey::Wins,
        label: "Wins",
        polarity: Polarity::HigherIsBetter,
    },
    MetricDefinition {
        key: MetricKey::Podiums,
        label: "Podiums",
        polarity: Polarity::HigherIsBetter,
    },
    MetricDefinition {
        key: MetricKey::Poles,
        label: "Pole Positions",
        polarity: Polarity::HigherIsBetter,
    },
    MetricDefinition {
        key: MetricKey::FastestLaps,
        label: "Fastest Laps",
        polarity: Polarity::HigherIsBetter,
    },
    MetricDefinition {
        key: MetricKey::Points,
        label: "Points",
        polarity: Polarity::HigherIsBetter,
    },
    MetricDefinition {
        key: MetricKey::Dnfs,
        label: "DNFs",
        polarity: Polarity::LowerIsBetter,
    },
    MetricDefinition {
        key: MetricKey::Races,
        label: "Races",
        polarity: Polarity::HigherIsBetter,
    },
];

impl MetricKey {
    pub const ALL: [MetricKey; 7] = [
        MetricKey::Wins,
        MetricKey::Podiums,
        MetricKey::Poles,
        MetricKey::FastestLaps,
        MetricKey::Points,
        MetricKey::Dnfs,
        MetricKey::Races,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            MetricKey::Wins => "wins",
            MetricKey::Podiums => "podiums",
            MetricKey::Poles => "poles",
            MetricKey::FastestLaps => "fastest_laps",
            MetricKey::Points => "points",
            MetricKey::Dnfs => "dnfs",
            MetricKey::Races => "races",
        }
    }

    pub fn definition(self) -> &'static MetricDefinition {
        definition(self)
    }

    pub fn label(self) -> &'static str {
        self.definition().label
    }

    pub fn polarity(self) -> Polarity {
        self.definition().polarity
    }
}

impl fmt::Display for MetricKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MetricKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "wins" | "win" => Ok(MetricKey::Wins),
            "podiums" | "podium" => Ok(MetricKey::Podiums),
            "poles" | "pole" | "pole_positions" => Ok(MetricKey::Poles),
            "fastest_laps" | "fastest-laps" | "fastestlaps" => Ok(MetricKey::FastestLaps),
            "points" => Ok(MetricKey::Points),
            "dnfs" | "dnf" => Ok(MetricKey::Dnfs),
            "races" | "starts" => Ok(MetricKey::Races),
            other => Err(format!(
                "'{other}': unknown metric (expected one of: {})",
                MetricKey::ALL
                    .iter()
                    .map(|k| k.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            )),
        }
    }
}

pub fn definition(key: MetricKey) -> &'static MetricDefinition {
    // REGISTRY is declared in MetricKey order.
    &REGISTRY[key as usize]
}

pub fn all_metrics() -> &'static [MetricDefinition] {
    &REGISTRY
}

pub fn default_enabled() -> BTreeSet<MetricKey> {
    MetricKey::ALL.into_iter().collect()
}

/// Parse a list of metric identifiers, rejecting unknown names.
pub fn parse_metric_keys<I, S>(items: I) -> Result<BTreeSet<MetricKey>, String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut keys = BTreeSet::new();
    for item in items {
        let item = item.as_ref();
        if item.trim().is_empty() {
            continue;
        }
        keys.insert(MetricKey::from_str(item)?);
    }
    Ok(keys)
}
