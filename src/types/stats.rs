//! Per-entity statistics records.
//!
//! The stats API is loose about shapes: counts may arrive as numbers or
//! numeric strings, keys may be camelCase or snake_case, and fields are
//! frequently absent. [`StatRecord::from_payload`] is the only place that
//! leniency lives; everything downstream works with a fully populated,
//! typed record.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::metrics::MetricKey;

/// One value per [`MetricKey`] for a single entity under a single scope.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatRecord {
    pub wins: f64,
    pub podiums: f64,
    pub poles: f64,
    pub fastest_laps: f64,
    pub points: f64,
    pub dnfs: f64,
    pub races: f64,
}

impl StatRecord {
    pub fn get(&self, key: MetricKey) -> f64 {
        match key {
            MetricKey::Wins => self.wins,
            MetricKey::Podiums => self.podiums,
            MetricKey::Poles => self.poles,
            MetricKey::FastestLaps => self.fastest_laps,
            MetricKey::Points => self.points,
            MetricKey::Dnfs => self.dnfs,
            MetricKey::Races => self.races,
        }
    }

    pub fn set(&mut self, key: MetricKey, value: f64) {
        let slot = match key {
            MetricKey::Wins => &mut self.wins,
            MetricKey::Podiums => &mut self.podiums,
            MetricKey::Poles => &mut self.poles,
            MetricKey::FastestLaps => &mut self.fastest_laps,
            MetricKey::Points => &mut self.points,
            MetricKey::Dnfs => &mut self.dnfs,
            MetricKey::Races => &mut self.races,
        };
        *slot = value;
    }

    pub fn with(mut self, key: MetricKey, value: f64) -> Self {
        self.set(key, value);
        self
    }

    /// Values in registry order.
    pub fn iter(&self) -> impl Iterator<Item = (MetricKey, f64)> + '_ {
        MetricKey::ALL.into_iter().map(move |key| (key, self.get(key)))
    }

    /// Decode a stats payload, substituting 0 for anything missing or unusable.
    ///
    /// Accepts the record at the top level or wrapped in a `stats` / `data`
    /// object. Negative and non-finite values are treated as missing.
    pub fn from_payload(payload: &Value) -> Self {
        let Some(object) = unwrap_record(payload) else {
            log::debug!("stats payload is not an object; using empty record");
            return StatRecord::default();
        };

        let mut record = StatRecord::default();
        for key in MetricKey::ALL {
            let value = field_aliases(key)
                .iter()
                .find_map(|alias| object.get(*alias).and_then(lenient_number));
            record.set(key, value.unwrap_or(0.0));
        }
        record
    }
}

fn unwrap_record(payload: &Value) -> Option<&Map<String, Value>> {
    let object = payload.as_object()?;
    for wrapper in ["stats", "data"] {
        if let Some(inner) = object.get(wrapper).and_then(Value::as_object) {
            return Some(inner);
        }
    }
    Some(object)
}

fn field_aliases(key: MetricKey) -> &'static [&'static str] {
    match key {
        MetricKey::Wins => &["wins", "total_wins", "totalWins"],
        MetricKey::Podiums => &["podiums", "total_podiums", "totalPodiums"],
        MetricKey::Poles => &["poles", "pole_positions", "polePositions"],
        MetricKey::FastestLaps => &["fastest_laps", "fastestLaps", "fastest_lap_count"],
        MetricKey::Points => &["points", "total_points", "totalPoints"],
        MetricKey::Dnfs => &["dnfs", "dnf_count", "dnfCount", "dnf"],
        MetricKey::Races => &["races", "races_entered", "racesEntered", "starts"],
    }
}

fn lenient_number(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    (parsed.is_finite() && parsed >= 0.0).then_some(parsed)
}
