//! Driver and constructor identity types.

use std::fmt;
use std::num::NonZeroU32;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Which side of the grid an entity belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Driver,
    Constructor,
}

impl EntityKind {
    /// Collection segment used by the stats API (`/api/<segment>/...`).
    pub fn path_segment(self) -> &'static str {
        match self {
            EntityKind::Driver => "drivers",
            EntityKind::Constructor => "constructors",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityKind::Driver => f.write_str("driver"),
            EntityKind::Constructor => f.write_str("constructor"),
        }
    }
}

/// Backend identifier of a driver or constructor. Always positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(NonZeroU32);

impl EntityId {
    pub fn new(id: u32) -> Option<Self> {
        NonZeroU32::new(id).map(Self)
    }

    pub fn get(self) -> u32 {
        self.0.get()
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for EntityId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw: u32 = s
            .trim()
            .parse()
            .map_err(|_| format!("invalid entity id '{s}': expected a positive integer"))?;
        EntityId::new(raw).ok_or_else(|| format!("invalid entity id '{s}': must be positive"))
    }
}

/// An entity id qualified by its kind; the identity used for caching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityRef {
    pub kind: EntityKind,
    pub id: EntityId,
}

impl EntityRef {
    pub fn new(kind: EntityKind, id: EntityId) -> Self {
        Self { kind, id }
    }
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} #{}", self.kind, self.id)
    }
}

/// Display metadata for a driver or constructor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparableEntity {
    pub id: EntityId,
    pub kind: EntityKind,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nationality: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

impl ComparableEntity {
    /// Build an entity from a profile payload, tolerating missing fields.
    ///
    /// `name` falls back to `forename surname`, then to `#<id>`.
    pub fn from_payload(entity: EntityRef, payload: &Value) -> Self {
        let payload = payload
            .get("data")
            .filter(|v| v.is_object())
            .unwrap_or(payload);
        let text = |keys: &[&str]| -> Option<String> {
            keys.iter()
                .filter_map(|k| payload.get(*k))
                .filter_map(Value::as_str)
                .map(str::trim)
                .find(|s| !s.is_empty())
                .map(str::to_string)
        };

        let name = text(&["name", "full_name", "fullName"])
            .or_else(|| {
                let parts: Vec<String> = [
                    text(&["forename", "first_name", "firstName"]),
                    text(&["surname", "last_name", "lastName"]),
                ]
                .into_iter()
                .flatten()
                .collect();
                if parts.is_empty() {
                    None
                } else {
                    Some(parts.join(" "))
                }
            })
            .unwrap_or_else(|| format!("#{}", entity.id));

        Self {
            id: entity.id,
            kind: entity.kind,
            name,
            team: text(&["team", "team_name", "teamName", "constructor"]),
            nationality: text(&["nationality", "country"]),
            image_url: text(&[
                "image_url",
                "imageUrl",
                "headshot_url",
                "headshotUrl",
                "logo_url",
                "logoUrl",
            ]),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn driver(id: u32) -> EntityRef {
        EntityRef::new(EntityKind::Driver, EntityId::new(id).unwrap())
    }

    #[test]
    fn entity_id_rejects_zero_and_garbage() {
        assert!("0".parse::<EntityId>().is_err());
        assert!("-4".parse::<EntityId>().is_err());
        assert!("abc".parse::<EntityId>().is_err());
        assert_eq!("44".parse::<EntityId>().unwrap().get(), 44);
    }

    #[test]
    fn profile_prefers_name_field() {
        let entity = ComparableEntity::from_payload(
            driver(1),
            &json!({"name": "Lewis Hamilton", "team_name": "Ferrari", "nationality": "British"}),
        );
        assert_eq!(entity.name, "Lewis Hamilton");
        assert_eq!(entity.team.as_deref(), Some("Ferrari"));
        assert_eq!(entity.nationality.as_deref(), Some("British"));
        assert_eq!(entity.image_url, None);
    }

    #[test]
    fn profile_builds_name_from_parts_or_id() {
        let from_parts = ComparableEntity::from_payload(
            driver(3),
            &json!({"data": {"forename": "Max", "surname": "Verstappen"}}),
        );
        assert_eq!(from_parts.name, "Max Verstappen");

        let anonymous = ComparableEntity::from_payload(driver(7), &json!({"name": "  "}));
        assert_eq!(anonymous.name, "#7");
    }
}
