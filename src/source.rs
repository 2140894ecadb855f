//! Where statistics come from.
//!
//! [`StatSource`] is the seam between the comparison engine and the
//! backend: [`crate::ApiClient`] talks to the stats API over HTTP and
//! [`FixtureStatSource`] serves the same payloads from disk.

use std::path::{Path, PathBuf};

use futures::future::BoxFuture;
use futures::FutureExt;
use reqwest::StatusCode;
use serde_json::Value;

use crate::error::{H2hError, Result};
use crate::types::{ComparableEntity, EntityRef, StatQuery, StatRecord};

/// An asynchronous provider of per-entity statistics and profiles.
pub trait StatSource: Send + Sync {
    /// Fetch one query's worth of statistics. Implementations issue at most
    /// one backend request per call and never retry.
    fn fetch_stats(&self, entity: EntityRef, query: StatQuery) -> BoxFuture<'_, Result<StatRecord>>;

    /// Fetch display metadata for an entity.
    fn fetch_entity(&self, entity: EntityRef) -> BoxFuture<'_, Result<ComparableEntity>>;
}

impl<S: StatSource + ?Sized> StatSource for std::sync::Arc<S> {
    fn fetch_stats(&self, entity: EntityRef, query: StatQuery) -> BoxFuture<'_, Result<StatRecord>> {
        (**self).fetch_stats(entity, query)
    }

    fn fetch_entity(&self, entity: EntityRef) -> BoxFuture<'_, Result<ComparableEntity>> {
        (**self).fetch_entity(entity)
    }
}

/// Serves payloads from a directory laid out like the API:
/// `<root>/<drivers|constructors>/<id>/{career,<year>,profile}.json`.
#[derive(Debug, Clone)]
pub struct FixtureStatSource {
    root: PathBuf,
}

impl FixtureStatSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Picks up `H2H_FIXTURES_DIR` when set to a non-empty path.
    pub fn from_env() -> Option<Self> {
        std::env::var("H2H_FIXTURES_DIR")
            .ok()
            .filter(|dir| !dir.trim().is_empty())
            .map(Self::new)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn entity_dir(&self, entity: EntityRef) -> PathBuf {
        self.root
            .join(entity.kind.path_segment())
            .join(entity.id.to_string())
    }

    fn stats_path(&self, entity: EntityRef, query: StatQuery) -> PathBuf {
        self.entity_dir(entity).join(format!("{query}.json"))
    }

    fn profile_path(&self, entity: EntityRef) -> PathBuf {
        self.entity_dir(entity).join("profile.json")
    }

    async fn read_json(&self, path: PathBuf) -> Result<Value> {
        let data = match tokio::fs::read(&path).await {
            Ok(data) => data,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Err(H2hError::api(
                    Some(StatusCode::NOT_FOUND),
                    format!("no fixture at {}", path.display()),
                ))
            }
            Err(err) => return Err(H2hError::Io(err)),
        };
        Ok(serde_json::from_slice(&data)?)
    }
}

impl StatSource for FixtureStatSource {
    fn fetch_stats(&self, entity: EntityRef, query: StatQuery) -> BoxFuture<'_, Result<StatRecord>> {
        async move {
            let payload = self.read_json(self.stats_path(entity, query)).await?;
            Ok(StatRecord::from_payload(&payload))
        }
        .boxed()
    }

    fn fetch_entity(&self, entity: EntityRef) -> BoxFuture<'_, Result<ComparableEntity>> {
        async move {
            let payload = self.read_json(self.profile_path(entity)).await?;
            Ok(ComparableEntity::from_payload(entity, &payload))
        }
        .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{EntityId, EntityKind};

    fn constructor(id: u32) -> EntityRef {
        EntityRef::new(EntityKind::Constructor, EntityId::new(id).unwrap())
    }

    #[tokio::test]
    async fn reads_stats_and_profiles_from_layout() {
        let dir = tempfile::tempdir().expect("tempdir");
        let entity_dir = dir.path().join("constructors").join("6");
        std::fs::create_dir_all(&entity_dir).unwrap();
        std::fs::write(entity_dir.join("2021.json"), r#"{"wins": "9", "points": 613.5}"#).unwrap();
        std::fs::write(entity_dir.join("profile.json"), r#"{"name": "Ferrari"}"#).unwrap();

        let source = FixtureStatSource::new(dir.path());
        let stats = source
            .fetch_stats(constructor(6), StatQuery::Season(2021))
            .await
            .unwrap();
        assert_eq!(stats.wins, 9.0);
        assert_eq!(stats.points, 613.5);

        let profile = source.fetch_entity(constructor(6)).await.unwrap();
        assert_eq!(profile.name, "Ferrari");
        assert_eq!(profile.kind, EntityKind::Constructor);
    }

    #[tokio::test]
    async fn missing_fixture_is_not_found() {
        let dir = tempfile::tempdir().expect("tempdir");
        let source = FixtureStatSource::new(dir.path());
        let err = source
            .fetch_stats(constructor(1), StatQuery::Career)
            .await
            .unwrap_err();
        match err {
            H2hError::Api { status, .. } => assert_eq!(status, Some(StatusCode::NOT_FOUND)),
            other => panic!("expected api error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn malformed_fixture_is_serialization_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let entity_dir = dir.path().join("constructors").join("2");
        std::fs::create_dir_all(&entity_dir).unwrap();
        std::fs::write(entity_dir.join("career.json"), "{not json").unwrap();

        let source = FixtureStatSource::new(dir.path());
        let err = source
            .fetch_stats(constructor(2), StatQuery::Career)
            .await
            .unwrap_err();
        assert!(matches!(err, H2hError::Serialization(_)));
    }
}
