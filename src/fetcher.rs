//! Memoizing stat fetcher.
//!
//! Each `(entity, query)` pair is requested from the [`StatSource`] at most
//! once per fetcher; successful responses are kept for the fetcher's
//! lifetime, failures are never cached. Concurrent lookups of a pair that is
//! already being fetched join the outstanding request instead of issuing a
//! second one. The cache is append-only and bounded: once `capacity` entries
//! are stored, further results are still returned to the caller but not
//! retained.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use futures::future::{try_join_all, BoxFuture, Shared};
use futures::FutureExt;

use crate::error::{H2hError, Result};
use crate::metrics::aggregate;
use crate::source::StatSource;
use crate::types::{ComparableEntity, EntityRef, StatQuery, StatRecord, StatScope};

pub const DEFAULT_CACHE_CAPACITY: usize = 256;

/// A request every concurrent caller for the same key awaits.
type PendingFetch<T> = Shared<BoxFuture<'static, std::result::Result<T, Arc<H2hError>>>>;

type StatKey = (EntityRef, StatQuery);

pub struct StatFetcher<S> {
    source: Arc<S>,
    capacity: usize,
    stats: Mutex<HashMap<StatKey, StatRecord>>,
    profiles: Mutex<HashMap<EntityRef, ComparableEntity>>,
    stats_in_flight: Mutex<HashMap<StatKey, PendingFetch<StatRecord>>>,
    profiles_in_flight: Mutex<HashMap<EntityRef, PendingFetch<ComparableEntity>>>,
    requests: AtomicUsize,
}

impl<S: StatSource + 'static> StatFetcher<S> {
    pub fn new(source: S) -> Self {
        Self::with_capacity(source, DEFAULT_CACHE_CAPACITY)
    }

    pub fn with_capacity(source: S, capacity: usize) -> Self {
        Self {
            source: Arc::new(source),
            capacity: capacity.max(1),
            stats: Mutex::new(HashMap::new()),
            profiles: Mutex::new(HashMap::new()),
            stats_in_flight: Mutex::new(HashMap::new()),
            profiles_in_flight: Mutex::new(HashMap::new()),
            requests: AtomicUsize::new(0),
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Statistics for `entity` over `scope`.
    ///
    /// Multi-season scopes fetch their uncached seasons concurrently and
    /// sum them; the first failing season fails the whole scope.
    pub async fn fetch_stats(&self, entity: EntityRef, scope: &StatScope) -> Result<StatRecord> {
        let queries = scope.queries();
        if scope.is_multi_season() {
            log::debug!("aggregating {} seasons for {entity} ({scope})", queries.len());
        }
        let records = try_join_all(queries.into_iter().map(|q| self.fetch_query(entity, q))).await?;
        aggregate(&records)
            .ok_or_else(|| H2hError::selection(format!("scope '{scope}' selects no seasons")))
    }

    /// One query's record, from cache when possible.
    pub async fn fetch_query(&self, entity: EntityRef, query: StatQuery) -> Result<StatRecord> {
        let key = (entity, query);
        let pending = {
            let mut in_flight = lock(&self.stats_in_flight);
            let cached = lock(&self.stats).get(&key).copied();
            if let Some(record) = cached {
                log::debug!("stats cache hit: {entity} {query}");
                return Ok(record);
            }
            match in_flight.get(&key) {
                Some(pending) => {
                    log::debug!("joining in-flight stats request: {entity} {query}");
                    pending.clone()
                }
                None => {
                    log::debug!("fetching stats: {entity} {query}");
                    self.requests.fetch_add(1, Ordering::Relaxed);
                    let source = Arc::clone(&self.source);
                    let pending = async move {
                        source.fetch_stats(entity, query).await.map_err(Arc::new)
                    }
                    .boxed()
                    .shared();
                    in_flight.insert(key, pending.clone());
                    pending
                }
            }
        };

        settle(&self.stats_in_flight, key, pending, |record: &StatRecord| {
            self.retain_stats(key, *record)
        })
        .await
    }

    /// Display metadata for `entity`, memoized like statistics.
    pub async fn fetch_entity(&self, entity: EntityRef) -> Result<ComparableEntity> {
        let pending = {
            let mut in_flight = lock(&self.profiles_in_flight);
            let cached = lock(&self.profiles).get(&entity).cloned();
            if let Some(profile) = cached {
                return Ok(profile);
            }
            match in_flight.get(&entity) {
                Some(pending) => pending.clone(),
                None => {
                    self.requests.fetch_add(1, Ordering::Relaxed);
                    let source = Arc::clone(&self.source);
                    let pending = async move { source.fetch_entity(entity).await.map_err(Arc::new) }
                        .boxed()
                        .shared();
                    in_flight.insert(entity, pending.clone());
                    pending
                }
            }
        };

        settle(
            &self.profiles_in_flight,
            entity,
            pending,
            |profile: &ComparableEntity| {
                let mut cache = lock(&self.profiles);
                if cache.len() < self.capacity {
                    cache.insert(entity, profile.clone());
                }
            },
        )
        .await
    }

    pub fn cached_len(&self) -> usize {
        lock(&self.stats).len()
    }

    pub fn is_cached(&self, entity: EntityRef, query: StatQuery) -> bool {
        lock(&self.stats).contains_key(&(entity, query))
    }

    /// Requests issued to the source so far (stats and profiles).
    pub fn request_count(&self) -> usize {
        self.requests.load(Ordering::Relaxed)
    }

    fn retain_stats(&self, key: StatKey, record: StatRecord) {
        let mut cache = lock(&self.stats);
        if cache.len() < self.capacity || cache.contains_key(&key) {
            cache.insert(key, record);
        } else {
            log::debug!(
                "stats cache full ({} entries); not retaining {} {}",
                self.capacity,
                key.0,
                key.1
            );
        }
    }
}

/// Await a pending request, store a success through `retain`, then retire
/// the request so later lookups go to the cache (or retry after a failure).
async fn settle<K, T>(
    in_flight: &Mutex<HashMap<K, PendingFetch<T>>>,
    key: K,
    pending: PendingFetch<T>,
    retain: impl FnOnce(&T),
) -> Result<T>
where
    K: Eq + Hash,
    T: Clone,
{
    let outcome = pending.clone().await;
    if let Ok(value) = &outcome {
        retain(value);
    }
    {
        let mut in_flight = lock(in_flight);
        if in_flight.get(&key).is_some_and(|p| p.ptr_eq(&pending)) {
            in_flight.remove(&key);
        }
    }
    // Release our handle so a sole waiter gets the original error back.
    drop(pending);
    outcome.map_err(|err| Arc::try_unwrap(err).unwrap_or_else(H2hError::Shared))
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    // Guards are never held across an await; a poisoned map is still consistent.
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}


#[cfg(test)]
mod tests {
    use super::test_support::FakeSource;
    use super::*;
    use crate::error::ErrorCategory;
    use crate::metrics::MetricKey;
    use crate::types::{EntityId, EntityKind};

    fn driver(id: u32) -> EntityRef {
        EntityRef::new(EntityKind::Driver, EntityId::new(id).unwrap())
    }

    fn wins(n: f64) -> StatRecord {
        StatRecord::default().with(MetricKey::Wins, n)
    }

    fn seasons_source() -> FakeSource {
        FakeSource::default()
            .with(driver(1), StatQuery::Season(2020), wins(11.0))
            .with(driver(1), StatQuery::Season(2021), wins(8.0))
            .with(driver(1), StatQuery::Season(2022), wins(1.0))
            .with(driver(1), StatQuery::Career, wins(103.0))
    }

    #[tokio::test]
    async fn repeated_fetch_hits_cache() {
        let fetcher = StatFetcher::new(seasons_source());
        let first = fetcher.fetch_stats(driver(1), &StatScope::Career).await.unwrap();
        let second = fetcher.fetch_stats(driver(1), &StatScope::Career).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(first.wins, 103.0);
        assert_eq!(fetcher.source().calls(), 1);
        assert_eq!(fetcher.request_count(), 1);
    }

    #[tokio::test]
    async fn multi_season_scope_sums_and_reuses_seasons() {
        let fetcher = StatFetcher::new(seasons_source());
        let scope = StatScope::years([2020, 2021]).unwrap();
        let total = fetcher.fetch_stats(driver(1), &scope).await.unwrap();
        assert_eq!(total.wins, 19.0);
        assert_eq!(fetcher.source().calls(), 2);

        // 2021 is already cached; only 2022 is new.
        let scope = StatScope::years([2021, 2022]).unwrap();
        let total = fetcher.fetch_stats(driver(1), &scope).await.unwrap();
        assert_eq!(total.wins, 9.0);
        assert_eq!(fetcher.source().calls(), 3);
        assert_eq!(fetcher.cached_len(), 3);
    }

    #[tokio::test]
    async fn failures_are_not_cached() {
        let fetcher = StatFetcher::new(seasons_source());
        let scope = StatScope::years([2021, 1999]).unwrap();
        let err = fetcher.fetch_stats(driver(1), &scope).await.unwrap_err();
        assert_eq!(err.to_payload().category, ErrorCategory::Api);
        assert!(!fetcher.is_cached(driver(1), StatQuery::Season(1999)));

        let _ = fetcher.fetch_stats(driver(1), &scope).await;
        let retried_1999 = fetcher.source().calls();
        assert!(retried_1999 >= 3, "failed season must be requested again");
    }

    #[tokio::test]
    async fn full_cache_still_returns_results() {
        let fetcher = StatFetcher::with_capacity(seasons_source(), 1);
        fetcher
            .fetch_stats(driver(1), &StatScope::season(2020))
            .await
            .unwrap();
        let record = fetcher
            .fetch_stats(driver(1), &StatScope::season(2021))
            .await
            .unwrap();
        assert_eq!(record.wins, 8.0);
        assert_eq!(fetcher.cached_len(), 1);
        assert!(fetcher.is_cached(driver(1), StatQuery::Season(2020)));
        assert!(!fetcher.is_cached(driver(1), StatQuery::Season(2021)));
    }

    #[tokio::test]
    async fn profiles_are_memoized() {
        let fetcher = StatFetcher::new(seasons_source());
        let a = fetcher.fetch_entity(driver(1)).await.unwrap();
        let b = fetcher.fetch_entity(driver(1)).await.unwrap();
        assert_eq!(a, b);
        assert_eq!(fetcher.source().calls(), 1);
    }

    #[tokio::test]
    async fn concurrent_lookups_share_one_request() {
        let fetcher = StatFetcher::new(seasons_source());
        let scope = StatScope::years([2020, 2021]).unwrap();
        let (a, b, profile_a, profile_b) = futures::join!(
            fetcher.fetch_stats(driver(1), &scope),
            fetcher.fetch_stats(driver(1), &scope),
            fetcher.fetch_entity(driver(1)),
            fetcher.fetch_entity(driver(1))
        );
        assert_eq!(a.unwrap().wins, 19.0);
        assert_eq!(b.unwrap().wins, 19.0);
        assert_eq!(profile_a.unwrap(), profile_b.unwrap());
        // Two seasons and one profile.
        assert_eq!(fetcher.source().calls(), 3);
        assert_eq!(fetcher.request_count(), 3);
        assert_eq!(fetcher.cached_len(), 2);
    }

    #[tokio::test]
    async fn concurrent_failure_reaches_every_caller_and_is_retried() {
        let fetcher = StatFetcher::new(seasons_source());
        let scope = StatScope::season(1999);
        let (a, b) = futures::join!(
            fetcher.fetch_stats(driver(1), &scope),
            fetcher.fetch_stats(driver(1), &scope)
        );
        assert_eq!(a.unwrap_err().to_payload().category, ErrorCategory::Api);
        assert_eq!(b.unwrap_err().to_payload().category, ErrorCategory::Api);
        assert_eq!(fetcher.source().calls(), 1);

        let _ = fetcher.fetch_stats(driver(1), &scope).await;
        assert_eq!(fetcher.source().calls(), 2);
    }
}
