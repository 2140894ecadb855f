use std::sync::Arc;

use h2h_lib::{
    ApiAuth, ApiClient, ApiClientOptions, ComparisonSession, ComparisonView, EntityId, EntityKind,
    FixtureStatSource, H2hError, RefreshOutcome, Slot, StatFetcher, StatScope, StatSource,
};

use crate::settings::ResolvedSettings;

pub type SharedSource = Arc<dyn StatSource>;

/// The stats API client, or local fixtures when `H2H_FIXTURES_DIR` is set.
pub fn build_source(settings: &ResolvedSettings) -> Result<SharedSource, H2hError> {
    if let Some(fixtures) = FixtureStatSource::from_env() {
        log::info!("Serving stats from fixtures at {}", fixtures.root().display());
        return Ok(Arc::new(fixtures));
    }

    let mut options = ApiClientOptions::new(settings.base_url.clone());
    options.timeout = settings.request_timeout;
    let auth = ApiAuth::from_env(&settings.token_env);
    if auth == ApiAuth::None {
        log::debug!("{} not set; sending unauthenticated requests", settings.token_env);
    }
    Ok(Arc::new(ApiClient::new(options, auth)?))
}

pub fn new_session(
    kind: EntityKind,
    source: SharedSource,
    settings: &ResolvedSettings,
) -> ComparisonSession<SharedSource> {
    ComparisonSession::new(
        kind,
        StatFetcher::with_capacity(source, settings.cache_capacity),
    )
}

#[derive(Debug, Clone)]
pub struct CompareRequest {
    pub entity1: EntityId,
    pub entity2: EntityId,
    pub scope1: StatScope,
    pub scope2: StatScope,
}

/// Drive a session through one full selection and refresh.
pub async fn run_comparison(
    session: &ComparisonSession<SharedSource>,
    settings: &ResolvedSettings,
    request: &CompareRequest,
) -> Result<ComparisonView, h2h_lib::ErrorPayload> {
    session.set_metrics(settings.metrics.clone());
    session.select_entity(Slot::First, request.entity1, request.scope1.clone());
    session.select_entity(Slot::Second, request.entity2, request.scope2.clone());

    match session.refresh().await {
        RefreshOutcome::Applied(_) => Ok(session.view()),
        RefreshOutcome::Failed(payload) => Err(payload),
        RefreshOutcome::Idle | RefreshOutcome::Stale => Err(H2hError::Unknown(
            "comparison did not complete".to_string(),
        )
        .to_payload()),
    }
}
