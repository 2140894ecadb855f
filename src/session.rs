//! Head-to-head comparison session.
//!
//! A [`ComparisonSession`] tracks which two entities are being compared,
//! over which scopes, and which metrics are enabled. Every change to the
//! selection bumps a sequence number. Changes to entities or scopes also
//! bump a separate fetch sequence; [`ComparisonSession::refresh`] snapshots
//! it, fetches both sides concurrently, and only publishes its result if
//! the fetch sequence is still current when the fetches resolve. A refresh
//! that lost the race to a newer pair is discarded ("last selection wins").
//! Metric changes rescore in place and never invalidate a running refresh.
//!
//! The session owns its [`StatFetcher`], so the stat cache lives exactly as
//! long as the session (and its clones).

use std::collections::BTreeSet;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use serde::{Deserialize, Serialize};

use crate::error::{ErrorPayload, H2hError, Result};
use crate::fetcher::StatFetcher;
use crate::metrics::{compute_breakdown, default_enabled, scoring, MetricKey};
use crate::source::StatSource;
use crate::types::{
    ComparableEntity, CompositeScore, EntityId, EntityKind, EntityRef, MetricContribution,
    StatRecord, StatScope,
};

/// One side of the comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Slot {
    First,
    Second,
}

impl Slot {
    fn index(self) -> usize {
        match self {
            Slot::First => 0,
            Slot::Second => 1,
        }
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Slot::First => f.write_str("entity1"),
            Slot::Second => f.write_str("entity2"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionPhase {
    Empty,
    OneSelected,
    /// Both entities chosen; scores not yet computed for this selection.
    BothSelected,
    /// Scores computed for the current selection.
    Ready,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SideSelection {
    pub entity: Option<EntityId>,
    pub scope: StatScope,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonSelection {
    pub kind: EntityKind,
    pub side1: SideSelection,
    pub side2: SideSelection,
    pub enabled: BTreeSet<MetricKey>,
}

impl ComparisonSelection {
    pub fn new(kind: EntityKind) -> Self {
        Self {
            kind,
            side1: SideSelection::default(),
            side2: SideSelection::default(),
            enabled: default_enabled(),
        }
    }

    pub fn side(&self, slot: Slot) -> &SideSelection {
        match slot {
            Slot::First => &self.side1,
            Slot::Second => &self.side2,
        }
    }

    fn side_mut(&mut self, slot: Slot) -> &mut SideSelection {
        match slot {
            Slot::First => &mut self.side1,
            Slot::Second => &mut self.side2,
        }
    }

    pub fn entity_ref(&self, slot: Slot) -> Option<EntityRef> {
        self.side(slot)
            .entity
            .map(|id| EntityRef::new(self.kind, id))
    }

    pub fn selected_count(&self) -> usize {
        [&self.side1, &self.side2]
            .iter()
            .filter(|s| s.entity.is_some())
            .count()
    }
}

/// Read-only snapshot of everything a renderer needs.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonView {
    pub phase: SelectionPhase,
    pub sequence: u64,
    pub selection: ComparisonSelection,
    pub entity1: Option<ComparableEntity>,
    pub entity2: Option<ComparableEntity>,
    pub stats1: Option<StatRecord>,
    pub stats2: Option<StatRecord>,
    pub score: CompositeScore,
    pub breakdown: Vec<MetricContribution>,
    pub loading: bool,
    pub error: Option<ErrorPayload>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RefreshOutcome {
    /// Nothing selected; no requests were made.
    Idle,
    /// Results were published; carries the selection sequence they were
    /// scored under.
    Applied(u64),
    /// A fetch failed; the error is published in the view.
    Failed(ErrorPayload),
    /// The selection changed while fetching; results were discarded.
    Stale,
}

#[derive(Debug, Clone, Default)]
struct SideData {
    /// Entity and scope the stats were fetched for.
    loaded_for: Option<(EntityId, StatScope)>,
    stats: Option<StatRecord>,
    profile: Option<ComparableEntity>,
}

impl SideData {
    fn is_current(&self, side: &SideSelection) -> bool {
        match (&self.loaded_for, side.entity) {
            (Some((id, scope)), Some(selected)) => *id == selected && *scope == side.scope,
            _ => false,
        }
    }
}

#[derive(Debug)]
struct SessionState {
    selection: ComparisonSelection,
    sequence: u64,
    /// Bumped only when an entity or scope changes.
    fetch_sequence: u64,
    /// Fetch sequence of the most recently started refresh.
    pending: Option<u64>,
    /// Sequence the current score was computed for.
    scored: Option<u64>,
    sides: [SideData; 2],
    score: CompositeScore,
    breakdown: Vec<MetricContribution>,
    error: Option<ErrorPayload>,
}

impl SessionState {
    fn new(kind: EntityKind) -> Self {
        Self {
            selection: ComparisonSelection::new(kind),
            sequence: 0,
            fetch_sequence: 0,
            pending: None,
            scored: None,
            sides: [SideData::default(), SideData::default()],
            score: CompositeScore::insufficient(),
            breakdown: Vec::new(),
            error: None,
        }
    }

    /// Invalidate the score after any selection change.
    fn bump(&mut self) -> u64 {
        self.sequence += 1;
        self.scored = None;
        self.score = CompositeScore::insufficient();
        self.breakdown.clear();
        self.sequence
    }

    /// Invalidate fetched data after an entity or scope change.
    fn bump_pair(&mut self) -> u64 {
        self.fetch_sequence += 1;
        self.error = None;
        for slot in [Slot::First, Slot::Second] {
            let side = self.selection.side(slot);
            let data = &mut self.sides[slot.index()];
            if !data.is_current(side) {
                data.stats = None;
                data.loaded_for = None;
                if data.profile.as_ref().map(|p| p.id) != side.entity {
                    data.profile = None;
                }
            }
        }
        self.bump()
    }

    /// Recompute the score from the stats on hand, if both are current.
    fn rescore(&mut self) -> bool {
        let sides_current = self.sides[0].is_current(&self.selection.side1)
            && self.sides[1].is_current(&self.selection.side2);
        match (sides_current, self.sides[0].stats, self.sides[1].stats) {
            (true, Some(stats1), Some(stats2)) => {
                self.breakdown = compute_breakdown(&stats1, &stats2, &self.selection.enabled);
                self.score = scoring::score_from_breakdown(&self.breakdown);
                self.scored = Some(self.sequence);
                true
            }
            _ => false,
        }
    }

    fn phase(&self) -> SelectionPhase {
        match self.selection.selected_count() {
            0 => SelectionPhase::Empty,
            1 => SelectionPhase::OneSelected,
            _ if self.scored == Some(self.sequence) => SelectionPhase::Ready,
            _ => SelectionPhase::BothSelected,
        }
    }

    fn view(&self) -> ComparisonView {
        ComparisonView {
            phase: self.phase(),
            sequence: self.sequence,
            selection: self.selection.clone(),
            entity1: self.sides[0].profile.clone(),
            entity2: self.sides[1].profile.clone(),
            stats1: self.sides[0].stats,
            stats2: self.sides[1].stats,
            score: self.score,
            breakdown: self.breakdown.clone(),
            loading: self.pending == Some(self.fetch_sequence),
            error: self.error.clone(),
        }
    }
}

type SideResult = Option<(Result<StatRecord>, Option<ComparableEntity>)>;

pub struct ComparisonSession<S> {
    fetcher: Arc<StatFetcher<S>>,
    state: Arc<Mutex<SessionState>>,
}

impl<S> Clone for ComparisonSession<S> {
    fn clone(&self) -> Self {
        Self {
            fetcher: Arc::clone(&self.fetcher),
            state: Arc::clone(&self.state),
        }
    }
}

impl<S: StatSource + 'static> ComparisonSession<S> {
    pub fn new(kind: EntityKind, fetcher: StatFetcher<S>) -> Self {
        Self {
            fetcher: Arc::new(fetcher),
            state: Arc::new(Mutex::new(SessionState::new(kind))),
        }
    }

    pub fn fetcher(&self) -> &StatFetcher<S> {
        &self.fetcher
    }

    fn state(&self) -> MutexGuard<'_, SessionState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn kind(&self) -> EntityKind {
        self.state().selection.kind
    }

    pub fn phase(&self) -> SelectionPhase {
        self.state().phase()
    }

    pub fn view(&self) -> ComparisonView {
        self.state().view()
    }

    pub fn selection(&self) -> ComparisonSelection {
        self.state().selection.clone()
    }

    /// Choose the entity and scope for one side. Returns the new sequence.
    pub fn select_entity(&self, slot: Slot, id: EntityId, scope: StatScope) -> u64 {
        let mut state = self.state();
        let side = state.selection.side_mut(slot);
        side.entity = Some(id);
        side.scope = scope;
        state.bump_pair()
    }

    /// Change one side's scope, keeping its entity.
    pub fn set_scope(&self, slot: Slot, scope: StatScope) -> u64 {
        let mut state = self.state();
        state.selection.side_mut(slot).scope = scope;
        state.bump_pair()
    }

    /// Clear one side; the other side is retained.
    pub fn clear(&self, slot: Slot) -> u64 {
        let mut state = self.state();
        *state.selection.side_mut(slot) = SideSelection::default();
        state.bump_pair()
    }

    /// Clear both sides. Enabled metrics are kept.
    pub fn clear_all(&self) -> u64 {
        let mut state = self.state();
        state.selection.side1 = SideSelection::default();
        state.selection.side2 = SideSelection::default();
        state.bump_pair()
    }

    /// Flip one metric on or off; returns whether it is now enabled.
    ///
    /// When both sides' stats are already loaded for the current selection
    /// the score is recomputed immediately, without a refresh. A refresh
    /// already running for the same pair still publishes its results.
    pub fn toggle_metric(&self, key: MetricKey) -> bool {
        let mut state = self.state();
        let enabled = if state.selection.enabled.remove(&key) {
            false
        } else {
            state.selection.enabled.insert(key);
            true
        };
        state.bump();
        state.rescore();
        enabled
    }

    /// Replace the enabled metric set.
    pub fn set_metrics(&self, metrics: BTreeSet<MetricKey>) -> u64 {
        let mut state = self.state();
        state.selection.enabled = metrics;
        let sequence = state.bump();
        state.rescore();
        sequence
    }

    /// Fetch, aggregate and score the current selection.
    ///
    /// Both sides are fetched concurrently. Results are published only if
    /// neither entity nor scope changed in the meantime; they are scored
    /// with the metrics enabled at that point.
    pub async fn refresh(&self) -> RefreshOutcome {
        let (fetch_sequence, selection) = {
            let mut state = self.state();
            if state.selection.selected_count() == 0 {
                return RefreshOutcome::Idle;
            }
            state.pending = Some(state.fetch_sequence);
            (state.fetch_sequence, state.selection.clone())
        };

        let (first, second) = futures::join!(
            self.load_side(selection.entity_ref(Slot::First), &selection.side1.scope),
            self.load_side(selection.entity_ref(Slot::Second), &selection.side2.scope)
        );

        let mut state = self.state();
        if state.fetch_sequence != fetch_sequence {
            log::debug!(
                "discarding stale comparison result (fetch {fetch_sequence}, current {})",
                state.fetch_sequence
            );
            return RefreshOutcome::Stale;
        }
        state.pending = None;

        let mut failure: Option<H2hError> = None;
        for (slot, loaded) in [(Slot::First, first), (Slot::Second, second)] {
            let side = selection.side(slot).clone();
            let data = &mut state.sides[slot.index()];
            let Some((stats, profile)) = loaded else {
                *data = SideData::default();
                continue;
            };
            if profile.is_some() {
                data.profile = profile;
            }
            match stats {
                Ok(stats) => {
                    data.stats = Some(stats);
                    data.loaded_for = side.entity.map(|id| (id, side.scope));
                }
                Err(err) => {
                    log::warn!("failed to load stats for {slot}: {err}");
                    data.stats = None;
                    data.loaded_for = None;
                    failure.get_or_insert(err);
                }
            }
        }

        match failure {
            Some(err) => {
                let payload = err.to_payload();
                state.error = Some(payload.clone());
                state.score = CompositeScore::insufficient();
                state.breakdown.clear();
                RefreshOutcome::Failed(payload)
            }
            None => {
                state.error = None;
                if state.rescore() {
                    log::info!(
                        "comparison scored: {:?} vs {:?}",
                        state.score.score1,
                        state.score.score2
                    );
                }
                RefreshOutcome::Applied(state.sequence)
            }
        }
    }

    async fn load_side(&self, entity: Option<EntityRef>, scope: &StatScope) -> SideResult {
        let entity = entity?;
        let (stats, profile) = futures::join!(
            self.fetcher.fetch_stats(entity, scope),
            self.fetcher.fetch_entity(entity)
        );
        let profile = match profile {
            Ok(profile) => Some(profile),
            Err(err) => {
                log::warn!("profile unavailable for {entity}: {err}");
                None
            }
        };
        Some((stats, profile))
    }
}
