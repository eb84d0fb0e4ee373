//! Merge orchestration.
//!
//! `MergeOrchestrator` owns the live player and team collections. Every pass
//! runs in two strictly separated phases:
//!
//! 1. **Prep** (read-only): each incoming item is scored against an untouched
//!    snapshot of the reference set, producing one `MergeRecord` per item.
//!    Players and teams are prepped side by side; batches above the configured
//!    threshold fan out across the rayon pool.
//! 2. **Perform** (serial): merges are applied, added items are inserted, and
//!    the pass's team id migration is applied to every player.
//!
//! No structural mutation happens while any prep task is still reading.

use std::collections::{BTreeSet, HashMap};
use std::fmt;

use chrono::Utc;
use crossbeam_channel::Receiver;
use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, error, info, info_span, warn};

use crate::config::MergeConfig;
use crate::entity::{EntityId, Mergeable, Player, Team};
use crate::error::{MergeError, RosterError, RosterResult};
use crate::events::{EventBus, MergeEvent, PassKind};
use crate::matching::{MatchContext, PlayerRoster};
use crate::merge::collection::EntitySet;
use crate::merge::migration::IdMigrationTracker;
use crate::merge::record::{MergeOutcome, MergeRecord};
use crate::merge::results::CoreMergeResults;
use crate::source::{Source, SourceRef};

/// Hop limit when walking the retired-id registry.
const MAX_RETIRED_HOPS: usize = 128;

/// Results of one pass: one batch of players and one batch of teams.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PassResults {
    /// Player records.
    pub players: CoreMergeResults,
    /// Team records.
    pub teams: CoreMergeResults,
}

impl PassResults {
    /// Merges across both kinds.
    #[must_use]
    pub fn merge_count(&self) -> usize {
        self.players.merge_count() + self.teams.merge_count()
    }

    /// Added entities across both kinds.
    #[must_use]
    pub fn added_count(&self) -> usize {
        self.players.added_count() + self.teams.added_count()
    }
}

impl fmt::Display for PassResults {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.players, self.teams)
    }
}

/// Outcome of `MergeOrchestrator::merge_known`.
///
/// Passes completed before a failure are preserved in `passes`.
#[derive(Debug)]
pub struct FinalizeReport {
    /// Every pass that ran, in order.
    pub passes: Vec<PassResults>,
    /// `Ok` on convergence, otherwise the error that stopped the loop.
    pub outcome: RosterResult<()>,
}

impl FinalizeReport {
    /// Returns true if the loop reached a zero-merge pass.
    #[must_use]
    pub fn converged(&self) -> bool {
        self.outcome.is_ok()
    }

    /// Merges applied across every pass.
    #[must_use]
    pub fn merge_count(&self) -> usize {
        self.passes.iter().map(PassResults::merge_count).sum()
    }

    /// Converts into a plain result, discarding passes on failure.
    ///
    /// # Errors
    ///
    /// Returns the error that stopped the finalize loop.
    pub fn into_result(self) -> RosterResult<Vec<PassResults>> {
        self.outcome.map(|()| self.passes)
    }
}

/// Owns the reference collections and drives merges.
///
/// # Examples
///
/// ```
/// use rostermerge::{MergeOrchestrator, Player, Source, SourceRef};
///
/// let mut engine = MergeOrchestrator::default();
/// let cup = SourceRef::named("cup-1");
/// let mut source = Source::new(cup.clone());
/// source.push_player(Player::named("Jane", &cup).unwrap());
///
/// let results = engine.merge_source(source).unwrap();
/// assert_eq!(results.players.added_count(), 1);
/// assert!(engine.merge_known().converged());
/// ```
#[derive(Debug)]
pub struct MergeOrchestrator {
    config: MergeConfig,
    players: EntitySet<Player>,
    teams: EntitySet<Team>,
    sources: BTreeSet<SourceRef>,
    retired: HashMap<EntityId, EntityId>,
    events: EventBus,
}

impl Default for MergeOrchestrator {
    fn default() -> Self {
        Self::from_parts(
            MergeConfig::default(),
            EntitySet::new(),
            EntitySet::new(),
            BTreeSet::new(),
            HashMap::new(),
        )
    }
}

impl MergeOrchestrator {
    /// Creates an empty orchestrator.
    ///
    /// # Errors
    ///
    /// Returns a validation error if `config` is rejected by `MergeConfig::validate`.
    pub fn new(config: MergeConfig) -> RosterResult<Self> {
        let config = config.validate()?;
        Ok(Self {
            config,
            ..Self::default()
        })
    }

    pub(crate) fn from_parts(
        config: MergeConfig,
        players: EntitySet<Player>,
        teams: EntitySet<Team>,
        sources: BTreeSet<SourceRef>,
        retired: HashMap<EntityId, EntityId>,
    ) -> Self {
        Self {
            config,
            players,
            teams,
            sources,
            retired,
            events: EventBus::new(),
        }
    }

    /// Active configuration.
    #[must_use]
    pub const fn config(&self) -> &MergeConfig {
        &self.config
    }

    /// Live players.
    #[must_use]
    pub const fn players(&self) -> &EntitySet<Player> {
        &self.players
    }

    /// Live teams.
    #[must_use]
    pub const fn teams(&self) -> &EntitySet<Team> {
        &self.teams
    }

    /// Looks up a live player.
    #[must_use]
    pub fn player(&self, id: EntityId) -> Option<&Player> {
        self.players.get(id)
    }

    /// Looks up a live team.
    #[must_use]
    pub fn team(&self, id: EntityId) -> Option<&Team> {
        self.teams.get(id)
    }

    /// Every source merged so far, in chronological order.
    pub fn sources(&self) -> impl Iterator<Item = &SourceRef> {
        self.sources.iter()
    }

    /// Every retired id and the entity that absorbed it.
    #[must_use]
    pub const fn retired(&self) -> &HashMap<EntityId, EntityId> {
        &self.retired
    }

    /// Subscribes to merge events.
    pub fn subscribe(&mut self, capacity: usize) -> Receiver<MergeEvent> {
        self.events.subscribe(capacity)
    }

    /// Events that could not be delivered to a subscriber.
    #[must_use]
    pub fn dropped_events(&self) -> u64 {
        self.events.dropped()
    }

    /// The live id for `id`, following the retired-id registry.
    ///
    /// Ids that were never retired map to themselves.
    ///
    /// # Errors
    ///
    /// Returns `RosterError::Internal` if the registry contains a cycle.
    pub fn canonical_id(&self, id: EntityId) -> RosterResult<EntityId> {
        let mut current = id;
        for _ in 0..MAX_RETIRED_HOPS {
            let Some(next) = self.retired.get(&current).copied() else {
                return Ok(current);
            };
            if next == current {
                return Err(RosterError::internal("retired id registry contains a self-cycle"));
            }
            current = next;
        }
        Err(RosterError::internal("retired id resolution exceeded hop limit"))
    }

    /// Merges one imported source into the reference sets.
    ///
    /// Incoming players' team references are first corrected against the
    /// retired-id registry. Each incoming item is then Added, Kept (it already
    /// lives in the reference set) or Merged into a reference entity.
    ///
    /// # Errors
    ///
    /// Returns `MergeError::MissingEntity` if the perform phase loses track of
    /// an entity.
    pub fn merge_source(&mut self, source: Source) -> RosterResult<PassResults> {
        let (reference, mut players, teams) = source.into_parts();
        let span = info_span!(
            "merge_source",
            source = %reference,
            players = players.len(),
            teams = teams.len()
        );
        let _guard = span.enter();

        let retired = &self.retired;
        let corrected = players
            .iter_mut()
            .map(|p| p.teams.map_values(|team| retired.get(team).copied().unwrap_or(*team)))
            .filter(|changed| *changed)
            .count();
        if corrected > 0 {
            debug!(corrected, "corrected retired team references on incoming players");
        }

        let label = reference.name.clone();
        self.sources.insert(reference);
        let results = self.run_pass(players, teams, PassKind::Source)?;
        self.emit_pass(PassKind::Source, label, &results);
        Ok(results)
    }

    /// Merges the whole reference set against itself until a pass makes no merges.
    ///
    /// Fails with `MergeError::ConvergenceFailed` once
    /// `max_finalize_iterations` passes have run without reaching a fixpoint.
    /// Passes completed before a failure are kept in the report; the
    /// orchestrator never retries on its own.
    pub fn merge_known(&mut self) -> FinalizeReport {
        let cap = self.config.max_finalize_iterations;
        let span = info_span!("merge_known", cap);
        let _guard = span.enter();

        let mut passes = Vec::new();
        for iteration in 1..=cap {
            let players: Vec<Player> = self.players.iter().cloned().collect();
            let teams: Vec<Team> = self.teams.iter().cloned().collect();

            let results = match self.run_pass(players, teams, PassKind::Known) {
                Ok(results) => results,
                Err(e) => {
                    error!(iteration, error = %e, "finalize pass failed");
                    return FinalizeReport {
                        passes,
                        outcome: Err(e),
                    };
                }
            };

            let merges = results.merge_count();
            self.emit_pass(PassKind::Known, iteration.to_string(), &results);
            passes.push(results);

            if merges == 0 {
                info!(passes = iteration, "finalize converged");
                self.events.emit(&MergeEvent::Converged {
                    passes: iteration,
                    at: Utc::now(),
                });
                return FinalizeReport {
                    passes,
                    outcome: Ok(()),
                };
            }
        }

        error!(iterations = cap, cap, "finalize did not converge");
        self.events.emit(&MergeEvent::ConvergenceFailed {
            iterations: cap,
            cap,
            at: Utc::now(),
        });
        FinalizeReport {
            passes,
            outcome: Err(MergeError::ConvergenceFailed {
                iterations: cap,
                cap,
            }
            .into()),
        }
    }

    fn run_pass(&mut self, players: Vec<Player>, teams: Vec<Team>, kind: PassKind) -> RosterResult<PassResults> {
        let parallel_threshold = self.config.parallel_threshold;
        let (players, repeated_players) = fold_repeated_ids(players);
        let (teams, repeated_teams) = fold_repeated_ids(teams);

        let (mut player_raw, mut team_raw) = {
            let known = &self.players;
            let roster = PlayerRoster::build(
                known
                    .iter()
                    .chain(players.iter().filter(|p| !known.contains(p.id))),
            );
            let ctx = MatchContext::new(&self.config.weights, self.config.merge_threshold, &roster);
            let teams_ref = &self.teams;

            if players.len() + teams.len() > parallel_threshold {
                rayon::join(
                    || prep_batch(&ctx, &players, known, kind, parallel_threshold),
                    || prep_batch(&ctx, &teams, teams_ref, kind, parallel_threshold),
                )
            } else {
                (
                    prep_batch(&ctx, &players, known, kind, parallel_threshold),
                    prep_batch(&ctx, &teams, teams_ref, kind, parallel_threshold),
                )
            }
        };

        player_raw.extend(repeated_players.into_iter().map(MergeRecord::kept));
        team_raw.extend(repeated_teams.into_iter().map(MergeRecord::kept));

        let results = PassResults {
            players: CoreMergeResults::new(Player::KIND, player_raw),
            teams: CoreMergeResults::new(Team::KIND, team_raw),
        };

        let mut team_tracker = IdMigrationTracker::new();
        let mut player_tracker = IdMigrationTracker::new();
        let team_merges = perform_batch(&mut self.teams, teams, &results.teams, &mut team_tracker)?;
        let player_merges = perform_batch(&mut self.players, players, &results.players, &mut player_tracker)?;

        self.retire(player_tracker.flatten());
        self.retire(team_tracker.flatten());
        let migrated = team_tracker.perform_migration(&mut self.players, parallel_threshold);
        player_tracker.clear();

        info!(
            ?kind,
            player_merges,
            team_merges,
            added = results.added_count(),
            migrated,
            players = self.players.len(),
            teams = self.teams.len(),
            "pass complete"
        );
        Ok(results)
    }

    /// Adds this pass's retirements to the permanent registry, keeping it flat.
    fn retire(&mut self, pass_map: HashMap<EntityId, EntityId>) {
        if pass_map.is_empty() {
            return;
        }
        for survivor in self.retired.values_mut() {
            if let Some(next) = pass_map.get(survivor) {
                *survivor = *next;
            }
        }
        self.retired.extend(pass_map);
    }

    fn emit_pass(&mut self, kind: PassKind, label: String, results: &PassResults) {
        self.events.emit(&MergeEvent::PassCompleted {
            kind,
            label,
            player_merges: results.players.merge_count(),
            team_merges: results.teams.merge_count(),
            added: results.added_count(),
            at: Utc::now(),
        });
    }
}

/// Folds later copies of a repeated id into the first copy.
///
/// Returns the distinct items in batch order and one id per folded copy, so
/// each copy can still be reported.
fn fold_repeated_ids<T: Mergeable>(batch: Vec<T>) -> (Vec<T>, Vec<EntityId>) {
    let mut position: HashMap<EntityId, usize> = HashMap::with_capacity(batch.len());
    let mut distinct: Vec<T> = Vec::with_capacity(batch.len());
    let mut repeated = Vec::new();
    for item in batch {
        let id = item.id();
        if let Some(&idx) = position.get(&id) {
            warn!(entity = %T::KIND, %id, "incoming batch repeats an id; folding into the first copy");
            distinct[idx].merge(&item);
            repeated.push(id);
        } else {
            position.insert(id, distinct.len());
            distinct.push(item);
        }
    }
    (distinct, repeated)
}

/// Read-only prep phase for one batch.
fn prep_batch<T: Mergeable>(
    ctx: &MatchContext<'_>,
    batch: &[T],
    reference: &EntitySet<T>,
    kind: PassKind,
    parallel_threshold: usize,
) -> Vec<MergeRecord> {
    let decide = |item: &T| -> MergeRecord {
        let id = item.id();
        if kind == PassKind::Source && reference.contains(id) {
            warn!(entity = %T::KIND, %id, "incoming item already in the reference set; keeping as-is");
            return MergeRecord::kept(id);
        }
        match ctx.find_match(item, reference) {
            Some(found) => MergeRecord::merged(id, found.target, found.reason, found.weight),
            None if reference.contains(id) => MergeRecord::kept(id),
            None => MergeRecord::added(id),
        }
    };

    if batch.len() > parallel_threshold {
        batch.par_iter().map(decide).collect()
    } else {
        batch.iter().map(decide).collect()
    }
}

/// Serial perform phase for one batch. Returns the number of merges applied.
fn perform_batch<T: Mergeable>(
    set: &mut EntitySet<T>,
    batch: Vec<T>,
    results: &CoreMergeResults,
    tracker: &mut IdMigrationTracker,
) -> Result<usize, MergeError> {
    let mut pending: HashMap<EntityId, T> = batch.into_iter().map(|item| (item.id(), item)).collect();
    let mut applied = 0;

    for record in results.all() {
        match record.outcome {
            MergeOutcome::Kept => {}
            MergeOutcome::Added => {
                if let Some(item) = pending.remove(&record.item) {
                    set.insert(item);
                }
            }
            MergeOutcome::Merged { reason, weight } => {
                let kept = tracker.resolve(record.resultant);
                let discarded = tracker.resolve(record.item);
                if kept == discarded {
                    debug!(entity = %T::KIND, item = %record.item, "merge already applied this pass; skipping");
                    continue;
                }
                if !set.contains(kept) {
                    return Err(MergeError::MissingEntity { id: kept });
                }
                let absorbed = set
                    .remove(discarded)
                    .or_else(|| pending.remove(&discarded))
                    .ok_or(MergeError::MissingEntity { id: discarded })?;
                let target = set.get_mut(kept).ok_or(MergeError::MissingEntity { id: kept })?;
                target.merge(&absorbed);
                tracker.record(kept, discarded);
                applied += 1;
                debug!(entity = %T::KIND, %discarded, %kept, %reason, weight, "merged");
            }
        }
    }
    Ok(applied)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attribute::Identifier;
    use crate::matching::MatchCategory;

    fn id(v: u128) -> EntityId {
        EntityId::from_u128(v)
    }

    fn player_with_chat(pid: u128, name: &str, chat: &str, source: &SourceRef) -> Player {
        let mut p = Player::with_id(id(pid));
        p.names.add(crate::attribute::Name::new(name).unwrap(), source.clone());
        p.identifiers.add(Identifier::chat_id(chat), source.clone());
        p
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let config = MergeConfig {
            max_finalize_iterations: 0,
            ..MergeConfig::default()
        };
        assert!(MergeOrchestrator::new(config).unwrap_err().is_validation());
    }

    #[test]
    fn test_merge_source_adds_then_merges() {
        let mut engine = MergeOrchestrator::default();
        let s1 = SourceRef::named("s1");
        let s2 = SourceRef::named("s2");

        let first = Source::with_entities(s1.clone(), vec![player_with_chat(1, "Jane", "42", &s1)], vec![]);
        let r1 = engine.merge_source(first).unwrap();
        assert_eq!(r1.players.added_count(), 1);

        let second = Source::with_entities(s2.clone(), vec![player_with_chat(2, "J", "42", &s2)], vec![]);
        let r2 = engine.merge_source(second).unwrap();
        assert_eq!(r2.players.merge_count(), 1);
        let record = r2.players.merged().next().unwrap();
        assert_eq!(record.resultant, id(1));
        assert!(record.reason().unwrap().contains(MatchCategory::ChatId));

        assert_eq!(engine.players().len(), 1);
        assert_eq!(engine.player(id(1)).unwrap().names.len(), 2);
        assert_eq!(engine.canonical_id(id(2)).unwrap(), id(1));
        assert_eq!(engine.sources().count(), 2);
    }

    #[test]
    fn test_duplicate_incoming_id_is_kept() {
        let mut engine = MergeOrchestrator::default();
        let s1 = SourceRef::named("s1");
        let player = player_with_chat(1, "Jane", "42", &s1);
        engine
            .merge_source(Source::with_entities(s1.clone(), vec![player.clone()], vec![]))
            .unwrap();
        let again = engine
            .merge_source(Source::with_entities(SourceRef::named("s2"), vec![player], vec![]))
            .unwrap();
        assert_eq!(again.players.unchanged_count(), 1);
        assert_eq!(engine.players().len(), 1);
    }

    #[test]
    fn test_repeated_id_in_one_batch_keeps_both_copies() {
        let mut engine = MergeOrchestrator::default();
        let s1 = SourceRef::named("s1");
        let mut first = Player::named("Jane", &s1).unwrap();
        first.id = id(1);
        let second = player_with_chat(1, "JaneAlt", "9", &s1);

        let results = engine
            .merge_source(Source::with_entities(s1, vec![first, second], vec![]))
            .unwrap();
        assert_eq!(results.players.len(), 2);
        assert_eq!(results.players.added_count(), 1);
        assert_eq!(results.players.unchanged_count(), 1);

        assert_eq!(engine.players().len(), 1);
        let player = engine.player(id(1)).unwrap();
        assert_eq!(player.names.len(), 2);
        assert!(player.identifiers.contains(&Identifier::chat_id("9")));
    }

    #[test]
    fn test_merge_known_collapses_chain_in_one_pass() {
        let mut engine = MergeOrchestrator::default();
        let s = SourceRef::named("s");
        let players = vec![
            player_with_chat(1, "A", "x", &s),
            player_with_chat(2, "B", "x", &s),
            player_with_chat(3, "C", "x", &s),
        ];
        engine.merge_source(Source::with_entities(s, players, vec![])).unwrap();
        assert_eq!(engine.players().len(), 3);

        let report = engine.merge_known();
        assert!(report.converged());
        assert_eq!(engine.players().len(), 1);
        let survivor = engine.players().ids().next().unwrap();
        for pid in 1..=3 {
            assert_eq!(engine.canonical_id(id(pid)).unwrap(), survivor);
        }
        assert_eq!(engine.player(survivor).unwrap().names.len(), 3);
    }

    #[test]
    fn test_retire_keeps_registry_flat() {
        let mut engine = MergeOrchestrator::default();
        engine.retire(HashMap::from([(id(1), id(2))]));
        engine.retire(HashMap::from([(id(2), id(3))]));
        assert_eq!(engine.retired().get(&id(1)), Some(&id(3)));
        assert_eq!(engine.canonical_id(id(1)).unwrap(), id(3));
    }

    #[test]
    fn test_canonical_id_detects_cycle() {
        let mut retired = HashMap::new();
        retired.insert(id(1), id(1));
        let engine = MergeOrchestrator::from_parts(
            MergeConfig::default(),
            EntitySet::new(),
            EntitySet::new(),
            BTreeSet::new(),
            retired,
        );
        assert!(engine.canonical_id(id(1)).is_err());
    }

    #[test]
    fn test_perform_batch_missing_target() {
        let mut set: EntitySet<Team> = EntitySet::new();
        let raw = vec![MergeRecord::merged(
            id(1),
            id(2),
            crate::matching::MatchReason::NONE | MatchCategory::BracketTeamId,
            50,
        )];
        let results = CoreMergeResults::new(Team::KIND, raw);
        let mut tracker = IdMigrationTracker::new();
        let err = perform_batch(&mut set, vec![Team::with_id(id(1))], &results, &mut tracker).unwrap_err();
        assert!(matches!(err, MergeError::MissingEntity { id: missing } if missing == id(2)));
    }
}
