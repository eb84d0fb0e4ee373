//! Pass-scoped id migration.
//!
//! Every merge retires one id. The tracker accumulates those retirements for
//! the duration of a pass and keeps them flattened, so that looking up any
//! retired id yields the entity that ultimately absorbed it, never an
//! intermediate hop. After the perform phase the map is applied to every
//! player's team references and then cleared.

use std::collections::{HashMap, HashSet};

use rayon::prelude::*;
use tracing::debug;

use crate::entity::{EntityId, Player};
use crate::merge::collection::EntitySet;

/// Accumulates `retired id -> surviving id` mappings for one pass.
#[derive(Debug, Default, Clone)]
pub struct IdMigrationTracker {
    /// Surviving id -> every id folded into it during this pass.
    absorbed: HashMap<EntityId, HashSet<EntityId>>,
    /// Retired id -> surviving id. Always flat.
    survivor: HashMap<EntityId, EntityId>,
}

impl IdMigrationTracker {
    /// Creates an empty tracker.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records that `merged` was folded into `kept`.
    ///
    /// Both ends are resolved first. If `merged` had itself absorbed other ids
    /// earlier in the pass, that whole set is re-parented onto `kept`. Returns
    /// false if both ends already resolve to the same entity.
    pub fn record(&mut self, kept: EntityId, merged: EntityId) -> bool {
        let kept = self.resolve(kept);
        let merged = self.resolve(merged);
        if kept == merged {
            return false;
        }

        let mut moved = self.absorbed.remove(&merged).unwrap_or_default();
        moved.insert(merged);
        for id in &moved {
            self.survivor.insert(*id, kept);
        }
        self.absorbed.entry(kept).or_default().extend(moved);
        true
    }

    /// The surviving id for `id`; ids never retired map to themselves.
    #[must_use]
    pub fn resolve(&self, id: EntityId) -> EntityId {
        self.survivor.get(&id).copied().unwrap_or(id)
    }

    /// The flattened `retired -> surviving` map.
    #[must_use]
    pub fn flatten(&self) -> HashMap<EntityId, EntityId> {
        self.survivor.clone()
    }

    /// Number of retired ids.
    #[must_use]
    pub fn len(&self) -> usize {
        self.survivor.len()
    }

    /// Returns true if nothing was retired.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.survivor.is_empty()
    }

    /// Drops every mapping.
    pub fn clear(&mut self) {
        self.absorbed.clear();
        self.survivor.clear();
    }

    /// Rewrites every player's team references through the flattened map and
    /// clears the tracker.
    ///
    /// Ids absent from the map are left untouched. Runs on rayon when the set
    /// holds more than `parallel_threshold` players. Returns the number of
    /// players whose references changed.
    pub fn perform_migration(&mut self, players: &mut EntitySet<Player>, parallel_threshold: usize) -> usize {
        if self.survivor.is_empty() {
            return 0;
        }

        let map = &self.survivor;
        let rewrite =
            |player: &mut Player| player.teams.map_values(|team| map.get(team).copied().unwrap_or(*team));

        let changed = if players.len() > parallel_threshold {
            players.par_iter_mut().map(rewrite).filter(|changed| *changed).count()
        } else {
            players.iter_mut().map(rewrite).filter(|changed| *changed).count()
        };

        debug!(retired = self.survivor.len(), changed, "applied team id migration");
        self.clear();
        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::SourceRef;

    fn id(v: u128) -> EntityId {
        EntityId::from_u128(v)
    }

    #[test]
    fn test_record_and_resolve() {
        let mut tracker = IdMigrationTracker::new();
        assert!(tracker.record(id(1), id(2)));
        assert_eq!(tracker.resolve(id(2)), id(1));
        assert_eq!(tracker.resolve(id(1)), id(1));
        assert_eq!(tracker.resolve(id(9)), id(9));
    }

    #[test]
    fn test_reparenting_flattens_chain() {
        let mut tracker = IdMigrationTracker::new();
        tracker.record(id(2), id(1));
        tracker.record(id(3), id(2));

        let flat = tracker.flatten();
        assert_eq!(flat.get(&id(1)), Some(&id(3)));
        assert_eq!(flat.get(&id(2)), Some(&id(3)));
        assert_eq!(tracker.len(), 2);
    }

    #[test]
    fn test_record_resolves_kept_end() {
        let mut tracker = IdMigrationTracker::new();
        tracker.record(id(2), id(1));
        // 1 is already gone; folding 3 into it lands on 2.
        tracker.record(id(1), id(3));
        assert_eq!(tracker.resolve(id(3)), id(2));
    }

    #[test]
    fn test_record_cycle_is_rejected() {
        let mut tracker = IdMigrationTracker::new();
        assert!(tracker.record(id(2), id(1)));
        assert!(!tracker.record(id(1), id(2)));
        assert!(!tracker.record(id(5), id(5)));
        assert_eq!(tracker.len(), 1);
    }

    fn player_on(team: EntityId) -> Player {
        let mut p = Player::new();
        p.teams.add(team, SourceRef::named("s"));
        p
    }

    #[test]
    fn test_perform_migration_rewrites_and_clears() {
        let mut tracker = IdMigrationTracker::new();
        tracker.record(id(10), id(11));

        let mut players: EntitySet<Player> =
            vec![player_on(id(11)), player_on(id(10)), player_on(id(12))]
                .into_iter()
                .collect();

        let changed = tracker.perform_migration(&mut players, 64);
        assert_eq!(changed, 1);
        assert!(tracker.is_empty());
        assert!(players.iter().all(|p| !p.is_on_team(id(11))));
        assert_eq!(players.iter().filter(|p| p.is_on_team(id(10))).count(), 2);
    }

    #[test]
    fn test_perform_migration_parallel_path() {
        let mut tracker = IdMigrationTracker::new();
        tracker.record(id(10), id(11));
        let mut players: EntitySet<Player> = (0..50).map(|_| player_on(id(11))).collect();
        let changed = tracker.perform_migration(&mut players, 4);
        assert_eq!(changed, 50);
        assert!(players.iter().all(|p| p.current_team() == Some(id(10))));
    }
}
