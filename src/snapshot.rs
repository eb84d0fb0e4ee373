//! Snapshot capture and restore.
//!
//! Sourced values are stored with source ids only. Restoring turns those ids
//! back into full `SourceRef`s through a `SourceResolver` passed explicitly
//! into every restore call; there is no process-wide lookup.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::attribute::{
    ClanTag, CountryCode, FriendCode, Identifier, Name, Placement, Pronoun, Skill, Sourced, StoredValue,
    Weapon,
};
use crate::config::MergeConfig;
use crate::entity::{EntityId, Player, Team};
use crate::error::{RosterError, RosterResult, ValidationError};
use crate::merge::{EntitySet, MergeOrchestrator};
use crate::source::{SourceId, SourceRef};

/// Current snapshot format version.
pub const SNAPSHOT_VERSION: u32 = 1;

/// Maps stored source ids back to source references.
#[derive(Debug, Clone, Default)]
pub struct SourceResolver {
    by_id: HashMap<SourceId, SourceRef>,
}

impl SourceResolver {
    /// Builds a resolver over `sources`.
    #[must_use]
    pub fn new(sources: impl IntoIterator<Item = SourceRef>) -> Self {
        Self {
            by_id: sources.into_iter().map(|s| (s.id, s)).collect(),
        }
    }

    /// Resolves one id.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::UnknownSource` if `id` was never registered.
    pub fn resolve(&self, id: SourceId) -> Result<&SourceRef, ValidationError> {
        self.by_id.get(&id).ok_or(ValidationError::UnknownSource { id })
    }

    /// Number of known sources.
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    /// Returns true if no sources are known.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}

#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerRecord {
    pub id: EntityId,
    pub names: Vec<StoredValue<Name>>,
    pub teams: Vec<StoredValue<EntityId>>,
    pub identifiers: Vec<StoredValue<Identifier>>,
    pub friend_codes: Vec<StoredValue<FriendCode>>,
    pub weapons: Vec<StoredValue<Weapon>>,
    pub pronouns: Vec<StoredValue<Pronoun>>,
    pub country: Vec<StoredValue<CountryCode>>,
    pub skill: Vec<StoredValue<Skill>>,
    pub notable: Vec<StoredValue<bool>>,
}

impl PlayerRecord {
    fn capture(player: &Player) -> Self {
        Self {
            id: player.id,
            names: player.names.to_stored(),
            teams: player.teams.to_stored(),
            identifiers: player.identifiers.to_stored(),
            friend_codes: player.friend_codes.to_stored(),
            weapons: player.weapons.to_stored(),
            pronouns: player.pronouns.to_stored(),
            country: player.country.to_stored(),
            skill: player.skill.to_stored(),
            notable: player.notable.to_stored(),
        }
    }

    fn restore(self, resolver: &SourceResolver) -> Result<Player, ValidationError> {
        Ok(Player {
            id: self.id,
            names: Sourced::restore(self.names, resolver)?,
            teams: Sourced::restore(self.teams, resolver)?,
            identifiers: Sourced::restore(self.identifiers, resolver)?,
            friend_codes: Sourced::restore(self.friend_codes, resolver)?,
            weapons: Sourced::restore(self.weapons, resolver)?,
            pronouns: Sourced::restore(self.pronouns, resolver)?,
            country: Sourced::restore(self.country, resolver)?,
            skill: Sourced::restore(self.skill, resolver)?,
            notable: Sourced::restore(self.notable, resolver)?,
        })
    }
}

#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamRecord {
    pub id: EntityId,
    pub names: Vec<StoredValue<Name>>,
    pub tags: Vec<StoredValue<ClanTag>>,
    pub divisions: Vec<StoredValue<Placement>>,
    pub identifiers: Vec<StoredValue<Identifier>>,
}

impl TeamRecord {
    fn capture(team: &Team) -> Self {
        Self {
            id: team.id,
            names: team.names.to_stored(),
            tags: team.tags.to_stored(),
            divisions: team.divisions.to_stored(),
            identifiers: team.identifiers.to_stored(),
        }
    }

    fn restore(self, resolver: &SourceResolver) -> Result<Team, ValidationError> {
        Ok(Team {
            id: self.id,
            names: Sourced::restore(self.names, resolver)?,
            tags: Sourced::restore(self.tags, resolver)?,
            divisions: Sourced::restore(self.divisions, resolver)?,
            identifiers: Sourced::restore(self.identifiers, resolver)?,
        })
    }
}

/// Serializable state of a `MergeOrchestrator`.
///
/// Event subscribers are not part of a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Format version.
    pub version: u32,
    /// Configuration in force when captured.
    pub config: MergeConfig,
    /// Every known source, in chronological order.
    pub sources: Vec<SourceRef>,
    /// Live players.
    pub players: Vec<PlayerRecord>,
    /// Live teams.
    pub teams: Vec<TeamRecord>,
    /// Retired id registry.
    pub retired: BTreeMap<EntityId, EntityId>,
}

impl Snapshot {
    /// Captures the orchestrator's current state.
    #[must_use]
    pub fn capture(engine: &MergeOrchestrator) -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            config: engine.config().clone(),
            sources: engine.sources().cloned().collect(),
            players: engine.players().iter().map(PlayerRecord::capture).collect(),
            teams: engine.teams().iter().map(TeamRecord::capture).collect(),
            retired: engine.retired().iter().map(|(k, v)| (*k, *v)).collect(),
        }
    }

    /// Rebuilds an orchestrator.
    ///
    /// # Errors
    ///
    /// Returns `RosterError::Snapshot` for an unsupported version and
    /// `RosterError::Validation` if the config is invalid or a stored value
    /// references a source the snapshot does not list.
    pub fn restore(self) -> RosterResult<MergeOrchestrator> {
        if self.version != SNAPSHOT_VERSION {
            return Err(RosterError::snapshot(format!(
                "unsupported snapshot version {} (expected {SNAPSHOT_VERSION})",
                self.version
            )));
        }
        let config = self.config.validate()?;
        let resolver = SourceResolver::new(self.sources.iter().cloned());

        let players = self
            .players
            .into_iter()
            .map(|p| p.restore(&resolver))
            .collect::<Result<EntitySet<Player>, _>>()?;
        let teams = self
            .teams
            .into_iter()
            .map(|t| t.restore(&resolver))
            .collect::<Result<EntitySet<Team>, _>>()?;
        let sources: BTreeSet<SourceRef> = self.sources.into_iter().collect();

        info!(
            players = players.len(),
            teams = teams.len(),
            sources = sources.len(),
            "restored snapshot"
        );
        Ok(MergeOrchestrator::from_parts(
            config,
            players,
            teams,
            sources,
            self.retired.into_iter().collect(),
        ))
    }

    /// Serializes to pretty JSON.
    ///
    /// # Errors
    ///
    /// Returns `RosterError::Snapshot` if serialization fails.
    pub fn to_json(&self) -> RosterResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parses JSON produced by `to_json`.
    ///
    /// # Errors
    ///
    /// Returns `RosterError::Snapshot` for malformed input.
    pub fn from_json(json: &str) -> RosterResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Writes the snapshot to `path`.
    ///
    /// # Errors
    ///
    /// Returns `RosterError::Snapshot` on I/O or serialization failure.
    pub fn write_to(&self, path: impl AsRef<Path>) -> RosterResult<()> {
        fs::write(path, self.to_json()?)?;
        Ok(())
    }

    /// Reads a snapshot from `path`.
    ///
    /// # Errors
    ///
    /// Returns `RosterError::Snapshot` on I/O or parse failure.
    pub fn read_from(path: impl AsRef<Path>) -> RosterResult<Self> {
        Self::from_json(&fs::read_to_string(path)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attribute::{TagLayout, Weapon};
    use crate::source::Source;
    use chrono::{TimeZone, Utc};

    fn populated() -> MergeOrchestrator {
        let cup = SourceRef::dated("cup-1", Utc.with_ymd_and_hms(2023, 4, 1, 0, 0, 0).unwrap());
        let mut team = Team::named("Alpha", &cup).unwrap();
        team.tags.add(ClanTag::new("A", TagLayout::Prefix), cup.clone());
        let mut player = Player::named("Jane", &cup).unwrap();
        player.teams.add(team.id, cup.clone());
        player.weapons.add(Weapon("Splattershot".to_string()), cup.clone());

        let mut engine = MergeOrchestrator::default();
        engine
            .merge_source(Source::with_entities(cup, vec![player], vec![team]))
            .unwrap();
        engine
    }

    #[test]
    fn test_resolver_unknown_id() {
        let resolver = SourceResolver::new(vec![SourceRef::named("a")]);
        assert_eq!(resolver.len(), 1);
        assert!(resolver.resolve(SourceRef::named("a").id).is_ok());
        assert!(matches!(
            resolver.resolve(SourceRef::named("b").id),
            Err(ValidationError::UnknownSource { .. })
        ));
    }

    #[test]
    fn test_capture_restore_preserves_entities() {
        let engine = populated();
        let snapshot = Snapshot::capture(&engine);
        let restored = Snapshot::from_json(&snapshot.to_json().unwrap())
            .unwrap()
            .restore()
            .unwrap();

        assert_eq!(restored.players().len(), 1);
        assert_eq!(restored.teams().len(), 1);
        let original = engine.players().iter().next().unwrap();
        assert_eq!(restored.player(original.id), Some(original));
        assert_eq!(restored.sources().count(), 1);
    }

    #[test]
    fn test_restore_rejects_unknown_source() {
        let mut snapshot = Snapshot::capture(&populated());
        snapshot.sources.clear();
        let err = snapshot.restore().unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn test_restore_rejects_future_version() {
        let mut snapshot = Snapshot::capture(&populated());
        snapshot.version = SNAPSHOT_VERSION + 1;
        assert!(matches!(snapshot.restore(), Err(RosterError::Snapshot { .. })));
    }

    #[test]
    fn test_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("roster.json");
        let snapshot = Snapshot::capture(&populated());
        snapshot.write_to(&path).unwrap();
        assert_eq!(Snapshot::read_from(&path).unwrap(), snapshot);
    }

    #[test]
    fn test_read_missing_file_is_snapshot_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = Snapshot::read_from(dir.path().join("missing.json")).unwrap_err();
        assert!(err.is_retryable());
    }
}
