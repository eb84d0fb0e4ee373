//! Source and provenance types.
//!
//! A source is one imported dataset: a tournament bracket export, a social
//! profile scrape, a manual entry. Every sourced value remembers which sources
//! reported it, and sources are ordered by their start time so the most recent
//! value of an attribute can be selected.

use std::cmp::Ordering;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entity::{Player, Team};

/// Namespace for name-derived source ids.
const SOURCE_NAMESPACE: Uuid = Uuid::from_u128(0x6c1f_1b52_9a0e_4f6b_b7a4_3d52_e7c1_90aa);

/// Unique identifier for a source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SourceId(Uuid);

impl SourceId {
    /// Creates a new random source ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Derives a stable source ID from the export name.
    ///
    /// Re-importing the same export yields the same id.
    #[must_use]
    pub fn from_name(name: &str) -> Self {
        Self(Uuid::new_v5(&SOURCE_NAMESPACE, name.as_bytes()))
    }
}

impl Default for SourceId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lightweight reference to a source, attached to every sourced value.
///
/// Ordering is chronological: by start time (undated sources first), then by
/// name, then by id.
///
/// # Examples
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use rostermerge::SourceRef;
///
/// let old = SourceRef::dated("cup-1", Utc.with_ymd_and_hms(2021, 1, 1, 0, 0, 0).unwrap());
/// let new = SourceRef::dated("cup-2", Utc.with_ymd_and_hms(2022, 1, 1, 0, 0, 0).unwrap());
/// assert!(old < new);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceRef {
    /// Unique identifier.
    pub id: SourceId,

    /// Human-readable export name.
    pub name: String,

    /// When the underlying event started, if known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start: Option<DateTime<Utc>>,
}

impl SourceRef {
    /// Creates an undated source reference with a name-derived id.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            id: SourceId::from_name(&name),
            name,
            start: None,
        }
    }

    /// Creates a dated source reference with a name-derived id.
    #[must_use]
    pub fn dated(name: impl Into<String>, start: DateTime<Utc>) -> Self {
        Self {
            start: Some(start),
            ..Self::named(name)
        }
    }

    fn chronology_key(&self) -> (Option<DateTime<Utc>>, &str, SourceId) {
        (self.start, self.name.as_str(), self.id)
    }
}

impl PartialOrd for SourceRef {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SourceRef {
    fn cmp(&self, other: &Self) -> Ordering {
        self.chronology_key().cmp(&other.chronology_key())
    }
}

impl fmt::Display for SourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.start {
            Some(start) => write!(f, "{} ({})", self.name, start.format("%Y-%m-%d")),
            None => write!(f, "{}", self.name),
        }
    }
}

/// One imported dataset and the entities it contributed.
///
/// Sources are immutable once handed to the orchestrator; the merge engine
/// only reads their player and team arrays.
#[derive(Debug, Clone)]
pub struct Source {
    reference: SourceRef,
    players: Vec<Player>,
    teams: Vec<Team>,
}

impl Source {
    /// Creates an empty source.
    #[must_use]
    pub const fn new(reference: SourceRef) -> Self {
        Self {
            reference,
            players: Vec::new(),
            teams: Vec::new(),
        }
    }

    /// Creates a source with the given entities.
    #[must_use]
    pub const fn with_entities(reference: SourceRef, players: Vec<Player>, teams: Vec<Team>) -> Self {
        Self {
            reference,
            players,
            teams,
        }
    }

    /// Adds a player contributed by this source.
    pub fn push_player(&mut self, player: Player) {
        self.players.push(player);
    }

    /// Adds a team contributed by this source.
    pub fn push_team(&mut self, team: Team) {
        self.teams.push(team);
    }

    /// The source reference used to tag values.
    #[must_use]
    pub const fn reference(&self) -> &SourceRef {
        &self.reference
    }

    /// Export name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.reference.name
    }

    /// Start timestamp, if known.
    #[must_use]
    pub const fn start(&self) -> Option<DateTime<Utc>> {
        self.reference.start
    }

    /// Players contributed by this source.
    #[must_use]
    pub fn players(&self) -> &[Player] {
        &self.players
    }

    /// Teams contributed by this source.
    #[must_use]
    pub fn teams(&self) -> &[Team] {
        &self.teams
    }

    pub(crate) fn into_parts(self) -> (SourceRef, Vec<Player>, Vec<Team>) {
        (self.reference, self.players, self.teams)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_source_id_from_name_is_stable() {
        assert_eq!(SourceId::from_name("cup-1"), SourceId::from_name("cup-1"));
        assert_ne!(SourceId::from_name("cup-1"), SourceId::from_name("cup-2"));
    }

    #[test]
    fn test_undated_sources_sort_first() {
        let undated = SourceRef::named("zzz-manual");
        let dated = SourceRef::dated("aaa", Utc.with_ymd_and_hms(2020, 5, 1, 0, 0, 0).unwrap());
        assert!(undated < dated);
    }

    #[test]
    fn test_same_start_orders_by_name() {
        let at = Utc.with_ymd_and_hms(2023, 3, 3, 12, 0, 0).unwrap();
        let a = SourceRef::dated("alpha", at);
        let b = SourceRef::dated("beta", at);
        assert!(a < b);
        assert_eq!(a.cmp(&a.clone()), Ordering::Equal);
    }

    #[test]
    fn test_source_display() {
        let at = Utc.with_ymd_and_hms(2023, 3, 3, 12, 0, 0).unwrap();
        assert_eq!(SourceRef::dated("cup", at).to_string(), "cup (2023-03-03)");
        assert_eq!(SourceRef::named("manual").to_string(), "manual");
    }

    #[test]
    fn test_source_collects_entities() {
        let reference = SourceRef::named("manual");
        let mut source = Source::new(reference.clone());
        source.push_player(Player::new());
        source.push_team(Team::new());
        assert_eq!(source.players().len(), 1);
        assert_eq!(source.teams().len(), 1);
        assert_eq!(source.name(), "manual");
        assert!(source.start().is_none());
    }
}
