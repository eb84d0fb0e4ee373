//! Team entities.

use std::collections::BTreeSet;

use crate::attribute::{ClanTag, Identifier, Name, Placement, Sourced};
use crate::entity::{EntityId, EntityKind, Mergeable};
use crate::error::ValidationError;
use crate::matching::heuristic::shares_players;
use crate::matching::{MatchCategory, MatchReason, PlayerRoster};
use crate::source::SourceRef;

/// A team, as the union of everything any source reported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Team {
    /// Stable identifier.
    pub id: EntityId,

    /// Team names.
    pub names: Sourced<Name>,

    /// Clan tags with their layout.
    pub tags: Sourced<ClanTag>,

    /// Per-season division placements.
    pub divisions: Sourced<Placement>,

    /// Persistent bracket team id and social handles.
    pub identifiers: Sourced<Identifier>,
}

impl Team {
    /// Creates an empty team with a fresh id.
    #[must_use]
    pub fn new() -> Self {
        Self::with_id(EntityId::new())
    }

    /// Creates an empty team with a specific id.
    #[must_use]
    pub fn with_id(id: EntityId) -> Self {
        Self {
            id,
            names: Sourced::new(),
            tags: Sourced::new(),
            divisions: Sourced::new(),
            identifiers: Sourced::new(),
        }
    }

    /// Creates a team with one name reported by `source`.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::EmptyName` if `name` is blank.
    pub fn named(name: &str, source: &SourceRef) -> Result<Self, ValidationError> {
        let mut team = Self::new();
        team.names.add(Name::new(name)?, source.clone());
        Ok(team)
    }

    /// Most recently reported name.
    #[must_use]
    pub fn current_name(&self) -> Option<&Name> {
        self.names.current()
    }

    /// Most recently reported clan tag.
    #[must_use]
    pub fn current_tag(&self) -> Option<&ClanTag> {
        self.tags.current()
    }
}

impl Default for Team {
    fn default() -> Self {
        Self::new()
    }
}

impl Mergeable for Team {
    const KIND: EntityKind = EntityKind::Team;

    fn id(&self) -> EntityId {
        self.id
    }

    fn match_with_reason(&self, other: &Self) -> MatchReason {
        let mut reason = MatchReason::NONE;
        if self.names.matches(&other.names) {
            reason |= MatchCategory::Name;
        }
        if self.tags.matches(&other.tags) {
            reason |= MatchCategory::ClanTag;
        }
        for ours in self.identifiers.values() {
            if other.identifiers.values().any(|theirs| ours == theirs) {
                reason |= ours.kind.category();
            }
        }
        reason
    }

    fn merge(&mut self, other: &Self) {
        self.names.merge(&other.names);
        self.tags.merge(&other.tags);
        self.divisions.merge(&other.divisions);
        self.identifiers.merge(&other.identifiers);
    }

    fn sources(&self) -> BTreeSet<SourceRef> {
        let mut out = self.names.sources();
        out.extend(self.tags.sources());
        out.extend(self.divisions.sources());
        out.extend(self.identifiers.sources());
        out
    }

    fn corroborate(&self, candidate: &Self, reason: MatchReason, roster: &PlayerRoster<'_>) -> bool {
        reason.contains(MatchCategory::Name) && shares_players(self, candidate, roster)
    }
}
