//! Player entities.

use std::collections::BTreeSet;

use crate::attribute::{CountryCode, FriendCode, Identifier, Name, Pronoun, Skill, Sourced, Weapon};
use crate::entity::{EntityId, EntityKind, Mergeable};
use crate::error::ValidationError;
use crate::matching::{MatchCategory, MatchReason};
use crate::source::SourceRef;

/// An individual competitor, as the union of everything any source reported.
///
/// # Examples
///
/// ```
/// use rostermerge::{Player, SourceRef};
///
/// let source = SourceRef::named("cup-1");
/// let player = Player::named("Jane", &source).unwrap();
/// assert_eq!(player.current_name().unwrap().as_str(), "Jane");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Player {
    /// Stable identifier.
    pub id: EntityId,

    /// Display names.
    pub names: Sourced<Name>,

    /// Team references, ordered by source chronology.
    pub teams: Sourced<EntityId>,

    /// Platform ids and handles.
    pub identifiers: Sourced<Identifier>,

    /// Console friend codes.
    pub friend_codes: Sourced<FriendCode>,

    /// Weapon preferences.
    pub weapons: Sourced<Weapon>,

    /// Pronoun declarations.
    pub pronouns: Sourced<Pronoun>,

    /// Country codes.
    pub country: Sourced<CountryCode>,

    /// Skill ratings.
    pub skill: Sourced<Skill>,

    /// Whether a source flagged this player as notable.
    pub notable: Sourced<bool>,
}

impl Player {
    /// Creates an empty player with a fresh id.
    #[must_use]
    pub fn new() -> Self {
        Self::with_id(EntityId::new())
    }

    /// Creates an empty player with a specific id.
    #[must_use]
    pub fn with_id(id: EntityId) -> Self {
        Self {
            id,
            names: Sourced::new(),
            teams: Sourced::new(),
            identifiers: Sourced::new(),
            friend_codes: Sourced::new(),
            weapons: Sourced::new(),
            pronouns: Sourced::new(),
            country: Sourced::new(),
            skill: Sourced::new(),
            notable: Sourced::new(),
        }
    }

    /// Creates a player with one name reported by `source`.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::EmptyName` if `name` is blank.
    pub fn named(name: &str, source: &SourceRef) -> Result<Self, ValidationError> {
        let mut player = Self::new();
        player.names.add(Name::new(name)?, source.clone());
        Ok(player)
    }

    /// Most recently reported name.
    #[must_use]
    pub fn current_name(&self) -> Option<&Name> {
        self.names.current()
    }

    /// Team referenced by the most recent source.
    #[must_use]
    pub fn current_team(&self) -> Option<EntityId> {
        self.teams.current().copied()
    }

    /// Every team this player was reported on, oldest first.
    #[must_use]
    pub fn team_history(&self) -> Vec<EntityId> {
        self.teams.chronological().into_iter().copied().collect()
    }

    /// Returns true if this player references `team`.
    #[must_use]
    pub fn is_on_team(&self, team: EntityId) -> bool {
        self.teams.contains(&team)
    }
}

impl Default for Player {
    fn default() -> Self {
        Self::new()
    }
}

impl Mergeable for Player {
    const KIND: EntityKind = EntityKind::Player;

    fn id(&self) -> EntityId {
        self.id
    }

    fn match_with_reason(&self, other: &Self) -> MatchReason {
        let mut reason = MatchReason::NONE;
        if self.names.matches(&other.names) {
            reason |= MatchCategory::Name;
        }
        if self.teams.matches(&other.teams) {
            reason |= MatchCategory::Team;
        }
        if self.friend_codes.matches(&other.friend_codes) {
            reason |= MatchCategory::FriendCode;
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
        self.teams.merge(&other.teams);
        self.identifiers.merge(&other.identifiers);
        self.friend_codes.merge(&other.friend_codes);
        self.weapons.merge(&other.weapons);
        self.pronouns.merge(&other.pronouns);
        self.country.merge(&other.country);
        self.skill.merge(&other.skill);
        self.notable.merge(&other.notable);
    }

    fn sources(&self) -> BTreeSet<SourceRef> {
        let mut out = self.names.sources();
        out.extend(self.teams.sources());
        out.extend(self.identifiers.sources());
        out.extend(self.friend_codes.sources());
        out.extend(self.weapons.sources());
        out.extend(self.pronouns.sources());
        out.extend(self.country.sources());
        out.extend(self.skill.sources());
        out.extend(self.notable.sources());
        out
    }
}
