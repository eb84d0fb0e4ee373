//! Similarity scoring.
//!
//! Two entities of the same kind are compared attribute by attribute. Every
//! attribute kind owns one `MatchCategory`; the categories that matched form a
//! `MatchReason` bitmask, which reduces to an integer weight through a fixed
//! `MatchWeights` table. Persistent platform ids weigh far more than free-text
//! names.

pub mod heuristic;
pub mod normalize;

use std::fmt;
use std::ops::{BitOr, BitOrAssign};

use serde::{Deserialize, Serialize};

use crate::entity::{EntityId, Mergeable};

pub use heuristic::PlayerRoster;

/// Attribute categories that can contribute to a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchCategory {
    /// Display name (player name or team name).
    Name,
    /// Players share a team reference.
    Team,
    /// Teams share a clan tag.
    ClanTag,
    /// Friend code.
    FriendCode,
    /// Chat service persistent id.
    ChatId,
    /// Bracket service persistent user id.
    BracketPersistentId,
    /// Chat service username.
    ChatUsername,
    /// Bracket service username.
    BracketUsername,
    /// Bracket service profile slug.
    BracketSlug,
    /// Streaming handle.
    StreamHandle,
    /// Social network handle.
    SocialHandle,
    /// Bracket service persistent team id.
    BracketTeamId,
}

impl MatchCategory {
    /// Every category, in bit order.
    pub const ALL: [Self; 12] = [
        Self::Name,
        Self::Team,
        Self::ClanTag,
        Self::FriendCode,
        Self::ChatId,
        Self::BracketPersistentId,
        Self::ChatUsername,
        Self::BracketUsername,
        Self::BracketSlug,
        Self::StreamHandle,
        Self::SocialHandle,
        Self::BracketTeamId,
    ];

    /// The bit this category owns in a `MatchReason`.
    #[must_use]
    pub const fn bit(self) -> u32 {
        1 << (self as u32)
    }

    const fn label(self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Team => "team",
            Self::ClanTag => "clan_tag",
            Self::FriendCode => "friend_code",
            Self::ChatId => "chat_id",
            Self::BracketPersistentId => "bracket_persistent_id",
            Self::ChatUsername => "chat_username",
            Self::BracketUsername => "bracket_username",
            Self::BracketSlug => "bracket_slug",
            Self::StreamHandle => "stream_handle",
            Self::SocialHandle => "social_handle",
            Self::BracketTeamId => "bracket_team_id",
        }
    }
}

impl fmt::Display for MatchCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Bitmask of matched categories.
///
/// # Examples
///
/// ```
/// use rostermerge::{MatchCategory, MatchReason};
///
/// let reason = MatchReason::NONE | MatchCategory::Name | MatchCategory::ChatId;
/// assert!(reason.contains(MatchCategory::ChatId));
/// assert_eq!(reason.to_string(), "name|chat_id");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MatchReason(u32);

impl MatchReason {
    /// Nothing matched.
    pub const NONE: Self = Self(0);

    /// Builds a reason from raw bits.
    #[must_use]
    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    /// Raw bits.
    #[must_use]
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// Returns a copy with `category` set.
    #[must_use]
    pub const fn with(self, category: MatchCategory) -> Self {
        Self(self.0 | category.bit())
    }

    /// Returns true if `category` matched.
    #[must_use]
    pub const fn contains(self, category: MatchCategory) -> bool {
        self.0 & category.bit() != 0
    }

    /// Returns true if nothing matched.
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// The matched categories, in bit order.
    pub fn categories(self) -> impl Iterator<Item = MatchCategory> {
        MatchCategory::ALL
            .into_iter()
            .filter(move |c| self.contains(*c))
    }
}

impl BitOr for MatchReason {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOr<MatchCategory> for MatchReason {
    type Output = Self;

    fn bitor(self, rhs: MatchCategory) -> Self {
        self.with(rhs)
    }
}

impl BitOrAssign for MatchReason {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl BitOrAssign<MatchCategory> for MatchReason {
    fn bitor_assign(&mut self, rhs: MatchCategory) {
        self.0 |= rhs.bit();
    }
}

impl fmt::Display for MatchReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("none");
        }
        let labels: Vec<&str> = self.categories().map(MatchCategory::label).collect();
        f.write_str(&labels.join("|"))
    }
}

/// Per-category weight table.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchWeights {
    pub name: u32,
    pub team: u32,
    pub clan_tag: u32,
    pub friend_code: u32,
    pub chat_id: u32,
    pub bracket_persistent_id: u32,
    pub chat_username: u32,
    pub bracket_username: u32,
    pub bracket_slug: u32,
    pub stream_handle: u32,
    pub social_handle: u32,
    pub bracket_team_id: u32,
}

impl Default for MatchWeights {
    fn default() -> Self {
        Self {
            name: 3,
            team: 3,
            clan_tag: 1,
            friend_code: 8,
            chat_id: 50,
            bracket_persistent_id: 50,
            chat_username: 10,
            bracket_username: 10,
            bracket_slug: 20,
            stream_handle: 10,
            social_handle: 10,
            bracket_team_id: 50,
        }
    }
}

impl MatchWeights {
    /// Weight of a single category.
    #[must_use]
    pub const fn get(&self, category: MatchCategory) -> u32 {
        match category {
            MatchCategory::Name => self.name,
            MatchCategory::Team => self.team,
            MatchCategory::ClanTag => self.clan_tag,
            MatchCategory::FriendCode => self.friend_code,
            MatchCategory::ChatId => self.chat_id,
            MatchCategory::BracketPersistentId => self.bracket_persistent_id,
            MatchCategory::ChatUsername => self.chat_username,
            MatchCategory::BracketUsername => self.bracket_username,
            MatchCategory::BracketSlug => self.bracket_slug,
            MatchCategory::StreamHandle => self.stream_handle,
            MatchCategory::SocialHandle => self.social_handle,
            MatchCategory::BracketTeamId => self.bracket_team_id,
        }
    }

    /// Sum of the weights of every category in `reason`.
    #[must_use]
    pub fn weight(&self, reason: MatchReason) -> u32 {
        reason
            .categories()
            .fold(0u32, |acc, c| acc.saturating_add(self.get(c)))
    }
}

/// A reference entity selected to absorb an incoming item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchCandidate {
    /// Id of the reference entity.
    pub target: EntityId,
    /// Categories that matched.
    pub reason: MatchReason,
    /// Weight of `reason`.
    pub weight: u32,
}

/// Read-only inputs for one pass of candidate searches.
#[derive(Debug, Clone, Copy)]
pub struct MatchContext<'a> {
    weights: &'a MatchWeights,
    threshold: u32,
    roster: &'a PlayerRoster<'a>,
}

impl<'a> MatchContext<'a> {
    /// Creates a context.
    #[must_use]
    pub const fn new(weights: &'a MatchWeights, threshold: u32, roster: &'a PlayerRoster<'a>) -> Self {
        Self {
            weights,
            threshold,
            roster,
        }
    }

    /// Finds the reference entity `item` should merge into, if any.
    ///
    /// Candidates other than `item` itself are grouped by weight; only the top
    /// group is considered, visited in ascending id order. If its weight is
    /// above the threshold the first candidate wins. Otherwise each candidate
    /// in the group is offered to `Mergeable::corroborate` and the first one
    /// accepted wins. No candidate means the item is new.
    pub fn find_match<'r, T, I>(&self, item: &T, references: I) -> Option<MatchCandidate>
    where
        T: Mergeable + 'r,
        I: IntoIterator<Item = &'r T>,
    {
        let item_id = item.id();
        let mut scored: Vec<(u32, EntityId, MatchReason, &'r T)> = references
            .into_iter()
            .filter(|r| r.id() != item_id)
            .filter_map(|r| {
                let reason = item.match_with_reason(r);
                (!reason.is_empty()).then(|| (self.weights.weight(reason), r.id(), reason, r))
            })
            .collect();

        if scored.is_empty() {
            return None;
        }

        scored.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.cmp(&b.1)));
        let top_weight = scored[0].0;
        let mut top_group = scored.iter().take_while(|s| s.0 == top_weight);

        if top_weight > self.threshold {
            return top_group.next().map(|&(weight, target, reason, _)| MatchCandidate {
                target,
                reason,
                weight,
            });
        }

        for &(weight, target, reason, candidate) in top_group {
            if item.corroborate(candidate, reason, self.roster) {
                return Some(MatchCandidate {
                    target,
                    reason,
                    weight,
                });
            }
        }
        None
    }
}
