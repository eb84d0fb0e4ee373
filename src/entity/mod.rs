//! Entity layer modules.
//!
//! This module groups identity, the mergeable-entity contract, and the two
//! entity kinds the engine resolves.

pub mod id;
pub mod player;
pub mod team;

use std::collections::BTreeSet;

use crate::matching::{MatchReason, PlayerRoster};
use crate::source::SourceRef;

pub use id::{EntityId, EntityKind};
pub use player::Player;
pub use team::Team;

/// The contract the scorer and orchestrator require of an entity.
pub trait Mergeable: Clone + Send + Sync {
    /// Which kind of entity this is.
    const KIND: EntityKind;

    /// Immutable identifier.
    fn id(&self) -> EntityId;

    /// Bitwise OR of every attribute category that matched between `self` and `other`.
    fn match_with_reason(&self, other: &Self) -> MatchReason;

    /// Unions every attribute of `other` into `self`.
    ///
    /// `self` keeps its id; no sourced value of either side is lost.
    fn merge(&mut self, other: &Self);

    /// Every source that contributed a value to this entity.
    fn sources(&self) -> BTreeSet<SourceRef>;

    /// Secondary evidence for a match whose weight did not clear the threshold.
    ///
    /// Called for each candidate in the top weight group. The default accepts
    /// nothing.
    fn corroborate(&self, _candidate: &Self, _reason: MatchReason, _roster: &PlayerRoster<'_>) -> bool {
        false
    }
}
