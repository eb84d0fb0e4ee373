//! Merge records.
//!
//! A `MergeRecord` is the immutable outcome of comparing one incoming item
//! against the reference snapshot.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::entity::EntityId;
use crate::matching::MatchReason;

/// What happened to one incoming item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MergeOutcome {
    /// No match: the item joins the reference set as a new entity.
    Added,
    /// The item is already part of the reference set and stays as-is.
    Kept,
    /// The item was folded into another entity.
    Merged {
        /// Categories that matched.
        reason: MatchReason,
        /// Weight of `reason`.
        weight: u32,
    },
}

/// Outcome of one comparison.
///
/// `item` is the incoming entity the record describes. `resultant` is the
/// entity holding the item's data afterwards: the item itself for Added and
/// Kept, the absorbing entity for Merged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MergeRecord {
    /// Incoming item.
    pub item: EntityId,
    /// Entity that carries the item's data after the pass.
    pub resultant: EntityId,
    /// What happened.
    pub outcome: MergeOutcome,
}

impl MergeRecord {
    /// A new entity with no match.
    #[must_use]
    pub const fn added(item: EntityId) -> Self {
        Self {
            item,
            resultant: item,
            outcome: MergeOutcome::Added,
        }
    }

    /// An existing entity left unchanged.
    #[must_use]
    pub const fn kept(item: EntityId) -> Self {
        Self {
            item,
            resultant: item,
            outcome: MergeOutcome::Kept,
        }
    }

    /// `discarded` was folded into `resultant`.
    #[must_use]
    pub const fn merged(discarded: EntityId, resultant: EntityId, reason: MatchReason, weight: u32) -> Self {
        Self {
            item: discarded,
            resultant,
            outcome: MergeOutcome::Merged { reason, weight },
        }
    }

    /// Returns true for merge records.
    #[must_use]
    pub const fn is_merged(&self) -> bool {
        matches!(self.outcome, MergeOutcome::Merged { .. })
    }

    /// The entity retired by this record, if it is a merge.
    #[must_use]
    pub const fn discarded(&self) -> Option<EntityId> {
        if self.is_merged() {
            Some(self.item)
        } else {
            None
        }
    }

    /// The match reason, if this is a merge.
    #[must_use]
    pub const fn reason(&self) -> Option<MatchReason> {
        match self.outcome {
            MergeOutcome::Merged { reason, .. } => Some(reason),
            MergeOutcome::Added | MergeOutcome::Kept => None,
        }
    }

    /// Returns true if this merge folds an entity into itself.
    #[must_use]
    pub fn is_self_merge(&self) -> bool {
        self.is_merged() && self.item == self.resultant
    }

    /// Change type label used in audit dumps.
    #[must_use]
    pub const fn change_type(&self) -> &'static str {
        match self.outcome {
            MergeOutcome::Added => "Added",
            MergeOutcome::Kept => "Kept",
            MergeOutcome::Merged { .. } => "Merged",
        }
    }
}

impl fmt::Display for MergeRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.outcome {
            MergeOutcome::Merged { reason, weight } => write!(
                f,
                "{}\t{}\t{}\t{}\t{}",
                self.change_type(),
                self.item,
                self.resultant,
                reason,
                weight
            ),
            MergeOutcome::Added | MergeOutcome::Kept => {
                write!(f, "{}\t{}\t{}\t\t", self.change_type(), self.item, self.resultant)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matching::MatchCategory;

    fn id(v: u128) -> EntityId {
        EntityId::from_u128(v)
    }

    #[test]
    fn test_added_and_kept_resolve_to_self() {
        let added = MergeRecord::added(id(1));
        assert_eq!(added.resultant, id(1));
        assert!(added.discarded().is_none());
        assert!(added.reason().is_none());

        let kept = MergeRecord::kept(id(2));
        assert_eq!(kept.change_type(), "Kept");
        assert!(!kept.is_merged());
    }

    #[test]
    fn test_merged_accessors() {
        let reason = MatchReason::NONE | MatchCategory::ChatId;
        let record = MergeRecord::merged(id(1), id(2), reason, 50);
        assert_eq!(record.discarded(), Some(id(1)));
        assert_eq!(record.reason(), Some(reason));
        assert!(!record.is_self_merge());
        assert!(MergeRecord::merged(id(3), id(3), reason, 50).is_self_merge());
    }

    #[test]
    fn test_display_is_tab_delimited() {
        let reason = MatchReason::NONE | MatchCategory::Name | MatchCategory::Team;
        let line = MergeRecord::merged(id(1), id(2), reason, 6).to_string();
        let fields: Vec<&str> = line.split('\t').collect();
        assert_eq!(fields.len(), 5);
        assert_eq!(fields[0], "Merged");
        assert_eq!(fields[3], "name|team");
        assert_eq!(fields[4], "6");

        let added = MergeRecord::added(id(1)).to_string();
        assert_eq!(added.split('\t').count(), 5);
        assert!(added.starts_with("Added\t"));
    }
}
