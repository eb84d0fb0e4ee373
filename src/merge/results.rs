//! Batch-level merge results.

use std::collections::HashSet;
use std::fmt;

use serde::Serialize;

use crate::entity::{EntityId, EntityKind};
use crate::merge::record::{MergeOutcome, MergeRecord};

/// Every record produced by one pass over one batch of a single entity kind.
///
/// Construction normalizes the raw records: a self-merge, or a merge that is
/// the mirror image of one already accepted (A into B and B into A found
/// independently), is demoted to a Kept record for its item. Every incoming
/// item therefore appears exactly once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CoreMergeResults {
    kind: EntityKind,
    records: Vec<MergeRecord>,
}

impl CoreMergeResults {
    /// Builds results from raw prep-phase records.
    #[must_use]
    pub fn new(kind: EntityKind, raw: Vec<MergeRecord>) -> Self {
        let mut accepted: HashSet<(EntityId, EntityId)> = HashSet::new();
        let records = raw
            .into_iter()
            .map(|record| {
                if !record.is_merged() {
                    return record;
                }
                if record.is_self_merge() || accepted.contains(&(record.resultant, record.item)) {
                    return MergeRecord::kept(record.item);
                }
                accepted.insert((record.item, record.resultant));
                record
            })
            .collect();
        Self { kind, records }
    }

    /// Entity kind these results describe.
    #[must_use]
    pub const fn kind(&self) -> EntityKind {
        self.kind
    }

    /// Every record, in batch order.
    #[must_use]
    pub fn all(&self) -> &[MergeRecord] {
        &self.records
    }

    /// Records for items added as new entities.
    pub fn added(&self) -> impl Iterator<Item = &MergeRecord> {
        self.records
            .iter()
            .filter(|r| r.outcome == MergeOutcome::Added)
    }

    /// Records for items left unchanged.
    pub fn unchanged(&self) -> impl Iterator<Item = &MergeRecord> {
        self.records
            .iter()
            .filter(|r| r.outcome == MergeOutcome::Kept)
    }

    /// Merge records.
    pub fn merged(&self) -> impl Iterator<Item = &MergeRecord> {
        self.records.iter().filter(|r| r.is_merged())
    }

    /// Ids of added items.
    #[must_use]
    pub fn added_ids(&self) -> Vec<EntityId> {
        self.added().map(|r| r.item).collect()
    }

    /// Number of added items.
    #[must_use]
    pub fn added_count(&self) -> usize {
        self.added().count()
    }

    /// Number of unchanged items.
    #[must_use]
    pub fn unchanged_count(&self) -> usize {
        self.unchanged().count()
    }

    /// Number of merges.
    #[must_use]
    pub fn merge_count(&self) -> usize {
        self.merged().count()
    }

    /// Number of records (equals the batch size).
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns true if the batch was empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl fmt::Display for CoreMergeResults {
    /// One tab-delimited line per record: kind, change type, item, resultant,
    /// match reason, weight.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for record in &self.records {
            writeln!(f, "{}\t{record}", self.kind)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matching::{MatchCategory, MatchReason};

    fn id(v: u128) -> EntityId {
        EntityId::from_u128(v)
    }

    fn merged(from: u128, into: u128) -> MergeRecord {
        MergeRecord::merged(id(from), id(into), MatchReason::NONE | MatchCategory::Name, 3)
    }

    #[test]
    fn test_partitions_and_completeness() {
        let raw = vec![
            MergeRecord::added(id(1)),
            MergeRecord::kept(id(2)),
            merged(3, 2),
            MergeRecord::added(id(4)),
        ];
        let results = CoreMergeResults::new(EntityKind::Player, raw);
        assert_eq!(results.added_count(), 2);
        assert_eq!(results.unchanged_count(), 1);
        assert_eq!(results.merge_count(), 1);
        assert_eq!(
            results.added_count() + results.unchanged_count() + results.merge_count(),
            results.len()
        );
        assert_eq!(results.added_ids(), vec![id(1), id(4)]);
    }

    #[test]
    fn test_symmetric_duplicate_is_demoted() {
        let results = CoreMergeResults::new(EntityKind::Team, vec![merged(1, 2), merged(2, 1)]);
        assert_eq!(results.merge_count(), 1);
        assert_eq!(results.all()[0], merged(1, 2));
        assert_eq!(results.all()[1], MergeRecord::kept(id(2)));
    }

    #[test]
    fn test_self_merge_is_demoted() {
        let results = CoreMergeResults::new(EntityKind::Team, vec![merged(5, 5)]);
        assert_eq!(results.merge_count(), 0);
        assert_eq!(results.all()[0], MergeRecord::kept(id(5)));
    }

    #[test]
    fn test_chain_is_not_symmetric() {
        let results =
            CoreMergeResults::new(EntityKind::Player, vec![merged(1, 2), merged(2, 3), merged(3, 1)]);
        assert_eq!(results.merge_count(), 3);
    }

    #[test]
    fn test_dump_lines() {
        let results =
            CoreMergeResults::new(EntityKind::Player, vec![MergeRecord::added(id(1)), merged(2, 1)]);
        let dump = results.to_string();
        let lines: Vec<&str> = dump.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("player\tAdded\t"));
        assert!(lines[1].starts_with("player\tMerged\t"));
        assert!(lines[1].ends_with("\tname\t3"));
    }
}
