//! Sourced attributes.
//!
//! Players and Teams are bundles of `Sourced<T>` containers. A container holds
//! a set of distinct values, each tagged with every source that reported it.
//! Merging two containers is a provenance-preserving union: no value and no
//! source tag is ever dropped.

pub mod kinds;

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::source::{SourceId, SourceRef};
use crate::snapshot::SourceResolver;

pub use kinds::{
    ClanTag, CountryCode, FriendCode, Identifier, IdentifierKind, Name, Placement, Pronoun, Skill,
    TagLayout, Weapon,
};

/// A value type that can live inside a `Sourced` container.
///
/// Equality decides whether two reported values are the same value (and so
/// share one entry); `matches` decides whether two values count as evidence
/// that their owners are the same entity. The default is plain equality.
pub trait AttributeValue: Clone + Eq + fmt::Debug + Send + Sync {
    /// Returns true if `self` and `other` denote the same real-world value.
    fn matches(&self, other: &Self) -> bool {
        self == other
    }
}

impl AttributeValue for bool {}

impl AttributeValue for crate::entity::EntityId {}

/// A single value plus the sources that reported it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourcedValue<T> {
    value: T,
    sources: BTreeSet<SourceRef>,
}

impl<T> SourcedValue<T> {
    /// The reported value.
    #[must_use]
    pub const fn value(&self) -> &T {
        &self.value
    }

    /// Every source that reported this value, in chronological order.
    #[must_use]
    pub const fn sources(&self) -> &BTreeSet<SourceRef> {
        &self.sources
    }

    /// The most recent source that reported this value.
    #[must_use]
    pub fn latest(&self) -> Option<&SourceRef> {
        self.sources.iter().next_back()
    }
}

/// Multi-valued, sourced, chronologically ordered attribute.
///
/// # Examples
///
/// ```
/// use rostermerge::{Name, Sourced, SourceRef};
///
/// let mut names = Sourced::new();
/// names.add(Name::new("Jane").unwrap(), SourceRef::named("cup-1"));
/// names.add(Name::new("Jane").unwrap(), SourceRef::named("cup-2"));
/// assert_eq!(names.len(), 1);
/// assert_eq!(names.sources().len(), 2);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sourced<T> {
    entries: Vec<SourcedValue<T>>,
}

impl<T> Default for Sourced<T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<T: AttributeValue> Sourced<T> {
    /// Creates an empty container.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a container holding one value from one source.
    #[must_use]
    pub fn single(value: T, source: SourceRef) -> Self {
        let mut out = Self::new();
        out.add(value, source);
        out
    }

    /// Records that `source` reported `value`.
    pub fn add(&mut self, value: T, source: SourceRef) {
        self.add_with_sources(value, std::iter::once(source));
    }

    fn add_with_sources(&mut self, value: T, sources: impl IntoIterator<Item = SourceRef>) {
        if let Some(entry) = self.entries.iter_mut().find(|e| e.value == value) {
            entry.sources.extend(sources);
            return;
        }
        self.entries.push(SourcedValue {
            value,
            sources: sources.into_iter().collect(),
        });
    }

    /// Unions `other` into this container, by value, keeping every source tag.
    pub fn merge(&mut self, other: &Self) {
        for entry in &other.entries {
            self.add_with_sources(entry.value.clone(), entry.sources.iter().cloned());
        }
    }

    /// The value tied to the most recent source.
    ///
    /// Ties (one source reporting several values) go to the value recorded last.
    #[must_use]
    pub fn current(&self) -> Option<&T> {
        self.entries
            .iter()
            .max_by(|a, b| a.latest().cmp(&b.latest()))
            .map(|e| &e.value)
    }

    /// Values ordered by the most recent source that reported each, oldest first.
    #[must_use]
    pub fn chronological(&self) -> Vec<&T> {
        let mut ordered: Vec<&SourcedValue<T>> = self.entries.iter().collect();
        ordered.sort_by(|a, b| a.latest().cmp(&b.latest()));
        ordered.into_iter().map(|e| &e.value).collect()
    }

    /// Iterates values in insertion order.
    pub fn values(&self) -> impl Iterator<Item = &T> {
        self.entries.iter().map(|e| &e.value)
    }

    /// The underlying entries.
    #[must_use]
    pub fn entries(&self) -> &[SourcedValue<T>] {
        &self.entries
    }

    /// Union of every source across all values.
    #[must_use]
    pub fn sources(&self) -> BTreeSet<SourceRef> {
        self.entries
            .iter()
            .flat_map(|e| e.sources.iter().cloned())
            .collect()
    }

    /// Returns true if `value` has been reported.
    #[must_use]
    pub fn contains(&self, value: &T) -> bool {
        self.entries.iter().any(|e| &e.value == value)
    }

    /// Returns true if no value has been reported.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of distinct values.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if any value here matches any value in `other`.
    #[must_use]
    pub fn matches(&self, other: &Self) -> bool {
        self.values()
            .any(|a| other.values().any(|b| a.matches(b)))
    }

    /// Rewrites every value through `f`.
    ///
    /// Values that collide after rewriting collapse into one entry whose
    /// sources are the union of the originals. Returns true if anything changed.
    pub fn map_values(&mut self, mut f: impl FnMut(&T) -> T) -> bool {
        let mut changed = false;
        let mut rebuilt = Self::new();
        for entry in std::mem::take(&mut self.entries) {
            let mapped = f(&entry.value);
            changed |= mapped != entry.value;
            rebuilt.add_with_sources(mapped, entry.sources);
        }
        *self = rebuilt;
        changed
    }
}

impl<T: AttributeValue + Serialize> Sourced<T> {
    /// Converts to the stored form, referencing sources by id only.
    #[must_use]
    pub fn to_stored(&self) -> Vec<StoredValue<T>> {
        self.entries
            .iter()
            .map(|e| StoredValue {
                value: e.value.clone(),
                sources: e.sources.iter().map(|s| s.id).collect(),
            })
            .collect()
    }
}

impl<T: AttributeValue> Sourced<T> {
    /// Rebuilds a container from its stored form.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::UnknownSource` if a stored source id is not
    /// known to `resolver`.
    pub fn restore(
        stored: Vec<StoredValue<T>>,
        resolver: &SourceResolver,
    ) -> Result<Self, ValidationError> {
        let mut out = Self::new();
        for item in stored {
            let sources = item
                .sources
                .iter()
                .map(|id| resolver.resolve(*id).cloned())
                .collect::<Result<Vec<_>, _>>()?;
            out.add_with_sources(item.value, sources);
        }
        Ok(out)
    }
}

/// Serialized form of one sourced value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredValue<T> {
    /// The value.
    pub value: T,
    /// Ids of the sources that reported it.
    pub sources: Vec<SourceId>,
}
