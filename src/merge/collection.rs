//! Id-keyed entity collections.

use std::collections::btree_map::{self, BTreeMap};

use rayon::prelude::*;

use crate::entity::{EntityId, Mergeable};

/// Live reference collection of one entity kind, keyed and iterated by id.
///
/// Iteration order is ascending id, which is what makes candidate search
/// and pass output deterministic.
#[derive(Debug, Clone)]
pub struct EntitySet<T> {
    items: BTreeMap<EntityId, T>,
}

impl<T> Default for EntitySet<T> {
    fn default() -> Self {
        Self {
            items: BTreeMap::new(),
        }
    }
}

impl<T: Mergeable> EntitySet<T> {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `item`, returning the entity it replaced, if any.
    pub fn insert(&mut self, item: T) -> Option<T> {
        self.items.insert(item.id(), item)
    }

    /// Looks up an entity.
    #[must_use]
    pub fn get(&self, id: EntityId) -> Option<&T> {
        self.items.get(&id)
    }

    /// Looks up an entity mutably.
    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut T> {
        self.items.get_mut(&id)
    }

    /// Removes an entity.
    pub fn remove(&mut self, id: EntityId) -> Option<T> {
        self.items.remove(&id)
    }

    /// Returns true if `id` is present.
    #[must_use]
    pub fn contains(&self, id: EntityId) -> bool {
        self.items.contains_key(&id)
    }

    /// Number of entities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns true if the set is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Entities in ascending id order.
    pub fn iter(&self) -> btree_map::Values<'_, EntityId, T> {
        self.items.values()
    }

    /// Mutable entities in ascending id order.
    pub fn iter_mut(&mut self) -> btree_map::ValuesMut<'_, EntityId, T> {
        self.items.values_mut()
    }

    /// Ids in ascending order.
    pub fn ids(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.items.keys().copied()
    }

    /// Consumes the set, yielding entities in ascending id order.
    pub fn into_values(self) -> impl Iterator<Item = T> {
        self.items.into_values()
    }
}

impl<T: Mergeable> EntitySet<T> {
    /// Parallel mutable iteration for per-entity rewrites.
    pub fn par_iter_mut(&mut self) -> impl ParallelIterator<Item = &mut T> {
        self.items.par_iter_mut().map(|(_, item)| item)
    }
}

impl<T: Mergeable> FromIterator<T> for EntitySet<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut out = Self::new();
        for item in iter {
            out.insert(item);
        }
        out
    }
}

impl<'a, T: Mergeable> IntoIterator for &'a EntitySet<T> {
    type Item = &'a T;
    type IntoIter = btree_map::Values<'a, EntityId, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
