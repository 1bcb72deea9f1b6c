/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Types that store pending updates to the module's state.

use std::collections::{btree_map, btree_set, BTreeMap, BTreeSet};

/// Generic set of key-value updates that are written into the store when an execution commits.
///
/// Both halves are ordered so that iterating an `UpdateSet` is deterministic across validators.
///
/// # Uniqueness of Key between `inserts` and `deletes`
///
/// A key is never in both `inserts` and `deletes`: scheduling one cancels the other.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct UpdateSet<K: Ord, V> {
    /// Insertion updates that will be written on commit.
    inserts: BTreeMap<K, V>,

    /// Deletion updates that will be written on commit.
    deletes: BTreeSet<K>,
}

impl<K: Ord + Clone, V> UpdateSet<K, V> {
    /// Create a new `UpdateSet` with empty `inserts` and `deletes`.
    pub fn new() -> Self {
        Self {
            inserts: BTreeMap::new(),
            deletes: BTreeSet::new(),
        }
    }

    /// Schedule the insertion of a `key`-`value` pair.
    ///
    /// This cancels the deletion of `key`, if it has been scheduled using [`delete`](Self::delete).
    pub fn insert(&mut self, key: K, value: V) {
        self.deletes.remove(&key);
        self.inserts.insert(key, value);
    }

    /// Schedule the deletion of `key`.
    ///
    /// This cancels the insertion of `key`, if it has been scheduled using [`insert`](Self::insert).
    pub fn delete(&mut self, key: K) {
        self.inserts.remove(&key);
        self.deletes.insert(key);
    }

    /// Get whether the `UpdateSet` is scheduled to insert a value to `key`, and if so, returns a reference
    /// to that value.
    pub fn get_insert(&self, key: &K) -> Option<&V> {
        self.inserts.get(key)
    }

    /// Check whether the `UpdateSet` is scheduled to delete `key`.
    pub fn contains_delete(&self, key: &K) -> bool {
        self.deletes.contains(key)
    }

    /// Get an iterator over all of the key-value pairs that this `UpdateSet` will insert, in key order.
    pub fn inserts(&self) -> btree_map::Iter<K, V> {
        self.inserts.iter()
    }

    /// Get an iterator over all of the keys that this `UpdateSet` will delete, in key order.
    pub fn deletes(&self) -> btree_set::Iter<K> {
        self.deletes.iter()
    }

    /// Whether this `UpdateSet` schedules no updates at all.
    pub fn is_empty(&self) -> bool {
        self.inserts.is_empty() && self.deletes.is_empty()
    }
}

/// Set of key-value updates made by one execution (a message, a packet callback, or a block hook) to the
/// module's store.
pub type StateUpdates = UpdateSet<Vec<u8>, Vec<u8>>;
