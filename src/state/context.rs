/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Defines [`Context`], the view of the module's state that one execution (a transaction message, a
//! packet callback, or a block hook) reads from and writes into.
//!
//! # Lifecycle
//!
//! The host opens a `Context` on top of its committed store at the current block height and time, runs
//! one or more executions against it, and then commits the writes those executions made:
//!
//! ```ignore
//! let mut ctx = Context::new(&store, height, time);
//! controller.handle_msg(&mut ctx, msg)?;
//! let write_batch = controller.commit(ctx);
//! store.write(write_batch);
//! ```
//!
//! Dropping a `Context` without committing it discards every write, event, and version tree change made
//! through it. [`Context::into_write_batch`] hands out the writes without going through the controller;
//! a host that commits those must call
//! [`Controller::invalidate_version_tree`](crate::controller::Controller::invalidate_version_tree).
//!
//! # Reads see writes
//!
//! Writes are buffered in a [`StateUpdates`] overlay. Every read through the context, including prefix
//! scans, sees the overlay first and the committed store second, so an execution always observes its own
//! writes.

use std::collections::BTreeMap;

use crate::error::ChainletError;
use crate::events::Event;
use crate::types::{
    data_types::{BlockHeight, Timestamp},
    update_sets::StateUpdates,
};
use crate::version_tree::{cache::StagedVersionTree, VersionTree, VersionTreeCache};

use super::pluggables::{KVGet, WriteBatch};

pub struct Context<'a, K: KVGet> {
    store: &'a K,
    updates: StateUpdates,
    height: BlockHeight,
    time: Timestamp,
    events: Vec<Event>,
    version_tree: StagedVersionTree,
}

impl<'a, K: KVGet> Context<'a, K> {
    /// Open a new context on top of `store` for the block at `height` with block time `time`.
    pub fn new(store: &'a K, height: BlockHeight, time: Timestamp) -> Self {
        Self {
            store,
            updates: StateUpdates::new(),
            height,
            time,
            events: Vec::new(),
            version_tree: StagedVersionTree::default(),
        }
    }

    pub fn height(&self) -> BlockHeight {
        self.height
    }

    pub fn time(&self) -> Timestamp {
        self.time
    }

    pub(crate) fn set(&mut self, key: Vec<u8>, value: Vec<u8>) {
        self.updates.insert(key, value)
    }

    pub(crate) fn delete(&mut self, key: Vec<u8>) {
        self.updates.delete(key)
    }

    pub(crate) fn emit(&mut self, event: Event) {
        self.events.push(event)
    }

    /// Get the events emitted through this context so far, in emission order.
    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// Get the writes buffered in this context so far.
    pub fn updates(&self) -> &StateUpdates {
        &self.updates
    }

    /// Get the version tree as this context sees it, loading it from `cache` on first use.
    pub(crate) fn version_tree(
        &mut self,
        cache: &VersionTreeCache,
    ) -> Result<&VersionTree, ChainletError> {
        self.load_version_tree(cache)?;
        self.version_tree.tree()
    }

    /// Like [`version_tree`](Self::version_tree), for mirroring a stack registry write into the tree.
    pub(crate) fn version_tree_mut(
        &mut self,
        cache: &VersionTreeCache,
    ) -> Result<&mut VersionTree, ChainletError> {
        self.load_version_tree(cache)?;
        self.version_tree.tree_mut()
    }

    /// Drop this context's version tree. Its next use rebuilds it from the context.
    pub(crate) fn discard_version_tree(&mut self) {
        self.version_tree.discard()
    }

    fn load_version_tree(&mut self, cache: &VersionTreeCache) -> Result<(), ChainletError> {
        if !self.version_tree.is_loaded() {
            let loaded = self.version_tree.load(cache, &*self)?;
            self.version_tree = loaded;
        }
        Ok(())
    }

    /// Run `f` against this context. If `f` fails, every write, event, and version tree change it made
    /// is discarded, leaving the context as it was before the call.
    pub fn atomic<T, E>(&mut self, f: impl FnOnce(&mut Self) -> Result<T, E>) -> Result<T, E> {
        let updates_checkpoint = self.updates.clone();
        let events_checkpoint = self.events.len();
        let tree_changes_checkpoint = self.version_tree.changes();

        let result = f(self);
        if result.is_err() {
            self.updates = updates_checkpoint;
            self.events.truncate(events_checkpoint);
            if self.version_tree.changes() != tree_changes_checkpoint {
                self.version_tree.discard();
            }
        }
        result
    }

    /// Consume the context, returning a write batch containing its buffered writes and the events it
    /// emitted.
    pub fn into_write_batch<W: WriteBatch>(self) -> (W, Vec<Event>) {
        let (wb, events, _) = self.into_parts();
        (wb, events)
    }

    pub(crate) fn into_parts<W: WriteBatch>(self) -> (W, Vec<Event>, StagedVersionTree) {
        let mut wb = W::new();
        for (key, value) in self.updates.inserts() {
            wb.set(key, value);
        }
        for key in self.updates.deletes() {
            wb.delete(key);
        }
        (wb, self.events, self.version_tree)
    }
}

impl<K: KVGet> KVGet for Context<'_, K> {
    fn get(&self, key: &[u8]) -> Option<Vec<u8>> {
        let key = key.to_vec();
        if self.updates.contains_delete(&key) {
            None
        } else if let Some(value) = self.updates.get_insert(&key) {
            Some(value.clone())
        } else {
            self.store.get(&key)
        }
    }

    fn scan_prefix(&self, prefix: &[u8]) -> Vec<(Vec<u8>, Vec<u8>)> {
        let mut merged: BTreeMap<Vec<u8>, Vec<u8>> =
            self.store.scan_prefix(prefix).into_iter().collect();

        for (key, value) in self.updates.inserts() {
            if key.starts_with(prefix) {
                merged.insert(key.clone(), value.clone());
            }
        }
        for key in self.updates.deletes() {
            merged.remove(key);
        }

        merged.into_iter().collect()
    }
}
