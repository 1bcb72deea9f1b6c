/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Defines [`VersionTreeCache`], the process-local cache of the [`VersionTree`].
//!
//! # Coherence with the stack registry
//!
//! The stack registry is the only authoritative source of which versions are enabled. The cache starts
//! out unloaded and is rebuilt by scanning the registry the first time it is needed, so a restarted
//! process converges to the same tree as one that has been running all along.
//!
//! Executions never touch the cache directly. Each [`Context`](crate::state::Context) works on its own
//! [`StagedVersionTree`], a copy of the cache (or a tree rebuilt from the context) that the context's
//! stack registry writes are mirrored into. The staged tree replaces the cache only when the context is
//! committed through [`Controller::commit`](crate::controller::Controller::commit). A context that is
//! dropped, or an execution that is rolled back, leaves the cache as it was.
//!
//! Every replacement or invalidation of the cache starts a new *generation*. A staged tree copied from an
//! older generation is never committed, since it may lack changes committed in between.

use crate::error::ChainletError;
use crate::state::KVGet;

use super::tree::VersionTree;

#[derive(Debug, Default)]
pub struct VersionTreeCache {
    tree: Option<VersionTree>,
    generation: u64,
}

impl VersionTreeCache {
    /// Create an unloaded cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop the loaded tree, if any. The next [`ensure_loaded`](Self::ensure_loaded) rebuilds it.
    pub fn invalidate(&mut self) {
        self.generation += 1;
        if self.tree.take().is_some() {
            log::debug!("Version tree cache invalidated");
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.tree.is_some()
    }

    /// Get the tree, rebuilding it from the stack registry in the committed `store` if it is not
    /// loaded.
    pub fn ensure_loaded<K: KVGet>(&mut self, store: &K) -> Result<&VersionTree, ChainletError> {
        if self.tree.is_none() {
            self.tree = Some(Self::rebuild(store)?);
        }
        match self.tree.as_ref() {
            Some(tree) => Ok(tree),
            None => Err(ChainletError::Integrity(
                "version tree missing right after being loaded".to_string(),
            )),
        }
    }

    /// Build a tree containing every enabled version of every stack in `store`.
    pub fn rebuild<K: KVGet>(store: &K) -> Result<VersionTree, ChainletError> {
        let mut tree = VersionTree::new();
        for stack in store.stacks()? {
            for version in stack.enabled_versions() {
                tree.add(&stack.display_name, &version.version)?;
            }
        }
        log::debug!("Version tree rebuilt from the stack registry");
        Ok(tree)
    }

    /// Take over the tree staged by a context whose writes are being committed.
    pub(crate) fn commit(&mut self, staged: StagedVersionTree) {
        let Some(tree) = staged.tree else {
            if staged.detached {
                self.invalidate();
            }
            return;
        };

        let up_to_date = staged.base.map_or(true, |base| base == self.generation);
        if !up_to_date {
            if staged.changes > 0 {
                self.invalidate();
            }
        } else if staged.changes > 0 || staged.base.is_none() || self.tree.is_none() {
            self.tree = Some(tree);
            self.generation += 1;
        }
    }
}

/// The version tree as seen by one [`Context`](crate::state::Context).
#[derive(Debug, Default)]
pub(crate) struct StagedVersionTree {
    tree: Option<VersionTree>,
    /// Generation of the cache `tree` was copied from. `None` if it was rebuilt from the context.
    base: Option<u64>,
    /// Set once the context's writes may disagree with a copy of the cache.
    detached: bool,
    changes: u64,
}

impl StagedVersionTree {
    pub(crate) fn is_loaded(&self) -> bool {
        self.tree.is_some()
    }

    /// Load the tree of a context whose state `store` reads. Copies `cache` if it is loaded and the
    /// context is not detached from it, and rebuilds from `store` otherwise.
    pub(crate) fn load<K: KVGet>(
        &self,
        cache: &VersionTreeCache,
        store: &K,
    ) -> Result<Self, ChainletError> {
        let (tree, base) = match &cache.tree {
            Some(tree) if !self.detached => (tree.clone(), Some(cache.generation)),
            _ => (VersionTreeCache::rebuild(store)?, None),
        };
        Ok(Self {
            tree: Some(tree),
            base,
            detached: self.detached,
            changes: self.changes,
        })
    }

    pub(crate) fn tree(&self) -> Result<&VersionTree, ChainletError> {
        self.tree.as_ref().ok_or_else(not_loaded)
    }

    pub(crate) fn tree_mut(&mut self) -> Result<&mut VersionTree, ChainletError> {
        self.changes += 1;
        self.tree.as_mut().ok_or_else(not_loaded)
    }

    /// Number of times the tree was handed out for mutation.
    pub(crate) fn changes(&self) -> u64 {
        self.changes
    }

    /// Drop the tree. The next load rebuilds it from the context.
    pub(crate) fn discard(&mut self) {
        self.tree = None;
        self.base = None;
        self.detached = true;
    }
}

fn not_loaded() -> ChainletError {
    ChainletError::Integrity("version tree used before being loaded".to_string())
}
