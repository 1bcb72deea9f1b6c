/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Read-only queries over the chainlet module's state.
//!
//! Queries work on anything that implements [`KVGet`]: the host's committed store, or a
//! [`Context`](crate::state::Context) to observe uncommitted writes.
//!
//! List queries are paginated by key. Pass the `next_key` of one page as the `key` of the next request
//! to continue where the previous page ended.

use crate::config::Params;
use crate::error::ChainletError;
use crate::state::{KVGet, KVGetError};
use crate::types::{chainlet::Chainlet, stack::{Stack, VersionAvailability}};
use crate::version_tree::VersionTreeCache;

/// The default number of items in a page, used when a request sets `limit` to zero.
pub const DEFAULT_PAGE_LIMIT: usize = 100;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PageRequest {
    /// The first key to include. `None` starts from the beginning.
    pub key: Option<String>,
    pub limit: usize,
}

impl PageRequest {
    pub fn new(key: Option<String>, limit: usize) -> Self {
        Self { key, limit }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// The key of the first item of the next page. `None` on the last page.
    pub next_key: Option<String>,
    pub total: u64,
}

pub fn chainlet<K: KVGet>(store: &K, chain_id: &str) -> Result<Option<Chainlet>, KVGetError> {
    store.chainlet(chain_id)
}

pub fn chainlets<K: KVGet>(store: &K, page: &PageRequest) -> Result<Page<Chainlet>, KVGetError> {
    Ok(paginate(store.chainlets()?, page, |chainlet| {
        chainlet.chain_id.as_str()
    }))
}

pub fn stack<K: KVGet>(store: &K, display_name: &str) -> Result<Option<Stack>, KVGetError> {
    store.stack(display_name)
}

pub fn stacks<K: KVGet>(store: &K, page: &PageRequest) -> Result<Page<Stack>, KVGetError> {
    Ok(paginate(store.stacks()?, page, |stack| stack.display_name.as_str()))
}

pub fn chainlet_count<K: KVGet>(store: &K) -> Result<u64, KVGetError> {
    store.chainlet_count()
}

pub fn params<K: KVGet>(store: &K) -> Result<Params, KVGetError> {
    store.params()
}

pub fn stack_version_available<K: KVGet>(
    store: &K,
    stack: &str,
    version: &str,
) -> Result<VersionAvailability, KVGetError> {
    crate::stack_registry::version_available(store, stack, version)
}

/// Get the newest version of `stack` that a chainlet running `current` could move to without a
/// breaking upgrade.
pub fn latest_compatible_version<K: KVGet>(
    store: &K,
    version_tree: &mut VersionTreeCache,
    stack: &str,
    current: &str,
) -> Result<String, ChainletError> {
    Ok(version_tree
        .ensure_loaded(store)?
        .latest_compatible(stack, current)?)
}

/// `items` must be sorted by `key`.
fn paginate<T>(items: Vec<T>, page: &PageRequest, key: impl Fn(&T) -> &str) -> Page<T> {
    let total = items.len() as u64;
    let limit = if page.limit == 0 {
        DEFAULT_PAGE_LIMIT
    } else {
        page.limit
    };

    let mut remaining = items
        .into_iter()
        .skip_while(|item| match &page.key {
            Some(start) => key(item) < start.as_str(),
            None => false,
        })
        .peekable();

    let mut items = Vec::with_capacity(limit.min(DEFAULT_PAGE_LIMIT));
    while items.len() < limit {
        match remaining.next() {
            Some(item) => items.push(item),
            None => break,
        }
    }
    let next_key = remaining.peek().map(|item| key(item).to_string());

    Page {
        items,
        next_key,
        total,
    }
}
