/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! The persistent state of the chainlet module, stored in a host-provided key-value store.

pub mod context;
pub mod pluggables;
pub mod registry;
pub mod variables;

pub use context::Context;
pub use pluggables::{KVGet, KVGetError, KVSetError, KVStore, WriteBatch};
