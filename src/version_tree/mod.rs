/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! The version tree: an index, derived from the stack registry, that answers "what is the latest
//! version that `X` can move to without a breaking upgrade".

pub mod cache;
pub mod semantics;
pub mod tree;

pub use cache::VersionTreeCache;
pub use semantics::{check_upgrade, plan_name, EffectiveMajor, VersionError};
pub use tree::VersionTree;
