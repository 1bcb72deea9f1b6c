/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! The in-memory index of enabled stack versions.

use std::collections::{BTreeMap, BTreeSet};

use semver::Version;

use super::semantics::{has_suffix, parse_version, VersionError};

type Patches = BTreeSet<u64>;
type Minors = BTreeMap<u64, Patches>;
type Majors = BTreeMap<u64, Minors>;

/// Per stack, an ordered `major -> minor -> patch` index of the versions that automatic upgrades may
/// move chainlets to.
///
/// A version is present iff it is a valid semantic version without pre-release or build suffix and it
/// is enabled in the stack registry. Removing the last version under a node prunes the node, so an
/// empty minor or major never lingers in the tree.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct VersionTree {
    stacks: BTreeMap<String, Majors>,
}

impl VersionTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track `version` of `stack`. Versions with a pre-release or build suffix are ignored.
    pub fn add(&mut self, stack: &str, version: &str) -> Result<(), VersionError> {
        let v = parse_version(version)?;
        if has_suffix(&v) {
            return Ok(());
        }

        self.stacks
            .entry(stack.to_string())
            .or_default()
            .entry(v.major)
            .or_default()
            .entry(v.minor)
            .or_default()
            .insert(v.patch);
        Ok(())
    }

    /// Stop tracking `version` of `stack`. Removing a version that is not tracked is a no-op.
    pub fn remove(&mut self, stack: &str, version: &str) -> Result<(), VersionError> {
        let v = parse_version(version)?;
        if has_suffix(&v) {
            return Ok(());
        }

        let Some(majors) = self.stacks.get_mut(stack) else {
            return Ok(());
        };
        if let Some(minors) = majors.get_mut(&v.major) {
            if let Some(patches) = minors.get_mut(&v.minor) {
                patches.remove(&v.patch);
                if patches.is_empty() {
                    minors.remove(&v.minor);
                }
            }
            if minors.is_empty() {
                majors.remove(&v.major);
            }
        }
        if majors.is_empty() {
            self.stacks.remove(stack);
        }
        Ok(())
    }

    /// Get the newest tracked version of `stack` that `current` can move to without a breaking upgrade.
    ///
    /// If nothing newer than `current` shares its effective major, `current` is returned unchanged.
    pub fn latest_compatible(&self, stack: &str, current: &str) -> Result<String, VersionError> {
        let v = parse_version(current)?;

        let Some(majors) = self.stacks.get(stack) else {
            return Ok(current.to_string());
        };
        let Some(minors) = majors.get(&v.major) else {
            return Ok(current.to_string());
        };

        let candidate = if v.major == 0 {
            minors
                .get(&v.minor)
                .and_then(|patches| patches.last())
                .map(|patch| Version::new(0, v.minor, *patch))
        } else {
            minors.iter().next_back().and_then(|(minor, patches)| {
                patches
                    .last()
                    .map(|patch| Version::new(v.major, *minor, *patch))
            })
        };

        match candidate {
            Some(candidate) if candidate > v => Ok(candidate.to_string()),
            _ => Ok(current.to_string()),
        }
    }

    /// Whether `version` of `stack` is tracked.
    pub fn contains(&self, stack: &str, version: &str) -> bool {
        let Ok(v) = parse_version(version) else {
            return false;
        };
        self.stacks
            .get(stack)
            .and_then(|majors| majors.get(&v.major))
            .and_then(|minors| minors.get(&v.minor))
            .is_some_and(|patches| patches.contains(&v.patch))
    }

    /// Get every tracked version of `stack`, in ascending order.
    pub fn export(&self, stack: &str) -> Vec<String> {
        let Some(majors) = self.stacks.get(stack) else {
            return Vec::new();
        };

        majors
            .iter()
            .flat_map(|(major, minors)| {
                minors.iter().flat_map(move |(minor, patches)| {
                    patches
                        .iter()
                        .map(move |patch| format!("{}.{}.{}", major, minor, patch))
                })
            })
            .collect()
    }

    /// Get the names of every stack that has at least one tracked version.
    pub fn stacks(&self) -> impl Iterator<Item = &str> {
        self.stacks.keys().map(|s| s.as_str())
    }
}
