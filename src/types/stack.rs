/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Definitions of the deployable software stacks that chainlets run.

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

use super::data_types::Coin;

/// One fee option of a [`Stack`].
///
/// A stack may expose multiple fee options, each in a different denomination. Launching a chainlet
/// succeeds if any one of them can be charged.
#[derive(Clone, Debug, PartialEq, Eq, BorshDeserialize, BorshSerialize, Serialize, Deserialize)]
pub struct StackFees {
    pub denom: String,
    pub epoch_fee: u128,
    pub setup_fee: u128,
}

impl StackFees {
    pub fn epoch_fee(&self) -> Coin {
        Coin::new(self.denom.clone(), self.epoch_fee)
    }

    pub fn setup_fee(&self) -> Coin {
        Coin::new(self.denom.clone(), self.setup_fee)
    }
}

/// A deployable version of a stack.
#[derive(Clone, Debug, PartialEq, Eq, BorshDeserialize, BorshSerialize, Serialize, Deserialize)]
pub struct StackVersion {
    /// Container image the chainlet's nodes run.
    pub image: String,

    /// Semantic version string, e.g. `"1.2.3"`.
    pub version: String,

    /// Checksum of the image.
    pub checksum: String,

    /// Disabled versions are kept for auditing but cannot be launched or upgraded to.
    pub enabled: bool,

    /// Whether chainlets running this version consume the parent chain's validator set.
    pub ccv_consumer: bool,
}

impl StackVersion {
    /// Whether any identifying field of `self` is equal to the same field of `other`.
    pub fn collides_with(&self, other: &StackVersion) -> bool {
        self.image == other.image || self.version == other.version || self.checksum == other.checksum
    }
}

/// A named, versioned deployable software image. Keyed by its globally unique `display_name`.
#[derive(Clone, Debug, PartialEq, Eq, BorshDeserialize, BorshSerialize, Serialize, Deserialize)]
pub struct Stack {
    pub display_name: String,
    pub description: String,
    pub fees: Vec<StackFees>,
    pub versions: Vec<StackVersion>,
}

impl Stack {
    /// Get the version whose version string is `version`.
    pub fn version(&self, version: &str) -> Option<&StackVersion> {
        self.versions.iter().find(|v| v.version == version)
    }

    pub(crate) fn version_mut(&mut self, version: &str) -> Option<&mut StackVersion> {
        self.versions.iter_mut().find(|v| v.version == version)
    }

    /// Find an existing version whose image, version string, or checksum equals that of `candidate`.
    pub fn colliding_version(&self, candidate: &StackVersion) -> Option<&StackVersion> {
        self.versions.iter().find(|v| v.collides_with(candidate))
    }

    /// Whether `version` can be launched or upgraded to.
    pub fn availability(&self, version: &str) -> VersionAvailability {
        match self.version(version) {
            Some(v) if v.enabled => VersionAvailability::Enabled,
            Some(_) => VersionAvailability::Disabled,
            None => VersionAvailability::NotFound,
        }
    }

    /// Iterate through the versions of this stack that are currently enabled.
    pub fn enabled_versions(&self) -> impl Iterator<Item = &StackVersion> {
        self.versions.iter().filter(|v| v.enabled)
    }
}

/// Result of looking a stack version up in the stack registry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VersionAvailability {
    Enabled,
    Disabled,
    NotFound,
}

impl VersionAvailability {
    pub fn is_enabled(&self) -> bool {
        matches!(self, VersionAvailability::Enabled)
    }
}
