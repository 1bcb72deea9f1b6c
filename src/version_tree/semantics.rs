/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Semantic-version compatibility rules.
//!
//! # Effective major
//!
//! Two versions can be switched between without a breaking upgrade iff they share the same
//! [`EffectiveMajor`]. The effective major of a version is its `major` component, except for `0.x`
//! versions, whose effective major is their `minor` component: before 1.0, every minor release may
//! break compatibility.
//!
//! A breaking upgrade must move to the *next* effective major: `1.x -> 2.y`, `0.3.x -> 0.4.y`, or
//! `0.x.y -> 1.z` (graduating out of the pre-1.0 series). Anything else, including skipping an
//! effective major and moving to an older one, is rejected.
//!
//! # Plan names
//!
//! Upgrade packets carry a plan name that encodes the old and new effective majors, e.g. `"0.3-to-0.4"`
//! or `"1-to-2"`. Acknowledgements are matched against the plan name implied by a chainlet's current
//! and pending versions, so the full version strings never have to be stored alongside the packet.

use std::fmt::{self, Display, Formatter};

use semver::Version;

/// Parse a semantic version string, e.g. `"1.2.3"` or `"0.4.0-rc.1"`.
pub fn parse_version(version: &str) -> Result<Version, VersionError> {
    Version::parse(version).map_err(|err| VersionError::InvalidVersion {
        version: version.to_string(),
        reason: err.to_string(),
    })
}

/// Whether `version` carries a pre-release or build suffix. Such versions are never considered for
/// automatic upgrades.
pub fn has_suffix(version: &Version) -> bool {
    !version.pre.is_empty() || !version.build.is_empty()
}

/// The component of a version that delimits breaking changes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EffectiveMajor {
    /// A `0.minor.x` version.
    Zero { minor: u64 },
    /// A `major.x.y` version with `major > 0`.
    Major(u64),
}

impl EffectiveMajor {
    pub fn of(version: &Version) -> Self {
        if version.major == 0 {
            EffectiveMajor::Zero {
                minor: version.minor,
            }
        } else {
            EffectiveMajor::Major(version.major)
        }
    }

    /// Whether `self` is the effective major directly after `previous`.
    pub fn follows(&self, previous: &EffectiveMajor) -> bool {
        match (previous, self) {
            (EffectiveMajor::Zero { minor: prev }, EffectiveMajor::Zero { minor: next }) => {
                prev.checked_add(1) == Some(*next)
            }
            (EffectiveMajor::Zero { .. }, EffectiveMajor::Major(next)) => *next == 1,
            (EffectiveMajor::Major(prev), EffectiveMajor::Major(next)) => {
                prev.checked_add(1) == Some(*next)
            }
            (EffectiveMajor::Major(_), EffectiveMajor::Zero { .. }) => false,
        }
    }
}

impl Display for EffectiveMajor {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            EffectiveMajor::Zero { minor } => write!(f, "0.{}", minor),
            EffectiveMajor::Major(major) => write!(f, "{}", major),
        }
    }
}

/// Decide whether moving from `old` to `new` is a breaking upgrade.
///
/// Returns `Ok(false)` if both versions share the same effective major, `Ok(true)` if `new`'s effective
/// major directly follows `old`'s, and an error otherwise.
pub fn check_upgrade(old: &str, new: &str) -> Result<bool, VersionError> {
    let old_major = EffectiveMajor::of(&parse_version(old)?);
    let new_major = EffectiveMajor::of(&parse_version(new)?);

    if new_major == old_major {
        Ok(false)
    } else if new_major.follows(&old_major) {
        Ok(true)
    } else {
        Err(VersionError::UnsupportedUpgrade {
            from: old.to_string(),
            to: new.to_string(),
        })
    }
}

/// Get the plan name of an upgrade from `old` to `new`.
pub fn plan_name(old: &str, new: &str) -> Result<String, VersionError> {
    let old_major = EffectiveMajor::of(&parse_version(old)?);
    let new_major = EffectiveMajor::of(&parse_version(new)?);
    Ok(format!("{}-to-{}", old_major, new_major))
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VersionError {
    #[error("invalid semantic version {version:?}: {reason}")]
    InvalidVersion { version: String, reason: String },

    #[error("cannot upgrade from {from} to {to}: major upgrades must move to the next major version")]
    UnsupportedUpgrade { from: String, to: String },
}
