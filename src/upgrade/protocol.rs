/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! The upgrade handshake as a pure state machine.
//!
//! Each chainlet is either [`Stable`](UpgradeState::Stable) or
//! [`Pending`](UpgradeState::Pending) a breaking upgrade. The state is persisted as the chainlet's
//! `upgrade` field, so a request and its eventual acknowledgement, timeout, or confirmation may be handled
//! by different processes many blocks apart.
//!
//! ```text
//!            on_request                on_confirm
//!   Stable ─────────────► Pending ─────────────────► Stable (target applied)
//!                           │
//!                           │ on_create_ack(error), on_create_timeout, on_cancel_ack(success)
//!                           └──────────────────────► Stable (target dropped)
//! ```
//!
//! The functions in this module take the current state and the contents of one callback and return a
//! [`Transition`]. They do not read or write the store, and they assume the callback's channel has
//! already been [verified](super::verification).
//!
//! ## Plan matching
//!
//! Callbacks carry the plan name of the upgrade they refer to. A callback whose plan differs from the
//! plan implied by the chainlet's current version and its pending target, or that arrives while nothing is
//! pending, refers to some other (stale or foreign) upgrade and is [ignored](Transition::Ignore).

use crate::events::CancelReason;
use crate::types::chainlet::{Chainlet, ChainletUpgrade};
use crate::version_tree::{plan_name, VersionError};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UpgradeState {
    Stable,
    Pending(ChainletUpgrade),
}

impl UpgradeState {
    pub fn of(chainlet: &Chainlet) -> Self {
        match &chainlet.upgrade {
            Some(upgrade) => UpgradeState::Pending(upgrade.clone()),
            None => UpgradeState::Stable,
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, UpgradeState::Pending(_))
    }

    /// Convert into the value of a chainlet's `upgrade` field.
    pub fn into_upgrade(self) -> Option<ChainletUpgrade> {
        match self {
            UpgradeState::Stable => None,
            UpgradeState::Pending(upgrade) => Some(upgrade),
        }
    }
}

/// What a callback does to a chainlet.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Transition {
    /// Leave the chainlet as it is.
    Stay,
    /// The callback is not about the pending upgrade. Leave the chainlet as it is.
    Ignore { reason: String },
    /// Drop the pending upgrade without applying it.
    Cancel {
        upgrade: ChainletUpgrade,
        reason: CancelReason,
    },
    /// Switch the chainlet to the pending upgrade's target version.
    Complete(ChainletUpgrade),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolError {
    #[error("an upgrade is already pending")]
    AlreadyPending,

    #[error("no upgrade is pending")]
    NotPending,

    #[error(transparent)]
    Version(#[from] VersionError),
}

/// A maintainer asked for a breaking upgrade to `target`.
pub fn on_request(
    state: &UpgradeState,
    target: ChainletUpgrade,
) -> Result<UpgradeState, ProtocolError> {
    match state {
        UpgradeState::Stable => Ok(UpgradeState::Pending(target)),
        UpgradeState::Pending(_) => Err(ProtocolError::AlreadyPending),
    }
}

/// A maintainer asked to cancel the pending upgrade. Returns the upgrade that the cancel packet must
/// refer to. The state does not change until the chainlet acknowledges the cancellation.
pub fn on_cancel_request(state: &UpgradeState) -> Result<&ChainletUpgrade, ProtocolError> {
    match state {
        UpgradeState::Stable => Err(ProtocolError::NotPending),
        UpgradeState::Pending(upgrade) => Ok(upgrade),
    }
}

/// The chainlet acknowledged a create-upgrade packet. Success keeps the upgrade pending: only the
/// chainlet's confirmation completes it.
pub fn on_create_ack(
    state: &UpgradeState,
    current_version: &str,
    plan: &str,
    success: bool,
) -> Result<Transition, ProtocolError> {
    let upgrade = match matching_upgrade(state, current_version, plan)? {
        Ok(upgrade) => upgrade,
        Err(ignore) => return Ok(ignore),
    };
    if success {
        Ok(Transition::Stay)
    } else {
        Ok(Transition::Cancel {
            upgrade: upgrade.clone(),
            reason: CancelReason::Rejected,
        })
    }
}

/// A create-upgrade packet timed out. The chainlet never learnt about the upgrade.
pub fn on_create_timeout(
    state: &UpgradeState,
    current_version: &str,
    plan: &str,
) -> Result<Transition, ProtocolError> {
    match matching_upgrade(state, current_version, plan)? {
        Ok(upgrade) => Ok(Transition::Cancel {
            upgrade: upgrade.clone(),
            reason: CancelReason::TimedOut,
        }),
        Err(ignore) => Ok(ignore),
    }
}

/// The chainlet confirmed that it reached the height right before its upgrade.
///
/// An empty `plan` is accepted for any pending upgrade; a non-empty one must match.
pub fn on_confirm(
    state: &UpgradeState,
    current_version: &str,
    plan: &str,
) -> Result<Transition, ProtocolError> {
    let UpgradeState::Pending(upgrade) = state else {
        return Err(ProtocolError::NotPending);
    };
    if !plan.is_empty() {
        let expected = plan_name(current_version, &upgrade.target_version)?;
        if plan != expected {
            return Ok(Transition::Ignore {
                reason: format!("confirmation for plan {}, pending plan is {}", plan, expected),
            });
        }
    }
    Ok(Transition::Complete(upgrade.clone()))
}

/// The chainlet acknowledged a cancel-upgrade packet. A failed cancellation leaves the original upgrade
/// scheduled.
pub fn on_cancel_ack(
    state: &UpgradeState,
    current_version: &str,
    plan: &str,
    success: bool,
) -> Result<Transition, ProtocolError> {
    let upgrade = match matching_upgrade(state, current_version, plan)? {
        Ok(upgrade) => upgrade,
        Err(ignore) => return Ok(ignore),
    };
    if success {
        Ok(Transition::Cancel {
            upgrade: upgrade.clone(),
            reason: CancelReason::Cancelled,
        })
    } else {
        Ok(Transition::Stay)
    }
}

/// A cancel-upgrade packet timed out. The original upgrade stays scheduled.
pub fn on_cancel_timeout(
    state: &UpgradeState,
    current_version: &str,
    plan: &str,
) -> Result<Transition, ProtocolError> {
    match matching_upgrade(state, current_version, plan)? {
        Ok(_) => Ok(Transition::Stay),
        Err(ignore) => Ok(ignore),
    }
}

/// Get the pending upgrade if `plan` refers to it, or the [`Transition::Ignore`] to return otherwise.
fn matching_upgrade<'s>(
    state: &'s UpgradeState,
    current_version: &str,
    plan: &str,
) -> Result<Result<&'s ChainletUpgrade, Transition>, ProtocolError> {
    let UpgradeState::Pending(upgrade) = state else {
        return Ok(Err(Transition::Ignore {
            reason: format!("no upgrade pending for plan {}", plan),
        }));
    };
    let expected = plan_name(current_version, &upgrade.target_version)?;
    if plan == expected {
        Ok(Ok(upgrade))
    } else {
        Ok(Err(Transition::Ignore {
            reason: format!("packet for plan {}, pending plan is {}", plan, expected),
        }))
    }
}
