/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! The error type returned by every fallible operation of the chainlet module.
//!
//! A failed transaction message or packet callback leaves the module's state exactly as it was before
//! the call (see [`Context::atomic`](crate::state::Context::atomic)). [`ChainletError::category`] tells
//! the host how to surface the failure; in particular, [`ErrorCategory::Integrity`] errors mean the
//! module's derived state disagrees with its durable state and block processing should stop.

use crate::collaborators::CollaboratorError;
use crate::state::{KVGetError, KVSetError};
use crate::types::stack::VersionAvailability;
use crate::upgrade::verification::VerificationError;
use crate::version_tree::VersionError;

#[derive(Debug, thiserror::Error)]
pub enum ChainletError {
    #[error("invalid message: {0}")]
    Validation(String),

    #[error(transparent)]
    Version(#[from] VersionError),

    #[error("{0} already exists")]
    AlreadyExists(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("chainlet {chain_id} already has a pending upgrade")]
    UpgradeAlreadyPending { chain_id: String },

    #[error("chainlet {chain_id} has no pending upgrade")]
    NoPendingUpgrade { chain_id: String },

    #[error("version {version} of stack {stack} is not available ({availability:?})")]
    VersionUnavailable {
        stack: String,
        version: String,
        availability: VersionAvailability,
    },

    #[error("cannot launch more than {max} chainlets")]
    MaxChainletsReached { max: u64 },

    #[error("chainlet {chain_id} is not registered as a consumer")]
    ConsumerNotRegistered { chain_id: String },

    #[error("breaking upgrades of chainlet {chain_id} require it to be a consumer chain")]
    BreakingUpgradeRequiresConsumer { chain_id: String },

    #[error("could not bill chainlet {chain_id} with any of its {attempts} fee options")]
    BillingFailed { chain_id: String, attempts: usize },

    #[error(transparent)]
    Verification(#[from] VerificationError),

    #[error("malformed packet: {0}")]
    PacketDecode(String),

    #[error("integrity violation: {0}")]
    Integrity(String),

    #[error("collaborator failed: {0}")]
    Collaborator(#[from] CollaboratorError),

    #[error(transparent)]
    KVGet(#[from] KVGetError),

    #[error(transparent)]
    KVSet(#[from] KVSetError),
}

/// Coarse classification of a [`ChainletError`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorCategory {
    /// The message was malformed. Rejected before any state was read.
    Validation,
    /// The message conflicts with existing state.
    Conflict,
    Authorization,
    /// A packet arrived over a path that does not lead to the chainlet it names.
    Verification,
    NotFound,
    /// Derived state disagrees with durable state. Fatal.
    Integrity,
    Billing,
    /// Storage or collaborator failure.
    Internal,
}

impl ChainletError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            ChainletError::Validation(_)
            | ChainletError::Version(_)
            | ChainletError::PacketDecode(_) => ErrorCategory::Validation,
            ChainletError::AlreadyExists(_)
            | ChainletError::UpgradeAlreadyPending { .. }
            | ChainletError::NoPendingUpgrade { .. }
            | ChainletError::VersionUnavailable { .. }
            | ChainletError::MaxChainletsReached { .. }
            | ChainletError::ConsumerNotRegistered { .. }
            | ChainletError::BreakingUpgradeRequiresConsumer { .. } => ErrorCategory::Conflict,
            ChainletError::Unauthorized(_) => ErrorCategory::Authorization,
            ChainletError::Verification(_) => ErrorCategory::Verification,
            ChainletError::NotFound(_) => ErrorCategory::NotFound,
            ChainletError::Integrity(_) => ErrorCategory::Integrity,
            ChainletError::BillingFailed { .. } => ErrorCategory::Billing,
            ChainletError::Collaborator(_)
            | ChainletError::KVGet(_)
            | ChainletError::KVSet(_) => ErrorCategory::Internal,
        }
    }

    /// Whether block processing must stop.
    pub fn is_fatal(&self) -> bool {
        self.category() == ErrorCategory::Integrity
    }
}
