/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Governable parameters of the chainlet module.
//!
//! Parameters are persisted in the module's store (see [`variables::PARAMS`](crate::state::variables::PARAMS))
//! so that every validator reads the same values. They are written at genesis and can be read back
//! through the [query](crate::query) surface.
//!
//! The parameters can be defined using the builder pattern, for example:
//!
//! ```
//! # use chainlet_rs::config::Params;
//! let params = Params::builder()
//!     .max_chainlets(1000)
//!     .automatic_chainlet_upgrades(true)
//!     .automatic_chainlet_upgrade_interval(100)
//!     .build();
//! assert_eq!(params.min_upgrade_height_delta, Params::default().min_upgrade_height_delta);
//! ```
//!
//! ## Upgrade heights
//!
//! The target height of a breaking upgrade is the chainlet's latest height known to its light client on
//! the parent chain, plus `min_upgrade_height_delta`, plus the delta the maintainer asked for. The
//! minimum delta exists so that the create-upgrade packet can be relayed before the chainlet reaches the
//! target height.
//!
//! ## Upgrade packet timeouts
//!
//! Create-upgrade and cancel-upgrade packets time out once the chainlet reaches its latest known height
//! plus `upgrade_timeout_height_delta`, or once `upgrade_timeout_secs` elapse, whichever comes first.

use std::time::Duration;

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

#[derive(Clone, Debug, PartialEq, Eq, TypedBuilder, BorshDeserialize, BorshSerialize, Serialize, Deserialize)]
#[builder(builder_method(doc = "
    Create a builder for building [Params]. Every parameter is optional and falls back to the value in
    [`Params::default`].
"))]
pub struct Params {
    #[builder(default = true, setter(doc = "Restrict stack creation and updates to ACL-allowed addresses."))]
    pub chainlet_stack_protections: bool,

    #[builder(default = 1_000, setter(doc = "Set the maximum number of chainlets that may be launched."))]
    pub max_chainlets: u64,

    #[builder(default = true, setter(doc = "Enable the automatic non-breaking upgrade scan."))]
    pub automatic_chainlet_upgrades: bool,

    #[builder(default = 100, setter(doc = "Set the number of blocks between two automatic upgrade scans."))]
    pub automatic_chainlet_upgrade_interval: u64,

    #[builder(default = 100, setter(doc = "Set the minimum number of chainlet blocks between scheduling and performing a breaking upgrade."))]
    pub min_upgrade_height_delta: u64,

    #[builder(default = 1_000, setter(doc = "Set the height delta after which upgrade packets time out."))]
    pub upgrade_timeout_height_delta: u64,

    #[builder(default = 86_400, setter(doc = "Set the number of seconds after which upgrade packets time out."))]
    pub upgrade_timeout_secs: u64,

    #[builder(default = 1_814_400, setter(doc = "Set the unbonding period (in seconds) given to newly registered consumers."))]
    pub consumer_unbonding_period_secs: u64,

    #[builder(default = 1, setter(doc = "Set the number of epoch fees deposited into a chainlet's escrow account at launch."))]
    pub launch_deposit_epochs: u64,
}

impl Params {
    pub fn upgrade_timeout(&self) -> Duration {
        Duration::from_secs(self.upgrade_timeout_secs)
    }

    pub fn consumer_unbonding_period(&self) -> Duration {
        Duration::from_secs(self.consumer_unbonding_period_secs)
    }
}

impl Default for Params {
    fn default() -> Self {
        Params::builder().build()
    }
}
