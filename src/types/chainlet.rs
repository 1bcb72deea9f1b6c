/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Definitions of launched chainlets.

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

use super::data_types::{BlockHeight, ConsumerId, Timestamp};

/// Whether a chainlet's nodes are expected to be producing blocks.
#[derive(Clone, Copy, Debug, PartialEq, Eq, BorshDeserialize, BorshSerialize, Serialize, Deserialize)]
pub enum ChainletStatus {
    Online,
    Offline,
}

/// A breaking upgrade that has been scheduled on a chainlet but not yet confirmed by it.
#[derive(Clone, Debug, PartialEq, Eq, BorshDeserialize, BorshSerialize, Serialize, Deserialize)]
pub struct ChainletUpgrade {
    /// The stack version the chainlet will run after the upgrade.
    pub target_version: String,

    /// The chainlet height at which the chainlet halts and switches binaries.
    pub target_height: BlockHeight,

    /// The channel over which the upgrade was negotiated. Acknowledgements arriving on any other channel
    /// are rejected.
    pub channel_id: String,
}

/// A dynamically launched child chain.
#[derive(Clone, Debug, PartialEq, Eq, BorshDeserialize, BorshSerialize, Serialize, Deserialize)]
pub struct Chainlet {
    pub chain_id: String,
    pub chainlet_name: String,
    pub launcher: String,
    pub maintainers: Vec<String>,
    pub stack_name: String,
    pub stack_version: String,
    pub status: ChainletStatus,
    pub auto_upgrade: bool,
    pub is_ccv_consumer: bool,
    pub consumer_id: Option<ConsumerId>,
    pub spawn_time: Timestamp,
    pub is_service_chainlet: bool,

    /// Set while a breaking upgrade is pending. At most one upgrade is ever pending.
    pub upgrade: Option<ChainletUpgrade>,
}

impl Chainlet {
    pub fn is_maintainer(&self, address: &str) -> bool {
        self.maintainers.iter().any(|m| m == address)
    }

    pub fn is_online(&self) -> bool {
        self.status == ChainletStatus::Online
    }
}
