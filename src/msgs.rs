/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Transaction messages handled by the [`Controller`](crate::controller::Controller).
//!
//! Every message has a `validate_basic` method that checks what can be checked without reading state.
//! The controller calls it before anything else, so a message that fails it never touches the store.
//! Whether the signer is who the message says it is (`creator`) is the host's concern.

use std::collections::BTreeSet;

use crate::error::ChainletError;
use crate::types::{chain_id::is_valid_chain_id, stack::StackFees};
use crate::version_tree::semantics::parse_version;

/// Create a stack together with its first version.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MsgCreateChainletStack {
    pub creator: String,
    pub display_name: String,
    pub description: String,
    pub image: String,
    pub version: String,
    pub checksum: String,
    pub fees: Vec<StackFees>,
    pub ccv_consumer: bool,
}

/// Add a version to an existing stack.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MsgUpdateChainletStack {
    pub creator: String,
    pub display_name: String,
    pub image: String,
    pub version: String,
    pub checksum: String,
    pub ccv_consumer: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MsgDisableChainletStackVersion {
    pub creator: String,
    pub display_name: String,
    pub version: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MsgLaunchChainlet {
    pub creator: String,
    pub maintainers: Vec<String>,
    pub stack_name: String,
    pub stack_version: String,
    pub chain_id: String,
    pub chainlet_name: String,
    pub auto_upgrade: bool,
    /// Service chainlets are fee-exempt and can only be launched by admins.
    pub is_service_chainlet: bool,
}

/// Move a chainlet to another version of its stack. Breaking upgrades are negotiated with the chainlet
/// over `channel_id`; non-breaking ones are applied immediately and `channel_id` is ignored.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MsgUpgradeChainlet {
    pub creator: String,
    pub chain_id: String,
    pub stack_version: String,
    /// Blocks to wait on top of the minimum upgrade height delta.
    pub height_delta: u64,
    pub channel_id: String,
}

/// Cancel a chainlet's pending breaking upgrade. The cancel packet is sent over the channel the upgrade
/// was negotiated over.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MsgCancelChainletUpgrade {
    pub creator: String,
    pub chain_id: String,
}

/// Built from a confirm-upgrade packet received from a chainlet. Never submitted as a transaction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MsgConfirmUpgradeChainlet {
    pub chain_id: String,
    pub height: u64,
    pub plan: String,
    pub port_id: String,
    pub channel_id: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Msg {
    CreateChainletStack(MsgCreateChainletStack),
    UpdateChainletStack(MsgUpdateChainletStack),
    DisableChainletStackVersion(MsgDisableChainletStackVersion),
    LaunchChainlet(MsgLaunchChainlet),
    UpgradeChainlet(MsgUpgradeChainlet),
    CancelChainletUpgrade(MsgCancelChainletUpgrade),
}

impl Msg {
    pub fn validate_basic(&self) -> Result<(), ChainletError> {
        match self {
            Msg::CreateChainletStack(msg) => msg.validate_basic(),
            Msg::UpdateChainletStack(msg) => msg.validate_basic(),
            Msg::DisableChainletStackVersion(msg) => msg.validate_basic(),
            Msg::LaunchChainlet(msg) => msg.validate_basic(),
            Msg::UpgradeChainlet(msg) => msg.validate_basic(),
            Msg::CancelChainletUpgrade(msg) => msg.validate_basic(),
        }
    }
}

impl MsgCreateChainletStack {
    pub fn validate_basic(&self) -> Result<(), ChainletError> {
        require_non_empty("creator", &self.creator)?;
        require_non_empty("display name", &self.display_name)?;
        require_non_empty("image", &self.image)?;
        require_non_empty("checksum", &self.checksum)?;
        parse_version(&self.version)?;
        validate_fees(&self.fees)
    }
}

impl MsgUpdateChainletStack {
    pub fn validate_basic(&self) -> Result<(), ChainletError> {
        require_non_empty("creator", &self.creator)?;
        require_non_empty("display name", &self.display_name)?;
        require_non_empty("image", &self.image)?;
        require_non_empty("checksum", &self.checksum)?;
        parse_version(&self.version)?;
        Ok(())
    }
}

impl MsgDisableChainletStackVersion {
    pub fn validate_basic(&self) -> Result<(), ChainletError> {
        require_non_empty("creator", &self.creator)?;
        require_non_empty("display name", &self.display_name)?;
        parse_version(&self.version)?;
        Ok(())
    }
}

impl MsgLaunchChainlet {
    pub fn validate_basic(&self) -> Result<(), ChainletError> {
        require_non_empty("creator", &self.creator)?;
        require_non_empty("stack name", &self.stack_name)?;
        require_non_empty("chainlet name", &self.chainlet_name)?;
        parse_version(&self.stack_version)?;
        require_chain_id(&self.chain_id)?;

        if self.maintainers.is_empty() {
            return Err(ChainletError::Validation(
                "at least one maintainer is required".to_string(),
            ));
        }
        let mut seen = BTreeSet::new();
        for maintainer in &self.maintainers {
            require_non_empty("maintainer", maintainer)?;
            if !seen.insert(maintainer.as_str()) {
                return Err(ChainletError::Validation(format!(
                    "duplicate maintainer {}",
                    maintainer
                )));
            }
        }
        Ok(())
    }
}

impl MsgUpgradeChainlet {
    pub fn validate_basic(&self) -> Result<(), ChainletError> {
        require_non_empty("creator", &self.creator)?;
        require_chain_id(&self.chain_id)?;
        parse_version(&self.stack_version)?;
        Ok(())
    }
}

impl MsgCancelChainletUpgrade {
    pub fn validate_basic(&self) -> Result<(), ChainletError> {
        require_non_empty("creator", &self.creator)?;
        require_chain_id(&self.chain_id)
    }
}

impl MsgConfirmUpgradeChainlet {
    pub fn validate_basic(&self) -> Result<(), ChainletError> {
        require_chain_id(&self.chain_id)?;
        require_non_empty("channel", &self.channel_id)
    }
}

fn require_non_empty(field: &str, value: &str) -> Result<(), ChainletError> {
    if value.trim().is_empty() {
        return Err(ChainletError::Validation(format!("{} must not be empty", field)));
    }
    Ok(())
}

fn require_chain_id(chain_id: &str) -> Result<(), ChainletError> {
    if !is_valid_chain_id(chain_id) {
        return Err(ChainletError::Validation(format!(
            "invalid chain id {:?}",
            chain_id
        )));
    }
    Ok(())
}

fn validate_fees(fees: &[StackFees]) -> Result<(), ChainletError> {
    if fees.is_empty() {
        return Err(ChainletError::Validation(
            "at least one fee option is required".to_string(),
        ));
    }
    let mut denoms = BTreeSet::new();
    for fee in fees {
        require_non_empty("fee denomination", &fee.denom)?;
        if !denoms.insert(fee.denom.as_str()) {
            return Err(ChainletError::Validation(format!(
                "duplicate fee denomination {}",
                fee.denom
            )));
        }
    }
    Ok(())
}
