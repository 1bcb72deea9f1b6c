/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! The durable catalog of launched chainlets.
//!
//! ## Launch fees
//!
//! Unless an admin launches a service chainlet, a launch must be paid for with one of the stack's fee
//! options. Options are tried in the order the stack lists them. For each option, the launcher funds the
//! chainlet's escrow account with `epoch_fee * launch_deposit_epochs` and is then billed the option's
//! setup fee. The first option for which both succeed pays for the launch; if none does, the launch
//! fails and no chainlet is written.

use std::time::SystemTime;

use crate::collaborators::{Acl, Billing, DelegatedSecurity, Escrow};
use crate::config::Params;
use crate::consumer;
use crate::error::ChainletError;
use crate::events::{
    Event, LaunchChainletEvent, StartChainletEvent, StopChainletEvent, UpgradeChainletEvent,
};
use crate::msgs::MsgLaunchChainlet;
use crate::state::{Context, KVGet};
use crate::types::{
    chain_id::is_self_service_chain_id,
    chainlet::{Chainlet, ChainletStatus},
    stack::Stack,
};

/// The memo attached to setup fee bills.
pub const SETUP_FEE_MEMO: &str = "setup fee";

/// Launch a chainlet.
pub fn launch<K: KVGet>(
    ctx: &mut Context<K>,
    acl: &dyn Acl,
    billing: &mut dyn Billing,
    escrow: &mut dyn Escrow,
    delegated_security: &mut dyn DelegatedSecurity,
    msg: &MsgLaunchChainlet,
) -> Result<(), ChainletError> {
    let params = ctx.params()?;
    let is_admin = acl.is_admin(&msg.creator);

    if msg.is_service_chainlet && !is_admin {
        return Err(ChainletError::Unauthorized(
            "only admins may launch service chainlets".to_string(),
        ));
    }
    if !is_admin && !is_self_service_chain_id(&msg.chain_id) {
        return Err(ChainletError::Validation(format!(
            "chain id {} is not in the self-service format <name>_<number>-<revision>",
            msg.chain_id
        )));
    }

    let count = ctx.chainlet_count()?;
    if count >= params.max_chainlets {
        return Err(ChainletError::MaxChainletsReached {
            max: params.max_chainlets,
        });
    }
    if ctx.chainlet(&msg.chain_id)?.is_some() {
        return Err(ChainletError::AlreadyExists(format!(
            "chainlet {}",
            msg.chain_id
        )));
    }

    let stack = ctx
        .stack(&msg.stack_name)?
        .ok_or_else(|| ChainletError::NotFound(format!("stack {}", msg.stack_name)))?;
    let availability = stack.availability(&msg.stack_version);
    let version = match stack.version(&msg.stack_version) {
        Some(version) if availability.is_enabled() => version,
        _ => {
            return Err(ChainletError::VersionUnavailable {
                stack: msg.stack_name.clone(),
                version: msg.stack_version.clone(),
                availability,
            })
        }
    };

    let mut chainlet = Chainlet {
        chain_id: msg.chain_id.clone(),
        chainlet_name: msg.chainlet_name.clone(),
        launcher: msg.creator.clone(),
        maintainers: msg.maintainers.clone(),
        stack_name: msg.stack_name.clone(),
        stack_version: msg.stack_version.clone(),
        status: ChainletStatus::Online,
        auto_upgrade: msg.auto_upgrade,
        is_ccv_consumer: version.ccv_consumer,
        consumer_id: None,
        spawn_time: ctx.time(),
        is_service_chainlet: msg.is_service_chainlet,
        upgrade: None,
    };

    let fee_denom = if msg.is_service_chainlet {
        None
    } else {
        Some(charge_launch_fees(billing, escrow, &params, &stack, &chainlet)?)
    };

    if chainlet.is_ccv_consumer {
        let consumer_id = consumer::register(
            ctx,
            delegated_security,
            &chainlet.chain_id,
            chainlet.spawn_time,
            params.consumer_unbonding_period(),
        )?;
        chainlet.consumer_id = Some(consumer_id);
    }

    ctx.set_chainlet(&chainlet)?;
    ctx.set_chainlet_count(count + 1)?;

    ctx.emit(Event::LaunchChainlet(LaunchChainletEvent {
        timestamp: SystemTime::now(),
        chain_id: chainlet.chain_id,
        stack: chainlet.stack_name,
        version: chainlet.stack_version,
        launcher: chainlet.launcher,
        fee_denom,
    }));
    Ok(())
}

/// Set the status of `chain_id`. Returns whether the status changed.
pub fn set_status<K: KVGet>(
    ctx: &mut Context<K>,
    chain_id: &str,
    status: ChainletStatus,
) -> Result<bool, ChainletError> {
    let mut chainlet = ctx
        .chainlet(chain_id)?
        .ok_or_else(|| ChainletError::NotFound(format!("chainlet {}", chain_id)))?;
    if chainlet.status == status {
        return Ok(false);
    }

    chainlet.status = status;
    ctx.set_chainlet(&chainlet)?;

    let timestamp = SystemTime::now();
    let chain_id = chainlet.chain_id;
    ctx.emit(match status {
        ChainletStatus::Online => Event::StartChainlet(StartChainletEvent { timestamp, chain_id }),
        ChainletStatus::Offline => Event::StopChainlet(StopChainletEvent { timestamp, chain_id }),
    });
    Ok(true)
}

/// Switch `chainlet` to `version` without a handshake and write it back.
pub(crate) fn apply_version<K: KVGet>(
    ctx: &mut Context<K>,
    chainlet: &mut Chainlet,
    version: &str,
    automatic: bool,
) -> Result<(), ChainletError> {
    let from_version = std::mem::replace(&mut chainlet.stack_version, version.to_string());
    ctx.set_chainlet(chainlet)?;

    ctx.emit(Event::UpgradeChainlet(UpgradeChainletEvent {
        timestamp: SystemTime::now(),
        chain_id: chainlet.chain_id.clone(),
        from_version,
        to_version: version.to_string(),
        automatic,
    }));
    Ok(())
}

/// Try the fee options of `stack` in order. Returns the denomination of the option that paid.
fn charge_launch_fees(
    billing: &mut dyn Billing,
    escrow: &mut dyn Escrow,
    params: &Params,
    stack: &Stack,
    chainlet: &Chainlet,
) -> Result<String, ChainletError> {
    for fees in &stack.fees {
        let Some(deposit) = fees.epoch_fee().checked_mul(params.launch_deposit_epochs) else {
            log::warn!(
                "Launch deposit in {} for chainlet {} overflows, skipping fee option",
                fees.denom,
                chainlet.chain_id
            );
            continue;
        };

        let charged = escrow
            .new_chainlet_account(&chainlet.launcher, &chainlet.chain_id, &deposit)
            .and_then(|()| billing.bill_account(&fees.setup_fee(), chainlet, SETUP_FEE_MEMO));
        match charged {
            Ok(()) => return Ok(fees.denom.clone()),
            Err(err) => log::debug!(
                "Fee option {} failed for chainlet {}: {}",
                fees.denom,
                chainlet.chain_id,
                err
            ),
        }
    }

    Err(ChainletError::BillingFailed {
        chain_id: chainlet.chain_id.clone(),
        attempts: stack.fees.len(),
    })
}
