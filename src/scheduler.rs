/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Work done at the beginning of every block.
//!
//! In order:
//! 1. Every `automatic_chainlet_upgrade_interval` blocks, move every chainlet that opted into automatic
//!    upgrades to the latest version of its stack that it can run without a breaking upgrade.
//! 2. Flush the first validator set packets of newly registered consumers
//!    ([`init_consumers`](crate::consumer::init_consumers)).
//! 3. Run the host's housekeeping hook, if any.
//!
//! ## Automatic upgrades
//!
//! The scan first takes a snapshot of all chainlets and decides every chainlet's target, then applies the
//! targets one by one. Chainlets with a pending breaking upgrade are skipped. A chainlet moving to a
//! consumer-mode version is registered as a consumer first, as on a manual upgrade. A failure to apply one
//! target is logged and does not stop the others, except when the version tree names a version the
//! stack registry does not have enabled: that means the tree is out of sync with the registry, and the
//! scan fails with [`ChainletError::Integrity`].

use crate::chainlet_registry::apply_version;
use crate::collaborators::{DelegatedSecurity, Housekeeping};
use crate::consumer;
use crate::error::ChainletError;
use crate::state::{Context, KVGet};
use crate::types::chainlet::Chainlet;
use crate::version_tree::VersionTreeCache;

pub fn begin_block<K: KVGet>(
    ctx: &mut Context<K>,
    version_tree: &VersionTreeCache,
    delegated_security: &mut dyn DelegatedSecurity,
    housekeeping: Option<&mut (dyn Housekeeping + 'static)>,
) -> Result<(), ChainletError> {
    let params = ctx.params()?;
    if params.automatic_chainlet_upgrades
        && ctx
            .height()
            .is_multiple_of(params.automatic_chainlet_upgrade_interval)
    {
        auto_upgrade(ctx, version_tree, delegated_security)?;
    }

    consumer::init_consumers(ctx, delegated_security)?;

    if let Some(housekeeping) = housekeeping {
        housekeeping.on_begin_block(ctx.height(), ctx.time())?;
    }
    Ok(())
}

/// Apply every available non-breaking upgrade. Returns the number of chainlets upgraded.
pub fn auto_upgrade<K: KVGet>(
    ctx: &mut Context<K>,
    version_tree: &VersionTreeCache,
    delegated_security: &mut dyn DelegatedSecurity,
) -> Result<usize, ChainletError> {
    let mut planned: Vec<(Chainlet, String)> = Vec::new();
    {
        let chainlets = ctx.chainlets()?;
        let tree = ctx.version_tree(version_tree)?;
        for chainlet in chainlets {
            if !chainlet.auto_upgrade || chainlet.upgrade.is_some() {
                continue;
            }
            match tree.latest_compatible(&chainlet.stack_name, &chainlet.stack_version) {
                Ok(latest) if latest != chainlet.stack_version => planned.push((chainlet, latest)),
                Ok(_) => (),
                Err(err) => log::warn!(
                    "Skipping automatic upgrade of chainlet {}: {}",
                    chainlet.chain_id,
                    err
                ),
            }
        }
    }

    let mut upgraded = 0;
    for (mut chainlet, target) in planned {
        let target_version = ctx
            .stack(&chainlet.stack_name)?
            .and_then(|stack| stack.version(&target).filter(|v| v.enabled).cloned());
        let Some(target_version) = target_version else {
            return Err(ChainletError::Integrity(format!(
                "version tree names version {} of stack {}, which the stack registry does not have enabled",
                target, chainlet.stack_name
            )));
        };

        let result = ctx.atomic(|ctx| {
            consumer::register_for_version(
                ctx,
                &mut *delegated_security,
                &mut chainlet,
                &target_version,
            )?;
            apply_version(ctx, &mut chainlet, &target, true)
        });
        match result {
            Ok(()) => upgraded += 1,
            Err(err) => log::warn!(
                "Failed to automatically upgrade chainlet {} to {}: {}",
                chainlet.chain_id,
                target,
                err
            ),
        }
    }
    Ok(upgraded)
}
