/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! The durable catalog of deployable stacks and their versions.
//!
//! Every function here that enables or disables a version also updates the context's [`VersionTree`] in
//! the same execution, after the write to the store has been made.
//!
//! [`VersionTree`]: crate::version_tree::VersionTree

use std::time::SystemTime;

use crate::collaborators::Acl;
use crate::error::ChainletError;
use crate::events::{AddStackVersionEvent, CreateStackEvent, DisableStackVersionEvent, Event};
use crate::msgs::{MsgCreateChainletStack, MsgDisableChainletStackVersion, MsgUpdateChainletStack};
use crate::state::{Context, KVGet, KVGetError};
use crate::types::stack::{Stack, StackVersion, VersionAvailability};
use crate::version_tree::{semantics::parse_version, VersionTreeCache};

pub fn create_stack<K: KVGet>(
    ctx: &mut Context<K>,
    version_tree: &VersionTreeCache,
    acl: &dyn Acl,
    msg: &MsgCreateChainletStack,
) -> Result<(), ChainletError> {
    authorize(ctx, acl, &msg.creator)?;

    if ctx.stack(&msg.display_name)?.is_some() {
        return Err(ChainletError::AlreadyExists(format!(
            "stack {}",
            msg.display_name
        )));
    }
    parse_version(&msg.version)?;

    let stack = Stack {
        display_name: msg.display_name.clone(),
        description: msg.description.clone(),
        fees: msg.fees.clone(),
        versions: vec![StackVersion {
            image: msg.image.clone(),
            version: msg.version.clone(),
            checksum: msg.checksum.clone(),
            enabled: true,
            ccv_consumer: msg.ccv_consumer,
        }],
    };
    ctx.set_stack(&stack)?;
    ctx.version_tree_mut(version_tree)?
        .add(&stack.display_name, &msg.version)?;

    ctx.emit(Event::CreateStack(CreateStackEvent {
        timestamp: SystemTime::now(),
        display_name: stack.display_name.clone(),
        creator: msg.creator.clone(),
    }));
    ctx.emit(Event::AddStackVersion(AddStackVersionEvent {
        timestamp: SystemTime::now(),
        stack: stack.display_name,
        version: msg.version.clone(),
        ccv_consumer: msg.ccv_consumer,
    }));
    Ok(())
}

pub fn add_version<K: KVGet>(
    ctx: &mut Context<K>,
    version_tree: &VersionTreeCache,
    acl: &dyn Acl,
    msg: &MsgUpdateChainletStack,
) -> Result<(), ChainletError> {
    authorize(ctx, acl, &msg.creator)?;

    let mut stack = ctx
        .stack(&msg.display_name)?
        .ok_or_else(|| ChainletError::NotFound(format!("stack {}", msg.display_name)))?;
    parse_version(&msg.version)?;

    let version = StackVersion {
        image: msg.image.clone(),
        version: msg.version.clone(),
        checksum: msg.checksum.clone(),
        enabled: true,
        ccv_consumer: msg.ccv_consumer,
    };
    if let Some(existing) = stack.colliding_version(&version) {
        return Err(ChainletError::AlreadyExists(format!(
            "version colliding with {} of stack {}",
            existing.version, stack.display_name
        )));
    }

    stack.versions.push(version);
    ctx.set_stack(&stack)?;
    ctx.version_tree_mut(version_tree)?
        .add(&stack.display_name, &msg.version)?;

    ctx.emit(Event::AddStackVersion(AddStackVersionEvent {
        timestamp: SystemTime::now(),
        stack: stack.display_name,
        version: msg.version.clone(),
        ccv_consumer: msg.ccv_consumer,
    }));
    Ok(())
}

/// Disable a version. The record stays in the registry. Disabling a version that is already disabled
/// does nothing.
pub fn disable_version<K: KVGet>(
    ctx: &mut Context<K>,
    version_tree: &VersionTreeCache,
    acl: &dyn Acl,
    msg: &MsgDisableChainletStackVersion,
) -> Result<(), ChainletError> {
    authorize(ctx, acl, &msg.creator)?;

    let mut stack = ctx
        .stack(&msg.display_name)?
        .ok_or_else(|| ChainletError::NotFound(format!("stack {}", msg.display_name)))?;
    let version = stack.version_mut(&msg.version).ok_or_else(|| {
        ChainletError::NotFound(format!(
            "version {} of stack {}",
            msg.version, msg.display_name
        ))
    })?;
    if !version.enabled {
        return Ok(());
    }
    version.enabled = false;

    ctx.set_stack(&stack)?;
    ctx.version_tree_mut(version_tree)?
        .remove(&stack.display_name, &msg.version)?;

    ctx.emit(Event::DisableStackVersion(DisableStackVersionEvent {
        timestamp: SystemTime::now(),
        stack: stack.display_name,
        version: msg.version.clone(),
    }));
    Ok(())
}

/// Get whether `version` of the stack named `stack` can be launched or upgraded to.
pub fn version_available<K: KVGet>(
    store: &K,
    stack: &str,
    version: &str,
) -> Result<VersionAvailability, KVGetError> {
    Ok(store
        .stack(stack)?
        .map(|stack| stack.availability(version))
        .unwrap_or(VersionAvailability::NotFound))
}

/// While stack protections are on, only ACL-allowed addresses and admins may change the registry.
fn authorize<K: KVGet>(
    ctx: &Context<K>,
    acl: &dyn Acl,
    creator: &str,
) -> Result<(), ChainletError> {
    if ctx.params()?.chainlet_stack_protections && !(acl.allowed(creator) || acl.is_admin(creator)) {
        return Err(ChainletError::Unauthorized(format!(
            "{} may not manage stacks",
            creator
        )));
    }
    Ok(())
}
