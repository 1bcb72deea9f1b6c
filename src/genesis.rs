/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Initial state of the chainlet module, and export of its current state in the same shape.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::config::Params;
use crate::error::ChainletError;
use crate::state::{Context, KVGet};
use crate::types::{chain_id::is_valid_chain_id, chainlet::Chainlet, stack::Stack};
use crate::version_tree::semantics::parse_version;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenesisState {
    pub params: Params,
    pub stacks: Vec<Stack>,
    pub chainlets: Vec<Chainlet>,
}

impl GenesisState {
    /// Check that the state is internally consistent: names are unique, versions parse, no two versions
    /// of a stack collide, and every chainlet runs an existing version of an existing stack.
    pub fn validate(&self) -> Result<(), ChainletError> {
        let mut stack_names = BTreeSet::new();
        for stack in &self.stacks {
            if !stack_names.insert(stack.display_name.as_str()) {
                return Err(ChainletError::Validation(format!(
                    "duplicate stack {}",
                    stack.display_name
                )));
            }
            for (i, version) in stack.versions.iter().enumerate() {
                parse_version(&version.version)?;
                if stack.versions[..i].iter().any(|v| v.collides_with(version)) {
                    return Err(ChainletError::Validation(format!(
                        "version {} of stack {} collides with an earlier version",
                        version.version, stack.display_name
                    )));
                }
            }
        }

        if self.chainlets.len() as u64 > self.params.max_chainlets {
            return Err(ChainletError::Validation(format!(
                "{} chainlets exceed the maximum of {}",
                self.chainlets.len(),
                self.params.max_chainlets
            )));
        }

        let mut chain_ids = BTreeSet::new();
        for chainlet in &self.chainlets {
            if !is_valid_chain_id(&chainlet.chain_id) {
                return Err(ChainletError::Validation(format!(
                    "invalid chain id {:?}",
                    chainlet.chain_id
                )));
            }
            if !chain_ids.insert(chainlet.chain_id.as_str()) {
                return Err(ChainletError::Validation(format!(
                    "duplicate chainlet {}",
                    chainlet.chain_id
                )));
            }
            let runs_known_version = self
                .stacks
                .iter()
                .find(|stack| stack.display_name == chainlet.stack_name)
                .and_then(|stack| stack.version(&chainlet.stack_version))
                .is_some();
            if !runs_known_version {
                return Err(ChainletError::Validation(format!(
                    "chainlet {} runs unknown version {} of stack {}",
                    chainlet.chain_id, chainlet.stack_version, chainlet.stack_name
                )));
            }
        }
        Ok(())
    }
}

/// Validate `genesis` and write it into `ctx`. The context's version tree is dropped so that its next use
/// rebuilds it from the written stacks.
pub fn init_genesis<K: KVGet>(
    ctx: &mut Context<K>,
    genesis: &GenesisState,
) -> Result<(), ChainletError> {
    genesis.validate()?;

    ctx.set_params(&genesis.params)?;
    for stack in &genesis.stacks {
        ctx.set_stack(stack)?;
    }
    for chainlet in &genesis.chainlets {
        ctx.set_chainlet(chainlet)?;
    }
    ctx.set_chainlet_count(genesis.chainlets.len() as u64)?;

    ctx.discard_version_tree();
    log::info!(
        "Initialized chainlet module with {} stacks and {} chainlets",
        genesis.stacks.len(),
        genesis.chainlets.len()
    );
    Ok(())
}

pub fn export_genesis<K: KVGet>(store: &K) -> Result<GenesisState, ChainletError> {
    Ok(GenesisState {
        params: store.params()?,
        stacks: store.stacks()?,
        chainlets: store.chainlets()?,
    })
}
