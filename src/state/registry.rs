/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Typed setters for the state variables listed in [`variables`](super::variables).
//!
//! Reads go through the default methods of [`KVGet`], which [`Context`] implements.

use borsh::BorshSerialize;

use crate::config::Params;
use crate::types::{chainlet::Chainlet, data_types::ConsumerId, stack::Stack};

use super::context::Context;
use super::pluggables::{KVGet, KVSetError, Key};
use super::variables::{self, concat};

impl<K: KVGet> Context<'_, K> {
    /* ↓↓↓ Stacks ↓↓↓ */

    pub fn set_stack(&mut self, stack: &Stack) -> Result<(), KVSetError> {
        let value = stack
            .try_to_vec()
            .map_err(|err| KVSetError::SerializeValueError {
                key: Key::Stack {
                    display_name: stack.display_name.clone(),
                },
                source: err,
            })?;
        self.set(
            concat(&variables::STACKS, stack.display_name.as_bytes()),
            value,
        );
        Ok(())
    }

    /* ↓↓↓ Chainlets ↓↓↓ */

    pub fn set_chainlet(&mut self, chainlet: &Chainlet) -> Result<(), KVSetError> {
        let value = chainlet
            .try_to_vec()
            .map_err(|err| KVSetError::SerializeValueError {
                key: Key::Chainlet {
                    chain_id: chainlet.chain_id.clone(),
                },
                source: err,
            })?;
        self.set(
            concat(&variables::CHAINLETS, chainlet.chain_id.as_bytes()),
            value,
        );
        Ok(())
    }

    /* ↓↓↓ Chainlet Count ↓↓↓ */

    pub fn set_chainlet_count(&mut self, count: u64) -> Result<(), KVSetError> {
        let value = count
            .try_to_vec()
            .map_err(|err| KVSetError::SerializeValueError {
                key: Key::ChainletCount,
                source: err,
            })?;
        self.set(variables::CHAINLET_COUNT.to_vec(), value);
        Ok(())
    }

    /* ↓↓↓ Params ↓↓↓ */

    pub fn set_params(&mut self, params: &Params) -> Result<(), KVSetError> {
        let value = params
            .try_to_vec()
            .map_err(|err| KVSetError::SerializeValueError {
                key: Key::Params,
                source: err,
            })?;
        self.set(variables::PARAMS.to_vec(), value);
        Ok(())
    }

    /* ↓↓↓ Pending Init ↓↓↓ */

    pub fn set_pending_init(
        &mut self,
        chain_id: &str,
        consumer_id: &ConsumerId,
    ) -> Result<(), KVSetError> {
        let value = consumer_id
            .try_to_vec()
            .map_err(|err| KVSetError::SerializeValueError {
                key: Key::PendingInit {
                    chain_id: chain_id.to_string(),
                },
                source: err,
            })?;
        self.set(concat(&variables::PENDING_INIT, chain_id.as_bytes()), value);
        Ok(())
    }

    pub fn delete_pending_init(&mut self, chain_id: &str) {
        self.delete(concat(&variables::PENDING_INIT, chain_id.as_bytes()))
    }
}
