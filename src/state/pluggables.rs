/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Traits for the pluggable, host-provided key-value store.
//!
//! Given methods to get a single value and to scan a prefix, [`KVGet`] also provides methods to read
//! every state variable listed in [`variables`](super::variables).

use std::fmt::Display;

use borsh::BorshDeserialize;

use crate::config::Params;
use crate::types::{chainlet::Chainlet, data_types::ConsumerId, stack::Stack};

use super::variables::{self, concat};

pub trait KVStore: KVGet {
    type WriteBatch: WriteBatch;

    fn write(&mut self, wb: Self::WriteBatch);
}

pub trait WriteBatch {
    fn new() -> Self;
    fn set(&mut self, key: &[u8], value: &[u8]);
    fn delete(&mut self, key: &[u8]);
}

pub trait KVGet {
    fn get(&self, key: &[u8]) -> Option<Vec<u8>>;

    /// Get every key-value pair whose key starts with `prefix`, in ascending key order.
    fn scan_prefix(&self, prefix: &[u8]) -> Vec<(Vec<u8>, Vec<u8>)>;

    /* ↓↓↓ Stacks ↓↓↓ */

    fn stack(&self, display_name: &str) -> Result<Option<Stack>, KVGetError> {
        if let Some(bytes) = self.get(&concat(&variables::STACKS, display_name.as_bytes())) {
            Ok(Some(Stack::deserialize(&mut &*bytes).map_err(|err| {
                KVGetError::DeserializeValueError {
                    key: Key::Stack {
                        display_name: display_name.to_string(),
                    },
                    source: err,
                }
            })?))
        } else {
            Ok(None)
        }
    }

    fn stacks(&self) -> Result<Vec<Stack>, KVGetError> {
        self.scan_prefix(&variables::STACKS)
            .into_iter()
            .map(|(key, bytes)| {
                Stack::deserialize(&mut &*bytes).map_err(|err| KVGetError::DeserializeValueError {
                    key: Key::Stack {
                        display_name: String::from_utf8_lossy(&key[variables::STACKS.len()..])
                            .into_owned(),
                    },
                    source: err,
                })
            })
            .collect()
    }

    /* ↓↓↓ Chainlets ↓↓↓ */

    fn chainlet(&self, chain_id: &str) -> Result<Option<Chainlet>, KVGetError> {
        if let Some(bytes) = self.get(&concat(&variables::CHAINLETS, chain_id.as_bytes())) {
            Ok(Some(Chainlet::deserialize(&mut &*bytes).map_err(|err| {
                KVGetError::DeserializeValueError {
                    key: Key::Chainlet {
                        chain_id: chain_id.to_string(),
                    },
                    source: err,
                }
            })?))
        } else {
            Ok(None)
        }
    }

    fn chainlets(&self) -> Result<Vec<Chainlet>, KVGetError> {
        self.scan_prefix(&variables::CHAINLETS)
            .into_iter()
            .map(|(key, bytes)| {
                Chainlet::deserialize(&mut &*bytes).map_err(|err| {
                    KVGetError::DeserializeValueError {
                        key: Key::Chainlet {
                            chain_id: String::from_utf8_lossy(&key[variables::CHAINLETS.len()..])
                                .into_owned(),
                        },
                        source: err,
                    }
                })
            })
            .collect()
    }

    /* ↓↓↓ Chainlet Count ↓↓↓ */

    fn chainlet_count(&self) -> Result<u64, KVGetError> {
        match self.get(&variables::CHAINLET_COUNT) {
            None => Ok(0),
            Some(bytes) => u64::deserialize(&mut &*bytes).map_err(|err| {
                KVGetError::DeserializeValueError {
                    key: Key::ChainletCount,
                    source: err,
                }
            }),
        }
    }

    /* ↓↓↓ Params ↓↓↓ */

    fn params(&self) -> Result<Params, KVGetError> {
        Params::deserialize(
            &mut &*self
                .get(&variables::PARAMS)
                .ok_or(KVGetError::ValueExpectedButNotFound { key: Key::Params })?,
        )
        .map_err(|err| KVGetError::DeserializeValueError {
            key: Key::Params,
            source: err,
        })
    }

    /* ↓↓↓ Pending Init ↓↓↓ */

    fn pending_init(&self, chain_id: &str) -> Result<Option<ConsumerId>, KVGetError> {
        if let Some(bytes) = self.get(&concat(&variables::PENDING_INIT, chain_id.as_bytes())) {
            Ok(Some(ConsumerId::deserialize(&mut &*bytes).map_err(|err| {
                KVGetError::DeserializeValueError {
                    key: Key::PendingInit {
                        chain_id: chain_id.to_string(),
                    },
                    source: err,
                }
            })?))
        } else {
            Ok(None)
        }
    }

    /// Get every pending-init marker as `(chain_id, consumer_id)` pairs, ordered by chain ID.
    fn pending_inits(&self) -> Result<Vec<(String, ConsumerId)>, KVGetError> {
        self.scan_prefix(&variables::PENDING_INIT)
            .into_iter()
            .map(|(key, bytes)| {
                let chain_id =
                    String::from_utf8_lossy(&key[variables::PENDING_INIT.len()..]).into_owned();
                ConsumerId::deserialize(&mut &*bytes)
                    .map(|consumer_id| (chain_id.clone(), consumer_id))
                    .map_err(|err| KVGetError::DeserializeValueError {
                        key: Key::PendingInit { chain_id },
                        source: err,
                    })
            })
            .collect()
    }
}

/// Error when trying to read a value corresponding to a given key from the [key value store][KVStore].
/// The error may arise in the following circumstances:
/// 1. The value corresponding to a given key cannot be deserialized into its expected type,
/// 2. The value corresponding to a given key cannot be found, even though it is expected to exist.
#[derive(Debug, thiserror::Error)]
pub enum KVGetError {
    #[error("failed to deserialize {key}: {source}")]
    DeserializeValueError { key: Key, source: std::io::Error },
    #[error("{key} expected but not found")]
    ValueExpectedButNotFound { key: Key },
}

/// Error when trying to write a value into the module's state.
#[derive(Debug, thiserror::Error)]
pub enum KVSetError {
    #[error("failed to serialize {key}: {source}")]
    SerializeValueError { key: Key, source: std::io::Error },
}

#[derive(Debug)]
pub enum Key {
    Stack { display_name: String },
    Chainlet { chain_id: String },
    ChainletCount,
    Params,
    PendingInit { chain_id: String },
}

impl Display for Key {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self {
            &Key::Stack { display_name } => write!(f, "Stack {}", display_name),
            &Key::Chainlet { chain_id } => write!(f, "Chainlet {}", chain_id),
            &Key::ChainletCount => write!(f, "Chainlet Count"),
            &Key::Params => write!(f, "Params"),
            &Key::PendingInit { chain_id } => write!(f, "Pending Init for chainlet {}", chain_id),
        }
    }
}
