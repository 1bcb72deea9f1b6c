/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Byte-prefixes that specify where each state variable of the chainlet module is stored in the
//! host-provided key-value store.
//!
//! # State variables
//!
//! |Variable|Type|Description|
//! |---|---|---|
//! |Stacks|`String` -> [`Stack`](crate::types::stack::Stack)|Every stack ever created, keyed by display name, including its disabled versions.|
//! |Chainlets|`String` -> [`Chainlet`](crate::types::chainlet::Chainlet)|Every chainlet ever launched, keyed by chain ID.|
//! |Chainlet Count|`u64`|Number of entries in Chainlets.|
//! |Params|[`Params`](crate::config::Params)|Governable module parameters.|
//! |Pending Init|`String` -> [`ConsumerId`](crate::types::data_types::ConsumerId)|Chainlets registered as consumers whose first validator set has not been force-sent yet.|
//!
//! # Storage of state variables
//!
//! Every variable is stored as **Borsh-serialized values**.
//!
//! "Single values" (Chainlet Count, Params) are stored at one-byte, constant keys defined in constants
//! sharing the variable's name.
//!
//! Mappings of the form "`A` -> `B`" are stored in multiple keys, each key being the concatenation of a
//! one-byte prefix sharing the variable's name and the raw UTF-8 bytes of the `String` key. Because no
//! prefix is a prefix of another, scanning a mapping's prefix yields exactly the entries of that mapping,
//! ordered by key.

pub const STACKS: [u8; 1] = [0];
pub const CHAINLETS: [u8; 1] = [1];
pub const CHAINLET_COUNT: [u8; 1] = [2];
pub const PARAMS: [u8; 1] = [3];
pub const PENDING_INIT: [u8; 1] = [4];

/// Concatenate two byteslices into one vector.
pub fn concat(a: &[u8], b: &[u8]) -> Vec<u8> {
    let mut res = Vec::with_capacity(a.len() + b.len());
    res.extend_from_slice(a);
    res.extend_from_slice(b);
    res
}
