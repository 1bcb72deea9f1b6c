/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! The cross-chain handshake that schedules, confirms and cancels breaking upgrades of chainlets.
//!
//! - [`messages`]: the packets exchanged with chainlets and their acknowledgements.
//! - [`protocol`]: the handshake as a pure state machine.
//! - [`verification`]: the check that a channel really leads to a given chainlet.
//! - [`engine`]: the handlers that tie the three together with the store and the collaborators.

pub mod engine;

pub mod messages;

pub mod protocol;

pub mod verification;

pub use engine::PacketOutcome;
