/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Traits for the subsystems of the parent chain that the chainlet module consumes but does not own.
//!
//! The host provides one implementation of each trait when it builds the
//! [`Controller`](crate::controller::Controller). Implementations must be *deterministic*: every
//! validator must observe the same results for the same calls at the same height.
//!
//! |Trait|Subsystem|
//! |---|---|
//! |[`Billing`]|Charges fees for chainlets.|
//! |[`Escrow`]|Holds the deposits that fund a chainlet's epochs.|
//! |[`Acl`]|Decides who is an admin and who may manage stacks.|
//! |[`DelegatedSecurity`]|Delegates the parent's validator set to consumer chains.|
//! |[`IbcLookup`]|Read-only view of channels, connections and light clients.|
//! |[`PacketTransport`]|Sends packets over channels.|
//! |[`Housekeeping`]|Unrelated per-block work scheduled alongside the chainlet module's own.|

use std::time::Duration;

use crate::types::{
    chainlet::Chainlet,
    data_types::{BlockHeight, Coin, ConsumerId, Sequence, Timestamp},
};

/// Error returned by a collaborator. The chainlet module never inspects it beyond logging and
/// propagating it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct CollaboratorError(pub String);

impl CollaboratorError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self(reason.into())
    }
}

pub trait Billing {
    /// Charge `amount` for `chainlet`.
    fn bill_account(
        &mut self,
        amount: &Coin,
        chainlet: &Chainlet,
        memo: &str,
    ) -> Result<(), CollaboratorError>;
}

pub trait Escrow {
    /// Open the escrow account of `chain_id`, funded by `payer` with `deposit`.
    fn new_chainlet_account(
        &mut self,
        payer: &str,
        chain_id: &str,
        deposit: &Coin,
    ) -> Result<(), CollaboratorError>;
}

pub trait Acl {
    fn is_admin(&self, address: &str) -> bool;

    /// Whether `address` may create and update stacks while stack protections are on.
    fn allowed(&self, address: &str) -> bool;
}

/// Lifecycle phase of a consumer in the delegated-security subsystem.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConsumerPhase {
    Registered,
    Initialized,
    Launched,
    Stopped,
    Deleted,
}

/// A change to a validator's power, as carried in a [`ValidatorSetChangePacket`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidatorUpdate {
    pub pub_key: Vec<u8>,
    pub power: u64,
}

/// A validator-set-change ("VSC") packet queued for delivery to a consumer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidatorSetChangePacket {
    pub valset_update_id: u64,
    pub validator_updates: Vec<ValidatorUpdate>,
}

impl ValidatorSetChangePacket {
    /// A packet that changes nothing. Used to hand a freshly registered consumer the current validator
    /// set as soon as its channel opens.
    pub fn empty(valset_update_id: u64) -> Self {
        Self {
            valset_update_id,
            validator_updates: Vec::new(),
        }
    }
}

pub trait DelegatedSecurity {
    /// Create the consumer record of `chain_id` and return its ID.
    fn create_consumer(
        &mut self,
        chain_id: &str,
        spawn_time: Timestamp,
        unbonding_period: Duration,
    ) -> Result<ConsumerId, CollaboratorError>;

    /// The ID that the next validator set update will carry.
    fn validator_set_update_id(&self) -> u64;

    fn increment_validator_set_update_id(&mut self);

    /// Queue `packet` for delivery to `consumer_id`.
    fn append_pending_vsc_packet(&mut self, consumer_id: &ConsumerId, packet: ValidatorSetChangePacket);

    /// The ID of the light client that tracks the consumer chain, once one exists.
    fn consumer_client_id(&self, consumer_id: &ConsumerId) -> Option<String>;

    /// The channel over which validator set updates flow to the consumer, once it is established.
    fn consumer_channel(&self, consumer_id: &ConsumerId) -> Option<String>;

    fn consumer_phase(&self, consumer_id: &ConsumerId) -> ConsumerPhase;

    /// Send every queued VSC packet to the consumer right away, instead of at the next epoch boundary.
    fn send_vsc_packets(
        &mut self,
        consumer_id: &ConsumerId,
        channel_id: &str,
    ) -> Result<(), CollaboratorError>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChannelState {
    Init,
    TryOpen,
    Open,
    Closed,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChannelEnd {
    pub state: ChannelState,
    pub connection_hops: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConnectionEnd {
    pub client_id: String,
}

pub trait IbcLookup {
    fn channel(&self, port_id: &str, channel_id: &str) -> Option<ChannelEnd>;

    fn connection(&self, connection_id: &str) -> Option<ConnectionEnd>;

    /// The latest height of the counterparty chain known to `client_id`.
    fn client_latest_height(&self, client_id: &str) -> Option<BlockHeight>;
}

pub trait PacketTransport {
    /// Send `data` over `source_channel`. The transport enforces both timeouts.
    fn send_packet(
        &mut self,
        source_port: &str,
        source_channel: &str,
        timeout_height: BlockHeight,
        timeout_timestamp: Timestamp,
        data: Vec<u8>,
    ) -> Result<Sequence, CollaboratorError>;
}

pub trait Housekeeping {
    fn on_begin_block(&mut self, height: BlockHeight, time: Timestamp)
        -> Result<(), CollaboratorError>;
}
