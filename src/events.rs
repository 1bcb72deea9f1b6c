/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Definitions of the events emitted by the chainlet module.
//!
//! An event indicates that the action it names has been completed *and committed to the execution's
//! context*. Events are buffered in the [`Context`](crate::state::Context) while an execution runs and
//! are discarded together with its writes if the execution fails. When the host commits the context
//! through [`Controller::commit`](crate::controller::Controller::commit), its events are published to the
//! host's event channel and, if enabled, [logged](crate::logging).

use std::sync::mpsc::Sender;
use std::time::SystemTime;

use crate::types::data_types::{BlockHeight, ConsumerId, CryptoHash, Sequence};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Event {
    // Stack registry events.
    CreateStack(CreateStackEvent),
    AddStackVersion(AddStackVersionEvent),
    DisableStackVersion(DisableStackVersionEvent),
    // Chainlet registry events.
    LaunchChainlet(LaunchChainletEvent),
    StopChainlet(StopChainletEvent),
    StartChainlet(StartChainletEvent),
    UpgradeChainlet(UpgradeChainletEvent),
    // Upgrade handshake events.
    ScheduleUpgrade(ScheduleUpgradeEvent),
    CompleteUpgrade(CompleteUpgradeEvent),
    CancelUpgrade(CancelUpgradeEvent),
    RequestCancelUpgrade(RequestCancelUpgradeEvent),
    IgnorePacket(IgnorePacketEvent),
    // Consumer events.
    RegisterConsumer(RegisterConsumerEvent),
    InitConsumer(InitConsumerEvent),
}

impl Event {
    pub(crate) fn publish(event_publisher: &Option<Sender<Event>>, event: Event) {
        if let Some(event_publisher) = event_publisher {
            if event_publisher.send(event).is_err() {
                log::debug!("Event subscriber disconnected, dropping event");
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CreateStackEvent {
    pub timestamp: SystemTime,
    pub display_name: String,
    pub creator: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AddStackVersionEvent {
    pub timestamp: SystemTime,
    pub stack: String,
    pub version: String,
    pub ccv_consumer: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DisableStackVersionEvent {
    pub timestamp: SystemTime,
    pub stack: String,
    pub version: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LaunchChainletEvent {
    pub timestamp: SystemTime,
    pub chain_id: String,
    pub stack: String,
    pub version: String,
    pub launcher: String,
    /// Denomination of the fee option that paid for the launch. `None` for service chainlets.
    pub fee_denom: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StopChainletEvent {
    pub timestamp: SystemTime,
    pub chain_id: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StartChainletEvent {
    pub timestamp: SystemTime,
    pub chain_id: String,
}

/// A non-breaking upgrade was applied, either at a maintainer's request or by the automatic upgrade
/// scan.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UpgradeChainletEvent {
    pub timestamp: SystemTime,
    pub chain_id: String,
    pub from_version: String,
    pub to_version: String,
    pub automatic: bool,
}

/// A create-upgrade packet was sent and the chainlet's upgrade is now pending.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScheduleUpgradeEvent {
    pub timestamp: SystemTime,
    pub chain_id: String,
    pub plan_name: String,
    pub target_version: String,
    pub target_height: BlockHeight,
    pub channel_id: String,
    pub sequence: Sequence,
    pub commitment: CryptoHash,
}

/// The chainlet confirmed a pending upgrade and now runs the target version.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompleteUpgradeEvent {
    pub timestamp: SystemTime,
    pub chain_id: String,
    pub version: String,
    pub height: BlockHeight,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CancelReason {
    /// The chainlet rejected the create-upgrade packet.
    Rejected,
    /// The create-upgrade packet timed out.
    TimedOut,
    /// The chainlet acknowledged a cancel-upgrade packet.
    Cancelled,
}

/// A pending upgrade was dropped without being applied.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CancelUpgradeEvent {
    pub timestamp: SystemTime,
    pub chain_id: String,
    pub target_version: String,
    pub reason: CancelReason,
}

/// A cancel-upgrade packet was sent. The upgrade stays pending until the chainlet acknowledges it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RequestCancelUpgradeEvent {
    pub timestamp: SystemTime,
    pub chain_id: String,
    pub plan_name: String,
    pub channel_id: String,
    pub sequence: Sequence,
    pub commitment: CryptoHash,
}

/// A verified packet callback was ignored because the plan it carries does not match the chainlet's
/// pending upgrade.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IgnorePacketEvent {
    pub timestamp: SystemTime,
    pub chain_id: String,
    pub plan_name: String,
    pub reason: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RegisterConsumerEvent {
    pub timestamp: SystemTime,
    pub chain_id: String,
    pub consumer_id: ConsumerId,
}

/// The first validator set packets of a newly registered consumer were sent.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InitConsumerEvent {
    pub timestamp: SystemTime,
    pub chain_id: String,
    pub consumer_id: ConsumerId,
    pub channel_id: String,
}
