/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Handlers that drive the upgrade handshake against the store and the collaborators.
//!
//! Each handler loads the chainlet, [verifies](super::verification) the channel involved before changing
//! anything, asks the [protocol](super::protocol) for the transition, and then applies it.

use std::time::SystemTime;

use crate::chainlet_registry::apply_version;
use crate::collaborators::{DelegatedSecurity, IbcLookup, PacketTransport};
use crate::config::Params;
use crate::consumer;
use crate::error::ChainletError;
use crate::events::{
    CancelUpgradeEvent, CompleteUpgradeEvent, Event, IgnorePacketEvent, RequestCancelUpgradeEvent,
    ScheduleUpgradeEvent,
};
use crate::msgs::{MsgCancelChainletUpgrade, MsgConfirmUpgradeChainlet, MsgUpgradeChainlet};
use crate::state::{Context, KVGet};
use crate::types::{
    chainlet::{Chainlet, ChainletUpgrade},
    data_types::{BlockHeight, CryptoHash, Sequence},
    stack::StackVersion,
};
use crate::version_tree::{check_upgrade, plan_name};

use super::messages::{
    Acknowledgement, CancelUpgradePacketData, ChainletPacketData, CreateUpgradePacketData, Packet,
    PORT,
};
use super::protocol::{self, ProtocolError, Transition, UpgradeState};
use super::verification::{self, VerificationError};

/// What a packet callback did.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PacketOutcome {
    /// The callback was about the chainlet's pending upgrade and has been handled.
    Handled,
    /// The callback was about some other upgrade. Nothing changed.
    Ignored { reason: String },
}

/// Handle a maintainer's request to move a chainlet to another version of its stack.
///
/// Non-breaking upgrades are applied right away. Breaking upgrades send a create-upgrade packet to the
/// chainlet and leave it pending until the chainlet confirms, rejects, or the packet times out.
pub fn request_upgrade<K: KVGet>(
    ctx: &mut Context<K>,
    ibc: &dyn IbcLookup,
    transport: &mut dyn PacketTransport,
    delegated_security: &mut dyn DelegatedSecurity,
    msg: &MsgUpgradeChainlet,
) -> Result<(), ChainletError> {
    let params = ctx.params()?;
    let mut chainlet = load_chainlet(ctx, &msg.chain_id)?;
    require_maintainer(&chainlet, &msg.creator)?;

    let state = UpgradeState::of(&chainlet);
    if state.is_pending() {
        return Err(ChainletError::UpgradeAlreadyPending {
            chain_id: chainlet.chain_id,
        });
    }

    let target = target_version(ctx, &chainlet, &msg.stack_version)?;
    if target.version == chainlet.stack_version {
        return Err(ChainletError::Validation(format!(
            "chainlet {} already runs version {}",
            chainlet.chain_id, target.version
        )));
    }
    let breaking = check_upgrade(&chainlet.stack_version, &target.version)?;

    if breaking && !chainlet.is_ccv_consumer && !target.ccv_consumer {
        return Err(ChainletError::BreakingUpgradeRequiresConsumer {
            chain_id: chainlet.chain_id,
        });
    }
    consumer::register_for_version(ctx, delegated_security, &mut chainlet, &target)?;

    if !breaking {
        return apply_version(ctx, &mut chainlet, &target.version, false);
    }

    let client_id = consumer_client_id(delegated_security, &chainlet)?;
    verification::verify_open_channel(ibc, PORT, &msg.channel_id, &client_id)?;
    let latest_height = ibc
        .client_latest_height(&client_id)
        .ok_or_else(|| VerificationError::ClientHeightUnknown {
            client: client_id.clone(),
        })?;

    let target_height = latest_height + params.min_upgrade_height_delta.saturating_add(msg.height_delta);
    let plan_name = plan_name(&chainlet.stack_version, &target.version)?;
    let upgrade = ChainletUpgrade {
        target_version: target.version.clone(),
        target_height,
        channel_id: msg.channel_id.clone(),
    };
    let next_state = protocol::on_request(&state, upgrade)
        .map_err(|err| protocol_error(err, &chainlet.chain_id))?;

    let data = ChainletPacketData::CreateUpgrade(CreateUpgradePacketData {
        chain_id: chainlet.chain_id.clone(),
        plan_name: plan_name.clone(),
        height: target_height.int(),
        info: target.image.clone(),
    })
    .to_bytes()?;
    let (sequence, commitment) =
        send(ctx, transport, &params, latest_height, &msg.channel_id, data)?;

    chainlet.upgrade = next_state.into_upgrade();
    ctx.set_chainlet(&chainlet)?;

    ctx.emit(Event::ScheduleUpgrade(ScheduleUpgradeEvent {
        timestamp: SystemTime::now(),
        chain_id: chainlet.chain_id,
        plan_name,
        target_version: target.version,
        target_height,
        channel_id: msg.channel_id.clone(),
        sequence,
        commitment,
    }));
    Ok(())
}

/// Handle a maintainer's request to cancel a chainlet's pending upgrade.
///
/// This only sends a cancel-upgrade packet. The upgrade stays pending until the chainlet acknowledges the
/// cancellation.
pub fn cancel_upgrade<K: KVGet>(
    ctx: &mut Context<K>,
    ibc: &dyn IbcLookup,
    transport: &mut dyn PacketTransport,
    delegated_security: &dyn DelegatedSecurity,
    msg: &MsgCancelChainletUpgrade,
) -> Result<(), ChainletError> {
    let params = ctx.params()?;
    let chainlet = load_chainlet(ctx, &msg.chain_id)?;
    require_maintainer(&chainlet, &msg.creator)?;

    let state = UpgradeState::of(&chainlet);
    let upgrade = protocol::on_cancel_request(&state)
        .map_err(|err| protocol_error(err, &chainlet.chain_id))?;

    let client_id = consumer_client_id(delegated_security, &chainlet)?;
    verification::verify_open_channel(ibc, PORT, &upgrade.channel_id, &client_id)?;
    let latest_height = ibc
        .client_latest_height(&client_id)
        .ok_or_else(|| VerificationError::ClientHeightUnknown {
            client: client_id.clone(),
        })?;

    let plan_name = plan_name(&chainlet.stack_version, &upgrade.target_version)?;
    let data = ChainletPacketData::CancelUpgrade(CancelUpgradePacketData {
        chain_id: chainlet.chain_id.clone(),
        plan: plan_name.clone(),
    })
    .to_bytes()?;
    let (sequence, commitment) =
        send(ctx, transport, &params, latest_height, &upgrade.channel_id, data)?;

    ctx.emit(Event::RequestCancelUpgrade(RequestCancelUpgradeEvent {
        timestamp: SystemTime::now(),
        chain_id: chainlet.chain_id.clone(),
        plan_name,
        channel_id: upgrade.channel_id.clone(),
        sequence,
        commitment,
    }));
    Ok(())
}

/// Handle a chainlet's confirmation that it reached the height right before its pending upgrade.
pub fn confirm_upgrade<K: KVGet>(
    ctx: &mut Context<K>,
    ibc: &dyn IbcLookup,
    delegated_security: &dyn DelegatedSecurity,
    msg: &MsgConfirmUpgradeChainlet,
) -> Result<PacketOutcome, ChainletError> {
    let chainlet = load_verified_chainlet(
        ctx,
        ibc,
        delegated_security,
        &msg.chain_id,
        &msg.port_id,
        &msg.channel_id,
    )?;
    let transition = protocol::on_confirm(
        &UpgradeState::of(&chainlet),
        &chainlet.stack_version,
        &msg.plan,
    )
    .map_err(|err| protocol_error(err, &chainlet.chain_id))?;

    apply_transition(ctx, chainlet, transition, &msg.plan, BlockHeight::new(msg.height))
}

/// Decode a packet received on the `chainlet` port into a confirmation and handle it.
pub fn on_recv_packet<K: KVGet>(
    ctx: &mut Context<K>,
    ibc: &dyn IbcLookup,
    delegated_security: &dyn DelegatedSecurity,
    packet: &Packet,
) -> Result<PacketOutcome, ChainletError> {
    match ChainletPacketData::from_bytes(&packet.data)? {
        ChainletPacketData::ConfirmUpgrade(data) => {
            let msg = MsgConfirmUpgradeChainlet {
                chain_id: data.chain_id,
                height: data.height,
                plan: data.plan,
                port_id: packet.destination_port.clone(),
                channel_id: packet.destination_channel.clone(),
            };
            msg.validate_basic()?;
            confirm_upgrade(ctx, ibc, delegated_security, &msg)
        }
        other => Err(ChainletError::PacketDecode(format!(
            "chainlets may only send confirm-upgrade packets, received a packet for {}",
            other.chain_id()
        ))),
    }
}

/// Handle the acknowledgement of a create-upgrade or cancel-upgrade packet sent by this module.
pub fn on_acknowledgement_packet<K: KVGet>(
    ctx: &mut Context<K>,
    ibc: &dyn IbcLookup,
    delegated_security: &dyn DelegatedSecurity,
    packet: &Packet,
    acknowledgement: &[u8],
) -> Result<PacketOutcome, ChainletError> {
    let data = ChainletPacketData::from_bytes(&packet.data)?;
    let success = Acknowledgement::from_bytes(acknowledgement)?.is_success();

    let chainlet = load_verified_chainlet(
        ctx,
        ibc,
        delegated_security,
        data.chain_id(),
        &packet.source_port,
        &packet.source_channel,
    )?;
    let state = UpgradeState::of(&chainlet);

    let (transition, plan) = match &data {
        ChainletPacketData::CreateUpgrade(data) => (
            protocol::on_create_ack(&state, &chainlet.stack_version, &data.plan_name, success),
            &data.plan_name,
        ),
        ChainletPacketData::CancelUpgrade(data) => (
            protocol::on_cancel_ack(&state, &chainlet.stack_version, &data.plan, success),
            &data.plan,
        ),
        ChainletPacketData::ConfirmUpgrade(_) => {
            return Err(ChainletError::PacketDecode(
                "received an acknowledgement for a confirm-upgrade packet".to_string(),
            ))
        }
    };
    let transition = transition.map_err(|err| protocol_error(err, &chainlet.chain_id))?;

    let height = ctx.height();
    apply_transition(ctx, chainlet, transition, plan, height)
}

/// Handle the timeout of a create-upgrade or cancel-upgrade packet sent by this module.
pub fn on_timeout_packet<K: KVGet>(
    ctx: &mut Context<K>,
    ibc: &dyn IbcLookup,
    delegated_security: &dyn DelegatedSecurity,
    packet: &Packet,
) -> Result<PacketOutcome, ChainletError> {
    let data = ChainletPacketData::from_bytes(&packet.data)?;

    let chainlet = load_verified_chainlet(
        ctx,
        ibc,
        delegated_security,
        data.chain_id(),
        &packet.source_port,
        &packet.source_channel,
    )?;
    let state = UpgradeState::of(&chainlet);

    let (transition, plan) = match &data {
        ChainletPacketData::CreateUpgrade(data) => (
            protocol::on_create_timeout(&state, &chainlet.stack_version, &data.plan_name),
            &data.plan_name,
        ),
        ChainletPacketData::CancelUpgrade(data) => (
            protocol::on_cancel_timeout(&state, &chainlet.stack_version, &data.plan),
            &data.plan,
        ),
        ChainletPacketData::ConfirmUpgrade(_) => {
            return Err(ChainletError::PacketDecode(
                "received a timeout for a confirm-upgrade packet".to_string(),
            ))
        }
    };
    let transition = transition.map_err(|err| protocol_error(err, &chainlet.chain_id))?;

    let height = ctx.height();
    apply_transition(ctx, chainlet, transition, plan, height)
}

fn apply_transition<K: KVGet>(
    ctx: &mut Context<K>,
    mut chainlet: Chainlet,
    transition: Transition,
    plan: &str,
    height: BlockHeight,
) -> Result<PacketOutcome, ChainletError> {
    match transition {
        Transition::Stay => Ok(PacketOutcome::Handled),
        Transition::Ignore { reason } => {
            log::debug!("Ignoring packet for chainlet {}: {}", chainlet.chain_id, reason);
            ctx.emit(Event::IgnorePacket(IgnorePacketEvent {
                timestamp: SystemTime::now(),
                chain_id: chainlet.chain_id,
                plan_name: plan.to_string(),
                reason: reason.clone(),
            }));
            Ok(PacketOutcome::Ignored { reason })
        }
        Transition::Cancel { upgrade, reason } => {
            chainlet.upgrade = None;
            ctx.set_chainlet(&chainlet)?;
            ctx.emit(Event::CancelUpgrade(CancelUpgradeEvent {
                timestamp: SystemTime::now(),
                chain_id: chainlet.chain_id,
                target_version: upgrade.target_version,
                reason,
            }));
            Ok(PacketOutcome::Handled)
        }
        Transition::Complete(upgrade) => {
            chainlet.stack_version = upgrade.target_version;
            chainlet.upgrade = None;
            ctx.set_chainlet(&chainlet)?;
            ctx.emit(Event::CompleteUpgrade(CompleteUpgradeEvent {
                timestamp: SystemTime::now(),
                chain_id: chainlet.chain_id,
                version: chainlet.stack_version,
                height,
            }));
            Ok(PacketOutcome::Handled)
        }
    }
}

fn load_chainlet<K: KVGet>(ctx: &Context<K>, chain_id: &str) -> Result<Chainlet, ChainletError> {
    ctx.chainlet(chain_id)?
        .ok_or_else(|| ChainletError::NotFound(format!("chainlet {}", chain_id)))
}

/// Load `chain_id` and check that `port_id`/`channel_id` leads to it. If an upgrade is pending, the
/// channel must also be the one it was negotiated over.
fn load_verified_chainlet<K: KVGet>(
    ctx: &Context<K>,
    ibc: &dyn IbcLookup,
    delegated_security: &dyn DelegatedSecurity,
    chain_id: &str,
    port_id: &str,
    channel_id: &str,
) -> Result<Chainlet, ChainletError> {
    let chainlet = load_chainlet(ctx, chain_id)?;
    let client_id = consumer_client_id(delegated_security, &chainlet)?;

    verification::verify_channel(ibc, port_id, channel_id, &client_id)?;
    if let Some(upgrade) = &chainlet.upgrade {
        verification::verify_recorded_channel(&upgrade.channel_id, channel_id)?;
    }
    Ok(chainlet)
}

fn require_maintainer(chainlet: &Chainlet, address: &str) -> Result<(), ChainletError> {
    if !chainlet.is_maintainer(address) {
        return Err(ChainletError::Unauthorized(format!(
            "{} is not a maintainer of chainlet {}",
            address, chainlet.chain_id
        )));
    }
    Ok(())
}

fn target_version<K: KVGet>(
    ctx: &Context<K>,
    chainlet: &Chainlet,
    version: &str,
) -> Result<StackVersion, ChainletError> {
    let stack = ctx
        .stack(&chainlet.stack_name)?
        .ok_or_else(|| ChainletError::NotFound(format!("stack {}", chainlet.stack_name)))?;
    let availability = stack.availability(version);
    match stack.version(version) {
        Some(target) if availability.is_enabled() => Ok(target.clone()),
        _ => Err(ChainletError::VersionUnavailable {
            stack: chainlet.stack_name.clone(),
            version: version.to_string(),
            availability,
        }),
    }
}

fn consumer_client_id(
    delegated_security: &dyn DelegatedSecurity,
    chainlet: &Chainlet,
) -> Result<String, ChainletError> {
    chainlet
        .consumer_id
        .as_ref()
        .and_then(|consumer_id| delegated_security.consumer_client_id(consumer_id))
        .ok_or_else(|| ChainletError::ConsumerNotRegistered {
            chain_id: chainlet.chain_id.clone(),
        })
}

fn send<K: KVGet>(
    ctx: &Context<K>,
    transport: &mut dyn PacketTransport,
    params: &Params,
    latest_height: BlockHeight,
    channel_id: &str,
    data: Vec<u8>,
) -> Result<(Sequence, CryptoHash), ChainletError> {
    let commitment = CryptoHash::commitment(&data);
    let sequence = transport.send_packet(
        PORT,
        channel_id,
        latest_height + params.upgrade_timeout_height_delta,
        ctx.time() + params.upgrade_timeout(),
        data,
    )?;
    Ok((sequence, commitment))
}

fn protocol_error(err: ProtocolError, chain_id: &str) -> ChainletError {
    match err {
        ProtocolError::AlreadyPending => ChainletError::UpgradeAlreadyPending {
            chain_id: chain_id.to_string(),
        },
        ProtocolError::NotPending => ChainletError::NoPendingUpgrade {
            chain_id: chain_id.to_string(),
        },
        ProtocolError::Version(err) => ChainletError::Version(err),
    }
}
