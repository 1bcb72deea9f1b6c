//! Builders for the messages and packets that tests submit.

use chainlet_rs::{
    msgs::{
        Msg, MsgCancelChainletUpgrade, MsgCreateChainletStack, MsgDisableChainletStackVersion,
        MsgLaunchChainlet, MsgUpdateChainletStack, MsgUpgradeChainlet,
    },
    types::{
        data_types::{BlockHeight, Sequence, Timestamp},
        stack::StackFees,
    },
    upgrade::messages::{
        Acknowledgement, ChainletPacketData, ConfirmUpgradePacketData, CreateUpgradePacketAck,
        Packet, PORT,
    },
};

use super::mocks::{SentPacket, STACK_MANAGER};

pub(crate) const MAINTAINER: &str = "maintainer";

/// The channel end on the chainlet side. Its value is never checked by the module.
pub(crate) const COUNTERPARTY_CHANNEL: &str = "channel-0";

pub(crate) fn fees(denom: &str) -> StackFees {
    StackFees {
        denom: denom.to_string(),
        epoch_fee: 10,
        setup_fee: 5,
    }
}

pub(crate) fn create_stack(name: &str, version: &str, ccv_consumer: bool) -> Msg {
    create_stack_with_fees(name, version, ccv_consumer, vec![fees("upc")])
}

pub(crate) fn create_stack_with_fees(
    name: &str,
    version: &str,
    ccv_consumer: bool,
    fees: Vec<StackFees>,
) -> Msg {
    Msg::CreateChainletStack(MsgCreateChainletStack {
        creator: STACK_MANAGER.to_string(),
        display_name: name.to_string(),
        description: format!("The {} stack", name),
        image: image(name, version),
        version: version.to_string(),
        checksum: checksum(name, version),
        fees,
        ccv_consumer,
    })
}

pub(crate) fn update_stack(name: &str, version: &str, ccv_consumer: bool) -> Msg {
    Msg::UpdateChainletStack(MsgUpdateChainletStack {
        creator: STACK_MANAGER.to_string(),
        display_name: name.to_string(),
        image: image(name, version),
        version: version.to_string(),
        checksum: checksum(name, version),
        ccv_consumer,
    })
}

pub(crate) fn disable_version(name: &str, version: &str) -> Msg {
    Msg::DisableChainletStackVersion(MsgDisableChainletStackVersion {
        creator: STACK_MANAGER.to_string(),
        display_name: name.to_string(),
        version: version.to_string(),
    })
}

pub(crate) fn launch_msg(chain_id: &str, stack: &str, version: &str) -> MsgLaunchChainlet {
    MsgLaunchChainlet {
        creator: MAINTAINER.to_string(),
        maintainers: vec![MAINTAINER.to_string()],
        stack_name: stack.to_string(),
        stack_version: version.to_string(),
        chain_id: chain_id.to_string(),
        chainlet_name: format!("{} chainlet", chain_id),
        auto_upgrade: false,
        is_service_chainlet: false,
    }
}

pub(crate) fn launch(chain_id: &str, stack: &str, version: &str) -> Msg {
    Msg::LaunchChainlet(launch_msg(chain_id, stack, version))
}

pub(crate) fn launch_auto_upgrading(chain_id: &str, stack: &str, version: &str) -> Msg {
    Msg::LaunchChainlet(MsgLaunchChainlet {
        auto_upgrade: true,
        ..launch_msg(chain_id, stack, version)
    })
}

pub(crate) fn upgrade(chain_id: &str, version: &str, channel_id: &str) -> Msg {
    Msg::UpgradeChainlet(MsgUpgradeChainlet {
        creator: MAINTAINER.to_string(),
        chain_id: chain_id.to_string(),
        stack_version: version.to_string(),
        height_delta: 100,
        channel_id: channel_id.to_string(),
    })
}

pub(crate) fn cancel_upgrade(chain_id: &str) -> Msg {
    Msg::CancelChainletUpgrade(MsgCancelChainletUpgrade {
        creator: MAINTAINER.to_string(),
        chain_id: chain_id.to_string(),
    })
}

/// A confirm-upgrade packet sent by a chainlet over `channel_id`.
pub(crate) fn confirm_packet(chain_id: &str, height: u64, plan: &str, channel_id: &str) -> Packet {
    let data = ChainletPacketData::ConfirmUpgrade(ConfirmUpgradePacketData {
        chain_id: chain_id.to_string(),
        height,
        plan: plan.to_string(),
    });
    inbound_packet(channel_id, data.to_bytes().unwrap())
}

pub(crate) fn inbound_packet(channel_id: &str, data: Vec<u8>) -> Packet {
    Packet {
        sequence: Sequence::new(1),
        source_port: PORT.to_string(),
        source_channel: COUNTERPARTY_CHANNEL.to_string(),
        destination_port: PORT.to_string(),
        destination_channel: channel_id.to_string(),
        data,
        timeout_height: BlockHeight::new(0),
        timeout_timestamp: Timestamp::from_nanos(0),
    }
}

/// The packet that the transport delivered for `sent`, as it comes back in acknowledgement and timeout
/// callbacks.
pub(crate) fn outbound_packet(sent: &SentPacket) -> Packet {
    Packet {
        sequence: sent.sequence,
        source_port: sent.port.clone(),
        source_channel: sent.channel.clone(),
        destination_port: PORT.to_string(),
        destination_channel: COUNTERPARTY_CHANNEL.to_string(),
        data: sent.data.clone(),
        timeout_height: sent.timeout_height,
        timeout_timestamp: sent.timeout_timestamp,
    }
}

pub(crate) fn success_ack() -> Vec<u8> {
    Acknowledgement::success(&CreateUpgradePacketAck {})
        .unwrap()
        .to_bytes()
        .unwrap()
}

pub(crate) fn error_ack(reason: &str) -> Vec<u8> {
    Acknowledgement::error(reason).to_bytes().unwrap()
}

fn image(name: &str, version: &str) -> String {
    format!("registry/{}:{}", name, version)
}

fn checksum(name: &str, version: &str) -> String {
    format!("sha256:{}-{}", name, version)
}
