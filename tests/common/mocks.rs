//! Mock implementations of the collaborator traits.
//!
//! Every trait is implemented on [`MockParent`], a cheaply cloneable handle to one shared
//! [`ParentState`]. Tests hand clones of the same `MockParent` to the controller builder and keep one
//! to inspect and manipulate the mock subsystems.

use std::{
    collections::{BTreeMap, BTreeSet},
    sync::{Arc, Mutex, MutexGuard},
    time::Duration,
};

use chainlet_rs::{
    collaborators::{
        Acl, Billing, ChannelEnd, ChannelState, CollaboratorError, ConnectionEnd, ConsumerPhase,
        DelegatedSecurity, Escrow, Housekeeping, IbcLookup, PacketTransport,
        ValidatorSetChangePacket,
    },
    types::{
        chainlet::Chainlet,
        data_types::{BlockHeight, Coin, ConsumerId, Sequence, Timestamp},
    },
    upgrade::messages::PORT,
};

pub(crate) const ADMIN: &str = "admin";
pub(crate) const STACK_MANAGER: &str = "stack-manager";

pub(crate) struct MockConsumer {
    pub(crate) chain_id: String,
    pub(crate) phase: ConsumerPhase,
    pub(crate) client_id: Option<String>,
    pub(crate) channel: Option<String>,
    pub(crate) pending_vsc_packets: Vec<ValidatorSetChangePacket>,
    pub(crate) sent_vsc_packets: Vec<ValidatorSetChangePacket>,
}

pub(crate) struct SentPacket {
    pub(crate) port: String,
    pub(crate) channel: String,
    pub(crate) timeout_height: BlockHeight,
    pub(crate) timeout_timestamp: Timestamp,
    pub(crate) data: Vec<u8>,
    pub(crate) sequence: Sequence,
}

#[derive(Default)]
pub(crate) struct ParentState {
    // Acl
    pub(crate) admins: BTreeSet<String>,
    pub(crate) allowed: BTreeSet<String>,

    // Billing and escrow
    pub(crate) broke_denoms: BTreeSet<String>,
    pub(crate) bills: Vec<(Coin, String, String)>,
    pub(crate) escrow_accounts: Vec<(String, String, Coin)>,

    // Delegated security
    pub(crate) consumers: BTreeMap<ConsumerId, MockConsumer>,
    pub(crate) next_consumer: u64,
    pub(crate) valset_update_id: u64,
    pub(crate) vsc_send_fails: bool,

    // IBC
    pub(crate) channels: BTreeMap<(String, String), ChannelEnd>,
    pub(crate) connections: BTreeMap<String, ConnectionEnd>,
    pub(crate) client_heights: BTreeMap<String, BlockHeight>,

    // Transport
    pub(crate) sent_packets: Vec<SentPacket>,
    pub(crate) next_sequence: u64,
    pub(crate) transport_down: bool,

    // Housekeeping
    pub(crate) housekeeping_heights: Vec<BlockHeight>,
}

#[derive(Clone, Default)]
pub(crate) struct MockParent(Arc<Mutex<ParentState>>);

impl MockParent {
    pub(crate) fn new() -> MockParent {
        let parent = MockParent::default();
        {
            let mut state = parent.state();
            state.admins.insert(ADMIN.to_string());
            state.allowed.insert(STACK_MANAGER.to_string());
            state.next_sequence = 1;
        }
        parent
    }

    pub(crate) fn state(&self) -> MutexGuard<'_, ParentState> {
        self.0.lock().unwrap()
    }

    /// The ID of the light client that the next registered consumer will get.
    pub(crate) fn next_client_id(&self) -> String {
        client_id_for(self.state().next_consumer)
    }

    /// Open a channel on the `chainlet` port whose single connection leads to `client_id`.
    pub(crate) fn open_channel(&self, channel_id: &str, connection_id: &str, client_id: &str) {
        let mut state = self.state();
        state.channels.insert(
            (PORT.to_string(), channel_id.to_string()),
            ChannelEnd {
                state: ChannelState::Open,
                connection_hops: vec![connection_id.to_string()],
            },
        );
        state.connections.insert(
            connection_id.to_string(),
            ConnectionEnd {
                client_id: client_id.to_string(),
            },
        );
    }

    pub(crate) fn set_channel_state(&self, channel_id: &str, channel_state: ChannelState) {
        if let Some(channel) = self
            .state()
            .channels
            .get_mut(&(PORT.to_string(), channel_id.to_string()))
        {
            channel.state = channel_state;
        }
    }

    pub(crate) fn set_client_height(&self, client_id: &str, height: u64) {
        self.state()
            .client_heights
            .insert(client_id.to_string(), BlockHeight::new(height));
    }

    /// Move a consumer to the launched phase and give it a validator set channel.
    pub(crate) fn launch_consumer(&self, consumer_id: &ConsumerId, vsc_channel: &str) {
        let mut state = self.state();
        let consumer = state.consumers.get_mut(consumer_id).unwrap();
        consumer.phase = ConsumerPhase::Launched;
        consumer.channel = Some(vsc_channel.to_string());
    }

    pub(crate) fn take_sent_packets(&self) -> Vec<SentPacket> {
        std::mem::take(&mut self.state().sent_packets)
    }
}

fn client_id_for(consumer: u64) -> String {
    format!("07-tendermint-{}", consumer)
}

impl Acl for MockParent {
    fn is_admin(&self, address: &str) -> bool {
        self.state().admins.contains(address)
    }

    fn allowed(&self, address: &str) -> bool {
        self.state().allowed.contains(address)
    }
}

impl Billing for MockParent {
    fn bill_account(
        &mut self,
        amount: &Coin,
        chainlet: &Chainlet,
        memo: &str,
    ) -> Result<(), CollaboratorError> {
        let mut state = self.state();
        if state.broke_denoms.contains(&amount.denom) {
            return Err(CollaboratorError::new(format!(
                "insufficient {} balance",
                amount.denom
            )));
        }
        state
            .bills
            .push((amount.clone(), chainlet.chain_id.clone(), memo.to_string()));
        Ok(())
    }
}

impl Escrow for MockParent {
    fn new_chainlet_account(
        &mut self,
        payer: &str,
        chain_id: &str,
        deposit: &Coin,
    ) -> Result<(), CollaboratorError> {
        let mut state = self.state();
        if state.broke_denoms.contains(&deposit.denom) {
            return Err(CollaboratorError::new(format!(
                "insufficient {} balance",
                deposit.denom
            )));
        }
        state
            .escrow_accounts
            .push((payer.to_string(), chain_id.to_string(), deposit.clone()));
        Ok(())
    }
}

impl DelegatedSecurity for MockParent {
    fn create_consumer(
        &mut self,
        chain_id: &str,
        _spawn_time: Timestamp,
        _unbonding_period: Duration,
    ) -> Result<ConsumerId, CollaboratorError> {
        let mut state = self.state();
        let n = state.next_consumer;
        state.next_consumer += 1;

        let consumer_id = ConsumerId::new(n.to_string());
        state.consumers.insert(
            consumer_id.clone(),
            MockConsumer {
                chain_id: chain_id.to_string(),
                phase: ConsumerPhase::Initialized,
                client_id: Some(client_id_for(n)),
                channel: None,
                pending_vsc_packets: Vec::new(),
                sent_vsc_packets: Vec::new(),
            },
        );
        Ok(consumer_id)
    }

    fn validator_set_update_id(&self) -> u64 {
        self.state().valset_update_id
    }

    fn increment_validator_set_update_id(&mut self) {
        self.state().valset_update_id += 1;
    }

    fn append_pending_vsc_packet(
        &mut self,
        consumer_id: &ConsumerId,
        packet: ValidatorSetChangePacket,
    ) {
        if let Some(consumer) = self.state().consumers.get_mut(consumer_id) {
            consumer.pending_vsc_packets.push(packet);
        }
    }

    fn consumer_client_id(&self, consumer_id: &ConsumerId) -> Option<String> {
        self.state()
            .consumers
            .get(consumer_id)
            .and_then(|consumer| consumer.client_id.clone())
    }

    fn consumer_channel(&self, consumer_id: &ConsumerId) -> Option<String> {
        self.state()
            .consumers
            .get(consumer_id)
            .and_then(|consumer| consumer.channel.clone())
    }

    fn consumer_phase(&self, consumer_id: &ConsumerId) -> ConsumerPhase {
        self.state()
            .consumers
            .get(consumer_id)
            .map(|consumer| consumer.phase)
            .unwrap_or(ConsumerPhase::Deleted)
    }

    fn send_vsc_packets(
        &mut self,
        consumer_id: &ConsumerId,
        _channel_id: &str,
    ) -> Result<(), CollaboratorError> {
        let mut state = self.state();
        if state.vsc_send_fails {
            return Err(CollaboratorError::new("channel congested"));
        }
        let consumer = state
            .consumers
            .get_mut(consumer_id)
            .ok_or_else(|| CollaboratorError::new("unknown consumer"))?;
        let pending = std::mem::take(&mut consumer.pending_vsc_packets);
        consumer.sent_vsc_packets.extend(pending);
        Ok(())
    }
}

impl IbcLookup for MockParent {
    fn channel(&self, port_id: &str, channel_id: &str) -> Option<ChannelEnd> {
        self.state()
            .channels
            .get(&(port_id.to_string(), channel_id.to_string()))
            .cloned()
    }

    fn connection(&self, connection_id: &str) -> Option<ConnectionEnd> {
        self.state().connections.get(connection_id).cloned()
    }

    fn client_latest_height(&self, client_id: &str) -> Option<BlockHeight> {
        self.state().client_heights.get(client_id).copied()
    }
}

impl PacketTransport for MockParent {
    fn send_packet(
        &mut self,
        source_port: &str,
        source_channel: &str,
        timeout_height: BlockHeight,
        timeout_timestamp: Timestamp,
        data: Vec<u8>,
    ) -> Result<Sequence, CollaboratorError> {
        let mut state = self.state();
        if state.transport_down {
            return Err(CollaboratorError::new("transport down"));
        }
        let sequence = Sequence::new(state.next_sequence);
        state.next_sequence += 1;
        state.sent_packets.push(SentPacket {
            port: source_port.to_string(),
            channel: source_channel.to_string(),
            timeout_height,
            timeout_timestamp,
            data,
            sequence,
        });
        Ok(sequence)
    }
}

impl Housekeeping for MockParent {
    fn on_begin_block(
        &mut self,
        height: BlockHeight,
        _time: Timestamp,
    ) -> Result<(), CollaboratorError> {
        self.state().housekeeping_heights.push(height);
        Ok(())
    }
}
