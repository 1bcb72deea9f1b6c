//! A minimal host that drives a [`Controller`] over a [`MemDB`], one block at a time.

use std::{
    sync::mpsc::{self, Receiver},
    time::Duration,
};

use chainlet_rs::{
    config::Params,
    controller::Controller,
    error::ChainletError,
    events::Event,
    genesis::GenesisState,
    msgs::Msg,
    query,
    state::{Context, KVStore},
    types::{
        chainlet::Chainlet,
        data_types::{BlockHeight, Timestamp},
        stack::Stack,
    },
    upgrade::{
        messages::{Acknowledgement, Packet},
        PacketOutcome,
    },
};
use log::LevelFilter;

use super::{
    logging::setup_logger,
    mem_db::{MemDB, MemWriteBatch},
    mocks::MockParent,
};

pub(crate) const BLOCK_TIME: Duration = Duration::from_secs(5);

pub(crate) struct TestChain {
    pub(crate) db: MemDB,
    pub(crate) parent: MockParent,
    pub(crate) controller: Controller,
    pub(crate) height: u64,
    pub(crate) time: Timestamp,
    events: Receiver<Event>,
}

impl TestChain {
    pub(crate) fn new(params: Params) -> TestChain {
        TestChain::with_genesis(GenesisState {
            params,
            ..GenesisState::default()
        })
    }

    pub(crate) fn with_genesis(genesis: GenesisState) -> TestChain {
        setup_logger(LevelFilter::Debug);

        let parent = MockParent::new();
        let (sender, receiver) = mpsc::channel();
        let controller = Controller::builder()
            .acl(parent.clone())
            .billing(parent.clone())
            .escrow(parent.clone())
            .delegated_security(parent.clone())
            .ibc(parent.clone())
            .transport(parent.clone())
            .housekeeping(parent.clone())
            .event_publisher(sender)
            .log_events(true)
            .build();

        let mut chain = TestChain {
            db: MemDB::new(),
            parent,
            controller,
            height: 1,
            time: Timestamp::from_secs(1_700_000_000),
            events: receiver,
        };
        chain
            .execute(|controller, ctx| controller.init_genesis(ctx, &genesis))
            .unwrap();
        chain.take_events();
        chain
    }

    /// Run `f` in a context at the current height and commit whatever it leaves in the context.
    pub(crate) fn execute<T>(
        &mut self,
        f: impl FnOnce(&mut Controller, &mut Context<'_, MemDB>) -> T,
    ) -> T {
        let mut ctx = Context::new(&self.db, BlockHeight::new(self.height), self.time);
        let result = f(&mut self.controller, &mut ctx);
        let write_batch: MemWriteBatch = self.controller.commit(ctx);
        self.db.write(write_batch);
        result
    }

    /// Run `f` in a context at the current height and drop the context without committing it.
    pub(crate) fn execute_and_drop<T>(
        &mut self,
        f: impl FnOnce(&mut Controller, &mut Context<'_, MemDB>) -> T,
    ) -> T {
        let mut ctx = Context::new(&self.db, BlockHeight::new(self.height), self.time);
        f(&mut self.controller, &mut ctx)
    }

    pub(crate) fn submit(&mut self, msg: Msg) -> Result<(), ChainletError> {
        self.execute(|controller, ctx| controller.handle_msg(ctx, &msg))
    }

    /// Move to the next block and run the begin-block hook.
    pub(crate) fn begin_block(&mut self) -> Result<(), ChainletError> {
        self.height += 1;
        self.time = self.time + BLOCK_TIME;
        self.execute(|controller, ctx| controller.begin_block(ctx))
    }

    /// Move to the block right before `height` without running any hooks.
    pub(crate) fn skip_to(&mut self, height: u64) {
        self.height = height - 1;
    }

    pub(crate) fn recv_packet(&mut self, packet: &Packet) -> Acknowledgement {
        self.execute(|controller, ctx| controller.on_recv_packet(ctx, packet))
    }

    pub(crate) fn acknowledge(
        &mut self,
        packet: &Packet,
        acknowledgement: &[u8],
    ) -> Result<PacketOutcome, ChainletError> {
        self.execute(|controller, ctx| {
            controller.on_acknowledgement_packet(ctx, packet, acknowledgement)
        })
    }

    pub(crate) fn time_out(&mut self, packet: &Packet) -> Result<PacketOutcome, ChainletError> {
        self.execute(|controller, ctx| controller.on_timeout_packet(ctx, packet))
    }

    pub(crate) fn chainlet(&self, chain_id: &str) -> Chainlet {
        query::chainlet(&self.db, chain_id)
            .unwrap()
            .unwrap_or_else(|| panic!("chainlet {} not found", chain_id))
    }

    pub(crate) fn stack(&self, display_name: &str) -> Stack {
        query::stack(&self.db, display_name)
            .unwrap()
            .unwrap_or_else(|| panic!("stack {} not found", display_name))
    }

    /// Get the events published since the last call.
    pub(crate) fn take_events(&self) -> Vec<Event> {
        self.events.try_iter().collect()
    }
}
