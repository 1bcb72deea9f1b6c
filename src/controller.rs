/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! The entry point of the chainlet module.
//!
//! A [`Controller`] owns the host's collaborator implementations and the process-local
//! [version tree cache](crate::version_tree::VersionTreeCache), and routes transaction messages, packet
//! callbacks, and the begin-block hook to the components that handle them.
//!
//! ## Building a controller
//!
//! ```ignore
//! let controller = Controller::builder()
//!     .acl(acl)
//!     .billing(billing)
//!     .escrow(escrow)
//!     .delegated_security(delegated_security)
//!     .ibc(ibc)
//!     .transport(transport)
//!     .housekeeping(housekeeping)
//!     .event_publisher(sender)
//!     .log_events(true)
//!     .build();
//! ```
//!
//! ### Required setters
//!
//! `.acl(...)`, `.billing(...)`, `.escrow(...)`, `.delegated_security(...)`, `.ibc(...)` and
//! `.transport(...)` take implementations of the corresponding traits in
//! [`collaborators`](crate::collaborators).
//!
//! ### Optional setters
//!
//! - `.housekeeping(...)`: work to run at the end of every begin-block hook.
//! - `.event_publisher(...)`: a channel that receives every [event](crate::events) of every committed
//!   execution.
//! - `.log_events(...)`: whether to [log](crate::logging) those events. Defaults to `false`.
//!
//! ## Executions
//!
//! Every method that takes a [`Context`] is one execution. An execution either succeeds and leaves its
//! writes, events, and version tree changes in the context, or fails and leaves the context exactly as
//! it found it.
//!
//! Nothing leaves the context until the host passes it to [`Controller::commit`]. Only then are its
//! events published and logged, and only then does its version tree replace the controller's cache. A
//! context that is dropped instead has no effect at all.
//!
//! An [`Integrity`](crate::error::ErrorCategory::Integrity) failure means the version tree disagreed with
//! the stack registry. It drops both the context's tree and the controller's cache.

use std::sync::mpsc::Sender;

use typed_builder::TypedBuilder;

use crate::chainlet_registry;
use crate::collaborators::{
    Acl, Billing, DelegatedSecurity, Escrow, Housekeeping, IbcLookup, PacketTransport,
};
use crate::error::ChainletError;
use crate::events::Event;
use crate::genesis::{self, GenesisState};
use crate::logging;
use crate::msgs::Msg;
use crate::scheduler;
use crate::stack_registry;
use crate::state::{Context, KVGet, WriteBatch};
use crate::types::chainlet::ChainletStatus;
use crate::upgrade::{
    engine::{self, PacketOutcome},
    messages::{Acknowledgement, ConfirmUpgradePacketAck, Packet},
};
use crate::version_tree::VersionTreeCache;

#[derive(TypedBuilder)]
#[builder(builder_method(doc = "
    Create a builder for building a [Controller]. On the builder call the following methods to construct a valid [Controller].

    Required:
    - `.acl(...)`
    - `.billing(...)`
    - `.escrow(...)`
    - `.delegated_security(...)`
    - `.ibc(...)`
    - `.transport(...)`

    Optional:
    - `.housekeeping(...)`
    - `.event_publisher(...)`
    - `.log_events(...)`
"))]
pub struct Controller {
    // Required collaborators
    #[builder(setter(transform = |acl: impl Acl + 'static| Box::new(acl) as Box<dyn Acl>,
    doc = "Set the access control list that decides who is an admin and who may manage stacks. Required."))]
    acl: Box<dyn Acl>,
    #[builder(setter(transform = |billing: impl Billing + 'static| Box::new(billing) as Box<dyn Billing>,
    doc = "Set the billing subsystem that charges setup fees. Required."))]
    billing: Box<dyn Billing>,
    #[builder(setter(transform = |escrow: impl Escrow + 'static| Box::new(escrow) as Box<dyn Escrow>,
    doc = "Set the escrow subsystem that holds launch deposits. Required."))]
    escrow: Box<dyn Escrow>,
    #[builder(setter(transform = |delegated_security: impl DelegatedSecurity + 'static| Box::new(delegated_security) as Box<dyn DelegatedSecurity>,
    doc = "Set the delegated-security subsystem that chainlets register with as consumers. Required."))]
    delegated_security: Box<dyn DelegatedSecurity>,
    #[builder(setter(transform = |ibc: impl IbcLookup + 'static| Box::new(ibc) as Box<dyn IbcLookup>,
    doc = "Set the read-only view of channels, connections and light clients. Required."))]
    ibc: Box<dyn IbcLookup>,
    #[builder(setter(transform = |transport: impl PacketTransport + 'static| Box::new(transport) as Box<dyn PacketTransport>,
    doc = "Set the transport that sends packets to chainlets. Required."))]
    transport: Box<dyn PacketTransport>,

    // Optional parameters
    #[builder(default, setter(transform = |housekeeping: impl Housekeeping + 'static| Some(Box::new(housekeeping) as Box<dyn Housekeeping>),
    doc = "Register work to run at the end of every begin-block hook. Optional."))]
    housekeeping: Option<Box<dyn Housekeeping>>,
    #[builder(default, setter(transform = |event_publisher: Sender<Event>| Some(event_publisher),
    doc = "Register a channel that receives the events of every committed execution. Optional."))]
    event_publisher: Option<Sender<Event>>,
    #[builder(default = false, setter(doc = "Enable logging of events? Optional, defaults to false."))]
    log_events: bool,

    #[builder(default, setter(skip))]
    version_tree: VersionTreeCache,
}

impl Controller {
    /// Write the initial state of the module.
    pub fn init_genesis<K: KVGet>(
        &mut self,
        ctx: &mut Context<K>,
        genesis: &GenesisState,
    ) -> Result<(), ChainletError> {
        self.execute(ctx, |controller, ctx| {
            genesis::init_genesis(ctx, genesis)
        })
    }

    /// Handle a transaction message.
    pub fn handle_msg<K: KVGet>(
        &mut self,
        ctx: &mut Context<K>,
        msg: &Msg,
    ) -> Result<(), ChainletError> {
        msg.validate_basic()?;

        self.execute(ctx, |controller, ctx| match msg {
            Msg::CreateChainletStack(msg) => stack_registry::create_stack(
                ctx,
                &controller.version_tree,
                controller.acl.as_ref(),
                msg,
            ),
            Msg::UpdateChainletStack(msg) => stack_registry::add_version(
                ctx,
                &controller.version_tree,
                controller.acl.as_ref(),
                msg,
            ),
            Msg::DisableChainletStackVersion(msg) => stack_registry::disable_version(
                ctx,
                &controller.version_tree,
                controller.acl.as_ref(),
                msg,
            ),
            Msg::LaunchChainlet(msg) => chainlet_registry::launch(
                ctx,
                controller.acl.as_ref(),
                controller.billing.as_mut(),
                controller.escrow.as_mut(),
                controller.delegated_security.as_mut(),
                msg,
            ),
            Msg::UpgradeChainlet(msg) => engine::request_upgrade(
                ctx,
                controller.ibc.as_ref(),
                controller.transport.as_mut(),
                controller.delegated_security.as_mut(),
                msg,
            ),
            Msg::CancelChainletUpgrade(msg) => engine::cancel_upgrade(
                ctx,
                controller.ibc.as_ref(),
                controller.transport.as_mut(),
                controller.delegated_security.as_ref(),
                msg,
            ),
        })
    }

    /// Take a chainlet offline. Returns whether its status changed.
    pub fn stop_chainlet<K: KVGet>(
        &mut self,
        ctx: &mut Context<K>,
        chain_id: &str,
    ) -> Result<bool, ChainletError> {
        self.execute(ctx, |_, ctx| {
            chainlet_registry::set_status(ctx, chain_id, ChainletStatus::Offline)
        })
    }

    /// Bring a chainlet back online. Returns whether its status changed.
    pub fn start_chainlet<K: KVGet>(
        &mut self,
        ctx: &mut Context<K>,
        chain_id: &str,
    ) -> Result<bool, ChainletError> {
        self.execute(ctx, |_, ctx| {
            chainlet_registry::set_status(ctx, chain_id, ChainletStatus::Online)
        })
    }

    /// Handle a packet received from a chainlet and return the acknowledgement to write for it.
    ///
    /// Packets that fail are answered with an error acknowledgement and change nothing. Ignored packets
    /// are answered with a success acknowledgement.
    pub fn on_recv_packet<K: KVGet>(
        &mut self,
        ctx: &mut Context<K>,
        packet: &Packet,
    ) -> Acknowledgement {
        let result = self.execute(ctx, |controller, ctx| {
            engine::on_recv_packet(
                ctx,
                controller.ibc.as_ref(),
                controller.delegated_security.as_ref(),
                packet,
            )
        });

        match result.and_then(|_| Acknowledgement::success(&ConfirmUpgradePacketAck {})) {
            Ok(ack) => ack,
            Err(err) => {
                log::warn!(
                    "Rejecting packet {} on {}: {}",
                    packet.sequence,
                    packet.destination_channel,
                    err
                );
                Acknowledgement::error(err.to_string())
            }
        }
    }

    /// Handle the acknowledgement of a packet this module sent.
    pub fn on_acknowledgement_packet<K: KVGet>(
        &mut self,
        ctx: &mut Context<K>,
        packet: &Packet,
        acknowledgement: &[u8],
    ) -> Result<PacketOutcome, ChainletError> {
        self.execute(ctx, |controller, ctx| {
            engine::on_acknowledgement_packet(
                ctx,
                controller.ibc.as_ref(),
                controller.delegated_security.as_ref(),
                packet,
                acknowledgement,
            )
        })
    }

    /// Handle the timeout of a packet this module sent.
    pub fn on_timeout_packet<K: KVGet>(
        &mut self,
        ctx: &mut Context<K>,
        packet: &Packet,
    ) -> Result<PacketOutcome, ChainletError> {
        self.execute(ctx, |controller, ctx| {
            engine::on_timeout_packet(
                ctx,
                controller.ibc.as_ref(),
                controller.delegated_security.as_ref(),
                packet,
            )
        })
    }

    /// Run the begin-block hook. An error whose [category](ChainletError::category) is
    /// [`Integrity`](crate::error::ErrorCategory::Integrity) must abort block processing.
    pub fn begin_block<K: KVGet>(&mut self, ctx: &mut Context<K>) -> Result<(), ChainletError> {
        self.execute(ctx, |controller, ctx| {
            scheduler::begin_block(
                ctx,
                &controller.version_tree,
                controller.delegated_security.as_mut(),
                controller.housekeeping.as_deref_mut(),
            )
        })
    }

    /// Commit the executions run against `ctx`. Publishes and logs their events, hands their version
    /// tree changes to the cache, and returns the write batch that the host must write into the store
    /// before opening the next context.
    pub fn commit<K: KVGet, W: WriteBatch>(&mut self, ctx: Context<K>) -> W {
        let (write_batch, events, version_tree) = ctx.into_parts();
        self.version_tree.commit(version_tree);

        for event in events {
            if self.log_events {
                logging::log_event(&event);
            }
            Event::publish(&self.event_publisher, event);
        }
        write_batch
    }

    /// Get the newest version of `stack` that a chainlet running `current` could move to without a
    /// breaking upgrade. `store` must be the committed store.
    pub fn latest_compatible_version<K: KVGet>(
        &mut self,
        store: &K,
        stack: &str,
        current: &str,
    ) -> Result<String, ChainletError> {
        crate::query::latest_compatible_version(store, &mut self.version_tree, stack, current)
    }

    /// Drop the version tree cache. Hosts call this after changing the module's store through any path
    /// other than this controller, e.g. a state-sync restore.
    pub fn invalidate_version_tree(&mut self) {
        self.version_tree.invalidate();
    }

    /// Run `f` as one execution against `ctx`.
    fn execute<K: KVGet, T>(
        &mut self,
        ctx: &mut Context<K>,
        f: impl FnOnce(&mut Self, &mut Context<K>) -> Result<T, ChainletError>,
    ) -> Result<T, ChainletError> {
        let result = ctx.atomic(|ctx| f(self, ctx));

        if let Err(err) = &result {
            if err.is_fatal() {
                self.version_tree.invalidate();
                ctx.discard_version_tree();
            }
            log::debug!("Execution failed and was rolled back: {}", err);
        }
        result
    }
}
