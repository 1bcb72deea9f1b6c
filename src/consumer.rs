/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Registration of chainlets as consumers of the parent chain's validator set.
//!
//! ## Pending init
//!
//! A newly registered consumer cannot receive validator set packets until its chainlet has started and
//! a channel to it has been opened, which may take many blocks. [`register`] therefore leaves a
//! pending-init marker behind, and [`init_consumers`] (run at the beginning of every block) force-sends
//! the queued packets of every marked consumer as soon as it is launched and has a channel, instead of
//! letting them wait for the delegated-security subsystem's next epoch boundary.

use std::time::{Duration, SystemTime};

use crate::collaborators::{ConsumerPhase, DelegatedSecurity, ValidatorSetChangePacket};
use crate::error::ChainletError;
use crate::events::{Event, InitConsumerEvent, RegisterConsumerEvent};
use crate::state::{Context, KVGet};
use crate::types::{
    chainlet::Chainlet,
    data_types::{ConsumerId, Timestamp},
    stack::StackVersion,
};

/// Register `chain_id` as a consumer and queue an empty validator set packet for it.
pub fn register<K: KVGet>(
    ctx: &mut Context<K>,
    delegated_security: &mut dyn DelegatedSecurity,
    chain_id: &str,
    spawn_time: Timestamp,
    unbonding_period: Duration,
) -> Result<ConsumerId, ChainletError> {
    let consumer_id = delegated_security.create_consumer(chain_id, spawn_time, unbonding_period)?;

    let valset_update_id = delegated_security.validator_set_update_id();
    delegated_security.append_pending_vsc_packet(
        &consumer_id,
        ValidatorSetChangePacket::empty(valset_update_id),
    );
    delegated_security.increment_validator_set_update_id();

    ctx.set_pending_init(chain_id, &consumer_id)?;

    ctx.emit(Event::RegisterConsumer(RegisterConsumerEvent {
        timestamp: SystemTime::now(),
        chain_id: chain_id.to_string(),
        consumer_id: consumer_id.clone(),
    }));
    Ok(consumer_id)
}

/// Register `chainlet` as a consumer if it is moving to the consumer-mode version `target` and is not a
/// consumer yet. The caller writes `chainlet` back.
pub(crate) fn register_for_version<K: KVGet>(
    ctx: &mut Context<K>,
    delegated_security: &mut dyn DelegatedSecurity,
    chainlet: &mut Chainlet,
    target: &StackVersion,
) -> Result<(), ChainletError> {
    if chainlet.is_ccv_consumer || !target.ccv_consumer {
        return Ok(());
    }

    let unbonding_period = ctx.params()?.consumer_unbonding_period();
    let spawn_time = ctx.time();
    let consumer_id = register(
        ctx,
        delegated_security,
        &chainlet.chain_id,
        spawn_time,
        unbonding_period,
    )?;
    chainlet.is_ccv_consumer = true;
    chainlet.consumer_id = Some(consumer_id);
    Ok(())
}

/// Flush the queued validator set packets of every pending consumer that is ready to receive them.
///
/// A consumer that is not launched yet, has no channel yet, or whose packets fail to send keeps its
/// marker and is retried in the next block.
pub fn init_consumers<K: KVGet>(
    ctx: &mut Context<K>,
    delegated_security: &mut dyn DelegatedSecurity,
) -> Result<(), ChainletError> {
    for (chain_id, consumer_id) in ctx.pending_inits()? {
        if delegated_security.consumer_phase(&consumer_id) != ConsumerPhase::Launched {
            continue;
        }
        let Some(channel_id) = delegated_security.consumer_channel(&consumer_id) else {
            continue;
        };

        if let Err(err) = delegated_security.send_vsc_packets(&consumer_id, &channel_id) {
            log::warn!(
                "Failed to send initial validator set packets to consumer {} of chainlet {}: {}",
                consumer_id,
                chain_id,
                err
            );
            continue;
        }

        ctx.delete_pending_init(&chain_id);
        ctx.emit(Event::InitConsumer(InitConsumerEvent {
            timestamp: SystemTime::now(),
            chain_id,
            consumer_id,
            channel_id,
        }));
    }
    Ok(())
}
