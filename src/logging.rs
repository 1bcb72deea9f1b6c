/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Functions that log out events.
//!
//! The logs defined in this module are printed if the host enabled them via the controller's
//! [`log_events`](crate::controller::Controller) flag.
//!
//! The chainlet module logs using the [log](https://docs.rs/log/latest/log/) crate. To get these
//! messages printed onto a terminal or to a file, set up a
//! [logging implementation](https://docs.rs/log/latest/log/#available-logging-implementations).
//!
//! ## Log message format
//!
//! Log messages are CSVs (Comma Separated Values) with at least two values. The first two values are
//! always:
//! 1. The name of the [event](crate::events) in PascalCase (defined in this module as constants).
//! 2. The time the event was emitted (as number of seconds since the Unix Epoch).
//!
//! The rest of the values differ depending on the kind of event. For example, the following snippet
//! is how a [ScheduleUpgrade](crate::events::ScheduleUpgradeEvent) is printed:
//!
//! ```text
//! ScheduleUpgrade, 1701329264, test_1-1, 1-to-2, 2.0.0, 1100, channel-42, 7, Id5u7f6
//! ```
//!
//! In the snippet, the last value is the first seven characters of the Base64 encoding of the
//! commitment of the create-upgrade packet.

use std::time::SystemTime;

use base64::{engine::general_purpose::STANDARD_NO_PAD, Engine as _};

use crate::events::*;

// Names of each event in PascalCase for printing:
pub const CREATE_STACK: &str = "CreateStack";
pub const ADD_STACK_VERSION: &str = "AddStackVersion";
pub const DISABLE_STACK_VERSION: &str = "DisableStackVersion";

pub const LAUNCH_CHAINLET: &str = "LaunchChainlet";
pub const STOP_CHAINLET: &str = "StopChainlet";
pub const START_CHAINLET: &str = "StartChainlet";
pub const UPGRADE_CHAINLET: &str = "UpgradeChainlet";

pub const SCHEDULE_UPGRADE: &str = "ScheduleUpgrade";
pub const COMPLETE_UPGRADE: &str = "CompleteUpgrade";
pub const CANCEL_UPGRADE: &str = "CancelUpgrade";
pub const REQUEST_CANCEL_UPGRADE: &str = "RequestCancelUpgrade";
pub const IGNORE_PACKET: &str = "IgnorePacket";

pub const REGISTER_CONSUMER: &str = "RegisterConsumer";
pub const INIT_CONSUMER: &str = "InitConsumer";

/// Implemented by event types. Used to get a closure that logs the event.
pub(crate) trait Logger {
    /// Returns a pointer to the default logging handler for a given event type.
    fn get_logger() -> Box<dyn Fn(&Self) + Send>;
}

/// Log `event` with the default logger of its type.
pub(crate) fn log_event(event: &Event) {
    match event {
        Event::CreateStack(e) => CreateStackEvent::get_logger()(e),
        Event::AddStackVersion(e) => AddStackVersionEvent::get_logger()(e),
        Event::DisableStackVersion(e) => DisableStackVersionEvent::get_logger()(e),
        Event::LaunchChainlet(e) => LaunchChainletEvent::get_logger()(e),
        Event::StopChainlet(e) => StopChainletEvent::get_logger()(e),
        Event::StartChainlet(e) => StartChainletEvent::get_logger()(e),
        Event::UpgradeChainlet(e) => UpgradeChainletEvent::get_logger()(e),
        Event::ScheduleUpgrade(e) => ScheduleUpgradeEvent::get_logger()(e),
        Event::CompleteUpgrade(e) => CompleteUpgradeEvent::get_logger()(e),
        Event::CancelUpgrade(e) => CancelUpgradeEvent::get_logger()(e),
        Event::RequestCancelUpgrade(e) => RequestCancelUpgradeEvent::get_logger()(e),
        Event::IgnorePacket(e) => IgnorePacketEvent::get_logger()(e),
        Event::RegisterConsumer(e) => RegisterConsumerEvent::get_logger()(e),
        Event::InitConsumer(e) => InitConsumerEvent::get_logger()(e),
    }
}

impl Logger for CreateStackEvent {
    fn get_logger() -> Box<dyn Fn(&Self) + Send> {
        let logger = |create_stack_event: &CreateStackEvent| {
            log::info!(
                "{}, {}, {}, {}",
                CREATE_STACK,
                secs_since_unix_epoch(create_stack_event.timestamp),
                create_stack_event.display_name,
                create_stack_event.creator
            )
        };
        Box::new(logger)
    }
}

impl Logger for AddStackVersionEvent {
    fn get_logger() -> Box<dyn Fn(&Self) + Send> {
        let logger = |add_stack_version_event: &AddStackVersionEvent| {
            log::info!(
                "{}, {}, {}, {}, {}",
                ADD_STACK_VERSION,
                secs_since_unix_epoch(add_stack_version_event.timestamp),
                add_stack_version_event.stack,
                add_stack_version_event.version,
                add_stack_version_event.ccv_consumer
            )
        };
        Box::new(logger)
    }
}

impl Logger for DisableStackVersionEvent {
    fn get_logger() -> Box<dyn Fn(&Self) + Send> {
        let logger = |disable_stack_version_event: &DisableStackVersionEvent| {
            log::info!(
                "{}, {}, {}, {}",
                DISABLE_STACK_VERSION,
                secs_since_unix_epoch(disable_stack_version_event.timestamp),
                disable_stack_version_event.stack,
                disable_stack_version_event.version
            )
        };
        Box::new(logger)
    }
}

impl Logger for LaunchChainletEvent {
    fn get_logger() -> Box<dyn Fn(&Self) + Send> {
        let logger = |launch_chainlet_event: &LaunchChainletEvent| {
            log::info!(
                "{}, {}, {}, {}, {}, {}, {}",
                LAUNCH_CHAINLET,
                secs_since_unix_epoch(launch_chainlet_event.timestamp),
                launch_chainlet_event.chain_id,
                launch_chainlet_event.stack,
                launch_chainlet_event.version,
                launch_chainlet_event.launcher,
                launch_chainlet_event.fee_denom.as_deref().unwrap_or("service")
            )
        };
        Box::new(logger)
    }
}

impl Logger for StopChainletEvent {
    fn get_logger() -> Box<dyn Fn(&Self) + Send> {
        let logger = |stop_chainlet_event: &StopChainletEvent| {
            log::info!(
                "{}, {}, {}",
                STOP_CHAINLET,
                secs_since_unix_epoch(stop_chainlet_event.timestamp),
                stop_chainlet_event.chain_id
            )
        };
        Box::new(logger)
    }
}

impl Logger for StartChainletEvent {
    fn get_logger() -> Box<dyn Fn(&Self) + Send> {
        let logger = |start_chainlet_event: &StartChainletEvent| {
            log::info!(
                "{}, {}, {}",
                START_CHAINLET,
                secs_since_unix_epoch(start_chainlet_event.timestamp),
                start_chainlet_event.chain_id
            )
        };
        Box::new(logger)
    }
}

impl Logger for UpgradeChainletEvent {
    fn get_logger() -> Box<dyn Fn(&Self) + Send> {
        let logger = |upgrade_chainlet_event: &UpgradeChainletEvent| {
            log::info!(
                "{}, {}, {}, {}, {}, {}",
                UPGRADE_CHAINLET,
                secs_since_unix_epoch(upgrade_chainlet_event.timestamp),
                upgrade_chainlet_event.chain_id,
                upgrade_chainlet_event.from_version,
                upgrade_chainlet_event.to_version,
                if upgrade_chainlet_event.automatic { "automatic" } else { "manual" }
            )
        };
        Box::new(logger)
    }
}

impl Logger for ScheduleUpgradeEvent {
    fn get_logger() -> Box<dyn Fn(&Self) + Send> {
        let logger = |schedule_upgrade_event: &ScheduleUpgradeEvent| {
            log::info!(
                "{}, {}, {}, {}, {}, {}, {}, {}, {}",
                SCHEDULE_UPGRADE,
                secs_since_unix_epoch(schedule_upgrade_event.timestamp),
                schedule_upgrade_event.chain_id,
                schedule_upgrade_event.plan_name,
                schedule_upgrade_event.target_version,
                schedule_upgrade_event.target_height,
                schedule_upgrade_event.channel_id,
                schedule_upgrade_event.sequence,
                first_seven_base64_chars(&schedule_upgrade_event.commitment.bytes())
            )
        };
        Box::new(logger)
    }
}

impl Logger for CompleteUpgradeEvent {
    fn get_logger() -> Box<dyn Fn(&Self) + Send> {
        let logger = |complete_upgrade_event: &CompleteUpgradeEvent| {
            log::info!(
                "{}, {}, {}, {}, {}",
                COMPLETE_UPGRADE,
                secs_since_unix_epoch(complete_upgrade_event.timestamp),
                complete_upgrade_event.chain_id,
                complete_upgrade_event.version,
                complete_upgrade_event.height
            )
        };
        Box::new(logger)
    }
}

impl Logger for CancelUpgradeEvent {
    fn get_logger() -> Box<dyn Fn(&Self) + Send> {
        let logger = |cancel_upgrade_event: &CancelUpgradeEvent| {
            log::info!(
                "{}, {}, {}, {}, {:?}",
                CANCEL_UPGRADE,
                secs_since_unix_epoch(cancel_upgrade_event.timestamp),
                cancel_upgrade_event.chain_id,
                cancel_upgrade_event.target_version,
                cancel_upgrade_event.reason
            )
        };
        Box::new(logger)
    }
}

impl Logger for RequestCancelUpgradeEvent {
    fn get_logger() -> Box<dyn Fn(&Self) + Send> {
        let logger = |request_cancel_upgrade_event: &RequestCancelUpgradeEvent| {
            log::info!(
                "{}, {}, {}, {}, {}, {}, {}",
                REQUEST_CANCEL_UPGRADE,
                secs_since_unix_epoch(request_cancel_upgrade_event.timestamp),
                request_cancel_upgrade_event.chain_id,
                request_cancel_upgrade_event.plan_name,
                request_cancel_upgrade_event.channel_id,
                request_cancel_upgrade_event.sequence,
                first_seven_base64_chars(&request_cancel_upgrade_event.commitment.bytes())
            )
        };
        Box::new(logger)
    }
}

impl Logger for IgnorePacketEvent {
    fn get_logger() -> Box<dyn Fn(&Self) + Send> {
        let logger = |ignore_packet_event: &IgnorePacketEvent| {
            log::info!(
                "{}, {}, {}, {}, {}",
                IGNORE_PACKET,
                secs_since_unix_epoch(ignore_packet_event.timestamp),
                ignore_packet_event.chain_id,
                ignore_packet_event.plan_name,
                ignore_packet_event.reason
            )
        };
        Box::new(logger)
    }
}

impl Logger for RegisterConsumerEvent {
    fn get_logger() -> Box<dyn Fn(&Self) + Send> {
        let logger = |register_consumer_event: &RegisterConsumerEvent| {
            log::info!(
                "{}, {}, {}, {}",
                REGISTER_CONSUMER,
                secs_since_unix_epoch(register_consumer_event.timestamp),
                register_consumer_event.chain_id,
                register_consumer_event.consumer_id
            )
        };
        Box::new(logger)
    }
}

impl Logger for InitConsumerEvent {
    fn get_logger() -> Box<dyn Fn(&Self) + Send> {
        let logger = |init_consumer_event: &InitConsumerEvent| {
            log::info!(
                "{}, {}, {}, {}, {}",
                INIT_CONSUMER,
                secs_since_unix_epoch(init_consumer_event.timestamp),
                init_consumer_event.chain_id,
                init_consumer_event.consumer_id,
                init_consumer_event.channel_id
            )
        };
        Box::new(logger)
    }
}

fn first_seven_base64_chars(bytes: &[u8]) -> String {
    let encoded = STANDARD_NO_PAD.encode(bytes);
    if encoded.len() > 7 {
        encoded[0..7].to_string()
    } else {
        encoded
    }
}

fn secs_since_unix_epoch(timestamp: SystemTime) -> u64 {
    timestamp
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|duration| duration.as_secs())
        .unwrap_or(0)
}
