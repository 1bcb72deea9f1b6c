/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Checks that a channel really leads to a given chainlet.
//!
//! A channel is only trusted to carry upgrade packets for a chainlet if walking
//! `channel -> connection -> client` ends at the light client that the delegated-security subsystem
//! registered for that chainlet's consumer. Anyone can open a channel to the `chainlet` port, so without
//! this walk a counterparty could confirm or cancel upgrades of chainlets it does not run.
//!
//! These functions only read through [`IbcLookup`] and never touch the module's state.

use crate::collaborators::{ChannelEnd, ChannelState, IbcLookup};

use super::messages::PORT;

/// Walk `channel_id` on `port_id` to its light client and require that it is `expected_client_id`.
/// Returns the channel end on success.
pub fn verify_channel(
    ibc: &dyn IbcLookup,
    port_id: &str,
    channel_id: &str,
    expected_client_id: &str,
) -> Result<ChannelEnd, VerificationError> {
    if port_id != PORT {
        return Err(VerificationError::UnexpectedPort {
            port: port_id.to_string(),
        });
    }

    let channel = ibc
        .channel(port_id, channel_id)
        .ok_or_else(|| VerificationError::ChannelNotFound {
            port: port_id.to_string(),
            channel: channel_id.to_string(),
        })?;

    let connection_id = match channel.connection_hops.as_slice() {
        [connection_id] => connection_id,
        hops => {
            return Err(VerificationError::InvalidConnectionHops {
                channel: channel_id.to_string(),
                hops: hops.len(),
            })
        }
    };

    let connection = ibc
        .connection(connection_id)
        .ok_or_else(|| VerificationError::ConnectionNotFound {
            connection: connection_id.clone(),
        })?;

    if connection.client_id != expected_client_id {
        return Err(VerificationError::ClientMismatch {
            channel: channel_id.to_string(),
            expected: expected_client_id.to_string(),
            actual: connection.client_id,
        });
    }

    Ok(channel)
}

/// Like [`verify_channel`], and additionally require the channel to be open so that a packet can be
/// sent over it.
pub fn verify_open_channel(
    ibc: &dyn IbcLookup,
    port_id: &str,
    channel_id: &str,
    expected_client_id: &str,
) -> Result<ChannelEnd, VerificationError> {
    let channel = verify_channel(ibc, port_id, channel_id, expected_client_id)?;
    if channel.state != ChannelState::Open {
        return Err(VerificationError::ChannelNotOpen {
            channel: channel_id.to_string(),
            state: channel.state,
        });
    }
    Ok(channel)
}

/// Require a callback for a pending upgrade to arrive on the channel the upgrade was negotiated over.
pub fn verify_recorded_channel(recorded: &str, actual: &str) -> Result<(), VerificationError> {
    if recorded != actual {
        return Err(VerificationError::UnexpectedChannel {
            recorded: recorded.to_string(),
            actual: actual.to_string(),
        });
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VerificationError {
    #[error("packets must use the chainlet port, got {port}")]
    UnexpectedPort { port: String },

    #[error("channel {channel} on port {port} not found")]
    ChannelNotFound { port: String, channel: String },

    #[error("channel {channel} has {hops} connection hops, expected exactly one")]
    InvalidConnectionHops { channel: String, hops: usize },

    #[error("connection {connection} not found")]
    ConnectionNotFound { connection: String },

    #[error("channel {channel} leads to client {actual}, expected {expected}")]
    ClientMismatch {
        channel: String,
        expected: String,
        actual: String,
    },

    #[error("channel {channel} is not open ({state:?})")]
    ChannelNotOpen { channel: String, state: ChannelState },

    #[error("latest height of client {client} unknown")]
    ClientHeightUnknown { client: String },

    #[error("upgrade was negotiated over {recorded}, but the packet used {actual}")]
    UnexpectedChannel { recorded: String, actual: String },
}
