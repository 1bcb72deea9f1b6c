/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Wire types exchanged with chainlets over the `chainlet` port.
//!
//! Packet payloads are JSON objects wrapped in a [`ChainletPacketData`] envelope whose single key names
//! the packet type, e.g.:
//!
//! ```text
//! {"create_upgrade":{"chain_id":"test_1-1","plan_name":"1-to-2","height":1100,"info":"registry/test:2.0.0"}}
//! ```
//!
//! Channel acknowledgements use the ICS-04 JSON form: `{"result":"<base64>"}` on success and
//! `{"error":"<reason>"}` on failure.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::error::ChainletError;
use crate::types::data_types::{BlockHeight, Sequence, Timestamp};

/// The port that the chainlet module binds.
pub const PORT: &str = "chainlet";

/// Sent to a chainlet to schedule a breaking upgrade at `height`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateUpgradePacketData {
    pub chain_id: String,
    pub plan_name: String,
    pub height: u64,
    pub info: String,
}

/// Sent to a chainlet to cancel the upgrade scheduled under `plan`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelUpgradePacketData {
    pub chain_id: String,
    pub plan: String,
}

/// Sent by a chainlet that reached the height right before its scheduled upgrade.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfirmUpgradePacketData {
    pub chain_id: String,
    pub height: u64,
    #[serde(default)]
    pub plan: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateUpgradePacketAck {}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelUpgradePacketAck {}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfirmUpgradePacketAck {}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChainletPacketData {
    CreateUpgrade(CreateUpgradePacketData),
    CancelUpgrade(CancelUpgradePacketData),
    ConfirmUpgrade(ConfirmUpgradePacketData),
}

impl ChainletPacketData {
    pub fn chain_id(&self) -> &str {
        match self {
            ChainletPacketData::CreateUpgrade(data) => &data.chain_id,
            ChainletPacketData::CancelUpgrade(data) => &data.chain_id,
            ChainletPacketData::ConfirmUpgrade(data) => &data.chain_id,
        }
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, ChainletError> {
        to_json(self)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ChainletError> {
        from_json(bytes)
    }
}

/// An ICS-04 channel acknowledgement.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Acknowledgement {
    /// Base64 encoding of the JSON-encoded typed ack.
    Result(String),
    Error(String),
}

impl Acknowledgement {
    /// Build a success acknowledgement carrying `ack`.
    pub fn success<T: Serialize>(ack: &T) -> Result<Self, ChainletError> {
        Ok(Acknowledgement::Result(STANDARD.encode(to_json(ack)?)))
    }

    pub fn error(reason: impl Into<String>) -> Self {
        Acknowledgement::Error(reason.into())
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Acknowledgement::Result(_))
    }

    /// Decode the typed ack carried by a success acknowledgement. Returns `None` for error
    /// acknowledgements.
    pub fn result<T: DeserializeOwned>(&self) -> Result<Option<T>, ChainletError> {
        match self {
            Acknowledgement::Result(encoded) => {
                let bytes = STANDARD
                    .decode(encoded)
                    .map_err(|err| ChainletError::PacketDecode(err.to_string()))?;
                Ok(Some(from_json(&bytes)?))
            }
            Acknowledgement::Error(_) => Ok(None),
        }
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, ChainletError> {
        to_json(self)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ChainletError> {
        from_json(bytes)
    }
}

/// A packet as delivered to the chainlet module's callbacks by the transport.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Packet {
    pub sequence: Sequence,
    pub source_port: String,
    pub source_channel: String,
    pub destination_port: String,
    pub destination_channel: String,
    pub data: Vec<u8>,
    pub timeout_height: BlockHeight,
    pub timeout_timestamp: Timestamp,
}

fn to_json<T: Serialize>(value: &T) -> Result<Vec<u8>, ChainletError> {
    serde_json::to_vec(value).map_err(|err| ChainletError::PacketDecode(err.to_string()))
}

fn from_json<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, ChainletError> {
    serde_json::from_slice(bytes).map_err(|err| ChainletError::PacketDecode(err.to_string()))
}
