/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Types that exist only to store numbers, identifiers and bytes, and do not have any major "active"
//! behavior.

use std::{
    fmt::{self, Debug, Display, Formatter},
    ops::Add,
    time::Duration,
};

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Height of a block, either on the parent chain or, when reported by a light client, on a chainlet.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, BorshDeserialize, BorshSerialize, Serialize, Deserialize)]
pub struct BlockHeight(u64);

impl BlockHeight {
    /// Create a new `BlockHeight` with an `int` inner value.
    pub const fn new(int: u64) -> Self {
        Self(int)
    }

    /// Get the inner `u64` value of this `BlockHeight`.
    pub const fn int(&self) -> u64 {
        self.0
    }

    /// Whether this height is a multiple of `interval`. An interval of zero never matches.
    pub const fn is_multiple_of(&self, interval: u64) -> bool {
        interval != 0 && self.0 % interval == 0
    }
}

impl Display for BlockHeight {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.0, f)
    }
}

impl Add<u64> for BlockHeight {
    type Output = BlockHeight;
    fn add(self, rhs: u64) -> Self::Output {
        BlockHeight::new(self.0.saturating_add(rhs))
    }
}

/// Block time, in nanoseconds since the Unix Epoch.
///
/// Block time is supplied by the host execution context and is identical on every validator, unlike
/// `SystemTime::now()`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, BorshDeserialize, BorshSerialize, Serialize, Deserialize)]
pub struct Timestamp(u64);

impl Timestamp {
    /// Create a new `Timestamp` from a number of nanoseconds since the Unix Epoch.
    pub const fn from_nanos(nanos: u64) -> Self {
        Self(nanos)
    }

    /// Create a new `Timestamp` from a number of seconds since the Unix Epoch.
    pub const fn from_secs(secs: u64) -> Self {
        Self(secs.saturating_mul(1_000_000_000))
    }

    /// Get the number of nanoseconds since the Unix Epoch.
    pub const fn nanos(&self) -> u64 {
        self.0
    }

    /// Get the number of whole seconds since the Unix Epoch.
    pub const fn secs(&self) -> u64 {
        self.0 / 1_000_000_000
    }
}

impl Add<Duration> for Timestamp {
    type Output = Timestamp;
    fn add(self, rhs: Duration) -> Self::Output {
        let nanos = u64::try_from(rhs.as_nanos()).unwrap_or(u64::MAX);
        Timestamp(self.0.saturating_add(nanos))
    }
}

/// Identifier that the delegated-security subsystem assigns to a consumer chain when it is registered.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, BorshDeserialize, BorshSerialize, Serialize, Deserialize)]
pub struct ConsumerId(String);

impl ConsumerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for ConsumerId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Sequence number assigned to an outbound packet by the packet transport.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, BorshDeserialize, BorshSerialize)]
pub struct Sequence(u64);

impl Sequence {
    pub const fn new(int: u64) -> Self {
        Self(int)
    }

    pub const fn int(&self) -> u64 {
        self.0
    }
}

impl Display for Sequence {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.0, f)
    }
}

/// 32-byte cryptographic hash.
///
/// Within this crate, `CryptoHash`-es only appear as packet commitments: the SHA256 hash of the bytes of
/// a packet sent to a chainlet.
#[derive(Clone, Copy, PartialEq, Eq, Hash, BorshDeserialize, BorshSerialize)]
pub struct CryptoHash([u8; 32]);

impl CryptoHash {
    /// Create a new `CryptoHash` wrapping `bytes`.
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Compute the SHA256 commitment of `data`.
    pub fn commitment(data: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(data);
        Self(hasher.finalize().into())
    }

    /// Get the inner `[u8; 32]` value of this `CryptoHash`.
    pub const fn bytes(&self) -> [u8; 32] {
        self.0
    }
}

impl Debug for CryptoHash {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// An amount of a single denomination.
#[derive(Clone, PartialEq, Eq, Debug, BorshDeserialize, BorshSerialize, Serialize, Deserialize)]
pub struct Coin {
    pub denom: String,
    pub amount: u128,
}

impl Coin {
    pub fn new(denom: impl Into<String>, amount: u128) -> Self {
        Self {
            denom: denom.into(),
            amount,
        }
    }

    /// Multiply the amount by `factor`, returning `None` on overflow.
    pub fn checked_mul(&self, factor: u64) -> Option<Coin> {
        self.amount
            .checked_mul(factor as u128)
            .map(|amount| Coin::new(self.denom.clone(), amount))
    }
}

impl Display for Coin {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.amount, self.denom)
    }
}
