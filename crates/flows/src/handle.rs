// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use alloy::primitives::{Address, Bytes, FixedBytes};
use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Reference to a ciphertext held by the coprocessor. Aggregates that have never been written
/// are returned by the contracts as the all-zero value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CiphertextHandle(pub FixedBytes<32>);

impl CiphertextHandle {
    pub const SENTINEL: CiphertextHandle = CiphertextHandle(FixedBytes::ZERO);

    pub fn is_sentinel(&self) -> bool {
        self.0 == FixedBytes::ZERO
    }

    pub fn as_bytes32(&self) -> FixedBytes<32> {
        self.0
    }
}

impl From<FixedBytes<32>> for CiphertextHandle {
    fn from(value: FixedBytes<32>) -> Self {
        Self(value)
    }
}

impl fmt::Display for CiphertextHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Which encrypted aggregate of a contract to read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Slot {
    /// Tally of a vote option, zero-based
    Tally(u8),
    /// Sum of all rating scores
    Sum,
    /// Number of ratings
    Count,
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Slot::Tally(i) => write!(f, "tally[{i}]"),
            Slot::Sum => write!(f, "sum"),
            Slot::Count => write!(f, "count"),
        }
    }
}

/// A single 32-bit plaintext queued for encryption
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlainU32(pub u32);

/// Builder for one encryption call. The ciphertexts it produces are only accepted by `contract`
/// when submitted by `submitter`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptionRequest {
    pub contract: Address,
    pub submitter: Address,
    pub values: Vec<PlainU32>,
}

impl EncryptionRequest {
    pub fn new(contract: Address, submitter: Address) -> Self {
        Self {
            contract,
            submitter,
            values: vec![],
        }
    }

    pub fn add32(mut self, value: u32) -> Self {
        self.values.push(PlainU32(value));
        self
    }
}

/// Result of encrypting an [`EncryptionRequest`]. Built fresh for every submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedInput {
    pub contract: Address,
    pub submitter: Address,
    pub handles: Vec<CiphertextHandle>,
    pub proof: Bytes,
}

impl EncryptedInput {
    /// Single-value submissions always use the first handle
    pub fn first_handle(&self) -> Result<CiphertextHandle> {
        match self.handles.first() {
            Some(handle) => Ok(*handle),
            None => bail!("Encryption returned no ciphertext handles"),
        }
    }

    pub fn is_bound_to(&self, contract: Address, submitter: Address) -> bool {
        self.contract == contract && self.submitter == submitter
    }
}

/// A decrypted aggregate. Held in memory only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecryptedValue {
    pub slot: Slot,
    pub handle: CiphertextHandle,
    pub requester: Address,
    pub value: u64,
}
