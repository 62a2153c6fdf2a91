//! Core type definitions for the hybrid transaction format

use num_bigint::BigUint;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Result, TxError};

/// Transaction type tag identifying the hybrid format on the wire.
///
/// Prepended to the RLP field list and part of the hash preimage.
pub const HYBRID_TX_TYPE: u8 = 0x05;

/// Number of fields in the unsigned (hash preimage) encoding
pub const UNSIGNED_FIELD_COUNT: usize = 9;

/// Number of fields in the signed (wire) encoding
pub const SIGNED_FIELD_COUNT: usize = 14;

/// Non-negative integer of unbounded size (chain id, fees, value, r, s)
pub type Scalar = BigUint;

/// Address - 20-byte account identifier
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Address([u8; 20]);

impl Address {
    /// Length of an address in bytes
    pub const LEN: usize = 20;

    /// Zero address
    pub const ZERO: Self = Self([0u8; 20]);

    pub fn new(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    /// Build from a slice that must be exactly 20 bytes long
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let array: [u8; 20] = bytes.try_into().map_err(|_| TxError::InvalidField {
            field: "address",
            reason: format!("expected {} bytes, got {}", Self::LEN, bytes.len()),
        })?;
        Ok(Self(array))
    }

    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse from hex, with or without a `0x` prefix
    pub fn from_hex(s: &str) -> Result<Self> {
        let bytes = decode_hex("address", s)?;
        Self::from_slice(&bytes)
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address(0x{})", self.to_hex())
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", self.to_hex())
    }
}

impl From<[u8; 20]> for Address {
    fn from(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }
}

/// TxHash - Keccak-256 digest of `type ∥ rlp(unsigned fields)`
///
/// The only payload either signature scheme ever signs.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct TxHash([u8; 32]);

impl TxHash {
    pub fn new(hash: [u8; 32]) -> Self {
        Self(hash)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse from hex, with or without a `0x` prefix. Must be exactly 32 bytes.
    pub fn from_hex(s: &str) -> Result<Self> {
        let bytes = decode_hex("hash", s)?;
        let array: [u8; 32] = bytes.as_slice().try_into().map_err(|_| TxError::InvalidField {
            field: "hash",
            reason: format!("expected 32 bytes, got {}", bytes.len()),
        })?;
        Ok(Self(array))
    }
}

impl fmt::Debug for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TxHash({})", &self.to_hex()[..16])
    }
}

impl fmt::Display for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", self.to_hex())
    }
}

impl AsRef<[u8]> for TxHash {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// Classical ECDSA signature as carried in fields 10-12 of the signed encoding
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EcdsaSignature {
    /// Recovery parity, 0 or 1
    pub y_parity: u8,

    /// Signature component r
    pub r: Scalar,

    /// Signature component s
    pub s: Scalar,
}

impl EcdsaSignature {
    pub fn new(y_parity: u8, r: Scalar, s: Scalar) -> Self {
        Self { y_parity, r, s }
    }

    /// Structural check only: parity is 0/1 and both components fit in 256 bits.
    /// Cryptographic validity is the verifier's job.
    pub fn is_well_formed(&self) -> bool {
        self.y_parity <= 1 && self.r.bits() <= 256 && self.s.bits() <= 256
    }
}

/// Which signatures a signed transaction carries
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignatureMode {
    /// ECDSA plus a post-quantum signature over the same hash
    Hybrid,

    /// ECDSA only; post-quantum fields are empty
    ClassicalOnly,
}

impl fmt::Display for SignatureMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Hybrid => write!(f, "hybrid"),
            Self::ClassicalOnly => write!(f, "classical-only"),
        }
    }
}

fn decode_hex(field: &'static str, s: &str) -> Result<Vec<u8>> {
    let trimmed = s.strip_prefix("0x").unwrap_or(s);
    hex::decode(trimmed).map_err(|e| TxError::InvalidField {
        field,
        reason: e.to_string(),
    })
}
