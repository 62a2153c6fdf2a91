//! Hybrid transaction field model
//!
//! Unsigned field order (the hash preimage):
//!
//! ```text
//! [chainId, nonce, maxPriorityFeePerGas, maxFeePerGas, gasLimit, to, value, data, accessList]
//! ```
//!
//! Signed field order (the wire form) appends the classical signature and
//! the post-quantum pair:
//!
//! ```text
//! [...unsigned, yParity, r, s, pqSignature, pqPublicKey]
//! ```
//!
//! Both are prefixed on the wire by [`HYBRID_TX_TYPE`]. Reordering any field
//! changes the hash and invalidates every signature.

use serde::{Deserialize, Serialize};

use crate::error::{Result, TxError};
use crate::hash::{keccak256, Keccak256Hasher};
use crate::rlp::{self, RlpError, RlpItem};
use crate::types::{
    Address, EcdsaSignature, Scalar, SignatureMode, TxHash, HYBRID_TX_TYPE, SIGNED_FIELD_COUNT,
    UNSIGNED_FIELD_COUNT,
};

// ============================================================================
// Access list
// ============================================================================

/// One access-list entry: an address and the storage slots it will touch
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AccessListEntry {
    pub address: Address,
    pub storage_keys: Vec<[u8; 32]>,
}

impl AccessListEntry {
    pub fn new(address: Address, storage_keys: Vec<[u8; 32]>) -> Self {
        Self {
            address,
            storage_keys,
        }
    }

    /// `[address, [key, ...]]`
    fn encode(&self) -> Vec<u8> {
        let keys: Vec<Vec<u8>> = self.storage_keys.iter().map(|k| rlp::encode_bytes(k)).collect();
        rlp::encode_list(&[
            rlp::encode_bytes(self.address.as_bytes()),
            rlp::encode_list(&keys),
        ])
    }

    fn decode(item: &RlpItem<'_>) -> Result<Self> {
        let parts = item.as_list()?;
        if parts.len() != 2 {
            return Err(invalid("access_list", format!("entry has {} items, expected 2", parts.len())));
        }

        let address = Address::from_slice(parts[0].as_bytes()?)
            .map_err(|e| invalid("access_list", e.to_string()))?;

        let storage_keys = parts[1]
            .as_list()?
            .iter()
            .map(|key| {
                let bytes = key.as_bytes()?;
                <[u8; 32]>::try_from(bytes)
                    .map_err(|_| invalid("access_list", format!("storage key of {} bytes", bytes.len())))
            })
            .collect::<Result<Vec<[u8; 32]>>>()?;

        Ok(Self {
            address,
            storage_keys,
        })
    }
}

// ============================================================================
// Unsigned transaction
// ============================================================================

/// The nine signed-over fields of a hybrid transaction.
///
/// Built from user intent, hashed, then discarded; it is never transmitted
/// on its own.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct UnsignedTransaction {
    pub chain_id: Scalar,
    pub nonce: u64,
    pub max_priority_fee_per_gas: Scalar,
    pub max_fee_per_gas: Scalar,
    pub gas_limit: u64,
    /// `None` for contract creation, encoded as the empty string
    pub to: Option<Address>,
    pub value: Scalar,
    pub data: Vec<u8>,
    pub access_list: Vec<AccessListEntry>,
}

impl UnsignedTransaction {
    /// Individually encoded fields, in wire order
    pub fn encode_fields(&self) -> Vec<Vec<u8>> {
        let access_list: Vec<Vec<u8>> = self.access_list.iter().map(AccessListEntry::encode).collect();
        vec![
            rlp::encode_scalar(&self.chain_id),
            rlp::encode_u64(self.nonce),
            rlp::encode_scalar(&self.max_priority_fee_per_gas),
            rlp::encode_scalar(&self.max_fee_per_gas),
            rlp::encode_u64(self.gas_limit),
            rlp::encode_bytes(self.to.as_ref().map(|a| &a.as_bytes()[..]).unwrap_or(&[])),
            rlp::encode_scalar(&self.value),
            rlp::encode_bytes(&self.data),
            rlp::encode_list(&access_list),
        ]
    }

    /// `0x05 ∥ rlp(unsigned fields)`, the exact bytes that get hashed
    pub fn signing_payload(&self) -> Vec<u8> {
        let list = rlp::encode_list(&self.encode_fields());
        let mut payload = Vec::with_capacity(1 + list.len());
        payload.push(HYBRID_TX_TYPE);
        payload.extend_from_slice(&list);
        payload
    }

    /// The digest both signature schemes sign. Pure; safe to call repeatedly.
    pub fn hash(&self) -> TxHash {
        compute_hash(self)
    }

    /// Parses a signing payload (`0x05 ∥ rlp(9 fields)`)
    pub fn decode_unsigned(bytes: &[u8]) -> Result<Self> {
        let fields = decode_field_list(bytes, UNSIGNED_FIELD_COUNT)?;
        Self::from_fields(&fields)
    }

    /// Builds from the first nine decoded fields
    fn from_fields(fields: &[RlpItem<'_>]) -> Result<Self> {
        let to = match fields[5].as_bytes()? {
            [] => None,
            bytes => Some(Address::from_slice(bytes).map_err(|e| invalid("to", e.to_string()))?),
        };

        let access_list = fields[8]
            .as_list()?
            .iter()
            .map(AccessListEntry::decode)
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            chain_id: fields[0].as_scalar()?,
            nonce: fields[1].as_u64()?,
            max_priority_fee_per_gas: fields[2].as_scalar()?,
            max_fee_per_gas: fields[3].as_scalar()?,
            gas_limit: fields[4].as_u64()?,
            to,
            value: fields[6].as_scalar()?,
            data: fields[7].as_bytes()?.to_vec(),
            access_list,
        })
    }
}

/// Keccak-256 over `0x05 ∥ rlp(unsigned fields)`.
///
/// Signature fields never enter the preimage, so every signer signs the same
/// 32 bytes.
pub fn compute_hash(tx: &UnsignedTransaction) -> TxHash {
    let list = rlp::encode_list(&tx.encode_fields());

    let mut hasher = Keccak256Hasher::new();
    hasher.update(&[HYBRID_TX_TYPE]);
    hasher.update(&list);
    let hash = TxHash::new(hasher.finalize());

    tracing::debug!(%hash, payload_len = list.len() + 1, "Computed hybrid transaction hash");
    hash
}

// ============================================================================
// Signed transaction
// ============================================================================

/// The fourteen-field transmission unit.
///
/// Only constructed once a classical signature exists. The post-quantum
/// fields are always present on the wire and may both be empty (fallback).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SignedTransaction {
    tx: UnsignedTransaction,
    signature: EcdsaSignature,
    pq_signature: Vec<u8>,
    pq_public_key: Vec<u8>,
}

impl SignedTransaction {
    /// Assembles a signed transaction from its parts.
    ///
    /// Only checks structure (parity 0/1, 256-bit components); whether the
    /// signatures are valid is decided by [`crate::protocol::HybridVerifier`].
    pub fn from_parts(
        tx: UnsignedTransaction,
        signature: EcdsaSignature,
        pq_signature: Vec<u8>,
        pq_public_key: Vec<u8>,
    ) -> Result<Self> {
        if !signature.is_well_formed() {
            return Err(invalid(
                "signature",
                format!("y_parity {} or component exceeds 256 bits", signature.y_parity),
            ));
        }
        Ok(Self::assemble(tx, signature, pq_signature, pq_public_key))
    }

    /// For signatures already known to be well formed
    pub(crate) fn assemble(
        tx: UnsignedTransaction,
        signature: EcdsaSignature,
        pq_signature: Vec<u8>,
        pq_public_key: Vec<u8>,
    ) -> Self {
        Self {
            tx,
            signature,
            pq_signature,
            pq_public_key,
        }
    }

    pub fn unsigned(&self) -> &UnsignedTransaction {
        &self.tx
    }

    pub fn signature(&self) -> &EcdsaSignature {
        &self.signature
    }

    pub fn pq_signature(&self) -> &[u8] {
        &self.pq_signature
    }

    pub fn pq_public_key(&self) -> &[u8] {
        &self.pq_public_key
    }

    /// Classical-only when both post-quantum fields are empty
    pub fn mode(&self) -> SignatureMode {
        if self.pq_signature.is_empty() && self.pq_public_key.is_empty() {
            SignatureMode::ClassicalOnly
        } else {
            SignatureMode::Hybrid
        }
    }

    /// Recomputes the signed-over hash from fields 1-9 only
    pub fn signing_hash(&self) -> TxHash {
        compute_hash(&self.tx)
    }

    /// Wire form: `0x05 ∥ rlp(14 fields)`
    pub fn encode(&self) -> Vec<u8> {
        let mut fields = self.tx.encode_fields();
        fields.extend([
            rlp::encode_u64(self.signature.y_parity as u64),
            rlp::encode_scalar(&self.signature.r),
            rlp::encode_scalar(&self.signature.s),
            rlp::encode_bytes(&self.pq_signature),
            rlp::encode_bytes(&self.pq_public_key),
        ]);

        let list = rlp::encode_list(&fields);
        let mut encoded = Vec::with_capacity(1 + list.len());
        encoded.push(HYBRID_TX_TYPE);
        encoded.extend_from_slice(&list);
        encoded
    }

    /// Identifier of the transmitted transaction: Keccak-256 of the full
    /// wire form. Differs from [`Self::signing_hash`].
    pub fn envelope_hash(&self) -> TxHash {
        TxHash::new(keccak256(&self.encode()))
    }

    /// Parses the wire form
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let fields = decode_field_list(bytes, SIGNED_FIELD_COUNT)?;
        let tx = UnsignedTransaction::from_fields(&fields[..UNSIGNED_FIELD_COUNT])?;

        let y_parity = fields[9].as_u64()?;
        if y_parity > 1 {
            return Err(invalid("y_parity", format!("expected 0 or 1, got {}", y_parity)));
        }
        let signature = EcdsaSignature::new(
            y_parity as u8,
            decode_u256(&fields[10], "r")?,
            decode_u256(&fields[11], "s")?,
        );

        Ok(Self {
            tx,
            signature,
            pq_signature: fields[12].as_bytes()?.to_vec(),
            pq_public_key: fields[13].as_bytes()?.to_vec(),
        })
    }

    pub fn into_parts(self) -> (UnsignedTransaction, EcdsaSignature, Vec<u8>, Vec<u8>) {
        (self.tx, self.signature, self.pq_signature, self.pq_public_key)
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Strips the type tag and returns the top-level field list of the expected arity
fn decode_field_list(bytes: &[u8], expected: usize) -> Result<Vec<RlpItem<'_>>> {
    let payload = match bytes.split_first() {
        Some((&HYBRID_TX_TYPE, rest)) => rest,
        Some((&other, _)) => return Err(TxError::UnsupportedTransactionType(other)),
        None => return Err(RlpError::EmptyInput.into()),
    };

    let fields = match rlp::decode_exact(payload)? {
        RlpItem::List(fields) => fields,
        RlpItem::String(_) => return Err(RlpError::ExpectedList.into()),
    };

    if fields.len() != expected {
        return Err(TxError::FieldCount {
            expected,
            found: fields.len(),
        });
    }
    Ok(fields)
}

fn decode_u256(item: &RlpItem<'_>, field: &'static str) -> Result<Scalar> {
    let value = item.as_scalar()?;
    if value.bits() > 256 {
        return Err(invalid(field, format!("{} bits exceeds 256", value.bits())));
    }
    Ok(value)
}

fn invalid(field: &'static str, reason: String) -> TxError {
    TxError::InvalidField { field, reason }
}
