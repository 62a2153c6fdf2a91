//! JSON rendering of decoded transactions
//!
//! Scalars are decimal strings so that 256-bit values survive JSON readers
//! that parse numbers as doubles. Byte strings are 0x-prefixed hex.

use serde::Serialize;
use tandem_core::{SignatureMode, SignedTransaction, UnsignedTransaction};

#[derive(Debug, Serialize)]
pub struct TransactionView {
    #[serde(rename = "type")]
    pub tx_type: String,
    pub hash: String,
    pub envelope_hash: String,
    pub mode: SignatureMode,
    #[serde(flatten)]
    pub fields: FieldsView,
    pub y_parity: u8,
    pub r: String,
    pub s: String,
    /// Algorithm named by the first signature byte, if any
    pub pq_algorithm: Option<String>,
    pub pq_signature: String,
    pub pq_public_key: String,
}

#[derive(Debug, Serialize)]
pub struct FieldsView {
    pub chain_id: String,
    pub nonce: String,
    pub max_priority_fee_per_gas: String,
    pub max_fee_per_gas: String,
    pub gas_limit: String,
    pub to: Option<String>,
    pub value: String,
    pub data: String,
    pub access_list: Vec<AccessListView>,
}

#[derive(Debug, Serialize)]
pub struct AccessListView {
    pub address: String,
    pub storage_keys: Vec<String>,
}

impl From<&UnsignedTransaction> for FieldsView {
    fn from(tx: &UnsignedTransaction) -> Self {
        Self {
            chain_id: tx.chain_id.to_str_radix(10),
            nonce: tx.nonce.to_string(),
            max_priority_fee_per_gas: tx.max_priority_fee_per_gas.to_str_radix(10),
            max_fee_per_gas: tx.max_fee_per_gas.to_str_radix(10),
            gas_limit: tx.gas_limit.to_string(),
            to: tx.to.as_ref().map(ToString::to_string),
            value: tx.value.to_str_radix(10),
            data: hex_bytes(&tx.data),
            access_list: tx
                .access_list
                .iter()
                .map(|entry| AccessListView {
                    address: entry.address.to_string(),
                    storage_keys: entry.storage_keys.iter().map(|k| hex_bytes(k)).collect(),
                })
                .collect(),
        }
    }
}

impl From<&SignedTransaction> for TransactionView {
    fn from(tx: &SignedTransaction) -> Self {
        let signature = tx.signature();
        let pq_algorithm = tx.pq_signature().first().map(|&id| {
            tandem_crypto::PqAlgorithm::from_id(id)
                .map(|algorithm| algorithm.to_string())
                .unwrap_or_else(|_| format!("unknown (0x{:02x})", id))
        });

        Self {
            tx_type: format!("0x{:02x}", tandem_core::HYBRID_TX_TYPE),
            hash: tx.signing_hash().to_string(),
            envelope_hash: tx.envelope_hash().to_string(),
            mode: tx.mode(),
            fields: FieldsView::from(tx.unsigned()),
            y_parity: signature.y_parity,
            r: signature.r.to_str_radix(10),
            s: signature.s.to_str_radix(10),
            pq_algorithm,
            pq_signature: hex_bytes(tx.pq_signature()),
            pq_public_key: hex_bytes(tx.pq_public_key()),
        }
    }
}

fn hex_bytes(bytes: &[u8]) -> String {
    format!("0x{}", hex::encode(bytes))
}
