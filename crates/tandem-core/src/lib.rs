//! # Tandem Core
//!
//! Core of the Tandem hybrid transaction format (type `0x05`): a ledger
//! transaction that carries a secp256k1 ECDSA signature and an optional
//! post-quantum signature side by side, both over the same digest.
//!
//! This crate provides:
//! - `rlp` - Canonical recursive-length-prefix codec (encode and strict decode)
//! - `transaction` - The 9-field unsigned and 14-field signed field model
//! - `hash` - Keccak-256, the digest both signature schemes sign
//! - `signer` - Capability traits for classical and post-quantum signers
//! - `protocol` - Dual-signature attachment and the acceptance rule
//!
//! ## Lifecycle
//!
//! ```text
//!   UnsignedTransaction ──hash()──► TxHash ◄── both schemes sign this
//!          │
//!          └─sign_classical()─► ClassicallySigned ─┬─attach_pq()──► SignedTransaction
//!                                                  └─fallback()───► SignedTransaction
//!                                                                        │
//!                                          0x05 ∥ rlp(14 fields) ◄──encode()
//! ```
//!
//! Everything here is pure and synchronous. Signing and verification
//! backends are injected through the traits in [`signer`].

pub mod error;
pub mod hash;
pub mod protocol;
pub mod rlp;
pub mod signer;
pub mod transaction;
pub mod types;

pub use error::*;
pub use hash::*;
pub use protocol::*;
pub use signer::*;
pub use transaction::*;
pub use types::*;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::error::{Result, TxError};
    pub use crate::protocol::{ClassicallySigned, HybridVerifier, RejectReason, Verdict};
    pub use crate::signer::{
        ClassicalSigner, ClassicalVerifier, PqSigner, PqVerifier, SignerError,
    };
    pub use crate::transaction::{AccessListEntry, SignedTransaction, UnsignedTransaction};
    pub use crate::types::*;
}
