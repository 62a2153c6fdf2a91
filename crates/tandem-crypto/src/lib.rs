//! # Tandem Cryptography
//!
//! Signer and verifier backends for the capability traits in `tandem-core`:
//! - secp256k1 ECDSA with public-key recovery (k256)
//! - CRYSTALS-Dilithium detached signatures (pqcrypto-dilithium)
//! - A subprocess adapter for external PQ signing tools
//! - Key file storage
//!
//! ## Security Model
//!
//! | Role | Algorithm | Security Level |
//! |------|-----------|----------------|
//! | Classical signature | secp256k1 ECDSA, low-s | 128-bit |
//! | PQ signature | Dilithium2 / 3 / 5 | NIST PQ-2 / 3 / 5 |
//! | Digest | Keccak-256 | 256-bit |
//!
//! Secret keys are zeroized on drop.

pub mod dilithium;
pub mod ecdsa;
pub mod error;
pub mod external;
pub mod keys;
pub mod pq;

pub use dilithium::*;
pub use ecdsa::*;
pub use error::*;
pub use external::*;
pub use keys::*;
pub use pq::*;

/// Cryptographic prelude
pub mod prelude {
    pub use crate::dilithium::{DilithiumSecretKey, DilithiumSigner, DilithiumVerifier};
    pub use crate::ecdsa::{EcdsaSecretKey, Secp256k1};
    pub use crate::error::{CryptoError, Result};
    pub use crate::external::CommandPqSigner;
    pub use crate::keys::{load_ecdsa_key, load_pq_public_key, load_pq_secret_key, PqKeyFiles};
    pub use crate::pq::{PqAlgorithm, PqSignature};
}
