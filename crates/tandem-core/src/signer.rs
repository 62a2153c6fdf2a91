//! Signer and verifier capabilities
//!
//! The core never signs or verifies anything itself. Both schemes are
//! injected through these traits, so a backend can be an in-process library,
//! a subprocess or a remote service. Key material is always passed
//! explicitly; there is no ambient "current key".

use thiserror::Error;

use crate::types::{Address, EcdsaSignature, TxHash};

/// Failure of an external signing or verification backend.
///
/// Surfaced to the caller unchanged as
/// [`TxError::ExternalSignerFailure`](crate::error::TxError::ExternalSignerFailure).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SignerError {
    /// Backend could not be reached (process failed to spawn, service down)
    #[error("Signer unavailable: {0}")]
    Unavailable(String),

    /// Backend ran but reported an error
    #[error("Signer failed: {0}")]
    Failed(String),

    /// Key material was rejected by the backend
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    /// Backend does not implement the requested algorithm
    #[error("Unsupported algorithm id: 0x{0:02x}")]
    UnsupportedAlgorithm(u8),

    /// Backend output could not be parsed
    #[error("Malformed signer output: {0}")]
    MalformedOutput(String),
}

impl SignerError {
    /// Whether the same call might succeed later
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}

/// Produces classical (secp256k1 ECDSA) signatures over a transaction hash.
pub trait ClassicalSigner {
    /// Private key material accepted by this backend
    type Key: ?Sized;

    fn sign(&self, key: &Self::Key, digest: &TxHash) -> Result<EcdsaSignature, SignerError>;
}

/// Recovers the signer of a classical signature.
pub trait ClassicalVerifier {
    /// Returns the address that produced `signature` over `digest`, or `None`
    /// if the signature does not recover to any key.
    fn recover(
        &self,
        digest: &TxHash,
        signature: &EcdsaSignature,
    ) -> Result<Option<Address>, SignerError>;
}

/// Post-quantum key generation and signing.
///
/// Signatures and public keys are opaque byte strings to the core.
pub trait PqSigner {
    /// Handle to a private key: in-memory bytes, a file path, a remote id
    type KeyHandle;

    /// Creates a fresh keypair, returning the private handle and public key bytes
    fn generate_keypair(&self) -> Result<(Self::KeyHandle, Vec<u8>), SignerError>;

    fn sign(&self, key: &Self::KeyHandle, digest: &TxHash) -> Result<Vec<u8>, SignerError>;
}

/// Post-quantum signature verification.
pub trait PqVerifier {
    /// `Ok(false)` means the signature is invalid; `Err` means the backend
    /// could not decide.
    fn verify(
        &self,
        public_key: &[u8],
        digest: &TxHash,
        signature: &[u8],
    ) -> Result<bool, SignerError>;
}
