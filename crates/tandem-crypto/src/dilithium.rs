//! CRYSTALS-Dilithium backend (NIST PQ-2/3/5)
//!
//! Produces detached signatures over the transaction hash, tagged with the
//! algorithm id (see [`crate::pq`]). Key and signature sizes are taken from
//! the linked `pqcrypto-dilithium` build.

use pqcrypto_traits::sign::{DetachedSignature as _, PublicKey as _, SecretKey as _};
use zeroize::{Zeroize, ZeroizeOnDrop};

use tandem_core::{PqSigner, PqVerifier, SignerError, TxHash};

use crate::error::{CryptoError, Result};
use crate::pq::{PqAlgorithm, PqSignature};

/// Runs `$body` with `$m` bound to the pqcrypto module for `$alg`.
/// Non-Dilithium algorithms yield `UnsupportedAlgorithm`.
macro_rules! with_dilithium {
    ($alg:expr, |$m:ident| $body:expr) => {
        match $alg {
            PqAlgorithm::Dilithium2 => {
                use pqcrypto_dilithium::dilithium2 as $m;
                $body
            }
            PqAlgorithm::Dilithium3 => {
                use pqcrypto_dilithium::dilithium3 as $m;
                $body
            }
            PqAlgorithm::Dilithium5 => {
                use pqcrypto_dilithium::dilithium5 as $m;
                $body
            }
            other => Err(CryptoError::UnsupportedAlgorithm(other.id())),
        }
    };
}

// ============================================================================
// Sizes
// ============================================================================

pub fn public_key_len(algorithm: PqAlgorithm) -> Result<usize> {
    with_dilithium!(algorithm, |m| Ok(m::public_key_bytes()))
}

pub fn secret_key_len(algorithm: PqAlgorithm) -> Result<usize> {
    with_dilithium!(algorithm, |m| Ok(m::secret_key_bytes()))
}

pub fn signature_len(algorithm: PqAlgorithm) -> Result<usize> {
    with_dilithium!(algorithm, |m| Ok(m::signature_bytes()))
}

/// Identifies the Dilithium variant of a raw public key by its length
pub fn algorithm_for_public_key(public_key: &[u8]) -> Result<PqAlgorithm> {
    infer_by_len(public_key.len(), public_key_len)
        .ok_or_else(|| CryptoError::InvalidPublicKey(format!("no algorithm has {}-byte public keys", public_key.len())))
}

/// Identifies the Dilithium variant of a raw secret key by its length
pub fn algorithm_for_secret_key(secret_key: &[u8]) -> Result<PqAlgorithm> {
    infer_by_len(secret_key.len(), secret_key_len)
        .ok_or_else(|| CryptoError::InvalidSecretKey(format!("no algorithm has {}-byte secret keys", secret_key.len())))
}

fn infer_by_len(len: usize, size_of: fn(PqAlgorithm) -> Result<usize>) -> Option<PqAlgorithm> {
    PqAlgorithm::ALL
        .into_iter()
        .filter(|alg| alg.is_supported())
        .find(|alg| size_of(*alg).ok() == Some(len))
}

// ============================================================================
// Secret key
// ============================================================================

/// Dilithium secret key (zeroized on drop)
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct DilithiumSecretKey {
    #[zeroize(skip)]
    algorithm: PqAlgorithm,

    bytes: Vec<u8>,
}

impl DilithiumSecretKey {
    /// Wraps raw key bytes, checking the length for `algorithm`
    pub fn from_bytes(algorithm: PqAlgorithm, bytes: Vec<u8>) -> Result<Self> {
        let expected = secret_key_len(algorithm)?;
        if bytes.len() != expected {
            return Err(CryptoError::InvalidSecretKey(format!(
                "{} secret key must be {} bytes, got {}",
                algorithm,
                expected,
                bytes.len()
            )));
        }
        Ok(Self { algorithm, bytes })
    }

    /// Wraps raw key bytes, inferring the algorithm from the length
    pub fn infer(bytes: Vec<u8>) -> Result<Self> {
        let algorithm = algorithm_for_secret_key(&bytes)?;
        Ok(Self { algorithm, bytes })
    }

    pub fn algorithm(&self) -> PqAlgorithm {
        self.algorithm
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Detached signature over `message`
    pub fn sign(&self, message: &[u8]) -> Result<PqSignature> {
        let raw = with_dilithium!(self.algorithm, |m| {
            let sk = m::SecretKey::from_bytes(&self.bytes)
                .map_err(|e| CryptoError::InvalidSecretKey(e.to_string()))?;
            Ok(m::detached_sign(message, &sk).as_bytes().to_vec())
        })?;
        Ok(PqSignature::new(self.algorithm, raw))
    }
}

impl std::fmt::Debug for DilithiumSecretKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "DilithiumSecretKey({}, {} bytes)", self.algorithm, self.bytes.len())
    }
}

// ============================================================================
// Signer
// ============================================================================

/// In-process Dilithium signer
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DilithiumSigner {
    algorithm: PqAlgorithm,
}

impl DilithiumSigner {
    pub fn new(algorithm: PqAlgorithm) -> Result<Self> {
        if !algorithm.is_supported() {
            return Err(CryptoError::UnsupportedAlgorithm(algorithm.id()));
        }
        Ok(Self { algorithm })
    }

    pub fn algorithm(&self) -> PqAlgorithm {
        self.algorithm
    }

    /// Fresh keypair: secret key and raw public key bytes
    pub fn generate(&self) -> Result<(DilithiumSecretKey, Vec<u8>)> {
        let algorithm = self.algorithm;
        with_dilithium!(algorithm, |m| {
            let (pk, sk) = m::keypair();
            tracing::debug!(%algorithm, public_key_len = pk.as_bytes().len(), "Generated PQ keypair");
            Ok((
                DilithiumSecretKey {
                    algorithm,
                    bytes: sk.as_bytes().to_vec(),
                },
                pk.as_bytes().to_vec(),
            ))
        })
    }
}

impl Default for DilithiumSigner {
    fn default() -> Self {
        Self {
            algorithm: PqAlgorithm::Dilithium3,
        }
    }
}

impl PqSigner for DilithiumSigner {
    type KeyHandle = DilithiumSecretKey;

    fn generate_keypair(&self) -> std::result::Result<(DilithiumSecretKey, Vec<u8>), SignerError> {
        Ok(self.generate()?)
    }

    fn sign(&self, key: &DilithiumSecretKey, digest: &TxHash) -> std::result::Result<Vec<u8>, SignerError> {
        Ok(key.sign(digest.as_bytes())?.to_bytes())
    }
}

// ============================================================================
// Verifier
// ============================================================================

/// In-process verifier for tagged Dilithium signatures
#[derive(Clone, Copy, Debug, Default)]
pub struct DilithiumVerifier;

impl DilithiumVerifier {
    /// `Ok(false)` for any signature that does not verify, including unknown
    /// algorithm ids and unparsable keys or bodies. `Err` only for a known
    /// algorithm this build cannot check.
    pub fn verify_message(public_key: &[u8], message: &[u8], signature: &[u8]) -> Result<bool> {
        let (&id, body) = match signature.split_first() {
            Some(split) => split,
            None => return Ok(false),
        };

        let algorithm = match PqAlgorithm::from_id(id) {
            Ok(algorithm) => algorithm,
            Err(_) => {
                tracing::debug!(id, "Unknown PQ algorithm id");
                return Ok(false);
            }
        };
        if !algorithm.is_supported() {
            return Err(CryptoError::UnsupportedAlgorithm(id));
        }

        with_dilithium!(algorithm, |m| {
            let pk = match m::PublicKey::from_bytes(public_key) {
                Ok(pk) => pk,
                Err(e) => {
                    tracing::debug!(%algorithm, error = %e, "Unparsable PQ public key");
                    return Ok(false);
                }
            };
            let sig = match m::DetachedSignature::from_bytes(body) {
                Ok(sig) => sig,
                Err(e) => {
                    tracing::debug!(%algorithm, error = %e, "Unparsable PQ signature");
                    return Ok(false);
                }
            };
            Ok(m::verify_detached_signature(&sig, message, &pk).is_ok())
        })
    }
}

impl PqVerifier for DilithiumVerifier {
    fn verify(
        &self,
        public_key: &[u8],
        digest: &TxHash,
        signature: &[u8],
    ) -> std::result::Result<bool, SignerError> {
        Ok(Self::verify_message(public_key, digest.as_bytes(), signature)?)
    }
}
