//! secp256k1 ECDSA backend
//!
//! Signs the 32-byte transaction hash directly (no further hashing) and
//! recovers the sender address from `(yParity, r, s)`.
//!
//! Address = keccak256(uncompressed pubkey without the 0x04 prefix)[12..32]

use k256::ecdsa::{RecoveryId, Signature, SigningKey, VerifyingKey};
use k256::elliptic_curve::sec1::ToEncodedPoint;
use k256::{FieldBytes, PublicKey};
use rand::rngs::OsRng;
use zeroize::Zeroizing;

use tandem_core::{
    keccak256, Address, ClassicalSigner, ClassicalVerifier, EcdsaSignature, Scalar, SignerError,
    TxHash,
};

use crate::error::{CryptoError, Result};

// ============================================================================
// Secret key
// ============================================================================

/// secp256k1 private key. The inner `SigningKey` zeroizes on drop.
#[derive(Clone)]
pub struct EcdsaSecretKey(SigningKey);

impl EcdsaSecretKey {
    /// Generate a new random key from the OS RNG
    pub fn generate() -> Self {
        Self(SigningKey::random(&mut OsRng))
    }

    /// From 32 big-endian bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        SigningKey::from_slice(bytes)
            .map(Self)
            .map_err(|e| CryptoError::InvalidSecretKey(e.to_string()))
    }

    /// From hex, with or without `0x`
    pub fn from_hex(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        let trimmed = trimmed.strip_prefix("0x").unwrap_or(trimmed);
        let bytes = Zeroizing::new(
            hex::decode(trimmed).map_err(|e| CryptoError::InvalidSecretKey(e.to_string()))?,
        );
        Self::from_bytes(&bytes)
    }

    pub fn to_bytes(&self) -> Zeroizing<[u8; 32]> {
        Zeroizing::new(self.0.to_bytes().into())
    }

    pub fn to_hex(&self) -> Zeroizing<String> {
        Zeroizing::new(hex::encode(*self.to_bytes()))
    }

    /// Account address controlled by this key
    pub fn address(&self) -> Address {
        public_key_to_address(self.0.verifying_key())
    }

    /// Recoverable signature over a prehashed digest, always low-s
    pub fn sign_digest(&self, digest: &TxHash) -> Result<EcdsaSignature> {
        let (signature, recovery_id) = self
            .0
            .sign_prehash_recoverable(digest.as_bytes())
            .map_err(|e| CryptoError::SigningFailed(e.to_string()))?;

        let (r, s) = signature.split_bytes();
        Ok(EcdsaSignature::new(
            recovery_id.is_y_odd() as u8,
            Scalar::from_bytes_be(&r),
            Scalar::from_bytes_be(&s),
        ))
    }
}

impl std::fmt::Debug for EcdsaSecretKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "EcdsaSecretKey({})", self.address())
    }
}

/// Address of an uncompressed secp256k1 public key
pub fn public_key_to_address(key: &VerifyingKey) -> Address {
    let encoded = PublicKey::from(key).to_encoded_point(false);
    let hash = keccak256(&encoded.as_bytes()[1..]);

    let mut address = [0u8; 20];
    address.copy_from_slice(&hash[12..]);
    Address::new(address)
}

/// Recovers the signer address, or `None` when the signature cannot be valid:
/// parity outside 0/1, zero or out-of-range components, high `s`, or no
/// recoverable point.
pub fn recover_address(digest: &TxHash, signature: &EcdsaSignature) -> Option<Address> {
    if signature.y_parity > 1 {
        return None;
    }

    let r = scalar_to_field_bytes(&signature.r)?;
    let s = scalar_to_field_bytes(&signature.s)?;
    let sig = Signature::from_scalars(r, s).ok()?;

    // Only the low-s form is canonical; the high-s twin is malleable
    if sig.normalize_s().is_some() {
        tracing::debug!("Rejecting high-s signature");
        return None;
    }

    let recovery_id = RecoveryId::new(signature.y_parity == 1, false);
    let key = VerifyingKey::recover_from_prehash(digest.as_bytes(), &sig, recovery_id).ok()?;
    Some(public_key_to_address(&key))
}

fn scalar_to_field_bytes(value: &Scalar) -> Option<FieldBytes> {
    let bytes = value.to_bytes_be();
    if bytes.len() > 32 {
        return None;
    }
    let mut out = [0u8; 32];
    out[32 - bytes.len()..].copy_from_slice(&bytes);
    Some(FieldBytes::from(out))
}

// ============================================================================
// Capability implementations
// ============================================================================

/// In-process secp256k1 signer and verifier
#[derive(Clone, Copy, Debug, Default)]
pub struct Secp256k1;

impl ClassicalSigner for Secp256k1 {
    type Key = EcdsaSecretKey;

    fn sign(&self, key: &EcdsaSecretKey, digest: &TxHash) -> std::result::Result<EcdsaSignature, SignerError> {
        Ok(key.sign_digest(digest)?)
    }
}

impl ClassicalVerifier for Secp256k1 {
    fn recover(
        &self,
        digest: &TxHash,
        signature: &EcdsaSignature,
    ) -> std::result::Result<Option<Address>, SignerError> {
        Ok(recover_address(digest, signature))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    const GOLDEN_KEY: &str = "8f2a55949038a9610f50fb23b5883af3b4ecb3c3bb792cbcefbd1542c692be63";

    /// secp256k1 group order
    const CURVE_ORDER: [u8; 32] =
        hex!("fffffffffffffffffffffffffffffffebaaedce6af48a03bbfd25e8cd0364141");

    #[test]
    fn test_golden_address() {
        let key = EcdsaSecretKey::from_hex(GOLDEN_KEY).unwrap();
        assert_eq!(
            key.address(),
            Address::new(hex!("fe3b557e8fb62b89f4916b721be55ceb828dbd73"))
        );
        assert_eq!(key.to_hex().as_str(), GOLDEN_KEY);
    }

    #[test]
    fn test_sign_and_recover() {
        let key = EcdsaSecretKey::generate();
        let digest = TxHash::new(keccak256(b"transfer"));

        let signature = key.sign_digest(&digest).unwrap();
        assert!(signature.y_parity <= 1);
        assert_eq!(recover_address(&digest, &signature), Some(key.address()));
    }

    #[test]
    fn test_signing_is_deterministic() {
        let key = EcdsaSecretKey::from_hex(GOLDEN_KEY).unwrap();
        let digest = TxHash::new([0x5a; 32]);
        assert_eq!(key.sign_digest(&digest).unwrap(), key.sign_digest(&digest).unwrap());
    }

    #[test]
    fn test_high_s_rejected() {
        let key = EcdsaSecretKey::generate();
        let digest = TxHash::new(keccak256(b"malleable"));
        let signature = key.sign_digest(&digest).unwrap();

        let twin = EcdsaSignature::new(
            signature.y_parity ^ 1,
            signature.r.clone(),
            Scalar::from_bytes_be(&CURVE_ORDER) - &signature.s,
        );
        assert_eq!(recover_address(&digest, &twin), None);
    }

    #[test]
    fn test_wrong_digest_recovers_other_address() {
        let key = EcdsaSecretKey::generate();
        let signature = key.sign_digest(&TxHash::new([1; 32])).unwrap();

        assert_ne!(recover_address(&TxHash::new([2; 32]), &signature), Some(key.address()));
    }

    #[test]
    fn test_degenerate_signatures() {
        let digest = TxHash::new([7; 32]);
        let zero = EcdsaSignature::new(0, Scalar::from(0u8), Scalar::from(1u8));
        let bad_parity = EcdsaSignature::new(27, Scalar::from(1u8), Scalar::from(1u8));
        let oversized = EcdsaSignature::new(0, Scalar::from_bytes_be(&[0xff; 33]), Scalar::from(1u8));

        assert_eq!(recover_address(&digest, &zero), None);
        assert_eq!(recover_address(&digest, &bad_parity), None);
        assert_eq!(recover_address(&digest, &oversized), None);
    }

    #[test]
    fn test_invalid_secret_keys() {
        assert!(EcdsaSecretKey::from_bytes(&[0u8; 32]).is_err());
        assert!(EcdsaSecretKey::from_bytes(&CURVE_ORDER).is_err());
        assert!(EcdsaSecretKey::from_hex("0xzz").is_err());
    }
}
