//! Keccak-256 hashing
//!
//! The host ledger uses Keccak-256 (pre-NIST padding) for transaction
//! hashes, address derivation and general message digests.

use tiny_keccak::{Hasher, Keccak};

/// Keccak-256 of `data`
pub fn keccak256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak::v256();
    hasher.update(data);
    let mut output = [0u8; 32];
    hasher.finalize(&mut output);
    output
}

/// Streaming Keccak-256 hasher, for preimages assembled from several parts
pub struct Keccak256Hasher {
    inner: Keccak,
}

impl Keccak256Hasher {
    pub fn new() -> Self {
        Self {
            inner: Keccak::v256(),
        }
    }

    pub fn update(&mut self, data: &[u8]) {
        self.inner.update(data);
    }

    pub fn finalize(self) -> [u8; 32] {
        let mut output = [0u8; 32];
        self.inner.finalize(&mut output);
        output
    }
}

impl Default for Keccak256Hasher {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    #[test]
    fn test_keccak256_empty() {
        assert_eq!(
            keccak256(b""),
            hex!("c5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470")
        );
    }

    #[test]
    fn test_keccak256_hello() {
        assert_eq!(
            keccak256(b"hello"),
            hex!("1c8aff950685c2ed4bc3174f3472287b56d9517b9c948127319a09a7a36deac8")
        );
    }

    #[test]
    fn test_streaming_matches_one_shot() {
        let mut hasher = Keccak256Hasher::new();
        hasher.update(b"hello");
        hasher.update(b" ");
        hasher.update(b"world");

        assert_eq!(hasher.finalize(), keccak256(b"hello world"));
    }
}
