//! Post-quantum algorithm identification
//!
//! A PQ signature travels as `[algorithm id] ∥ raw signature`, so a verifier
//! can dispatch without out-of-band metadata.
//!
//! | Algorithm | Id | In-process |
//! |-----------|----|------------|
//! | Dilithium2 | 0x01 | yes |
//! | Dilithium3 | 0x02 | yes (default) |
//! | Dilithium5 | 0x03 | yes |
//! | Falcon-512 | 0x04 | no |
//! | Falcon-1024 | 0x05 | no |

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{CryptoError, Result};

/// Post-quantum signature algorithm
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PqAlgorithm {
    Dilithium2,
    #[default]
    Dilithium3,
    Dilithium5,
    Falcon512,
    Falcon1024,
}

impl PqAlgorithm {
    pub const ALL: [Self; 5] = [
        Self::Dilithium2,
        Self::Dilithium3,
        Self::Dilithium5,
        Self::Falcon512,
        Self::Falcon1024,
    ];

    /// Wire identifier
    pub fn id(self) -> u8 {
        match self {
            Self::Dilithium2 => 0x01,
            Self::Dilithium3 => 0x02,
            Self::Dilithium5 => 0x03,
            Self::Falcon512 => 0x04,
            Self::Falcon1024 => 0x05,
        }
    }

    pub fn from_id(id: u8) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|alg| alg.id() == id)
            .ok_or(CryptoError::UnsupportedAlgorithm(id))
    }

    /// Lowercase name, also the key file prefix
    pub fn name(self) -> &'static str {
        match self {
            Self::Dilithium2 => "dilithium2",
            Self::Dilithium3 => "dilithium3",
            Self::Dilithium5 => "dilithium5",
            Self::Falcon512 => "falcon512",
            Self::Falcon1024 => "falcon1024",
        }
    }

    /// Whether this build can sign and verify in-process
    pub fn is_supported(self) -> bool {
        matches!(self, Self::Dilithium2 | Self::Dilithium3 | Self::Dilithium5)
    }
}

impl fmt::Display for PqAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PqAlgorithm {
    type Err = CryptoError;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "");
        Self::ALL
            .into_iter()
            .find(|alg| alg.name() == normalized)
            .ok_or_else(|| CryptoError::UnknownAlgorithm(s.to_string()))
    }
}

/// A PQ signature with its algorithm tag
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PqSignature {
    pub algorithm: PqAlgorithm,
    pub bytes: Vec<u8>,
}

impl PqSignature {
    pub fn new(algorithm: PqAlgorithm, bytes: Vec<u8>) -> Self {
        Self { algorithm, bytes }
    }

    /// `[id] ∥ signature`
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(1 + self.bytes.len());
        out.push(self.algorithm.id());
        out.extend_from_slice(&self.bytes);
        out
    }

    /// Splits off the algorithm tag. A tag with no body is malformed.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        match bytes {
            [id, body @ ..] if !body.is_empty() => {
                Ok(Self::new(PqAlgorithm::from_id(*id)?, body.to_vec()))
            }
            _ => Err(CryptoError::InvalidSignature(format!(
                "PQ signature of {} bytes has no body",
                bytes.len()
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_algorithm_ids() {
        for alg in PqAlgorithm::ALL {
            assert_eq!(PqAlgorithm::from_id(alg.id()).unwrap(), alg);
        }
        assert_eq!(PqAlgorithm::Dilithium3.id(), 0x02);
        assert_eq!(PqAlgorithm::from_id(0x00), Err(CryptoError::UnsupportedAlgorithm(0x00)));
        assert_eq!(PqAlgorithm::from_id(0x06), Err(CryptoError::UnsupportedAlgorithm(0x06)));
    }

    #[test]
    fn test_algorithm_names() {
        assert_eq!("Dilithium3".parse::<PqAlgorithm>().unwrap(), PqAlgorithm::Dilithium3);
        assert_eq!("falcon-512".parse::<PqAlgorithm>().unwrap(), PqAlgorithm::Falcon512);
        assert!("rsa".parse::<PqAlgorithm>().is_err());
        assert_eq!(PqAlgorithm::default().to_string(), "dilithium3");
    }

    #[test]
    fn test_supported_family() {
        assert!(PqAlgorithm::Dilithium5.is_supported());
        assert!(!PqAlgorithm::Falcon1024.is_supported());
    }

    #[test]
    fn test_signature_envelope() {
        let sig = PqSignature::new(PqAlgorithm::Dilithium2, vec![9, 8, 7]);
        let bytes = sig.to_bytes();
        assert_eq!(bytes, vec![0x01, 9, 8, 7]);
        assert_eq!(PqSignature::from_bytes(&bytes).unwrap(), sig);

        assert!(PqSignature::from_bytes(&[]).is_err());
        assert!(PqSignature::from_bytes(&[0x02]).is_err());
        assert_eq!(
            PqSignature::from_bytes(&[0x7f, 1]),
            Err(CryptoError::UnsupportedAlgorithm(0x7f))
        );
    }
}
