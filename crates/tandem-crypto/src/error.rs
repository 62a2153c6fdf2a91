//! Cryptographic error types

use std::path::PathBuf;

use tandem_core::SignerError;
use thiserror::Error;

/// Result type for cryptographic operations
pub type Result<T> = std::result::Result<T, CryptoError>;

/// Errors in cryptographic operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CryptoError {
    /// Invalid public key
    #[error("Invalid public key: {0}")]
    InvalidPublicKey(String),

    /// Invalid secret key
    #[error("Invalid secret key: {0}")]
    InvalidSecretKey(String),

    /// Signature bytes are structurally invalid
    #[error("Invalid signature: {0}")]
    InvalidSignature(String),

    /// Signing primitive failed
    #[error("Signing failed: {0}")]
    SigningFailed(String),

    /// Algorithm id unknown, or known but not built in
    #[error("Unsupported PQ algorithm id: 0x{0:02x}")]
    UnsupportedAlgorithm(u8),

    /// Algorithm name not recognized
    #[error("Unknown PQ algorithm: {0}")]
    UnknownAlgorithm(String),

    /// Key file could not be read or written
    #[error("Key file {path}: {reason}")]
    KeyFile { path: PathBuf, reason: String },
}

impl CryptoError {
    pub(crate) fn key_file(path: impl Into<PathBuf>, err: impl ToString) -> Self {
        Self::KeyFile {
            path: path.into(),
            reason: err.to_string(),
        }
    }
}

impl From<CryptoError> for SignerError {
    fn from(err: CryptoError) -> Self {
        match err {
            CryptoError::InvalidPublicKey(_)
            | CryptoError::InvalidSecretKey(_)
            | CryptoError::UnknownAlgorithm(_) => SignerError::InvalidKey(err.to_string()),
            CryptoError::UnsupportedAlgorithm(id) => SignerError::UnsupportedAlgorithm(id),
            CryptoError::InvalidSignature(_)
            | CryptoError::SigningFailed(_)
            | CryptoError::KeyFile { .. } => {
                SignerError::Failed(err.to_string())
            }
        }
    }
}
