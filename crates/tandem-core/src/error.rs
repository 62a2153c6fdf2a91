//! Error types for transaction construction, encoding and decoding

use thiserror::Error;

use crate::rlp::RlpError;
use crate::signer::SignerError;

/// Result type alias for transaction operations
pub type Result<T> = std::result::Result<T, TxError>;

/// Errors that can occur while building, encoding, decoding or signing a
/// hybrid transaction.
///
/// Signature *verification* failures are not errors: they are reported as
/// [`crate::protocol::Verdict::Rejected`] so callers can tell which of the two
/// checks failed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TxError {
    // === Decoding ===
    /// Input is not a canonical RLP encoding
    #[error("Malformed encoding: {0}")]
    MalformedEncoding(#[from] RlpError),

    /// Leading type byte is not the hybrid transaction tag
    #[error("Unsupported transaction type: 0x{0:02x}")]
    UnsupportedTransactionType(u8),

    /// Field list has the wrong arity
    #[error("Expected {expected} fields, found {found}")]
    FieldCount { expected: usize, found: usize },

    /// A field decoded canonically but its value is out of range
    #[error("Invalid field {field}: {reason}")]
    InvalidField { field: &'static str, reason: String },

    // === Signing ===
    /// A signer or verifier backend is unreachable or failed
    #[error("External signer failure: {0}")]
    ExternalSignerFailure(#[from] SignerError),
}

impl TxError {
    /// Stable numeric code; the CLI logs it with the failing command's error
    pub fn code(&self) -> u32 {
        match self {
            Self::MalformedEncoding(_) => 2001,
            Self::UnsupportedTransactionType(_) => 2002,
            Self::FieldCount { .. } => 2003,
            Self::InvalidField { .. } => 2004,
            Self::ExternalSignerFailure(_) => 3001,
        }
    }

    /// True for every error that means "these bytes are not a valid hybrid
    /// transaction", as opposed to a backend failure.
    pub fn is_malformed(&self) -> bool {
        !matches!(self, Self::ExternalSignerFailure(_))
    }

    /// Whether retrying the same call could succeed. Only backend failures
    /// qualify; the core itself never retries.
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::ExternalSignerFailure(e) => e.is_transient(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        let err = TxError::MalformedEncoding(RlpError::UnexpectedEof);
        assert_eq!(err.code(), 2001);
        assert!(err.is_malformed());

        let err = TxError::ExternalSignerFailure(SignerError::Unavailable("gone".into()));
        assert_eq!(err.code(), 3001);
        assert!(!err.is_malformed());
    }

    #[test]
    fn test_error_display() {
        let err = TxError::UnsupportedTransactionType(0x02);
        assert_eq!(err.to_string(), "Unsupported transaction type: 0x02");

        let err = TxError::FieldCount { expected: 14, found: 13 };
        assert!(err.to_string().contains("Expected 14 fields"));
    }

    #[test]
    fn test_recoverable_errors() {
        assert!(TxError::ExternalSignerFailure(SignerError::Unavailable("x".into())).is_recoverable());
        assert!(!TxError::ExternalSignerFailure(SignerError::InvalidKey("x".into())).is_recoverable());
        assert!(!TxError::UnsupportedTransactionType(1).is_recoverable());
    }
}
