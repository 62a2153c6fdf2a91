//! Dual-signature protocol
//!
//! The classical signature is mandatory and always checked. The post-quantum
//! signature is additive: when both PQ fields are empty the transaction is a
//! classical-only fallback and is accepted on the classical check alone.

use thiserror::Error;

use crate::error::{Result, TxError};
use crate::signer::{ClassicalSigner, ClassicalVerifier, PqSigner, PqVerifier, SignerError};
use crate::transaction::{SignedTransaction, UnsignedTransaction};
use crate::types::{Address, EcdsaSignature, SignatureMode, TxHash};

// ============================================================================
// Signing
// ============================================================================

impl UnsignedTransaction {
    /// Hashes the transaction and has `signer` produce the mandatory
    /// classical signature over the digest.
    pub fn sign_classical<S>(self, signer: &S, key: &S::Key) -> Result<ClassicallySigned>
    where
        S: ClassicalSigner + ?Sized,
    {
        let hash = self.hash();
        let signature = signer.sign(key, &hash)?;

        if !signature.is_well_formed() {
            return Err(SignerError::MalformedOutput(format!(
                "classical signer returned y_parity {} or an oversized component",
                signature.y_parity
            ))
            .into());
        }

        tracing::debug!(%hash, y_parity = signature.y_parity, "Attached classical signature");
        Ok(ClassicallySigned {
            tx: self,
            hash,
            signature,
        })
    }
}

/// A transaction carrying its classical signature, waiting for the
/// post-quantum step to be taken or skipped.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClassicallySigned {
    tx: UnsignedTransaction,
    hash: TxHash,
    signature: EcdsaSignature,
}

impl ClassicallySigned {
    /// The digest the classical signature covers; the PQ signature must cover it too
    pub fn hash(&self) -> &TxHash {
        &self.hash
    }

    pub fn signature(&self) -> &EcdsaSignature {
        &self.signature
    }

    pub fn unsigned(&self) -> &UnsignedTransaction {
        &self.tx
    }

    /// Signs the same digest with a post-quantum key and completes the transaction
    pub fn attach_pq<S>(
        self,
        signer: &S,
        key: &S::KeyHandle,
        public_key: Vec<u8>,
    ) -> Result<SignedTransaction>
    where
        S: PqSigner + ?Sized,
    {
        let pq_signature = signer.sign(key, &self.hash)?;
        self.attach_pq_signature(pq_signature, public_key)
    }

    /// Completes the transaction with a PQ signature produced elsewhere.
    ///
    /// Both parts must be non-empty; an empty pair is spelled [`Self::fallback`].
    pub fn attach_pq_signature(
        self,
        pq_signature: Vec<u8>,
        public_key: Vec<u8>,
    ) -> Result<SignedTransaction> {
        if pq_signature.is_empty() || public_key.is_empty() {
            return Err(TxError::InvalidField {
                field: "pq_signature",
                reason: "post-quantum signature and public key must both be non-empty".into(),
            });
        }

        tracing::debug!(
            hash = %self.hash,
            signature_len = pq_signature.len(),
            public_key_len = public_key.len(),
            "Attached post-quantum signature"
        );
        Ok(SignedTransaction::assemble(
            self.tx,
            self.signature,
            pq_signature,
            public_key,
        ))
    }

    /// Completes the transaction without a PQ signature. Both PQ fields are
    /// encoded as empty strings.
    pub fn fallback(self) -> SignedTransaction {
        tracing::info!(hash = %self.hash, "No post-quantum signature, using classical-only fallback");
        SignedTransaction::assemble(self.tx, self.signature, Vec::new(), Vec::new())
    }
}

// ============================================================================
// Verification
// ============================================================================

/// Which of the two signature checks failed
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RejectReason {
    #[error("Invalid classical signature")]
    InvalidClassicalSignature,

    #[error("Invalid post-quantum signature")]
    InvalidPqSignature,
}

/// Outcome of verifying a signed transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Accepted { sender: Address, mode: SignatureMode },
    Rejected(RejectReason),
}

impl Verdict {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted { .. })
    }

    /// Recovered sender, if accepted
    pub fn sender(&self) -> Option<Address> {
        match self {
            Self::Accepted { sender, .. } => Some(*sender),
            Self::Rejected(_) => None,
        }
    }

    pub fn reject_reason(&self) -> Option<RejectReason> {
        match self {
            Self::Accepted { .. } => None,
            Self::Rejected(reason) => Some(*reason),
        }
    }
}

/// Applies the hybrid acceptance rule using injected verifier backends.
///
/// The classical check is recover-then-compare against the sender the
/// transaction claims to come from. Recovery alone cannot tell a forged `s`
/// from a signature by some other key.
pub struct HybridVerifier<'a> {
    classical: &'a dyn ClassicalVerifier,
    pq: &'a dyn PqVerifier,
    expected_sender: Address,
}

impl<'a> HybridVerifier<'a> {
    pub fn new(
        classical: &'a dyn ClassicalVerifier,
        pq: &'a dyn PqVerifier,
        expected_sender: Address,
    ) -> Self {
        Self {
            classical,
            pq,
            expected_sender,
        }
    }

    /// Verifies one transaction.
    ///
    /// `Err` only when a backend fails; invalid signatures come back as
    /// [`Verdict::Rejected`].
    pub fn verify(&self, tx: &SignedTransaction) -> Result<Verdict> {
        let hash = tx.signing_hash();

        let sender = match self.check_classical(&hash, tx.signature())? {
            Some(sender) => sender,
            None => return Ok(reject(&hash, RejectReason::InvalidClassicalSignature)),
        };

        let (pq_signature, pq_public_key) = (tx.pq_signature(), tx.pq_public_key());
        let mode = match (pq_signature.is_empty(), pq_public_key.is_empty()) {
            (true, true) => SignatureMode::ClassicalOnly,
            (false, false) => {
                if !self.pq.verify(pq_public_key, &hash, pq_signature)? {
                    return Ok(reject(&hash, RejectReason::InvalidPqSignature));
                }
                SignatureMode::Hybrid
            }
            // Half a PQ pair is neither fallback nor a verifiable signature
            _ => return Ok(reject(&hash, RejectReason::InvalidPqSignature)),
        };

        tracing::debug!(%hash, %sender, %mode, "Transaction accepted");
        Ok(Verdict::Accepted { sender, mode })
    }

    /// Verifies each transaction from the expected sender independently,
    /// stopping at the first backend failure.
    pub fn verify_all<'t, I>(&self, txs: I) -> Result<Vec<Verdict>>
    where
        I: IntoIterator<Item = &'t SignedTransaction>,
    {
        txs.into_iter().map(|tx| self.verify(tx)).collect()
    }

    fn check_classical(
        &self,
        hash: &TxHash,
        signature: &EcdsaSignature,
    ) -> Result<Option<Address>> {
        if !signature.is_well_formed() {
            return Ok(None);
        }

        let recovered = match self.classical.recover(hash, signature)? {
            Some(address) => address,
            None => return Ok(None),
        };

        if recovered != self.expected_sender {
            tracing::debug!(expected = %self.expected_sender, %recovered, "Recovered sender does not match");
            return Ok(None);
        }
        Ok(Some(recovered))
    }
}

fn reject(hash: &TxHash, reason: RejectReason) -> Verdict {
    tracing::warn!(%hash, %reason, "Transaction rejected");
    Verdict::Rejected(reason)
}
