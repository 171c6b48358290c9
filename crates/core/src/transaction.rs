//! Signed transactions.
//!
//! A transaction carries one [`Operation`] from a sender key:
//! ```text
//! Transaction {
//!   id        : Hash        // Content hash of (sender, nonce, operation)
//!   sender    : PublicKey   // Ed25519 key; identity = hash(sender)
//!   nonce     : u64         // Sender's next nonce, starting at 0
//!   operation : Operation   // What to do
//!   signature : Signature   // Over the same content as the id
//! }
//! ```

use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use serde::{Deserialize, Serialize};

use crate::hash::encode;
use crate::{Error, Hash, Identity, Operation, Result};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Content hash (computed, not part of the signed content).
    #[serde(skip)]
    pub id: Hash,

    /// Ed25519 public key of the sender.
    pub sender: [u8; 32],

    pub nonce: u64,

    pub operation: Operation,

    /// Ed25519 signature over the signable content.
    pub signature: Vec<u8>,
}

/// Helper struct for signing (excludes id and signature).
#[derive(Serialize)]
struct SignableTransaction<'a> {
    sender: &'a [u8; 32],
    nonce: u64,
    operation: &'a Operation,
}

impl Transaction {
    /// Create a transaction and sign it.
    pub fn new(operation: Operation, nonce: u64, signing_key: &SigningKey) -> Result<Self> {
        let mut tx = Self {
            id: Hash::ZERO,
            sender: signing_key.verifying_key().to_bytes(),
            nonce,
            operation,
            signature: Vec::new(),
        };

        let content = tx.signable_content()?;
        tx.signature = signing_key.sign(&content).to_bytes().to_vec();
        tx.id = Hash::of(&content);

        Ok(tx)
    }

    fn signable_content(&self) -> Result<Vec<u8>> {
        encode(&SignableTransaction {
            sender: &self.sender,
            nonce: self.nonce,
            operation: &self.operation,
        })
    }

    pub fn compute_id(&self) -> Result<Hash> {
        Ok(Hash::of(&self.signable_content()?))
    }

    /// Recompute and set the id field.
    pub fn refresh_id(&mut self) -> Result<()> {
        self.id = self.compute_id()?;
        Ok(())
    }

    pub fn sender_key(&self) -> Result<VerifyingKey> {
        VerifyingKey::from_bytes(&self.sender).map_err(|_| Error::InvalidSignature(self.id))
    }

    pub fn sender_identity(&self) -> Result<Identity> {
        Ok(Identity::from_public_key(&self.sender_key()?))
    }

    /// Check the signature against the embedded sender key.
    pub fn verify(&self) -> Result<()> {
        let key = self.sender_key()?;
        let bytes: [u8; 64] = self
            .signature
            .as_slice()
            .try_into()
            .map_err(|_| Error::InvalidSignature(self.id))?;
        let signature = Signature::from_bytes(&bytes);

        let content = self.signable_content()?;
        key.verify(&content, &signature)
            .map_err(|_| Error::InvalidSignature(self.id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;
    use rand::rngs::OsRng;

    fn vote_op() -> Operation {
        Operation::Vote {
            poll_id: 1,
            candidate_id: 2,
        }
    }

    #[test]
    fn signature_valid() {
        let key = SigningKey::generate(&mut OsRng);
        let tx = Transaction::new(vote_op(), 0, &key).unwrap();
        assert!(tx.verify().is_ok());
        assert_eq!(
            tx.sender_identity().unwrap(),
            Identity::from_public_key(&key.verifying_key())
        );
    }

    #[test]
    fn tampered_operation_fails() {
        let key = SigningKey::generate(&mut OsRng);
        let mut tx = Transaction::new(vote_op(), 0, &key).unwrap();
        tx.operation = Operation::Vote {
            poll_id: 1,
            candidate_id: 1,
        };
        assert_eq!(tx.verify().unwrap_err().kind(), ErrorKind::InvalidSignature);
    }

    #[test]
    fn swapped_sender_fails() {
        let key = SigningKey::generate(&mut OsRng);
        let other = SigningKey::generate(&mut OsRng);
        let mut tx = Transaction::new(vote_op(), 0, &key).unwrap();
        tx.sender = other.verifying_key().to_bytes();
        assert!(tx.verify().is_err());
    }

    #[test]
    fn truncated_signature_fails() {
        let key = SigningKey::generate(&mut OsRng);
        let mut tx = Transaction::new(vote_op(), 0, &key).unwrap();
        tx.signature.truncate(10);
        assert!(tx.verify().is_err());
    }

    #[test]
    fn id_covers_nonce() {
        let key = SigningKey::generate(&mut OsRng);
        let a = Transaction::new(vote_op(), 0, &key).unwrap();
        let b = Transaction::new(vote_op(), 1, &key).unwrap();
        assert_ne!(a.id, b.id);
        assert_eq!(a.compute_id().unwrap(), a.id);
    }
}
