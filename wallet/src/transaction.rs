// Transfer transaction
// Built from a resolved TransferIntent and signed by every declared signer.
// The digest covers the unsigned payload only, so signatures can be added in
// any order; changing the validity window drops existing signatures.

use secp256k1::PublicKey;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::address::Address;
use crate::entity::Entity;
use crate::transfer::TransferIntent;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransactionError {
    #[error("Transfer needs {expected} signer keys, got {actual}")]
    SignerCountMismatch { expected: usize, actual: usize },

    #[error("Key {0} is not a signer of this transaction")]
    NotASigner(String),

    #[error("Invalid validity period: {valid_from}..{valid_until}")]
    InvalidValidityPeriod { valid_from: u64, valid_until: u64 },

    #[error("Transaction serialization error: {0}")]
    Serialization(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxSignature {
    /// Compressed public key, hex
    pub public_key: String,
    /// Compact ECDSA signature over the transaction digest, hex
    pub signature: String,
}

#[derive(Serialize)]
struct UnsignedPayload<'a> {
    from: &'a Address,
    to: &'a Address,
    amount: u64,
    charge_rate: u64,
    charge_limit: u64,
    valid_from: u64,
    valid_until: u64,
    signers: &'a [String],
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferTx {
    pub from: Address,
    pub to: Address,
    pub amount: u64,
    pub charge_rate: u64,
    /// Maximum number of charged operations, one per signature
    pub charge_limit: u64,
    pub valid_from: u64,
    pub valid_until: u64,
    /// Declared signers' public keys (hex) in signing order
    pub signers: Vec<String>,
    pub signatures: Vec<TxSignature>,
}

impl TransferTx {
    /// Unsigned transaction for `intent`. `signers` are the unsealed keys of
    /// `intent.signer_names`, in the same order.
    pub fn from_intent(intent: &TransferIntent, signers: &[Entity]) -> Result<Self, TransactionError> {
        if signers.len() != intent.signer_names.len() {
            return Err(TransactionError::SignerCountMismatch {
                expected: intent.signer_names.len(),
                actual: signers.len(),
            });
        }

        Ok(Self {
            from: intent.from_address,
            to: intent.destination_address,
            amount: intent.amount,
            charge_rate: intent.charge_rate,
            charge_limit: intent.required_signatures,
            valid_from: 0,
            valid_until: 0,
            signers: signers.iter().map(Entity::public_key_hex).collect(),
            signatures: Vec::new(),
        })
    }

    /// Set the block window in which the transaction is valid
    pub fn set_validity_period(&mut self, valid_from: u64, valid_until: u64) -> Result<(), TransactionError> {
        if valid_until <= valid_from {
            return Err(TransactionError::InvalidValidityPeriod {
                valid_from,
                valid_until,
            });
        }
        self.valid_from = valid_from;
        self.valid_until = valid_until;
        self.signatures.clear();
        Ok(())
    }

    /// SHA-256 of the canonical JSON encoding of the unsigned payload
    pub fn digest(&self) -> Result<[u8; 32], TransactionError> {
        let payload = UnsignedPayload {
            from: &self.from,
            to: &self.to,
            amount: self.amount,
            charge_rate: self.charge_rate,
            charge_limit: self.charge_limit,
            valid_from: self.valid_from,
            valid_until: self.valid_until,
            signers: &self.signers,
        };
        let encoded =
            serde_json::to_vec(&payload).map_err(|e| TransactionError::Serialization(e.to_string()))?;

        let mut digest = [0u8; 32];
        digest.copy_from_slice(&Sha256::digest(&encoded));
        Ok(digest)
    }

    pub fn digest_hex(&self) -> Result<String, TransactionError> {
        Ok(hex::encode(self.digest()?))
    }

    /// Add (or replace) the signature of a declared signer
    pub fn sign(&mut self, entity: &Entity) -> Result<(), TransactionError> {
        let public_key = entity.public_key_hex();
        if !self.signers.contains(&public_key) {
            return Err(TransactionError::NotASigner(public_key));
        }

        let signature = hex::encode(entity.sign_digest(&self.digest()?));
        self.signatures.retain(|s| s.public_key != public_key);
        self.signatures.push(TxSignature {
            public_key,
            signature,
        });
        Ok(())
    }

    /// Every declared signer has a signature that verifies against the
    /// current digest
    pub fn is_fully_signed(&self) -> bool {
        let Ok(digest) = self.digest() else {
            return false;
        };

        self.signers.iter().all(|signer| {
            self.signatures
                .iter()
                .find(|s| &s.public_key == signer)
                .map_or(false, |s| verify(&s.public_key, &digest, &s.signature))
        })
    }
}

fn verify(public_key_hex: &str, digest: &[u8; 32], signature_hex: &str) -> bool {
    let (Ok(key_bytes), Ok(signature)) = (hex::decode(public_key_hex), hex::decode(signature_hex)) else {
        return false;
    };
    match PublicKey::from_slice(&key_bytes) {
        Ok(public_key) => Entity::verify_digest(&public_key, digest, &signature),
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::SecretEntity;

    fn intent(from: &Entity, signers: &[&Entity]) -> TransferIntent {
        TransferIntent {
            destination_address: Entity::generate().address(),
            destination_display_name: None,
            amount: 10_000_000_000,
            charge_rate: 1,
            signer_names: (0..signers.len()).map(|i| format!("signer{}", i)).collect(),
            from_name: "payer".to_string(),
            from_address: from.address(),
            required_signatures: signers.len() as u64,
            fee: signers.len() as u64,
            total: 10_000_000_000 + signers.len() as u64,
        }
    }

    #[test]
    fn test_multi_signer_flow() {
        let alice = Entity::generate();
        let bob = Entity::generate();
        let intent = intent(&alice, &[&alice, &bob]);

        let mut tx = TransferTx::from_intent(&intent, &[alice.clone(), bob.clone()]).unwrap();
        assert_eq!(tx.charge_limit, 2);
        tx.set_validity_period(100, 200).unwrap();

        tx.sign(&alice).unwrap();
        assert!(!tx.is_fully_signed());
        tx.sign(&bob).unwrap();
        assert!(tx.is_fully_signed());
    }

    #[test]
    fn test_foreign_key_cannot_sign() {
        let alice = Entity::generate();
        let intent = intent(&alice, &[&alice]);
        let mut tx = TransferTx::from_intent(&intent, &[alice.clone()]).unwrap();

        let mallory = Entity::generate();
        assert!(matches!(tx.sign(&mallory), Err(TransactionError::NotASigner(_))));
    }

    #[test]
    fn test_validity_change_drops_signatures() {
        let alice = Entity::generate();
        let intent = intent(&alice, &[&alice]);
        let mut tx = TransferTx::from_intent(&intent, &[alice.clone()]).unwrap();

        tx.set_validity_period(1, 10).unwrap();
        let before = tx.digest().unwrap();
        tx.sign(&alice).unwrap();
        assert!(tx.is_fully_signed());

        tx.set_validity_period(5, 50).unwrap();
        assert_ne!(tx.digest().unwrap(), before);
        assert!(!tx.is_fully_signed());
        assert!(tx.set_validity_period(5, 5).is_err());
    }

    #[test]
    fn test_signer_count_must_match() {
        let alice = Entity::generate();
        let bob = Entity::generate();
        let intent = intent(&alice, &[&alice, &bob]);

        assert_eq!(
            TransferTx::from_intent(&intent, &[alice]),
            Err(TransactionError::SignerCountMismatch {
                expected: 2,
                actual: 1
            })
        );
    }

    #[test]
    fn test_tampered_signature_not_accepted() {
        let alice = Entity::generate();
        let intent = intent(&alice, &[&alice]);
        let mut tx = TransferTx::from_intent(&intent, &[alice.clone()]).unwrap();
        tx.sign(&alice).unwrap();

        tx.amount += 1;
        assert!(!tx.is_fully_signed());
    }
}
