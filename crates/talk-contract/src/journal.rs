use serde::{Deserialize, Serialize};
use talk_crypto::{Digest, Domain};

use crate::action::SignedAction;

/// Errors from the action journal.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum JournalError {
    #[error("integrity violation at seq {seq}: {reason}")]
    IntegrityViolation { seq: u64, reason: String },

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// One applied action, hash-linked to the one before it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionReceipt {
    /// 1-based position in the journal.
    pub seq: u64,
    pub prev_hash: Option<Digest>,
    pub receipt_hash: Digest,
    /// Digest the action's signatures cover.
    pub action_digest: Digest,
    pub signed: SignedAction,
    /// Id the action assigned to the record it created.
    pub assigned_id: u64,
}

impl ActionReceipt {
    fn compute_hash(&self) -> Result<Digest, JournalError> {
        let canonical = Self {
            receipt_hash: [0; 32],
            ..self.clone()
        };
        Domain::Receipt
            .digest_json(&canonical)
            .map_err(|e| JournalError::Serialization(e.to_string()))
    }

    /// Short hex form of the receipt hash.
    pub fn short_hash(&self) -> String {
        hex::encode(&self.receipt_hash[..4])
    }
}

/// Append-only log of every action the partition accepted.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActionJournal {
    receipts: Vec<ActionReceipt>,
}

impl ActionJournal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an accepted action and return its receipt.
    pub fn append(
        &mut self,
        signed: &SignedAction,
        assigned_id: u64,
    ) -> Result<ActionReceipt, JournalError> {
        let action_digest = signed
            .digest()
            .map_err(|e| JournalError::Serialization(e.to_string()))?;

        let mut receipt = ActionReceipt {
            seq: self.receipts.len() as u64 + 1,
            prev_hash: self.head().map(|r| r.receipt_hash),
            receipt_hash: [0; 32],
            action_digest,
            signed: signed.clone(),
            assigned_id,
        };
        receipt.receipt_hash = receipt.compute_hash()?;

        self.receipts.push(receipt.clone());
        Ok(receipt)
    }

    pub fn head(&self) -> Option<&ActionReceipt> {
        self.receipts.last()
    }

    pub fn receipts(&self) -> &[ActionReceipt] {
        &self.receipts
    }

    pub fn len(&self) -> usize {
        self.receipts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.receipts.is_empty()
    }

    /// Check sequence contiguity, hash links, and recomputed hashes.
    pub fn validate(&self) -> Result<(), JournalError> {
        for (index, receipt) in self.receipts.iter().enumerate() {
            let expected_seq = index as u64 + 1;
            if receipt.seq != expected_seq {
                return Err(JournalError::IntegrityViolation {
                    seq: receipt.seq,
                    reason: format!("expected seq {expected_seq}, found {}", receipt.seq),
                });
            }

            let expected_prev = index
                .checked_sub(1)
                .map(|prev| self.receipts[prev].receipt_hash);
            if receipt.prev_hash != expected_prev {
                return Err(JournalError::IntegrityViolation {
                    seq: receipt.seq,
                    reason: "previous hash link mismatch".into(),
                });
            }

            let digest = receipt
                .signed
                .digest()
                .map_err(|e| JournalError::Serialization(e.to_string()))?;
            if digest != receipt.action_digest {
                return Err(JournalError::IntegrityViolation {
                    seq: receipt.seq,
                    reason: "action digest mismatch".into(),
                });
            }

            if receipt.compute_hash()? != receipt.receipt_hash {
                return Err(JournalError::IntegrityViolation {
                    seq: receipt.seq,
                    reason: "receipt hash mismatch".into(),
                });
            }
        }
        Ok(())
    }
}
