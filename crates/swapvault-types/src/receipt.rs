//! Receipts for the escrow audit trail.
//!
//! Every committed lifecycle transition produces a [`Receipt`] carrying a
//! SHA-256 hash of its payload, so the transition can later be matched
//! against the exact record and counterparties it concerned.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::Address;
use crate::constants::RECEIPT_HASH_TAG;

/// Unique receipt identifier. Uses UUIDv7 for time-ordered sorting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct ReceiptId(pub Uuid);

impl ReceiptId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for ReceiptId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ReceiptId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rcpt:{}", self.0)
    }
}

/// The lifecycle transition a receipt proves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReceiptKind {
    /// Make committed: record and vault opened, offered amount locked.
    EscrowOpened,
    /// Take committed: both transfers done, record and vault closed.
    EscrowTaken,
    /// Refund committed: vault returned to the maker, record and vault closed.
    EscrowRefunded,
}

impl fmt::Display for ReceiptKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EscrowOpened => write!(f, "ESCROW_OPENED"),
            Self::EscrowTaken => write!(f, "ESCROW_TAKEN"),
            Self::EscrowRefunded => write!(f, "ESCROW_REFUNDED"),
        }
    }
}

/// Proof that a lifecycle transition committed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Receipt {
    pub id: ReceiptId,
    pub kind: ReceiptKind,
    /// Address of the escrow record concerned.
    pub record: Address,
    /// The signer who submitted the instruction.
    pub actor: Address,
    /// SHA-256 over the tagged payload.
    pub payload_hash: [u8; 32],
    pub issued_at: DateTime<Utc>,
}

impl Receipt {
    #[must_use]
    pub fn new(kind: ReceiptKind, record: Address, actor: Address, payload: &[u8]) -> Self {
        Self {
            id: ReceiptId::new(),
            kind,
            record,
            actor,
            payload_hash: Self::hash_payload(kind, payload),
            issued_at: Utc::now(),
        }
    }

    /// `SHA-256("swapvault:receipt:v1:" || kind || payload)`
    #[must_use]
    pub fn hash_payload(kind: ReceiptKind, payload: &[u8]) -> [u8; 32] {
        let mut hasher = Sha256::new();
        hasher.update(RECEIPT_HASH_TAG);
        hasher.update(kind.to_string().as_bytes());
        hasher.update(payload);
        let mut hash = [0u8; 32];
        hash.copy_from_slice(&hasher.finalize());
        hash
    }

    /// Whether `payload` is the one this receipt was issued for.
    #[must_use]
    pub fn matches_payload(&self, payload: &[u8]) -> bool {
        Self::hash_payload(self.kind, payload) == self.payload_hash
    }
}
