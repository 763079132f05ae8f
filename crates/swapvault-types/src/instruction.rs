//! Escrow instructions and their signed envelope.
//!
//! Callers submit a [`SignedInstruction`]: the instruction plus an Ed25519
//! signature over its canonical signing payload. The ledger verifies the
//! signature before the instruction runs; the verified key becomes the
//! transaction's signer.

use borsh::{BorshDeserialize, BorshSerialize};
use ed25519_dalek::{Signature, Signer, SigningKey, VerifyingKey};
use serde::{Deserialize, Serialize};

use crate::constants::INSTRUCTION_SIGNING_TAG;
use crate::{Address, AssetId, EscrowError, Result};

/// Terms supplied by the maker when opening an escrow.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize,
)]
pub struct MakeTerms {
    pub maker: Address,
    pub nonce: u64,
    pub amount_wanted: u64,
    pub amount_offered: u64,
    pub asset_offered: AssetId,
    pub asset_wanted: AssetId,
}

/// The operations exposed by the escrow program.
///
/// Take and Refund carry no quantities: everything is read from the
/// persisted record, so a caller cannot alter the agreed terms.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize,
)]
pub enum EscrowInstruction {
    /// Open an escrow and lock `amount_offered` in its vault.
    Make(MakeTerms),
    /// Pay the record's price and receive the vault's contents.
    Take {
        taker: Address,
        record: Address,
        vault: Address,
    },
    /// Reclaim an unfulfilled escrow (maker only).
    Refund {
        maker: Address,
        record: Address,
        vault: Address,
    },
}

impl EscrowInstruction {
    /// The identity that must sign this instruction.
    #[must_use]
    pub fn authority(&self) -> Address {
        match self {
            Self::Make(terms) => terms.maker,
            Self::Take { taker, .. } => *taker,
            Self::Refund { maker, .. } => *maker,
        }
    }

    /// Short name for log lines.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Make(_) => "make",
            Self::Take { .. } => "take",
            Self::Refund { .. } => "refund",
        }
    }

    /// Canonical signing payload.
    ///
    /// Format: `"swapvault:ix:v1:" || borsh(instruction)`
    pub fn signing_payload(&self) -> Result<Vec<u8>> {
        let mut payload = Vec::with_capacity(256);
        payload.extend_from_slice(INSTRUCTION_SIGNING_TAG);
        BorshSerialize::serialize(self, &mut payload)
            .map_err(|e| EscrowError::Serialization(e.to_string()))?;
        Ok(payload)
    }
}

/// An instruction together with its signer's Ed25519 signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedInstruction {
    pub instruction: EscrowInstruction,
    /// The signer's public key.
    pub signer: Address,
    /// Ed25519 signature over [`EscrowInstruction::signing_payload`].
    pub signature: Vec<u8>,
}

impl SignedInstruction {
    /// Sign `instruction` with `key`.
    pub fn sign(instruction: EscrowInstruction, key: &SigningKey) -> Result<Self> {
        let payload = instruction.signing_payload()?;
        let signature = key.sign(&payload);
        Ok(Self {
            instruction,
            signer: Address::from(&key.verifying_key()),
            signature: signature.to_bytes().to_vec(),
        })
    }

    /// Verify the signature against the claimed signer.
    ///
    /// # Errors
    /// Returns `SignatureInvalid` if the signer is not a valid public key,
    /// the signature is malformed, or verification fails.
    pub fn verify(&self) -> Result<()> {
        let key = VerifyingKey::from_bytes(self.signer.as_bytes())
            .map_err(|_| EscrowError::SignatureInvalid)?;
        let signature =
            Signature::from_slice(&self.signature).map_err(|_| EscrowError::SignatureInvalid)?;
        let payload = self.instruction.signing_payload()?;
        key.verify_strict(&payload, &signature)
            .map_err(|_| EscrowError::SignatureInvalid)
    }
}
