//! Instruction entry point.
//!
//! A submitted [`SignedInstruction`] is verified into the transaction's
//! [`Signers`], dispatched to the lifecycle, and answered with a
//! [`Receipt`] binding the committed outcome.

use borsh::BorshSerialize;
use swapvault_ledger::{Ledger, Signers};
use swapvault_types::{
    Address, EscrowError, EscrowInstruction, Receipt, ReceiptKind, Result, SignedInstruction,
};

use crate::lifecycle::EscrowProgram;

impl EscrowProgram {
    /// Verify and execute one signed instruction.
    ///
    /// # Errors
    /// - `SignatureInvalid` if the signature does not verify
    /// - any lifecycle error of the dispatched transition
    pub fn process(&self, ledger: &mut Ledger, signed: &SignedInstruction) -> Result<Receipt> {
        let instruction = signed.instruction;
        let result = Signers::from_signed(signed).and_then(|signers| {
            self.dispatch(ledger, &signers, &instruction)
        });
        match result {
            Ok((kind, record, payload)) => {
                let receipt = Receipt::new(kind, record, signed.signer, &payload);
                tracing::debug!(
                    receipt = %receipt.id,
                    kind = %receipt.kind,
                    payload_hash = %hex::encode(receipt.payload_hash),
                    "Receipt issued"
                );
                Ok(receipt)
            }
            Err(e) => {
                tracing::warn!(
                    instruction = instruction.name(),
                    signer = %signed.signer,
                    error = %e,
                    "Instruction rejected"
                );
                Err(e)
            }
        }
    }

    fn dispatch(
        &self,
        ledger: &mut Ledger,
        signers: &Signers,
        instruction: &EscrowInstruction,
    ) -> Result<(ReceiptKind, Address, Vec<u8>)> {
        match instruction {
            EscrowInstruction::Make(terms) => {
                let opened = self.make(ledger, signers, terms)?;
                Ok((ReceiptKind::EscrowOpened, opened.record_address, encode(&opened)?))
            }
            EscrowInstruction::Take {
                taker,
                record,
                vault,
            } => {
                let fulfillment = self.take(ledger, signers, taker, record, vault)?;
                Ok((ReceiptKind::EscrowTaken, *record, encode(&fulfillment)?))
            }
            EscrowInstruction::Refund {
                maker,
                record,
                vault,
            } => {
                let refunded = self.refund(ledger, signers, maker, record, vault)?;
                Ok((ReceiptKind::EscrowRefunded, *record, encode(&refunded)?))
            }
        }
    }
}

/// Borsh encoding of a lifecycle outcome; the receipt hashes these bytes.
pub fn encode<T: BorshSerialize>(outcome: &T) -> Result<Vec<u8>> {
    borsh::to_vec(outcome).map_err(|e| EscrowError::Serialization(e.to_string()))
}
