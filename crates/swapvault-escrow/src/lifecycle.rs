//! Escrow lifecycle: Make, Take and Refund.
//!
//! Each transition is one [`Ledger::execute`] call, so it either applies
//! every effect or none:
//!
//! ```text
//! Make:   record + vault opened, amount_offered maker → vault
//! Take:   amount_wanted taker → maker, vault → taker, vault + record closed
//! Refund: vault → maker, vault + record closed
//! ```
//!
//! Custody deposits of the record and the vault are paid by the maker and
//! always refunded to the maker when the pair is closed.

use borsh::BorshSerialize;
use swapvault_ledger::{Authority, Ledger, Signers, Transaction};
use swapvault_types::constants::NATIVE_ASSET;
use swapvault_types::{
    Address, AssetId, EscrowConfig, EscrowError, EscrowRecord, MakeTerms, Result,
};

use crate::derive::{EscrowAuthority, derive};
use crate::{store, vault};

/// Outcome of a successful Make.
#[derive(Debug, Clone, Copy, PartialEq, Eq, BorshSerialize)]
pub struct Opened {
    pub record_address: Address,
    pub vault_address: Address,
    pub record: EscrowRecord,
}

/// Outcome of a successful Take.
#[derive(Debug, Clone, Copy, PartialEq, Eq, BorshSerialize)]
pub struct Fulfillment {
    pub record_address: Address,
    pub vault_address: Address,
    pub maker: Address,
    pub taker: Address,
    /// Paid by the taker to the maker.
    pub asset_wanted: AssetId,
    pub amount_paid: u64,
    /// Released from the vault to the taker.
    pub asset_offered: AssetId,
    pub amount_released: u64,
}

/// Outcome of a successful Refund.
#[derive(Debug, Clone, Copy, PartialEq, Eq, BorshSerialize)]
pub struct Refunded {
    pub record_address: Address,
    pub vault_address: Address,
    pub maker: Address,
    pub asset_offered: AssetId,
    pub amount_returned: u64,
}

/// The escrow program: settles offers against a [`Ledger`].
#[derive(Debug, Clone, Default)]
pub struct EscrowProgram {
    config: EscrowConfig,
}

impl EscrowProgram {
    #[must_use]
    pub fn new(config: EscrowConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn config(&self) -> &EscrowConfig {
        &self.config
    }

    #[must_use]
    pub fn program_id(&self) -> &Address {
        &self.config.program_id
    }

    /// Where the record of `(owner, nonce)` lives.
    pub fn record_address(&self, owner: &Address, nonce: u64) -> Result<Address> {
        derive(owner, nonce, self.program_id()).map(|(address, _)| address)
    }

    /// Read the open record at `address`.
    ///
    /// # Errors
    /// Returns `RecordNotFound` if no record of this program lives there.
    pub fn record(&self, ledger: &Ledger, address: &Address) -> Result<EscrowRecord> {
        store::decode_record(ledger.account(address), address, self.program_id())
    }

    fn validate_terms(&self, terms: &MakeTerms) -> Result<()> {
        if terms.amount_offered == 0 {
            return Err(EscrowError::InvalidAmount {
                reason: "amount_offered must be positive".into(),
            });
        }
        if terms.amount_wanted == 0 {
            return Err(EscrowError::InvalidAmount {
                reason: "amount_wanted must be positive".into(),
            });
        }
        if terms.asset_offered == NATIVE_ASSET || terms.asset_wanted == NATIVE_ASSET {
            return Err(EscrowError::NativeAssetNotEscrowable);
        }
        if self.config.reject_identical_assets && terms.asset_offered == terms.asset_wanted {
            return Err(EscrowError::IdenticalAssets(terms.asset_offered));
        }
        Ok(())
    }

    /// Open an escrow: lock `amount_offered` of `asset_offered` in a fresh
    /// vault and record the asking price.
    ///
    /// # Errors
    /// - `InvalidAmount` if either amount is zero
    /// - `NativeAssetNotEscrowable` if either asset is the native asset
    /// - `IdenticalAssets` if both assets match and that is rejected
    /// - `Unauthorized` if the maker did not sign
    /// - `RecordCollision` if `(maker, nonce)` already has a live record
    /// - `InsufficientFunds` if the maker lacks the asset or the deposits
    pub fn make(
        &self,
        ledger: &mut Ledger,
        signers: &Signers,
        terms: &MakeTerms,
    ) -> Result<Opened> {
        self.validate_terms(terms)?;
        let maker = terms.maker;
        let (record_address, proof) = derive(&maker, terms.nonce, self.program_id())?;

        let opened = ledger.execute(*self.program_id(), signers, |tx| {
            tx.require_signer(&maker)?;
            if tx.exists(&record_address) {
                return Err(EscrowError::RecordCollision(record_address));
            }
            let source = tx.custody_address(&maker, &terms.asset_offered)?;
            require_balance(tx, &source, terms.amount_offered)?;

            let record = EscrowRecord {
                owner: maker,
                nonce: terms.nonce,
                asset_offered: terms.asset_offered,
                asset_wanted: terms.asset_wanted,
                amount_wanted: terms.amount_wanted,
                proof,
            };
            store::open_record(tx, record_address, &record, &maker)?;
            let vault_address =
                vault::open_vault(tx, &record_address, &terms.asset_offered, &maker)?;
            vault::lock(
                tx,
                &source,
                &vault_address,
                terms.amount_offered,
                &Authority::Signer(maker),
            )?;

            Ok(Opened {
                record_address,
                vault_address,
                record,
            })
        })?;

        tracing::info!(
            record = %opened.record_address,
            maker = %maker,
            nonce = terms.nonce,
            asset_offered = %terms.asset_offered.short(),
            amount_offered = terms.amount_offered,
            asset_wanted = %terms.asset_wanted.short(),
            amount_wanted = terms.amount_wanted,
            "Escrow opened"
        );
        Ok(opened)
    }

    /// Fulfill the escrow at `record_address`: pay the maker and receive
    /// the vault's contents. Quantities come from the record.
    ///
    /// # Errors
    /// - `Unauthorized` if the taker did not sign
    /// - `RecordNotFound` if the record is absent or already settled
    /// - `CustodyMismatch` if `vault_address` is not the record's vault
    /// - `InsufficientFunds` if the taker cannot pay or cover deposits
    pub fn take(
        &self,
        ledger: &mut Ledger,
        signers: &Signers,
        taker: &Address,
        record_address: &Address,
        vault_address: &Address,
    ) -> Result<Fulfillment> {
        let fulfillment = ledger.execute(*self.program_id(), signers, |tx| {
            tx.require_signer(taker)?;
            let record = store::load_record(tx, record_address)?;
            let escrow = EscrowAuthority::new(record.owner, record.nonce, record.proof);
            escrow.verify(record_address, tx.program())?;
            vault::inspect(tx, vault_address, record_address, &record.asset_offered)?;

            let source = tx.custody_address(taker, &record.asset_wanted)?;
            require_balance(tx, &source, record.amount_wanted)?;

            let maker_account =
                tx.open_custody_idempotent(&record.owner, &record.asset_wanted, taker)?;
            tx.transfer(
                &source,
                &maker_account,
                record.amount_wanted,
                &Authority::Signer(*taker),
            )?;

            let taker_account = tx.open_custody_idempotent(taker, &record.asset_offered, taker)?;
            let authority = escrow.into_authority(*tx.program());
            let released = vault::release_and_close(
                tx,
                vault_address,
                &taker_account,
                &authority,
                &record.owner,
            )?;
            store::close_record(tx, record_address, &record.owner)?;

            Ok(Fulfillment {
                record_address: *record_address,
                vault_address: *vault_address,
                maker: record.owner,
                taker: *taker,
                asset_wanted: record.asset_wanted,
                amount_paid: record.amount_wanted,
                asset_offered: record.asset_offered,
                amount_released: released,
            })
        })?;

        tracing::info!(
            record = %fulfillment.record_address,
            maker = %fulfillment.maker,
            taker = %fulfillment.taker,
            amount_paid = fulfillment.amount_paid,
            amount_released = fulfillment.amount_released,
            "Escrow taken"
        );
        Ok(fulfillment)
    }

    /// Reclaim an unfulfilled escrow: the vault's contents go back to the
    /// maker and both accounts close.
    ///
    /// # Errors
    /// - `Unauthorized` if `maker` did not sign or does not own the record
    /// - `RecordNotFound` if the record is absent or already settled
    /// - `CustodyMismatch` if `vault_address` is not the record's vault
    pub fn refund(
        &self,
        ledger: &mut Ledger,
        signers: &Signers,
        maker: &Address,
        record_address: &Address,
        vault_address: &Address,
    ) -> Result<Refunded> {
        let refunded = ledger.execute(*self.program_id(), signers, |tx| {
            tx.require_signer(maker)?;
            let record = store::load_record(tx, record_address)?;
            if record.owner != *maker {
                return Err(EscrowError::Unauthorized {
                    reason: format!("{maker} does not own record {record_address}"),
                });
            }
            let escrow = EscrowAuthority::new(record.owner, record.nonce, record.proof);
            escrow.verify(record_address, tx.program())?;
            vault::inspect(tx, vault_address, record_address, &record.asset_offered)?;

            let destination = tx.open_custody_idempotent(maker, &record.asset_offered, maker)?;
            let authority = escrow.into_authority(*tx.program());
            let returned =
                vault::release_and_close(tx, vault_address, &destination, &authority, maker)?;
            store::close_record(tx, record_address, maker)?;

            Ok(Refunded {
                record_address: *record_address,
                vault_address: *vault_address,
                maker: *maker,
                asset_offered: record.asset_offered,
                amount_returned: returned,
            })
        })?;

        tracing::info!(
            record = %refunded.record_address,
            maker = %refunded.maker,
            amount_returned = refunded.amount_returned,
            "Escrow refunded"
        );
        Ok(refunded)
    }
}

/// Fail with `InsufficientFunds` unless the custody account at `source`
/// holds at least `needed`. A missing account holds nothing.
fn require_balance(tx: &Transaction<'_>, source: &Address, needed: u64) -> Result<()> {
    let available = if tx.exists(source) {
        tx.custody(source)?.amount
    } else {
        0
    };
    if available < needed {
        return Err(EscrowError::InsufficientFunds { needed, available });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use swapvault_types::constants::ESCROW_PROGRAM_ID;

    use super::*;

    const ASSET_A: Address = Address([1u8; 32]);
    const ASSET_B: Address = Address([2u8; 32]);

    fn terms(maker: Address) -> MakeTerms {
        MakeTerms {
            maker,
            nonce: 1,
            amount_wanted: 100,
            amount_offered: 10,
            asset_offered: ASSET_A,
            asset_wanted: ASSET_B,
        }
    }

    fn setup() -> (Ledger, EscrowProgram, Address, Address) {
        let mut ledger = Ledger::default();
        let maker = Address::new_unique();
        let taker = Address::new_unique();
        ledger.fund_reserve(maker, 10_000_000).unwrap();
        ledger.fund_reserve(taker, 10_000_000).unwrap();
        ledger.issue(maker, ASSET_A, 10).unwrap();
        ledger.issue(taker, ASSET_B, 100).unwrap();
        (ledger, EscrowProgram::default(), maker, taker)
    }

    #[test]
    fn make_locks_offer_in_vault() {
        let (mut ledger, program, maker, _) = setup();
        let opened = program
            .make(&mut ledger, &Signers::trusted([maker]), &terms(maker))
            .unwrap();

        assert_eq!(opened.record_address, program.record_address(&maker, 1).unwrap());
        assert_eq!(ledger.balance(&maker, &ASSET_A), 0);
        assert_eq!(ledger.custody_account(&opened.vault_address).unwrap().amount, 10);
        assert_eq!(
            program.record(&ledger, &opened.record_address).unwrap(),
            opened.record
        );
        assert_eq!(
            ledger.account(&opened.record_address).unwrap().program,
            ESCROW_PROGRAM_ID
        );
    }

    #[test]
    fn zero_amounts_rejected() {
        let (mut ledger, program, maker, _) = setup();
        let signers = Signers::trusted([maker]);
        let mut zero_offer = terms(maker);
        zero_offer.amount_offered = 0;
        let mut zero_price = terms(maker);
        zero_price.amount_wanted = 0;
        for bad in [zero_offer, zero_price] {
            let err = program.make(&mut ledger, &signers, &bad).unwrap_err();
            assert!(matches!(err, EscrowError::InvalidAmount { .. }));
        }
    }

    #[test]
    fn make_requires_maker_signature() {
        let (mut ledger, program, maker, taker) = setup();
        let err = program
            .make(&mut ledger, &Signers::trusted([taker]), &terms(maker))
            .unwrap_err();
        assert!(matches!(err, EscrowError::Unauthorized { .. }));
    }

    #[test]
    fn reused_nonce_collides() {
        let (mut ledger, program, maker, _) = setup();
        ledger.issue(maker, ASSET_A, 10).unwrap();
        let signers = Signers::trusted([maker]);
        program.make(&mut ledger, &signers, &terms(maker)).unwrap();
        let err = program.make(&mut ledger, &signers, &terms(maker)).unwrap_err();
        assert!(matches!(err, EscrowError::RecordCollision(_)));
        assert_eq!(ledger.balance(&maker, &ASSET_A), 10);
    }

    #[test]
    fn take_settles_both_legs() {
        let (mut ledger, program, maker, taker) = setup();
        let opened = program
            .make(&mut ledger, &Signers::trusted([maker]), &terms(maker))
            .unwrap();
        let fulfillment = program
            .take(
                &mut ledger,
                &Signers::trusted([taker]),
                &taker,
                &opened.record_address,
                &opened.vault_address,
            )
            .unwrap();

        assert_eq!(fulfillment.amount_paid, 100);
        assert_eq!(fulfillment.amount_released, 10);
        assert_eq!(ledger.balance(&maker, &ASSET_B), 100);
        assert_eq!(ledger.balance(&taker, &ASSET_A), 10);
        assert_eq!(ledger.balance(&taker, &ASSET_B), 0);
        assert!(ledger.account(&opened.vault_address).is_none());
        assert!(matches!(
            program.record(&ledger, &opened.record_address),
            Err(EscrowError::RecordNotFound(_))
        ));
    }

    #[test]
    fn take_with_wrong_vault_rejected() {
        let (mut ledger, program, maker, taker) = setup();
        let opened = program
            .make(&mut ledger, &Signers::trusted([maker]), &terms(maker))
            .unwrap();
        let decoy = ledger.custody_address(&maker, &ASSET_A).unwrap();
        let err = program
            .take(
                &mut ledger,
                &Signers::trusted([taker]),
                &taker,
                &opened.record_address,
                &decoy,
            )
            .unwrap_err();
        assert!(matches!(err, EscrowError::CustodyMismatch { .. }));
    }

    #[test]
    fn refund_by_stranger_rejected() {
        let (mut ledger, program, maker, taker) = setup();
        let opened = program
            .make(&mut ledger, &Signers::trusted([maker]), &terms(maker))
            .unwrap();
        let err = program
            .refund(
                &mut ledger,
                &Signers::trusted([taker]),
                &taker,
                &opened.record_address,
                &opened.vault_address,
            )
            .unwrap_err();
        assert!(matches!(err, EscrowError::Unauthorized { .. }));
    }

    #[test]
    fn native_asset_cannot_be_escrowed() {
        let (mut ledger, program, maker, _) = setup();
        let signers = Signers::trusted([maker]);
        let before = ledger.state_root();
        let mut wants_native = terms(maker);
        wants_native.asset_wanted = NATIVE_ASSET;
        let mut offers_native = terms(maker);
        offers_native.asset_offered = NATIVE_ASSET;
        for bad in [wants_native, offers_native] {
            let err = program.make(&mut ledger, &signers, &bad).unwrap_err();
            assert!(matches!(err, EscrowError::NativeAssetNotEscrowable));
        }
        assert_eq!(ledger.state_root(), before);
        assert_eq!(ledger.balance(&maker, &ASSET_A), 10);
    }

    #[test]
    fn identical_assets_rejected_by_default() {
        let (mut ledger, program, maker, _) = setup();
        let mut same = terms(maker);
        same.asset_wanted = ASSET_A;
        let err = program
            .make(&mut ledger, &Signers::trusted([maker]), &same)
            .unwrap_err();
        assert!(matches!(err, EscrowError::IdenticalAssets(a) if a == ASSET_A));
    }
}
