//! Deterministic addressing of escrow records and their vaults.
//!
//! A record lives at the derived address of `[b"escrow", owner, nonce_le]`
//! under the escrow program. Derived addresses are off the Ed25519 curve,
//! so nobody holds a key for them; the escrow program alone can act for a
//! record by re-presenting those seeds as an [`EscrowAuthority`].

use swapvault_ledger::{Authority, DerivedAuthority};
use swapvault_types::constants::ESCROW_SEED;
use swapvault_types::{Address, AssetId, EscrowError, Result, custody_address};

/// Record address and proof for `(owner, nonce)` under `program`.
///
/// # Errors
/// Returns `DerivationExhausted` in the astronomically unlikely case that
/// every proof lands on the curve.
pub fn derive(owner: &Address, nonce: u64, program: &Address) -> Result<(Address, u8)> {
    let nonce = nonce.to_le_bytes();
    Address::find_derived(&[ESCROW_SEED, owner.as_bytes(), &nonce], program)
}

/// The vault of `record`: its standard custody account for `asset_offered`.
pub fn derive_vault(
    record: &Address,
    asset_offered: &AssetId,
    custody_program: &Address,
) -> Result<Address> {
    custody_address(record, asset_offered, custody_program).map(|(address, _)| address)
}

/// Seeds of a record address, kept so the escrow program can sign for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EscrowAuthority {
    pub owner: Address,
    pub nonce: u64,
    pub proof: u8,
}

impl EscrowAuthority {
    #[must_use]
    pub fn new(owner: Address, nonce: u64, proof: u8) -> Self {
        Self { owner, nonce, proof }
    }

    /// Re-derive the record address with the stored proof.
    pub fn address(&self, program: &Address) -> Result<Address> {
        let nonce = self.nonce.to_le_bytes();
        Address::create_derived(
            &[ESCROW_SEED, self.owner.as_bytes(), &nonce],
            self.proof,
            program,
        )
    }

    /// Check that these seeds re-derive exactly `record`.
    ///
    /// # Errors
    /// Returns `CustodyMismatch` if they do not.
    pub fn verify(&self, record: &Address, program: &Address) -> Result<()> {
        match self.address(program) {
            Ok(address) if address == *record => Ok(()),
            _ => Err(EscrowError::CustodyMismatch {
                reason: format!("record {record} does not derive from its stored seeds"),
            }),
        }
    }

    /// Ledger authority for debiting accounts owned by the record.
    #[must_use]
    pub fn into_authority(self, program: Address) -> Authority {
        Authority::Derived(DerivedAuthority::new(
            vec![
                ESCROW_SEED.to_vec(),
                self.owner.as_bytes().to_vec(),
                self.nonce.to_le_bytes().to_vec(),
            ],
            self.proof,
            program,
        ))
    }
}
