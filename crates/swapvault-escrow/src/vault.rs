//! Vault custody: the record-owned account holding the locked asset.
//!
//! A vault is the standard custody account of `(record, asset_offered)`.
//! Its owner is the record address, which only the escrow program can act
//! for, so funds leave a vault only through a lifecycle transition.

use swapvault_ledger::{Authority, Transaction};
use swapvault_types::{Address, AssetId, CustodyAccount, EscrowError, Result};

use crate::derive::derive_vault;

/// Open the vault of `record`, charging its deposit to `payer`.
pub fn open_vault(
    tx: &mut Transaction<'_>,
    record: &Address,
    asset_offered: &AssetId,
    payer: &Address,
) -> Result<Address> {
    tx.open_custody(record, asset_offered, payer)
}

/// Move `amount` from `source` into `vault`.
pub fn lock(
    tx: &mut Transaction<'_>,
    source: &Address,
    vault: &Address,
    amount: u64,
    authority: &Authority,
) -> Result<()> {
    tx.transfer(source, vault, amount, authority)
}

/// Check that `vault` is the vault of `record` holding `asset_offered`.
///
/// # Errors
/// Returns `CustodyMismatch` if the address, owner or asset disagree, and
/// `AccountNotFound` if the vault does not exist.
pub fn inspect(
    tx: &Transaction<'_>,
    vault: &Address,
    record: &Address,
    asset_offered: &AssetId,
) -> Result<CustodyAccount> {
    let expected = derive_vault(record, asset_offered, tx.custody_program())?;
    if *vault != expected {
        return Err(EscrowError::CustodyMismatch {
            reason: format!("{vault} is not the vault of record {record}"),
        });
    }
    let custody = tx.custody(vault)?;
    if custody.owner != *record {
        return Err(EscrowError::CustodyMismatch {
            reason: format!("vault {vault} is owned by {}", custody.owner),
        });
    }
    if custody.asset != *asset_offered {
        return Err(EscrowError::CustodyMismatch {
            reason: format!("vault {vault} holds {}", custody.asset.short()),
        });
    }
    Ok(custody)
}

/// Drain the whole vault into `destination`, close it and refund its
/// deposit to `refund_to`. Returns the amount released.
pub fn release_and_close(
    tx: &mut Transaction<'_>,
    vault: &Address,
    destination: &Address,
    authority: &Authority,
    refund_to: &Address,
) -> Result<u64> {
    let amount = tx.custody(vault)?.amount;
    tx.transfer(vault, destination, amount, authority)?;
    tx.close_custody(vault, authority, refund_to)?;
    Ok(amount)
}
