//! Escrow record persistence.

use swapvault_ledger::{Account, Transaction};
use swapvault_types::{Address, EscrowError, EscrowRecord, Result};

/// Persist `record` at `address`, charging its deposit to `payer`.
///
/// # Errors
/// - `RecordCollision` if any account already lives at `address`
/// - `Unauthorized` / `InsufficientFunds` from the deposit charge
pub fn open_record(
    tx: &mut Transaction<'_>,
    address: Address,
    record: &EscrowRecord,
    payer: &Address,
) -> Result<()> {
    let data = record.pack()?;
    tx.create_account(address, data, payer).map_err(|e| match e {
        EscrowError::AccountInUse(address) => EscrowError::RecordCollision(address),
        other => other,
    })
}

/// Load the open record at `address`.
///
/// # Errors
/// - `RecordNotFound` if no record of the invoking program lives there
/// - `InvalidAccountData` if the bytes do not decode
pub fn load_record(tx: &Transaction<'_>, address: &Address) -> Result<EscrowRecord> {
    decode_record(tx.account(address), address, tx.program())
}

/// Decode the account found at `address` as a record owned by `program`.
///
/// # Errors
/// - `RecordNotFound` if the account is absent or owned by another program
/// - `InvalidAccountData` if the bytes do not decode
pub fn decode_record(
    account: Option<&Account>,
    address: &Address,
    program: &Address,
) -> Result<EscrowRecord> {
    match account {
        Some(account) if account.program == *program => EscrowRecord::unpack(&account.data),
        _ => Err(EscrowError::RecordNotFound(*address)),
    }
}

/// Close the record at `address`, refunding its deposit to `refund_to`.
pub fn close_record(
    tx: &mut Transaction<'_>,
    address: &Address,
    refund_to: &Address,
) -> Result<()> {
    tx.close_account(address, refund_to).map(|_| ())
}
