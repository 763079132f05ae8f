//! Custody accounts: per-(owner, asset) fungible balances held by the
//! custody program.
//!
//! Every custody account lives at a deterministic address derived from
//! `(owner, asset)`, so any party can locate a holder's balance, including
//! the vault of an escrow record, without an index.

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

use crate::constants::CUSTODY_SEED;
use crate::{Address, AssetId, EscrowError, Result};

/// A single fungible balance of `asset` controlled by `owner`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize,
)]
pub struct CustodyAccount {
    /// Authority allowed to debit or close this account.
    pub owner: Address,
    /// The asset held.
    pub asset: AssetId,
    /// Current balance.
    pub amount: u64,
}

impl CustodyAccount {
    /// 32 (owner) + 32 (asset) + 8 (amount) = 72
    pub const LEN: usize = 32 + 32 + 8;

    /// Create an empty custody account.
    #[must_use]
    pub fn empty(owner: Address, asset: AssetId) -> Self {
        Self {
            owner,
            asset,
            amount: 0,
        }
    }

    pub fn pack(&self) -> Result<Vec<u8>> {
        borsh::to_vec(self).map_err(|e| EscrowError::Serialization(e.to_string()))
    }

    pub fn unpack(data: &[u8]) -> Result<Self> {
        if data.len() != Self::LEN {
            return Err(EscrowError::InvalidAccountData {
                reason: format!("custody account is {} bytes, expected {}", data.len(), Self::LEN),
            });
        }
        Self::try_from_slice(data).map_err(|e| EscrowError::InvalidAccountData {
            reason: e.to_string(),
        })
    }
}

/// Standard deterministic address of the custody account holding `asset`
/// for `owner`.
pub fn custody_address(
    owner: &Address,
    asset: &AssetId,
    custody_program: &Address,
) -> Result<(Address, u8)> {
    Address::find_derived(
        &[owner.as_bytes(), CUSTODY_SEED, asset.as_bytes()],
        custody_program,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::CUSTODY_PROGRAM_ID;

    #[test]
    fn custody_address_is_deterministic() {
        let owner = Address([1u8; 32]);
        let asset = Address([2u8; 32]);
        let a = custody_address(&owner, &asset, &CUSTODY_PROGRAM_ID).unwrap();
        let b = custody_address(&owner, &asset, &CUSTODY_PROGRAM_ID).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn custody_address_differs_per_asset() {
        let owner = Address([1u8; 32]);
        let (a, _) = custody_address(&owner, &Address([2u8; 32]), &CUSTODY_PROGRAM_ID).unwrap();
        let (b, _) = custody_address(&owner, &Address([3u8; 32]), &CUSTODY_PROGRAM_ID).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn packed_custody_account_is_fixed_size() {
        let account = CustodyAccount {
            owner: Address([1u8; 32]),
            asset: Address([2u8; 32]),
            amount: 10,
        };
        let data = account.pack().unwrap();
        assert_eq!(data.len(), CustodyAccount::LEN);
        assert_eq!(CustodyAccount::unpack(&data).unwrap(), account);
    }

    #[test]
    fn unpack_rejects_wrong_length() {
        let err = CustodyAccount::unpack(&[0u8; 10]).unwrap_err();
        assert!(matches!(err, EscrowError::InvalidAccountData { .. }));
    }
}
