//! The persisted escrow record: terms of one open offer.
//!
//! Layout on the ledger is fixed-size: an 8-byte discriminator followed by
//! the Borsh encoding of [`EscrowRecord`]. Every field is fixed-width, so
//! every live record occupies exactly [`EscrowRecord::LEN`] bytes.

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

use crate::constants::ESCROW_RECORD_DISCRIMINATOR;
use crate::{Address, AssetId, EscrowError, Result};

/// Terms of one open offer, written by Make and consumed by Take / Refund.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize,
)]
pub struct EscrowRecord {
    /// The maker. Sole authority that created this record.
    pub owner: Address,
    /// Caller-chosen value disambiguating simultaneous offers of one owner.
    pub nonce: u64,
    /// Asset locked in the vault.
    pub asset_offered: AssetId,
    /// Asset the maker wants in return.
    pub asset_wanted: AssetId,
    /// Quantity of `asset_wanted` required to fulfill.
    pub amount_wanted: u64,
    /// Disambiguator returned by the address derivation.
    pub proof: u8,
}

impl EscrowRecord {
    /// 8 (discriminator) + 32 (owner) + 8 (nonce) + 32 + 32 (assets) + 8 (amount) + 1 (proof) = 121
    pub const LEN: usize = 8 + 32 + 8 + 32 + 32 + 8 + 1;

    /// Encode into the fixed on-ledger layout.
    pub fn pack(&self) -> Result<Vec<u8>> {
        let mut data = Vec::with_capacity(Self::LEN);
        data.extend_from_slice(&ESCROW_RECORD_DISCRIMINATOR);
        BorshSerialize::serialize(self, &mut data)
            .map_err(|e| EscrowError::Serialization(e.to_string()))?;
        debug_assert_eq!(data.len(), Self::LEN);
        Ok(data)
    }

    /// Decode from the fixed on-ledger layout.
    ///
    /// # Errors
    /// Returns `InvalidAccountData` on a wrong length, a wrong discriminator,
    /// or undecodable fields.
    pub fn unpack(data: &[u8]) -> Result<Self> {
        if data.len() != Self::LEN {
            return Err(EscrowError::InvalidAccountData {
                reason: format!("escrow record is {} bytes, expected {}", data.len(), Self::LEN),
            });
        }
        let (discriminator, body) = data.split_at(ESCROW_RECORD_DISCRIMINATOR.len());
        if discriminator != ESCROW_RECORD_DISCRIMINATOR {
            return Err(EscrowError::InvalidAccountData {
                reason: "escrow record discriminator mismatch".into(),
            });
        }
        Self::try_from_slice(body).map_err(|e| EscrowError::InvalidAccountData {
            reason: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_record() -> EscrowRecord {
        EscrowRecord {
            owner: Address([1u8; 32]),
            nonce: 42,
            asset_offered: Address([2u8; 32]),
            asset_wanted: Address([3u8; 32]),
            amount_wanted: 100,
            proof: 254,
        }
    }

    #[test]
    fn packed_record_is_fixed_size() {
        let data = make_record().pack().unwrap();
        assert_eq!(data.len(), EscrowRecord::LEN);
        assert_eq!(&data[..8], &ESCROW_RECORD_DISCRIMINATOR);
    }

    #[test]
    fn nonce_is_little_endian_after_owner() {
        let data = make_record().pack().unwrap();
        assert_eq!(&data[40..48], &42u64.to_le_bytes());
    }

    #[test]
    fn unpack_restores_record() {
        let record = make_record();
        let back = EscrowRecord::unpack(&record.pack().unwrap()).unwrap();
        assert_eq!(record, back);
    }

    #[test]
    fn unpack_rejects_truncated_data() {
        let data = make_record().pack().unwrap();
        let err = EscrowRecord::unpack(&data[..EscrowRecord::LEN - 1]).unwrap_err();
        assert!(matches!(err, EscrowError::InvalidAccountData { .. }));
    }

    #[test]
    fn unpack_rejects_foreign_discriminator() {
        let mut data = make_record().pack().unwrap();
        data[0] ^= 0xff;
        let err = EscrowRecord::unpack(&data).unwrap_err();
        assert!(matches!(err, EscrowError::InvalidAccountData { .. }));
    }
}
