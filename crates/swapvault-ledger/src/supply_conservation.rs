//! Supply conservation invariant checker.
//!
//! Mathematical invariant enforced after every transaction:
//! ```text
//! ∀ asset: Σ(holdings) == Σ(issued)
//! ```
//!
//! Holdings of a fungible asset are the amounts in its custody accounts;
//! holdings of the native asset are free reserves plus the custody deposits
//! locked in persisted accounts. Transactions only move value, so any drift
//! between issued and held supply means value was created or destroyed.

use std::collections::HashMap;

use swapvault_types::{AssetId, EscrowError, Result};

/// Tracks per-asset issued totals and validates conservation.
#[derive(Debug, Default)]
pub struct SupplyConservation {
    /// Total issued per asset since genesis.
    issued: HashMap<AssetId, u128>,
}

impl SupplyConservation {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record newly issued supply.
    pub fn record_issuance(&mut self, asset: AssetId, amount: u64) {
        *self.issued.entry(asset).or_insert(0) += u128::from(amount);
    }

    /// Expected total supply for an asset.
    #[must_use]
    pub fn expected_supply(&self, asset: &AssetId) -> u128 {
        self.issued.get(asset).copied().unwrap_or(0)
    }

    /// Verify that the actual holdings of `asset` match the issued total.
    ///
    /// # Errors
    /// Returns [`EscrowError::SupplyInvariantViolation`] if actual ≠ expected.
    pub fn verify(&self, asset: &AssetId, actual_supply: u128) -> Result<()> {
        let expected = self.expected_supply(asset);
        if actual_supply != expected {
            return Err(EscrowError::SupplyInvariantViolation {
                reason: format!(
                    "Asset {asset}: actual supply {actual_supply} != issued {expected}"
                ),
            });
        }
        Ok(())
    }

    /// All assets with recorded issuance, sorted.
    #[must_use]
    pub fn tracked_assets(&self) -> Vec<AssetId> {
        let mut assets: Vec<AssetId> = self.issued.keys().copied().collect();
        assets.sort();
        assets
    }
}
