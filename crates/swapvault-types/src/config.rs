//! Configuration types for the ledger and the escrow program.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::constants::{self, NATIVE_ASSET};
use crate::{Address, EscrowError, Result};

/// Custody deposit pricing: every persisted account holds a refundable
/// reserve of `(overhead_bytes + data_len) * per_byte` native units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DepositSchedule {
    /// Fixed storage overhead counted for every account.
    pub overhead_bytes: u64,
    /// Native units charged per stored byte.
    pub per_byte: u64,
}

impl DepositSchedule {
    /// Deposit required to persist an account holding `data_len` bytes.
    #[must_use]
    pub fn deposit_for(&self, data_len: usize) -> u64 {
        let bytes = self.overhead_bytes.saturating_add(data_len as u64);
        bytes.saturating_mul(self.per_byte)
    }
}

impl Default for DepositSchedule {
    fn default() -> Self {
        Self {
            overhead_bytes: constants::DEFAULT_ACCOUNT_OVERHEAD_BYTES,
            per_byte: constants::DEFAULT_DEPOSIT_PER_BYTE,
        }
    }
}

/// Host ledger configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Program that owns every custody account.
    pub custody_program: Address,
    /// Custody deposit pricing.
    pub deposits: DepositSchedule,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            custody_program: constants::CUSTODY_PROGRAM_ID,
            deposits: DepositSchedule::default(),
        }
    }
}

/// Escrow program configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EscrowConfig {
    /// Address of the escrow program; part of every record derivation.
    pub program_id: Address,
    /// Reject offers whose offered and wanted asset are the same.
    pub reject_identical_assets: bool,
}

impl Default for EscrowConfig {
    fn default() -> Self {
        Self {
            program_id: constants::ESCROW_PROGRAM_ID,
            reject_identical_assets: true,
        }
    }
}

/// Top-level configuration for one swapvault deployment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SwapvaultConfig {
    pub ledger: LedgerConfig,
    pub escrow: EscrowConfig,
}

impl SwapvaultConfig {
    /// Parse and validate a JSON configuration document.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON configuration file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    /// Check cross-field constraints.
    ///
    /// # Errors
    /// Returns `Configuration` if the program addresses collide with each
    /// other or with the native asset.
    pub fn validate(&self) -> Result<()> {
        if self.escrow.program_id == self.ledger.custody_program {
            return Err(EscrowError::Configuration(
                "escrow program and custody program must differ".into(),
            ));
        }
        if self.escrow.program_id == NATIVE_ASSET || self.ledger.custody_program == NATIVE_ASSET {
            return Err(EscrowError::Configuration(
                "program addresses must not equal the native asset id".into(),
            ));
        }
        Ok(())
    }
}
