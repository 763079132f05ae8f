//! System-wide constants for the swapvault escrow engine.

use crate::Address;

/// Default address of the escrow program (owner of every escrow record).
pub const ESCROW_PROGRAM_ID: Address = Address(*b"swapvault::escrow::program::v001");

/// Default address of the custody program (owner of every custody account).
pub const CUSTODY_PROGRAM_ID: Address = Address(*b"swapvault::custody::program::v01");

/// Asset identifier of the native reserve asset used for custody deposits.
pub const NATIVE_ASSET: Address = Address([0u8; 32]);

/// Protocol tag prefixed to every escrow record derivation.
pub const ESCROW_SEED: &[u8] = b"escrow";

/// Tag separating owner and asset in custody account derivations.
pub const CUSTODY_SEED: &[u8] = b"custody";

/// Marker appended to every derived-address preimage.
pub const DERIVED_ADDRESS_MARKER: &[u8] = b"DerivedAddress";

/// Maximum number of seeds in one derivation (the proof byte included).
pub const MAX_SEEDS: usize = 16;

/// Maximum length of a single seed in bytes.
pub const MAX_SEED_LEN: usize = 32;

/// Discriminator prefixed to persisted escrow records.
pub const ESCROW_RECORD_DISCRIMINATOR: [u8; 8] = *b"svescrow";

/// Fixed per-account storage overhead charged on top of the data length.
pub const DEFAULT_ACCOUNT_OVERHEAD_BYTES: u64 = 128;

/// Default custody deposit rate per stored byte.
pub const DEFAULT_DEPOSIT_PER_BYTE: u64 = 6_960;

/// Domain tag for instruction signing payloads.
pub const INSTRUCTION_SIGNING_TAG: &[u8] = b"swapvault:ix:v1:";

/// Domain tag for receipt payload hashes.
pub const RECEIPT_HASH_TAG: &[u8] = b"swapvault:receipt:v1:";
