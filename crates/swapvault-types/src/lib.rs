//! # swapvault-types
//!
//! Shared types, errors, and configuration for the **swapvault** escrow
//! engine.
//!
//! This crate is the leaf dependency of the workspace; every other crate
//! depends on it. It defines:
//!
//! - **Addressing**: [`Address`], [`AssetId`], deterministic derivation
//!   ([`Address::find_derived`]) and [`custody_address`]
//! - **Persisted state**: [`EscrowRecord`], [`CustodyAccount`]
//! - **Instructions**: [`EscrowInstruction`], [`MakeTerms`], [`SignedInstruction`]
//! - **Receipts**: [`Receipt`], [`ReceiptKind`], [`ReceiptId`]
//! - **Configuration**: [`SwapvaultConfig`], [`LedgerConfig`], [`EscrowConfig`],
//!   [`DepositSchedule`]
//! - **Errors**: [`EscrowError`] with `SV_ERR_` prefix codes
//! - **Constants**: program ids, seeds, limits and defaults

pub mod address;
pub mod config;
pub mod constants;
pub mod custody;
pub mod error;
pub mod instruction;
pub mod receipt;
pub mod record;

// Re-export all primary types at crate root for ergonomic imports:
//   use swapvault_types::{Address, EscrowRecord, EscrowError, ...};

pub use address::*;
pub use config::*;
pub use custody::*;
pub use error::*;
pub use instruction::*;
pub use receipt::*;
pub use record::*;

// Constants are accessed via `swapvault_types::constants::FOO`
// (not re-exported to avoid name collisions).
