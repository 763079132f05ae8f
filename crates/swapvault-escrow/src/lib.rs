//! # swapvault-escrow
//!
//! **Escrow program**: single-offer, all-or-nothing asset swaps settled on
//! a [`swapvault_ledger::Ledger`].
//!
//! ## Architecture
//!
//! A maker locks an offered asset and names a price in a wanted asset:
//! 1. [`derive`](mod@derive) computes the record address from `(maker, nonce)` and the
//!    vault address from `(record, asset_offered)`
//! 2. [`store`] persists the offer's terms at the record address
//! 3. [`vault`] holds the locked asset in a custody account owned by the
//!    record, which only this program can debit
//! 4. [`lifecycle`] runs Make, Take and Refund, each as one ledger
//!    transaction
//! 5. [`processor`] verifies signed instructions and issues receipts
//!
//! At most one Take or Refund succeeds per record: the first one closes it.

pub mod derive;
pub mod lifecycle;
pub mod processor;
pub mod store;
pub mod vault;

pub use derive::{EscrowAuthority, derive, derive_vault};
pub use lifecycle::{EscrowProgram, Fulfillment, Opened, Refunded};
