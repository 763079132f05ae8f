//! # swapvault-ledger
//!
//! **Host ledger**: the account store the escrow program runs against.
//!
//! ## Architecture
//!
//! Every state change runs inside [`Ledger::execute`]:
//! 1. The caller supplies the invoking program and the verified [`Signers`]
//! 2. The closure stages writes against a [`Transaction`] overlay
//! 3. On `Ok` the overlay is committed; on `Err` it is discarded
//!
//! Custody accounts hold fungible balances at derived addresses. Debits
//! require an [`Authority`]: a signer, or a [`DerivedAuthority`] presented
//! by the program the address derives under. Every persisted account locks
//! a refundable deposit from its payer, and [`SupplyConservation`] checks
//! that no transaction creates or destroys value.

pub mod account;
pub mod authority;
pub mod ledger;
pub mod supply_conservation;
pub mod transaction;

pub use account::Account;
pub use authority::{Authority, DerivedAuthority, Signers};
pub use ledger::Ledger;
pub use supply_conservation::SupplyConservation;
pub use transaction::Transaction;
