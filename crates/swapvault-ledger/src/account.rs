//! A persisted ledger account.

use swapvault_types::Address;

/// One persisted account: raw data owned by a program, plus the custody
/// deposit locked against its storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    /// Program allowed to write and close this account.
    pub program: Address,
    /// Refundable custody deposit, returned to the closer's chosen recipient.
    pub reserve: u64,
    /// Program-defined bytes.
    pub data: Vec<u8>,
}
