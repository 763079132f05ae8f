//! The committed account store.

use std::collections::BTreeMap;

use sha2::{Digest, Sha256};
use swapvault_types::constants::NATIVE_ASSET;
use swapvault_types::{
    Address, AssetId, CustodyAccount, EscrowError, LedgerConfig, Result, custody_address,
};

use crate::account::Account;
use crate::authority::Signers;
use crate::supply_conservation::SupplyConservation;
use crate::transaction::{Changes, Transaction};

const STATE_ROOT_TAG: &[u8] = b"swapvault:state:v1:";

/// Persisted accounts, free native reserves and issuance history.
///
/// All mutation of accounts goes through [`Ledger::execute`], which runs a
/// closure against a [`Transaction`] and commits its writes only on success.
#[derive(Debug)]
pub struct Ledger {
    config: LedgerConfig,
    accounts: BTreeMap<Address, Account>,
    reserves: BTreeMap<Address, u64>,
    supply: SupplyConservation,
}

impl Default for Ledger {
    fn default() -> Self {
        Self::new(LedgerConfig::default())
    }
}

impl Ledger {
    #[must_use]
    pub fn new(config: LedgerConfig) -> Self {
        Self {
            config,
            accounts: BTreeMap::new(),
            reserves: BTreeMap::new(),
            supply: SupplyConservation::new(),
        }
    }

    #[must_use]
    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    /// Run `f` as one atomic transaction invoked by `program`.
    ///
    /// Every write `f` stages is applied if it returns `Ok`; if it returns
    /// `Err` the ledger is left exactly as it was.
    ///
    /// # Errors
    /// Propagates the closure's error.
    pub fn execute<T, F>(&mut self, program: Address, signers: &Signers, f: F) -> Result<T>
    where
        F: FnOnce(&mut Transaction<'_>) -> Result<T>,
    {
        let mut tx = Transaction::new(self, program, signers);
        match f(&mut tx) {
            Ok(value) => {
                let changes = tx.into_changes();
                let touched = changes.accounts.len();
                self.apply(changes);
                tracing::debug!(
                    program = %program.short(),
                    accounts = touched,
                    "Transaction committed"
                );
                Ok(value)
            }
            Err(e) => {
                tracing::warn!(
                    program = %program.short(),
                    error = %e,
                    "Transaction rolled back"
                );
                Err(e)
            }
        }
    }

    fn apply(&mut self, changes: Changes) {
        for (address, account) in changes.accounts {
            match account {
                Some(account) => {
                    self.accounts.insert(address, account);
                }
                None => {
                    self.accounts.remove(&address);
                }
            }
        }
        for (owner, amount) in changes.reserves {
            if amount == 0 {
                self.reserves.remove(&owner);
            } else {
                self.reserves.insert(owner, amount);
            }
        }
    }

    // -----------------------------------------------------------------
    // Issuance
    // -----------------------------------------------------------------

    /// Mint free native reserve to `owner`.
    ///
    /// # Errors
    /// Returns `AmountOverflow` if the reserve would overflow; nothing is
    /// minted in that case.
    pub fn fund_reserve(&mut self, owner: Address, amount: u64) -> Result<()> {
        let balance = self
            .reserve(&owner)
            .checked_add(amount)
            .ok_or(EscrowError::AmountOverflow)?;
        if balance != 0 {
            self.reserves.insert(owner, balance);
        }
        self.supply.record_issuance(NATIVE_ASSET, amount);
        tracing::debug!(owner = %owner, amount, "Reserve funded");
        Ok(())
    }

    /// Mint `amount` of `asset` into the standard custody account of
    /// `owner`, opening it first if needed. The opening deposit is minted as
    /// fresh native supply rather than charged to anyone.
    ///
    /// # Errors
    /// - `InvalidAmount` if `asset` is the native asset
    /// - `CustodyMismatch` if a foreign account occupies the custody address
    /// - `AmountOverflow` if the balance would overflow
    pub fn issue(&mut self, owner: Address, asset: AssetId, amount: u64) -> Result<Address> {
        if asset == NATIVE_ASSET {
            return Err(EscrowError::InvalidAmount {
                reason: "native supply is issued through reserves".into(),
            });
        }
        let address = self.custody_address(&owner, &asset)?;

        let mut custody = match self.accounts.get(&address) {
            Some(_) => {
                let existing = self.custody_account(&address)?;
                if existing.owner != owner || existing.asset != asset {
                    return Err(EscrowError::CustodyMismatch {
                        reason: format!("{address} is not the custody account of {owner}"),
                    });
                }
                existing
            }
            None => CustodyAccount::empty(owner, asset),
        };
        custody.amount = custody
            .amount
            .checked_add(amount)
            .ok_or(EscrowError::AmountOverflow)?;
        let data = custody.pack()?;

        match self.accounts.get_mut(&address) {
            Some(account) => account.data = data,
            None => {
                let reserve = self.config.deposits.deposit_for(data.len());
                self.supply.record_issuance(NATIVE_ASSET, reserve);
                self.accounts.insert(
                    address,
                    Account {
                        program: self.config.custody_program,
                        reserve,
                        data,
                    },
                );
            }
        }
        self.supply.record_issuance(asset, amount);
        tracing::debug!(owner = %owner, asset = %asset.short(), amount, "Asset issued");
        Ok(address)
    }

    // -----------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------

    #[must_use]
    pub fn account(&self, address: &Address) -> Option<&Account> {
        self.accounts.get(address)
    }

    /// Decode the custody account at `address`.
    ///
    /// # Errors
    /// - `AccountNotFound` if nothing lives at `address`
    /// - `CustodyMismatch` if the account is not a custody account
    pub fn custody_account(&self, address: &Address) -> Result<CustodyAccount> {
        let account = self
            .accounts
            .get(address)
            .ok_or(EscrowError::AccountNotFound(*address))?;
        if account.program != self.config.custody_program {
            return Err(EscrowError::CustodyMismatch {
                reason: format!("{address} is not a custody account"),
            });
        }
        CustodyAccount::unpack(&account.data)
    }

    /// Standard custody address of `(owner, asset)`.
    pub fn custody_address(&self, owner: &Address, asset: &AssetId) -> Result<Address> {
        custody_address(owner, asset, &self.config.custody_program).map(|(address, _)| address)
    }

    /// Balance held in the standard custody account of `(owner, asset)`;
    /// zero if the account does not exist.
    #[must_use]
    pub fn balance(&self, owner: &Address, asset: &AssetId) -> u64 {
        self.custody_address(owner, asset)
            .and_then(|address| self.custody_account(&address))
            .map(|custody| custody.amount)
            .unwrap_or(0)
    }

    /// Free native reserve of `owner`.
    #[must_use]
    pub fn reserve(&self, owner: &Address) -> u64 {
        self.reserves.get(owner).copied().unwrap_or(0)
    }

    /// Everything currently held of `asset`.
    #[must_use]
    pub fn total_supply(&self, asset: &AssetId) -> u128 {
        if *asset == NATIVE_ASSET {
            let free: u128 = self.reserves.values().map(|v| u128::from(*v)).sum();
            let locked: u128 = self
                .accounts
                .values()
                .map(|account| u128::from(account.reserve))
                .sum();
            return free + locked;
        }
        self.accounts
            .values()
            .filter(|account| account.program == self.config.custody_program)
            .filter_map(|account| CustodyAccount::unpack(&account.data).ok())
            .filter(|custody| custody.asset == *asset)
            .map(|custody| u128::from(custody.amount))
            .sum()
    }

    /// # Errors
    /// Returns `SupplyInvariantViolation` if held supply drifted from issued.
    pub fn verify_supply(&self, asset: &AssetId) -> Result<()> {
        self.supply.verify(asset, self.total_supply(asset))
    }

    /// Verify conservation of every asset ever issued.
    pub fn verify_all_supply(&self) -> Result<()> {
        self.supply
            .tracked_assets()
            .iter()
            .try_for_each(|asset| self.verify_supply(asset))
    }

    #[must_use]
    pub fn supply(&self) -> &SupplyConservation {
        &self.supply
    }

    /// Digest of all committed state. Equal roots mean equal ledgers.
    #[must_use]
    pub fn state_root(&self) -> [u8; 32] {
        let mut hasher = Sha256::new();
        hasher.update(STATE_ROOT_TAG);
        hasher.update((self.accounts.len() as u64).to_le_bytes());
        for (address, account) in &self.accounts {
            hasher.update(address.as_bytes());
            hasher.update(account.program.as_bytes());
            hasher.update(account.reserve.to_le_bytes());
            hasher.update((account.data.len() as u64).to_le_bytes());
            hasher.update(&account.data);
        }
        hasher.update((self.reserves.len() as u64).to_le_bytes());
        for (owner, amount) in &self.reserves {
            hasher.update(owner.as_bytes());
            hasher.update(amount.to_le_bytes());
        }
        let result = hasher.finalize();
        let mut root = [0u8; 32];
        root.copy_from_slice(&result);
        root
    }

    /// Hex form of [`Self::state_root`], for logs.
    #[must_use]
    pub fn state_root_hex(&self) -> String {
        hex::encode(self.state_root())
    }
}
