//! The transactional boundary.
//!
//! A [`Transaction`] reads through to the committed [`Ledger`] and stages
//! every write in its own overlay. The ledger applies the overlay only if
//! the whole closure returns `Ok`; on error the overlay is dropped, so no
//! partial state is ever visible.

use std::collections::BTreeMap;

use swapvault_types::{
    Address, AssetId, CustodyAccount, DepositSchedule, EscrowError, Result, custody_address,
};

use crate::account::Account;
use crate::authority::{Authority, Signers};
use crate::ledger::Ledger;

/// Staged writes produced by a successful transaction.
pub(crate) struct Changes {
    /// `None` marks a closed account.
    pub(crate) accounts: BTreeMap<Address, Option<Account>>,
    pub(crate) reserves: BTreeMap<Address, u64>,
}

/// One in-flight, all-or-nothing unit of work invoked by `program`.
pub struct Transaction<'a> {
    base: &'a Ledger,
    program: Address,
    signers: &'a Signers,
    accounts: BTreeMap<Address, Option<Account>>,
    reserves: BTreeMap<Address, u64>,
}

impl<'a> Transaction<'a> {
    pub(crate) fn new(base: &'a Ledger, program: Address, signers: &'a Signers) -> Self {
        Self {
            base,
            program,
            signers,
            accounts: BTreeMap::new(),
            reserves: BTreeMap::new(),
        }
    }

    pub(crate) fn into_changes(self) -> Changes {
        Changes {
            accounts: self.accounts,
            reserves: self.reserves,
        }
    }

    /// The program this transaction runs on behalf of.
    #[must_use]
    pub fn program(&self) -> &Address {
        &self.program
    }

    /// # Errors
    /// Returns `Unauthorized` if `who` did not sign this transaction.
    pub fn require_signer(&self, who: &Address) -> Result<()> {
        self.signers.require(who)
    }

    #[must_use]
    pub fn deposits(&self) -> &DepositSchedule {
        &self.base.config().deposits
    }

    #[must_use]
    pub fn custody_program(&self) -> &Address {
        &self.base.config().custody_program
    }

    // -----------------------------------------------------------------
    // Raw accounts
    // -----------------------------------------------------------------

    /// Current view of an account, staged writes first.
    #[must_use]
    pub fn account(&self, address: &Address) -> Option<&Account> {
        match self.accounts.get(address) {
            Some(staged) => staged.as_ref(),
            None => self.base.account(address),
        }
    }

    #[must_use]
    pub fn exists(&self, address: &Address) -> bool {
        self.account(address).is_some()
    }

    /// Free native reserve of `owner`.
    #[must_use]
    pub fn reserve(&self, owner: &Address) -> u64 {
        self.reserves
            .get(owner)
            .copied()
            .unwrap_or_else(|| self.base.reserve(owner))
    }

    fn debit_reserve(&mut self, owner: &Address, amount: u64) -> Result<()> {
        let available = self.reserve(owner);
        if available < amount {
            return Err(EscrowError::InsufficientFunds {
                needed: amount,
                available,
            });
        }
        self.reserves.insert(*owner, available - amount);
        Ok(())
    }

    fn credit_reserve(&mut self, owner: &Address, amount: u64) -> Result<()> {
        let balance = self
            .reserve(owner)
            .checked_add(amount)
            .ok_or(EscrowError::AmountOverflow)?;
        self.reserves.insert(*owner, balance);
        Ok(())
    }

    /// Create an account owned by the invoking program, charging its
    /// custody deposit to `payer`.
    ///
    /// # Errors
    /// - `Unauthorized` if `payer` did not sign
    /// - `AccountInUse` if an account already lives at `address`
    /// - `InsufficientFunds` if `payer` cannot cover the deposit
    pub fn create_account(
        &mut self,
        address: Address,
        data: Vec<u8>,
        payer: &Address,
    ) -> Result<()> {
        let program = self.program;
        self.create_owned(address, program, data, payer)
    }

    fn create_owned(
        &mut self,
        address: Address,
        program: Address,
        data: Vec<u8>,
        payer: &Address,
    ) -> Result<()> {
        self.require_signer(payer)?;
        if self.exists(&address) {
            return Err(EscrowError::AccountInUse(address));
        }
        let reserve = self.deposits().deposit_for(data.len());
        self.debit_reserve(payer, reserve)?;
        self.accounts.insert(
            address,
            Some(Account {
                program,
                reserve,
                data,
            }),
        );
        Ok(())
    }

    /// Close an account owned by the invoking program and refund its
    /// deposit to `refund_to`. Returns the closed account.
    ///
    /// # Errors
    /// - `AccountNotFound` if nothing lives at `address`
    /// - `Unauthorized` if another program owns it
    pub fn close_account(&mut self, address: &Address, refund_to: &Address) -> Result<Account> {
        let account = self
            .account(address)
            .cloned()
            .ok_or(EscrowError::AccountNotFound(*address))?;
        if account.program != self.program {
            return Err(EscrowError::Unauthorized {
                reason: format!(
                    "account {address} belongs to program {}",
                    account.program.short()
                ),
            });
        }
        self.remove(address, &account, refund_to)?;
        Ok(account)
    }

    fn remove(&mut self, address: &Address, account: &Account, refund_to: &Address) -> Result<()> {
        self.credit_reserve(refund_to, account.reserve)?;
        self.accounts.insert(*address, None);
        Ok(())
    }

    // -----------------------------------------------------------------
    // Custody accounts
    // -----------------------------------------------------------------

    /// Standard custody address for `(owner, asset)`.
    pub fn custody_address(&self, owner: &Address, asset: &AssetId) -> Result<Address> {
        custody_address(owner, asset, self.custody_program()).map(|(address, _)| address)
    }

    /// Decode the custody account at `address`.
    ///
    /// # Errors
    /// - `AccountNotFound` if nothing lives at `address`
    /// - `CustodyMismatch` if the account is not a custody account
    pub fn custody(&self, address: &Address) -> Result<CustodyAccount> {
        let account = self
            .account(address)
            .ok_or(EscrowError::AccountNotFound(*address))?;
        if account.program != *self.custody_program() {
            return Err(EscrowError::CustodyMismatch {
                reason: format!("{address} is not a custody account"),
            });
        }
        CustodyAccount::unpack(&account.data)
    }

    fn store_custody(&mut self, address: &Address, custody: &CustodyAccount) -> Result<()> {
        let mut account = self
            .account(address)
            .cloned()
            .ok_or(EscrowError::AccountNotFound(*address))?;
        account.data = custody.pack()?;
        self.accounts.insert(*address, Some(account));
        Ok(())
    }

    /// Open the standard custody account of `(owner, asset)`, paid by `payer`.
    ///
    /// # Errors
    /// - `AccountInUse` if it already exists
    /// - `Unauthorized` / `InsufficientFunds` from the deposit charge
    pub fn open_custody(
        &mut self,
        owner: &Address,
        asset: &AssetId,
        payer: &Address,
    ) -> Result<Address> {
        let address = self.custody_address(owner, asset)?;
        let data = CustodyAccount::empty(*owner, *asset).pack()?;
        let program = *self.custody_program();
        self.create_owned(address, program, data, payer)?;
        Ok(address)
    }

    /// Like [`Self::open_custody`], but returns the existing account if it
    /// is already open for exactly `(owner, asset)`.
    ///
    /// # Errors
    /// Returns `CustodyMismatch` if a foreign account occupies the address.
    pub fn open_custody_idempotent(
        &mut self,
        owner: &Address,
        asset: &AssetId,
        payer: &Address,
    ) -> Result<Address> {
        let address = self.custody_address(owner, asset)?;
        if !self.exists(&address) {
            return self.open_custody(owner, asset, payer);
        }
        let existing = self.custody(&address)?;
        if existing.owner != *owner || existing.asset != *asset {
            return Err(EscrowError::CustodyMismatch {
                reason: format!("{address} is not the custody account of {owner} for {asset}"),
            });
        }
        Ok(address)
    }

    /// Move `amount` between two custody accounts of the same asset.
    ///
    /// # Errors
    /// - `AccountNotFound` / `CustodyMismatch` for missing or mismatched accounts
    /// - `Unauthorized` if `authority` does not control the source
    /// - `InsufficientFunds` if the source holds less than `amount`
    /// - `AmountOverflow` if the destination would overflow
    pub fn transfer(
        &mut self,
        from: &Address,
        to: &Address,
        amount: u64,
        authority: &Authority,
    ) -> Result<()> {
        let mut source = self.custody(from)?;
        let mut destination = self.custody(to)?;
        if source.asset != destination.asset {
            return Err(EscrowError::CustodyMismatch {
                reason: format!(
                    "cannot move {} into an account of {}",
                    source.asset.short(),
                    destination.asset.short()
                ),
            });
        }
        authority.authorize(&source.owner, &self.program, self.signers)?;
        if source.amount < amount {
            return Err(EscrowError::InsufficientFunds {
                needed: amount,
                available: source.amount,
            });
        }
        if from == to {
            return Ok(());
        }

        destination.amount = destination
            .amount
            .checked_add(amount)
            .ok_or(EscrowError::AmountOverflow)?;
        source.amount -= amount;
        self.store_custody(from, &source)?;
        self.store_custody(to, &destination)
    }

    /// Close an empty custody account and refund its deposit to `refund_to`.
    ///
    /// # Errors
    /// - `Unauthorized` if `authority` does not control the account
    /// - `CustodyMismatch` if the account still holds a balance
    pub fn close_custody(
        &mut self,
        address: &Address,
        authority: &Authority,
        refund_to: &Address,
    ) -> Result<()> {
        let custody = self.custody(address)?;
        authority.authorize(&custody.owner, &self.program, self.signers)?;
        if custody.amount != 0 {
            return Err(EscrowError::CustodyMismatch {
                reason: format!("cannot close {address} holding {}", custody.amount),
            });
        }
        let account = self
            .account(address)
            .cloned()
            .ok_or(EscrowError::AccountNotFound(*address))?;
        self.remove(address, &account, refund_to)
    }
}

#[cfg(test)]
mod tests {
    use swapvault_types::LedgerConfig;

    use super::*;
    use crate::authority::DerivedAuthority;

    const PROGRAM: Address = Address([9u8; 32]);
    const ASSET_A: Address = Address([1u8; 32]);
    const ASSET_B: Address = Address([2u8; 32]);

    fn funded(users: &[Address]) -> Ledger {
        let mut ledger = Ledger::new(LedgerConfig::default());
        for user in users {
            ledger.fund_reserve(*user, 10_000_000).unwrap();
        }
        ledger
    }

    #[test]
    fn staged_writes_visible_inside_transaction() {
        let user = Address::new_unique();
        let mut ledger = funded(&[user]);
        let signers = Signers::trusted([user]);
        ledger
            .execute(PROGRAM, &signers, |tx| {
                let address = tx.open_custody(&user, &ASSET_A, &user)?;
                assert!(tx.exists(&address));
                assert_eq!(tx.custody(&address)?.amount, 0);
                Ok(())
            })
            .unwrap();
    }

    #[test]
    fn opening_custody_charges_deposit() {
        let user = Address::new_unique();
        let mut ledger = funded(&[user]);
        let deposit = ledger.config().deposits.deposit_for(CustodyAccount::LEN);
        ledger
            .execute(PROGRAM, &Signers::trusted([user]), |tx| {
                tx.open_custody(&user, &ASSET_A, &user)
            })
            .unwrap();
        assert_eq!(ledger.reserve(&user), 10_000_000 - deposit);
    }

    #[test]
    fn unsigned_payer_rejected() {
        let user = Address::new_unique();
        let mut ledger = funded(&[user]);
        let err = ledger
            .execute(PROGRAM, &Signers::default(), |tx| {
                tx.open_custody(&user, &ASSET_A, &user)
            })
            .unwrap_err();
        assert!(matches!(err, EscrowError::Unauthorized { .. }));
    }

    #[test]
    fn transfer_between_signers() {
        let alice = Address::new_unique();
        let bob = Address::new_unique();
        let mut ledger = funded(&[alice, bob]);
        let from = ledger.issue(alice, ASSET_A, 100).unwrap();
        let to = ledger.issue(bob, ASSET_A, 0).unwrap();

        ledger
            .execute(PROGRAM, &Signers::trusted([alice]), |tx| {
                tx.transfer(&from, &to, 40, &Authority::Signer(alice))
            })
            .unwrap();
        assert_eq!(ledger.balance(&alice, &ASSET_A), 60);
        assert_eq!(ledger.balance(&bob, &ASSET_A), 40);
    }

    #[test]
    fn transfer_across_assets_rejected() {
        let alice = Address::new_unique();
        let mut ledger = funded(&[alice]);
        let from = ledger.issue(alice, ASSET_A, 100).unwrap();
        let to = ledger.issue(alice, ASSET_B, 0).unwrap();
        let err = ledger
            .execute(PROGRAM, &Signers::trusted([alice]), |tx| {
                tx.transfer(&from, &to, 1, &Authority::Signer(alice))
            })
            .unwrap_err();
        assert!(matches!(err, EscrowError::CustodyMismatch { .. }));
    }

    #[test]
    fn overdraft_rejected() {
        let alice = Address::new_unique();
        let bob = Address::new_unique();
        let mut ledger = funded(&[alice, bob]);
        let from = ledger.issue(alice, ASSET_A, 10).unwrap();
        let to = ledger.issue(bob, ASSET_A, 0).unwrap();
        let err = ledger
            .execute(PROGRAM, &Signers::trusted([alice]), |tx| {
                tx.transfer(&from, &to, 11, &Authority::Signer(alice))
            })
            .unwrap_err();
        assert!(matches!(
            err,
            EscrowError::InsufficientFunds {
                needed: 11,
                available: 10
            }
        ));
    }

    #[test]
    fn derived_owner_moves_funds_only_through_its_program() {
        let alice = Address::new_unique();
        let mut ledger = funded(&[alice]);
        let seeds = vec![b"pool".to_vec()];
        let (pool, proof) = Address::find_derived(&[b"pool".as_slice()], &PROGRAM).unwrap();
        let authority = Authority::Derived(DerivedAuthority::new(seeds, proof, PROGRAM));

        let from = ledger.issue(pool, ASSET_A, 50).unwrap();
        let to = ledger.issue(alice, ASSET_A, 0).unwrap();

        let err = ledger
            .execute(Address([8u8; 32]), &Signers::default(), |tx| {
                tx.transfer(&from, &to, 50, &authority)
            })
            .unwrap_err();
        assert!(matches!(err, EscrowError::Unauthorized { .. }));

        ledger
            .execute(PROGRAM, &Signers::default(), |tx| {
                tx.transfer(&from, &to, 50, &authority)
            })
            .unwrap();
        assert_eq!(ledger.balance(&alice, &ASSET_A), 50);
    }

    #[test]
    fn close_non_empty_custody_rejected() {
        let alice = Address::new_unique();
        let mut ledger = funded(&[alice]);
        let address = ledger.issue(alice, ASSET_A, 5).unwrap();
        let err = ledger
            .execute(PROGRAM, &Signers::trusted([alice]), |tx| {
                tx.close_custody(&address, &Authority::Signer(alice), &alice)
            })
            .unwrap_err();
        assert!(matches!(err, EscrowError::CustodyMismatch { .. }));
    }

    #[test]
    fn close_refunds_deposit() {
        let alice = Address::new_unique();
        let mut ledger = funded(&[alice]);
        let before = ledger.reserve(&alice);
        let address = ledger
            .execute(PROGRAM, &Signers::trusted([alice]), |tx| {
                tx.open_custody(&alice, &ASSET_A, &alice)
            })
            .unwrap();
        ledger
            .execute(PROGRAM, &Signers::trusted([alice]), |tx| {
                tx.close_custody(&address, &Authority::Signer(alice), &alice)
            })
            .unwrap();
        assert_eq!(ledger.reserve(&alice), before);
        assert!(ledger.account(&address).is_none());
    }

    #[test]
    fn program_accounts_closed_only_by_owner_program() {
        let alice = Address::new_unique();
        let mut ledger = funded(&[alice]);
        let address = Address::new_unique();
        ledger
            .execute(PROGRAM, &Signers::trusted([alice]), |tx| {
                tx.create_account(address, vec![1, 2, 3], &alice)
            })
            .unwrap();
        let err = ledger
            .execute(Address([8u8; 32]), &Signers::trusted([alice]), |tx| {
                tx.close_account(&address, &alice)
            })
            .unwrap_err();
        assert!(matches!(err, EscrowError::Unauthorized { .. }));
    }

    #[test]
    fn create_over_existing_account_rejected() {
        let alice = Address::new_unique();
        let mut ledger = funded(&[alice]);
        let address = Address::new_unique();
        let signers = Signers::trusted([alice]);
        ledger
            .execute(PROGRAM, &signers, |tx| tx.create_account(address, vec![0], &alice))
            .unwrap();
        let err = ledger
            .execute(PROGRAM, &signers, |tx| tx.create_account(address, vec![0], &alice))
            .unwrap_err();
        assert!(matches!(err, EscrowError::AccountInUse(a) if a == address));
    }

    #[test]
    fn idempotent_open_returns_existing() {
        let alice = Address::new_unique();
        let mut ledger = funded(&[alice]);
        let existing = ledger.issue(alice, ASSET_A, 7).unwrap();
        let reserve = ledger.reserve(&alice);
        let address = ledger
            .execute(PROGRAM, &Signers::trusted([alice]), |tx| {
                tx.open_custody_idempotent(&alice, &ASSET_A, &alice)
            })
            .unwrap();
        assert_eq!(address, existing);
        assert_eq!(ledger.balance(&alice, &ASSET_A), 7);
        assert_eq!(ledger.reserve(&alice), reserve);
    }
}
