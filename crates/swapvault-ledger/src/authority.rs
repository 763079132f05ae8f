//! Who may move funds: verified signers and derived authorities.
//!
//! A user identity authorizes a debit by signing the submitted instruction;
//! the ledger verifies the signature once and records the identity in
//! [`Signers`]. A derived address has no key: a program authorizes on its
//! behalf by presenting a [`DerivedAuthority`], the exact seeds and proof
//! that re-derive the address under that program's ID.

use std::collections::BTreeSet;

use swapvault_types::{Address, EscrowError, Result, SignedInstruction};

/// Identities whose signatures were verified for the current transaction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Signers(BTreeSet<Address>);

impl Signers {
    /// Verify a signed instruction and admit its signer.
    ///
    /// # Errors
    /// Returns `SignatureInvalid` if the signature does not verify.
    pub fn from_signed(signed: &SignedInstruction) -> Result<Self> {
        signed.verify()?;
        Ok(Self(BTreeSet::from([signed.signer])))
    }

    #[must_use]
    pub fn contains(&self, who: &Address) -> bool {
        self.0.contains(who)
    }

    /// # Errors
    /// Returns `Unauthorized` if `who` did not sign.
    pub fn require(&self, who: &Address) -> Result<()> {
        if self.contains(who) {
            Ok(())
        } else {
            Err(EscrowError::Unauthorized {
                reason: format!("missing signature of {who}"),
            })
        }
    }
}

/// Signer set that skips signature verification. **Never use in production.**
#[cfg(any(test, feature = "test-helpers"))]
impl Signers {
    pub fn trusted(signers: impl IntoIterator<Item = Address>) -> Self {
        Self(signers.into_iter().collect())
    }
}

/// Capability to act for a derived address: the seeds and proof that
/// re-derive it under `program`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DerivedAuthority {
    seeds: Vec<Vec<u8>>,
    proof: u8,
    program: Address,
}

impl DerivedAuthority {
    #[must_use]
    pub fn new(seeds: Vec<Vec<u8>>, proof: u8, program: Address) -> Self {
        Self {
            seeds,
            proof,
            program,
        }
    }

    /// The program that may present this authority.
    #[must_use]
    pub fn program(&self) -> &Address {
        &self.program
    }

    /// The address this authority acts for.
    pub fn address(&self) -> Result<Address> {
        let seeds: Vec<&[u8]> = self.seeds.iter().map(Vec::as_slice).collect();
        Address::create_derived(&seeds, self.proof, &self.program)
    }
}

/// The authority presented for a debit or a closure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Authority {
    /// A user identity; must be among the transaction's verified signers.
    Signer(Address),
    /// A derived address; must be presented by the program it derives under.
    Derived(DerivedAuthority),
}

impl Authority {
    /// Check that this authority controls `owner` within a transaction
    /// invoked by `program` with `signers`.
    ///
    /// # Errors
    /// Returns `Unauthorized` on any mismatch.
    pub fn authorize(&self, owner: &Address, program: &Address, signers: &Signers) -> Result<()> {
        match self {
            Self::Signer(who) => {
                if who != owner {
                    return Err(EscrowError::Unauthorized {
                        reason: format!("{who} does not control {owner}"),
                    });
                }
                signers.require(who)
            }
            Self::Derived(derived) => {
                if derived.program() != program {
                    return Err(EscrowError::Unauthorized {
                        reason: format!(
                            "derived authority of {} presented by {}",
                            derived.program().short(),
                            program.short()
                        ),
                    });
                }
                let address = derived.address().map_err(|e| EscrowError::Unauthorized {
                    reason: format!("derived authority does not re-derive: {e}"),
                })?;
                if address != *owner {
                    return Err(EscrowError::Unauthorized {
                        reason: format!("derived authority {address} does not control {owner}"),
                    });
                }
                Ok(())
            }
        }
    }
}
