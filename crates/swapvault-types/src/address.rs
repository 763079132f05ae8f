//! 32-byte ledger addresses and deterministic address derivation.
//!
//! An [`Address`] is either an Ed25519 public key (a user identity that can
//! sign) or a *derived* address: a SHA-256 digest of fixed seeds that is
//! guaranteed NOT to be a valid curve point, so no private key exists for
//! it. Derived addresses can only be "signed for" by the program whose ID
//! went into the preimage, by re-presenting the same seeds.

use std::{fmt, str::FromStr};

use borsh::{BorshDeserialize, BorshSerialize};
use ed25519_dalek::VerifyingKey;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};

use crate::constants::{DERIVED_ADDRESS_MARKER, MAX_SEED_LEN, MAX_SEEDS};
use crate::{EscrowError, Result};

/// A 32-byte account / identity / asset address.
#[derive(
    Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Default, BorshSerialize, BorshDeserialize,
)]
pub struct Address(pub [u8; 32]);

impl Address {
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// First four bytes as hex, for log lines.
    #[must_use]
    pub fn short(&self) -> String {
        hex::encode(&self.0[..4])
    }

    /// Whether these bytes decompress to an Ed25519 point, i.e. whether a
    /// private key could exist for this address.
    #[must_use]
    pub fn is_on_curve(&self) -> bool {
        VerifyingKey::from_bytes(&self.0).is_ok()
    }

    /// Derive an address from `seeds`, a `proof` byte and the owning program.
    ///
    /// Preimage: `seed_0 || .. || seed_n || proof || program || "DerivedAddress"`.
    ///
    /// # Errors
    /// - `InvalidSeeds` if there are too many seeds or one is too long
    /// - `DerivedOnCurve` if the digest is a valid curve point
    pub fn create_derived(seeds: &[&[u8]], proof: u8, program: &Address) -> Result<Self> {
        if seeds.len() >= MAX_SEEDS {
            return Err(EscrowError::InvalidSeeds {
                reason: format!("{} seeds, at most {} allowed", seeds.len(), MAX_SEEDS - 1),
            });
        }
        if let Some(seed) = seeds.iter().find(|s| s.len() > MAX_SEED_LEN) {
            return Err(EscrowError::InvalidSeeds {
                reason: format!("seed of {} bytes exceeds {MAX_SEED_LEN}", seed.len()),
            });
        }

        let mut hasher = Sha256::new();
        for seed in seeds {
            hasher.update(seed);
        }
        hasher.update([proof]);
        hasher.update(program.0);
        hasher.update(DERIVED_ADDRESS_MARKER);
        let mut digest = [0u8; 32];
        digest.copy_from_slice(&hasher.finalize());

        let candidate = Self(digest);
        if candidate.is_on_curve() {
            return Err(EscrowError::DerivedOnCurve);
        }
        Ok(candidate)
    }

    /// Search for the first off-curve derived address, probing the proof
    /// byte downward from 255.
    ///
    /// The same `(seeds, program)` always yields the same `(address, proof)`.
    ///
    /// # Errors
    /// - `InvalidSeeds` if the seeds violate the limits
    /// - `DerivationExhausted` if every proof lands on the curve
    pub fn find_derived(seeds: &[&[u8]], program: &Address) -> Result<(Self, u8)> {
        for proof in (0..=u8::MAX).rev() {
            match Self::create_derived(seeds, proof, program) {
                Ok(address) => return Ok((address, proof)),
                Err(EscrowError::DerivedOnCurve) => {}
                Err(err) => return Err(err),
            }
        }
        Err(EscrowError::DerivationExhausted)
    }
}

/// Random address for unit tests. **Never use in production.**
#[cfg(any(test, feature = "test-helpers"))]
impl Address {
    #[must_use]
    pub fn new_unique() -> Self {
        Self(rand::random::<[u8; 32]>())
    }
}

impl From<&VerifyingKey> for Address {
    fn from(key: &VerifyingKey) -> Self {
        Self(key.to_bytes())
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", hex::encode(self.0))
    }
}

impl FromStr for Address {
    type Err = EscrowError;

    fn from_str(s: &str) -> Result<Self> {
        let bytes = hex::decode(s)
            .map_err(|e| EscrowError::Serialization(format!("address {s:?}: {e}")))?;
        let bytes: [u8; 32] = bytes.try_into().map_err(|v: Vec<u8>| {
            EscrowError::Serialization(format!("address must be 32 bytes, got {}", v.len()))
        })?;
        Ok(Self(bytes))
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(self.0))
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = <String as Deserialize>::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Asset identifiers are the address of the asset's issuing account.
pub type AssetId = Address;

#[cfg(test)]
mod tests {
    use ed25519_dalek::SigningKey;

    use super::*;

    const PROGRAM: Address = Address([9u8; 32]);

    #[test]
    fn find_derived_is_deterministic() {
        let owner = Address([1u8; 32]);
        let seeds: &[&[u8]] = &[b"escrow", owner.as_bytes(), &7u64.to_le_bytes()];
        let a = Address::find_derived(seeds, &PROGRAM).unwrap();
        let b = Address::find_derived(seeds, &PROGRAM).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn derived_address_is_off_curve() {
        let (address, proof) = Address::find_derived(&[b"anything".as_slice()], &PROGRAM).unwrap();
        assert!(!address.is_on_curve());
        assert_eq!(
            Address::create_derived(&[b"anything".as_slice()], proof, &PROGRAM).unwrap(),
            address
        );
    }

    #[test]
    fn different_seeds_different_address() {
        let (a, _) =
            Address::find_derived(&[b"escrow".as_slice(), &1u64.to_le_bytes()], &PROGRAM).unwrap();
        let (b, _) =
            Address::find_derived(&[b"escrow".as_slice(), &2u64.to_le_bytes()], &PROGRAM).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn program_is_part_of_preimage() {
        let (a, _) = Address::find_derived(&[b"escrow".as_slice()], &PROGRAM).unwrap();
        let (b, _) = Address::find_derived(&[b"escrow".as_slice()], &Address([8u8; 32])).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn verifying_keys_are_on_curve() {
        let key = SigningKey::from_bytes(&rand::random::<[u8; 32]>());
        let address = Address::from(&key.verifying_key());
        assert!(address.is_on_curve());
    }

    #[test]
    fn oversized_seed_rejected() {
        let long = [0u8; MAX_SEED_LEN + 1];
        let err = Address::find_derived(&[&long], &PROGRAM).unwrap_err();
        assert!(matches!(err, EscrowError::InvalidSeeds { .. }));
    }

    #[test]
    fn too_many_seeds_rejected() {
        let seeds: Vec<&[u8]> = vec![b"s".as_slice(); MAX_SEEDS];
        let err = Address::create_derived(&seeds, 255, &PROGRAM).unwrap_err();
        assert!(matches!(err, EscrowError::InvalidSeeds { .. }));
    }

    #[test]
    fn hex_roundtrip_via_serde() {
        let address = Address::new_unique();
        let json = serde_json::to_string(&address).unwrap();
        assert_eq!(json, format!("\"{address}\""));
        let back: Address = serde_json::from_str(&json).unwrap();
        assert_eq!(address, back);
    }

    #[test]
    fn deserialize_rejects_non_hex() {
        assert!(serde_json::from_str::<Address>("42").is_err());
        assert!(serde_json::from_str::<Address>("\"not-hex\"").is_err());
        let config: crate::LedgerConfig =
            serde_json::from_str(&format!("{{\"custody_program\":\"{}\"}}", "11".repeat(32)))
                .unwrap();
        assert_eq!(config.custody_program, Address([0x11; 32]));
    }

    #[test]
    fn parse_rejects_wrong_length() {
        let err = "abcd".parse::<Address>().unwrap_err();
        assert!(matches!(err, EscrowError::Serialization(_)));
    }
}
