//! Error types for the swapvault escrow engine.
//!
//! All errors use the `SV_ERR_` prefix convention for easy grepping in logs.
//! Error codes are grouped by subsystem:
//! - 1xx: Amount / balance errors
//! - 2xx: Escrow record errors
//! - 3xx: Custody account errors
//! - 4xx: Authorization errors
//! - 5xx: Address derivation errors
//! - 6xx: Ledger invariant errors
//! - 9xx: General / internal errors

use thiserror::Error;

use crate::Address;

/// Central error enum for all swapvault operations.
#[derive(Debug, Error)]
pub enum EscrowError {
    // =================================================================
    // Amount Errors (1xx)
    // =================================================================
    /// A debit exceeds the available balance.
    #[error("SV_ERR_100: Insufficient funds: need {needed}, have {available}")]
    InsufficientFunds { needed: u64, available: u64 },

    /// A zero or otherwise disallowed quantity.
    #[error("SV_ERR_101: Invalid amount: {reason}")]
    InvalidAmount { reason: String },

    /// A credit would overflow the destination balance.
    #[error("SV_ERR_102: Amount overflow")]
    AmountOverflow,

    // =================================================================
    // Record Errors (2xx)
    // =================================================================
    /// An account already lives at the derived record address.
    #[error("SV_ERR_200: Escrow record already exists: {0}")]
    RecordCollision(Address),

    /// No open escrow record at this address (never made, or already closed).
    #[error("SV_ERR_201: Escrow record not found: {0}")]
    RecordNotFound(Address),

    /// The offered and wanted assets are the same.
    #[error("SV_ERR_202: Offered and wanted asset are identical: {0}")]
    IdenticalAssets(Address),

    /// Persisted bytes do not decode into the expected layout.
    #[error("SV_ERR_203: Invalid account data: {reason}")]
    InvalidAccountData { reason: String },

    /// The native asset lives in reserves, not custody, and cannot be escrowed.
    #[error("SV_ERR_204: Native asset cannot be escrowed")]
    NativeAssetNotEscrowable,

    // =================================================================
    // Custody Errors (3xx)
    // =================================================================
    /// A custody account does not belong to the record / asset it claims.
    #[error("SV_ERR_300: Custody mismatch: {reason}")]
    CustodyMismatch { reason: String },

    /// No account at this address.
    #[error("SV_ERR_301: Account not found: {0}")]
    AccountNotFound(Address),

    /// An account already exists at this address.
    #[error("SV_ERR_302: Account already in use: {0}")]
    AccountInUse(Address),

    // =================================================================
    // Authorization Errors (4xx)
    // =================================================================
    /// A required signer or derived authority is missing.
    #[error("SV_ERR_400: Unauthorized: {reason}")]
    Unauthorized { reason: String },

    /// The Ed25519 signature on an instruction didn't verify.
    #[error("SV_ERR_401: Instruction signature verification failed")]
    SignatureInvalid,

    // =================================================================
    // Derivation Errors (5xx)
    // =================================================================
    /// Seeds exceed the count or length limits.
    #[error("SV_ERR_500: Invalid seeds: {reason}")]
    InvalidSeeds { reason: String },

    /// The candidate digest is a valid curve point and cannot be a derived address.
    #[error("SV_ERR_501: Derived address lies on the curve")]
    DerivedOnCurve,

    /// No proof byte in 0..=255 produced an off-curve address.
    #[error("SV_ERR_502: Address derivation exhausted all proofs")]
    DerivationExhausted,

    // =================================================================
    // Ledger Errors (6xx)
    // =================================================================
    /// Supply conservation invariant violated.
    #[error("SV_ERR_600: Supply invariant violation: {reason}")]
    SupplyInvariantViolation { reason: String },

    // =================================================================
    // General / Internal (9xx)
    // =================================================================
    /// Serialization / deserialization error.
    #[error("SV_ERR_901: Serialization error: {0}")]
    Serialization(String),

    /// Configuration error (invalid config file, bad values, etc.).
    #[error("SV_ERR_902: Configuration error: {0}")]
    Configuration(String),

    /// I/O error.
    #[error("SV_ERR_903: I/O error: {0}")]
    Io(String),
}

/// Crate-wide `Result` alias.
pub type Result<T> = std::result::Result<T, EscrowError>;

impl From<std::io::Error> for EscrowError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_json::Error> for EscrowError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
