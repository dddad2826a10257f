//! Error types for the ddrail settlement engine.
//!
//! All errors use the `RAIL_ERR_` prefix convention for easy grepping in logs.
//! Error codes are grouped by subsystem:
//! - 1xx: Program state errors
//! - 2xx: Authorization errors
//! - 3xx: Balance / account errors
//! - 4xx: Escrow errors
//! - 5xx: Offer / attestation errors
//! - 8xx: Invariant violations
//! - 9xx: General / internal errors

use thiserror::Error;

use crate::{Identity, OfferId};

/// Central error enum for all ddrail operations.
///
/// Every variant is a local, deterministic validation failure. None of them
/// are retried internally; a failed operation leaves all state unchanged.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RailError {
    // =================================================================
    // Program State Errors (1xx)
    // =================================================================
    /// The program state has not been initialized (version is 0).
    #[error("RAIL_ERR_100: Program not initialized")]
    NotInitialized,

    /// Initialize was called on an already-initialized program.
    #[error("RAIL_ERR_101: Program already initialized at version {version}")]
    AlreadyInitialized { version: u8 },

    /// No reserve asset has been bound by `configure` yet.
    #[error("RAIL_ERR_102: Reserve asset not configured")]
    NotConfigured,

    /// The vault or mint identities are inconsistent with prior state.
    #[error("RAIL_ERR_103: Invalid mint binding: {reason}")]
    InvalidMintBinding { reason: String },

    // =================================================================
    // Authorization Errors (2xx)
    // =================================================================
    /// The signer is not the identity required for this privileged operation.
    #[error("RAIL_ERR_200: Unauthorized: {caller} is not {required}")]
    Unauthorized { caller: Identity, required: Identity },

    /// A program-owned address was named as signer outside the program.
    #[error("RAIL_ERR_201: {0} is program-owned and signs only through the program")]
    ProgramSignerRequired(Identity),

    // =================================================================
    // Balance / Account Errors (3xx)
    // =================================================================
    /// Not enough balance to perform the operation.
    #[error("RAIL_ERR_300: Insufficient funds: need {needed}, have {available}")]
    InsufficientFunds { needed: u64, available: u64 },

    /// The referenced asset is not the one this operation accepts.
    #[error("RAIL_ERR_301: Wrong mint: expected {expected}, got {actual}")]
    WrongMint { expected: Identity, actual: Identity },

    /// The amount is not acceptable (e.g. zero).
    #[error("RAIL_ERR_302: Invalid amount: {reason}")]
    InvalidAmount { reason: String },

    /// A balance or supply computation overflowed `u64`.
    #[error("RAIL_ERR_303: Amount overflow")]
    AmountOverflow,

    /// The token account does not exist.
    #[error("RAIL_ERR_304: Account not found: {0}")]
    AccountNotFound(Identity),

    /// A token account or mint already exists at this address.
    #[error("RAIL_ERR_305: Account already exists: {0}")]
    AccountAlreadyExists(Identity),

    /// The mint does not exist.
    #[error("RAIL_ERR_306: Mint not found: {0}")]
    MintNotFound(Identity),

    /// Only empty token accounts can be closed or rebound.
    #[error("RAIL_ERR_307: Account {address} still holds {amount}")]
    AccountNotEmpty { address: Identity, amount: u64 },

    // =================================================================
    // Escrow Errors (4xx)
    // =================================================================
    /// The user already has an open escrow.
    #[error("RAIL_ERR_400: Escrow already open for {0}")]
    EscrowAlreadyOpen(Identity),

    /// No open escrow exists for the given owner.
    #[error("RAIL_ERR_401: No escrow open for {0}")]
    NoEscrow(Identity),

    // =================================================================
    // Offer / Attestation Errors (5xx)
    // =================================================================
    /// The off-ledger attestation signature did not verify.
    #[error("RAIL_ERR_500: Attestation invalid: {reason}")]
    AttestationInvalid { reason: String },

    /// The requested offer is not in the book.
    #[error("RAIL_ERR_501: Offer not found: {0}")]
    OfferNotFound(OfferId),

    /// The offer request could not be decoded.
    #[error("RAIL_ERR_502: Malformed offer: {reason}")]
    MalformedOffer { reason: String },

    /// Two offers cannot form a deal (direction or amount differ).
    #[error("RAIL_ERR_503: Deal mismatch: {reason}")]
    DealMismatch { reason: String },

    // =================================================================
    // Invariant Violations (8xx)
    // =================================================================
    /// Vault balance and DD supply no longer agree. Critical safety alert.
    #[error("RAIL_ERR_800: Supply invariant violation: {reason}")]
    SupplyInvariantViolation { reason: String },

    // =================================================================
    // General / Internal (9xx)
    // =================================================================
    /// Unrecoverable internal error.
    #[error("RAIL_ERR_900: Internal error: {0}")]
    Internal(String),

    /// Serialization / deserialization error.
    #[error("RAIL_ERR_901: Serialization error: {0}")]
    Serialization(String),

    /// Configuration error (missing env, bad key material, etc.).
    #[error("RAIL_ERR_902: Configuration error: {0}")]
    Configuration(String),

    /// I/O error.
    #[error("RAIL_ERR_903: I/O error: {0}")]
    Io(String),
}

impl RailError {
    /// Numeric code of this error (the `NNN` in `RAIL_ERR_NNN`).
    #[must_use]
    pub fn code(&self) -> u16 {
        match self {
            Self::NotInitialized => 100,
            Self::AlreadyInitialized { .. } => 101,
            Self::NotConfigured => 102,
            Self::InvalidMintBinding { .. } => 103,
            Self::Unauthorized { .. } => 200,
            Self::ProgramSignerRequired(_) => 201,
            Self::InsufficientFunds { .. } => 300,
            Self::WrongMint { .. } => 301,
            Self::InvalidAmount { .. } => 302,
            Self::AmountOverflow => 303,
            Self::AccountNotFound(_) => 304,
            Self::AccountAlreadyExists(_) => 305,
            Self::MintNotFound(_) => 306,
            Self::AccountNotEmpty { .. } => 307,
            Self::EscrowAlreadyOpen(_) => 400,
            Self::NoEscrow(_) => 401,
            Self::AttestationInvalid { .. } => 500,
            Self::OfferNotFound(_) => 501,
            Self::MalformedOffer { .. } => 502,
            Self::DealMismatch { .. } => 503,
            Self::SupplyInvariantViolation { .. } => 800,
            Self::Internal(_) => 900,
            Self::Serialization(_) => 901,
            Self::Configuration(_) => 902,
            Self::Io(_) => 903,
        }
    }
}

/// Crate-wide `Result` alias.
pub type Result<T> = std::result::Result<T, RailError>;

impl From<std::io::Error> for RailError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_json::Error> for RailError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_contains_prefix() {
        let err = RailError::NoEscrow(Identity::from_bytes([7u8; 32]));
        let msg = format!("{err}");
        assert!(msg.starts_with("RAIL_ERR_401"), "Got: {msg}");
    }

    #[test]
    fn insufficient_funds_display() {
        let err = RailError::InsufficientFunds {
            needed: 100,
            available: 50,
        };
        let msg = format!("{err}");
        assert!(msg.contains("RAIL_ERR_300"));
        assert!(msg.contains("100"));
        assert!(msg.contains("50"));
    }

    #[test]
    fn code_matches_display_prefix() {
        let errors = vec![
            RailError::NotInitialized,
            RailError::AlreadyInitialized { version: 1 },
            RailError::Unauthorized {
                caller: Identity::from_bytes([1u8; 32]),
                required: Identity::from_bytes([2u8; 32]),
            },
            RailError::ProgramSignerRequired(Identity::from_bytes([4u8; 32])),
            RailError::AmountOverflow,
            RailError::EscrowAlreadyOpen(Identity::from_bytes([3u8; 32])),
            RailError::SupplyInvariantViolation {
                reason: "test".into(),
            },
            RailError::Internal("test".into()),
        ];
        for err in errors {
            let msg = format!("{err}");
            let expected = format!("RAIL_ERR_{}:", err.code());
            assert!(msg.starts_with(&expected), "{msg} vs {expected}");
        }
    }

    #[test]
    fn serde_json_error_converts() {
        let err: RailError = serde_json::from_str::<u64>("nope").unwrap_err().into();
        assert!(matches!(err, RailError::Serialization(_)));
    }
}
