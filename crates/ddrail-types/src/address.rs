//! Deterministic derived addresses.
//!
//! Every account the engine owns is located by hashing fixed seed tags
//! (plus the owner identity where the account is per-user) together with the
//! program id. Clients can compute the same addresses without an index
//! service.
//!
//! ```text
//! address = SHA-256( for seed in seeds: len(seed) as u8 || seed
//!                    || program_id
//!                    || "ProgramDerivedAddress" )
//! ```
//!
//! Seeds are length-prefixed so that no two distinct seed lists hash the
//! same byte stream.

use sha2::{Digest, Sha256};

use crate::Identity;
use crate::constants::{
    BALANCE_SEED, DD_MINT_SEED, DERIVATION_MARKER, ESCROW_SEED, RESERVE_VAULT_SEED, STATE_SEED,
};

/// Derive an address from `seeds` under `program_id`.
#[must_use]
pub fn derive_address(program_id: &Identity, seeds: &[&[u8]]) -> Identity {
    let mut hasher = Sha256::new();
    for seed in seeds {
        // Seeds are at most 32 bytes (tags and identities).
        #[allow(clippy::cast_possible_truncation)]
        hasher.update([seed.len() as u8]);
        hasher.update(seed);
    }
    hasher.update(program_id.as_bytes());
    hasher.update(DERIVATION_MARKER);
    Identity(hasher.finalize().into())
}

/// The singleton program state account.
#[must_use]
pub fn state_address(program_id: &Identity) -> Identity {
    derive_address(program_id, &[STATE_SEED])
}

/// The DD mint. Its own address is its mint authority.
#[must_use]
pub fn dd_mint_address(program_id: &Identity) -> Identity {
    derive_address(program_id, &[DD_MINT_SEED])
}

/// The reserve-asset custody vault.
#[must_use]
pub fn reserve_vault_address(program_id: &Identity) -> Identity {
    derive_address(program_id, &[RESERVE_VAULT_SEED])
}

/// The escrow custody account scoped to `owner`.
#[must_use]
pub fn escrow_address(program_id: &Identity, owner: &Identity) -> Identity {
    derive_address(program_id, &[ESCROW_SEED, owner.as_bytes()])
}

/// The canonical balance account of `owner` for `mint`.
#[must_use]
pub fn associated_balance_address(
    program_id: &Identity,
    owner: &Identity,
    mint: &Identity,
) -> Identity {
    derive_address(program_id, &[BALANCE_SEED, owner.as_bytes(), mint.as_bytes()])
}
