//! Token account types for the custody model.
//!
//! A `MintAccount` defines an asset (DD or the reserve asset) and who may
//! issue it. A `TokenAccount` holds a balance of exactly one mint and can be
//! debited only by its `authority`.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::Identity;

/// Issuance record of one asset.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct MintAccount {
    /// Decimal places of the base unit.
    pub decimals: u8,
    /// Outstanding supply in base units.
    pub supply: u64,
    /// The only identity allowed to mint new units.
    pub authority: Identity,
}

impl MintAccount {
    #[must_use]
    pub fn new(decimals: u8, authority: Identity) -> Self {
        Self {
            decimals,
            supply: 0,
            authority,
        }
    }
}

/// A balance of a single mint.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokenAccount {
    /// Which asset this account holds.
    pub mint: Identity,
    /// Who may debit or close the account.
    pub authority: Identity,
    /// Balance in base units.
    pub amount: u64,
}

impl TokenAccount {
    /// Create an empty account.
    #[must_use]
    pub fn new(mint: Identity, authority: Identity) -> Self {
        Self {
            mint,
            authority,
            amount: 0,
        }
    }

    /// Whether this account holds nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.amount == 0
    }
}

/// Convert a base-unit amount to its human decimal form.
///
/// `ui_amount(223_000_000, 6) == 223.000000`. Scales beyond 28 are clamped.
#[must_use]
pub fn ui_amount(amount: u64, decimals: u8) -> Decimal {
    const MAX_SCALE: u8 = 28;
    Decimal::from_i128_with_scale(i128::from(amount), u32::from(decimals.min(MAX_SCALE)))
}
