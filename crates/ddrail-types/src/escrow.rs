//! Escrow records: DD locked for an OTC fiat exchange.
//!
//! ## Lifecycle
//!
//! ```text
//!   offer-DD            release-funds (settlement authority only)
//!   ────────▶ OPEN ───────────────────────────────────────────▶ (closed)
//! ```
//!
//! A record exists if and only if its custody account holds at least
//! `locked_amount > 0` DD. Anyone may add to a custody account, but there is
//! no unlock path: the owner cannot spend escrowed DD, only the settlement
//! authority can move it out, and a release moves everything held.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::Identity;

/// One open escrow. At most one per owner.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct EscrowRecord {
    /// The user who locked the funds.
    pub owner: Identity,
    /// Derived custody account holding the DD.
    pub custody: Identity,
    /// Locked DD in base units. Fixed at creation.
    pub locked_amount: u64,
    /// When the escrow was opened.
    pub opened_at: DateTime<Utc>,
}

impl EscrowRecord {
    #[must_use]
    pub fn new(owner: Identity, custody: Identity, locked_amount: u64) -> Self {
        Self {
            owner,
            custody,
            locked_amount,
            opened_at: Utc::now(),
        }
    }
}

/// Result of releasing an escrow.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct EscrowPayout {
    /// The record as it stood before release.
    pub record: EscrowRecord,
    /// DD paid to the beneficiary; at least `record.locked_amount`.
    pub paid: u64,
}

impl EscrowPayout {
    /// DD paid beyond the locked amount.
    #[must_use]
    pub fn surplus(&self) -> u64 {
        self.paid.saturating_sub(self.record.locked_amount)
    }
}
