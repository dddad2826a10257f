//! Audit journal types.
//!
//! Every successful engine operation appends one [`JournalEntry`]. Entries
//! are hash-chained so that any rewrite of history is detectable.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::Identity;

/// What happened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LedgerEvent {
    /// Program state created.
    Initialized {
        version: u8,
        settlement_authority: Identity,
    },
    /// Reserve asset bound (or re-bound).
    Configured {
        reserve_mint: Identity,
        vault: Identity,
        dd_mint: Identity,
        rebound_from: Option<Identity>,
    },
    /// Reserve asset moved into the vault and DD minted 1:1.
    Deposited { user: Identity, amount: u64 },
    /// DD burned and reserve asset paid out 1:1.
    Redeemed { user: Identity, amount: u64 },
    /// DD locked in a per-user escrow.
    EscrowOpened {
        owner: Identity,
        custody: Identity,
        amount: u64,
    },
    /// A user advertised intent to buy DD for fiat. No custody movement.
    FiatOffered { user: Identity, amount: u64 },
    /// Escrowed DD paid to the beneficiary and the escrow closed.
    FundsReleased {
        authority: Identity,
        owner: Identity,
        beneficiary: Identity,
        amount: u64,
    },
}

impl LedgerEvent {
    /// Short uppercase label for log lines.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Initialized { .. } => "INITIALIZED",
            Self::Configured { .. } => "CONFIGURED",
            Self::Deposited { .. } => "DEPOSITED",
            Self::Redeemed { .. } => "REDEEMED",
            Self::EscrowOpened { .. } => "ESCROW_OPENED",
            Self::FiatOffered { .. } => "FIAT_OFFERED",
            Self::FundsReleased { .. } => "FUNDS_RELEASED",
        }
    }
}

/// One link of the journal chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalEntry {
    /// 0-based position in the journal.
    pub sequence: u64,
    pub event: LedgerEvent,
    pub recorded_at: DateTime<Utc>,
    /// SHA-256 over the previous digest, the sequence and the JSON event.
    pub digest: [u8; 32],
}

impl JournalEntry {
    #[must_use]
    pub fn digest_hex(&self) -> String {
        hex::encode(self.digest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_label() {
        let ev = LedgerEvent::Deposited {
            user: Identity::random(),
            amount: 1,
        };
        assert_eq!(ev.label(), "DEPOSITED");
    }

    #[test]
    fn event_json_is_tagged() {
        let ev = LedgerEvent::FiatOffered {
            user: Identity::from_bytes([4u8; 32]),
            amount: 10,
        };
        let json = serde_json::to_value(&ev).unwrap();
        assert_eq!(json["kind"], "fiat_offered");
        assert_eq!(json["amount"], 10);
    }
}
