//! Fiat-leg reconciliation and escrow release.
//!
//! A [`Deal`] binds an offramp offer (seller locks DD, wants fiat) to an
//! onramp offer (buyer pays fiat, wants DD) of the same amount. Bank
//! readouts mark the two fiat confirmations:
//!
//! ```text
//! buyer_sent_fiat      record.account == buyer bank,  description ends with seller bank
//! seller_received_fiat record.account == seller bank, description ends with buyer bank
//! ```
//!
//! Once both are set the [`SettlementDesk`] releases the seller's escrow to
//! the buyer, signing as the settlement authority.

use ddrail_types::{
    EscrowPayout, FiatOffer, Identity, OfferDirection, OfferId, RailError, Result, TreasuryConfig,
};
use serde::Serialize;

use crate::engine::SettlementEngine;
use crate::offers::{OfferBook, OfferStatus};
use crate::readout::{BankStatementRecord, parse_statement};

/// A paired OTC exchange awaiting fiat confirmation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Deal {
    pub offramp: FiatOffer,
    pub onramp: FiatOffer,
    pub buyer_sent_fiat: bool,
    pub seller_received_fiat: bool,
}

impl Deal {
    /// Pair an offramp offer with an onramp offer.
    ///
    /// # Errors
    /// Returns `DealMismatch` if the directions are wrong, the amounts
    /// differ, or either side has no bank account.
    pub fn pair(offramp: FiatOffer, onramp: FiatOffer) -> Result<Self> {
        if offramp.direction != OfferDirection::DdToFiat {
            return Err(RailError::DealMismatch {
                reason: format!("{} is not an offramp offer", offramp.id),
            });
        }
        if onramp.direction != OfferDirection::FiatToDd {
            return Err(RailError::DealMismatch {
                reason: format!("{} is not an onramp offer", onramp.id),
            });
        }
        if offramp.amount != onramp.amount {
            return Err(RailError::DealMismatch {
                reason: format!("amounts differ: {} vs {}", offramp.amount, onramp.amount),
            });
        }
        if offramp.bank_account.is_empty() || onramp.bank_account.is_empty() {
            return Err(RailError::DealMismatch {
                reason: "both sides need a bank account".to_string(),
            });
        }
        Ok(Self {
            offramp,
            onramp,
            buyer_sent_fiat: false,
            seller_received_fiat: false,
        })
    }

    /// Deals are identified by their offramp offer.
    #[must_use]
    pub fn id(&self) -> OfferId {
        self.offramp.id
    }

    /// Escrow owner: the seller.
    #[must_use]
    pub fn seller(&self) -> Identity {
        self.offramp.public_key
    }

    /// Release beneficiary: the buyer.
    #[must_use]
    pub fn buyer(&self) -> Identity {
        self.onramp.public_key
    }

    /// Apply one bank record. Returns `true` if a flag changed.
    pub fn apply_record(&mut self, record: &BankStatementRecord) -> bool {
        let mut changed = false;
        if !self.buyer_sent_fiat
            && record.account == self.onramp.bank_account
            && record.description.ends_with(&self.offramp.bank_account)
        {
            self.buyer_sent_fiat = true;
            changed = true;
        }
        if !self.seller_received_fiat
            && record.account == self.offramp.bank_account
            && record.description.ends_with(&self.onramp.bank_account)
        {
            self.seller_received_fiat = true;
            changed = true;
        }
        if changed {
            tracing::info!(
                deal = %self.id(),
                transaction = %record.transaction_id,
                buyer_sent_fiat = self.buyer_sent_fiat,
                seller_received_fiat = self.seller_received_fiat,
                "fiat leg observed"
            );
        }
        changed
    }

    #[must_use]
    pub fn is_settled(&self) -> bool {
        self.buyer_sent_fiat && self.seller_received_fiat
    }
}

/// Outcome of releasing one settled deal.
#[derive(Debug)]
pub struct ReleaseOutcome {
    pub deal: OfferId,
    pub result: Result<EscrowPayout>,
}

/// Holds deals and releases them once both fiat legs are confirmed.
#[derive(Debug)]
pub struct SettlementDesk {
    authority: Identity,
    deals: Vec<Deal>,
}

impl SettlementDesk {
    /// A desk signing releases as `authority`.
    #[must_use]
    pub fn new(authority: Identity) -> Self {
        Self {
            authority,
            deals: Vec::new(),
        }
    }

    /// A desk signing as the configured treasurer.
    ///
    /// # Errors
    /// Returns `Configuration` naming the missing variables.
    pub fn from_treasury(config: &TreasuryConfig) -> Result<Self> {
        config.require_complete()?;
        let authority = config
            .treasurer()
            .ok_or_else(|| RailError::Configuration("missing env: TREASURER_SECRET_KEY".into()))?;
        Ok(Self::new(authority))
    }

    #[must_use]
    pub fn authority(&self) -> &Identity {
        &self.authority
    }

    /// Track an already paired deal.
    pub fn add_deal(&mut self, deal: Deal) {
        tracing::info!(
            deal = %deal.id(),
            seller = %deal.seller(),
            buyer = %deal.buyer(),
            amount = deal.offramp.amount,
            "deal opened"
        );
        self.deals.push(deal);
    }

    /// Take two open offers out of `book` and pair them.
    ///
    /// The book is left unchanged if the offers cannot be paired.
    ///
    /// # Errors
    /// - `OfferNotFound` if either offer is unknown or not open
    /// - `DealMismatch` if they do not pair
    pub fn open_deal(&mut self, book: &mut OfferBook, offramp: &OfferId, onramp: &OfferId) -> Result<OfferId> {
        let offramp_offer = open_offer(book, offramp)?;
        let onramp_offer = open_offer(book, onramp)?;
        let deal = Deal::pair(offramp_offer, onramp_offer)?;
        book.take_open(offramp)?;
        book.take_open(onramp)?;
        let id = deal.id();
        self.add_deal(deal);
        Ok(id)
    }

    /// Apply a raw readout to every deal. Returns the number of flag changes.
    pub fn ingest_readout(&mut self, body: &str) -> usize {
        let records = parse_statement(body);
        let mut changes = 0;
        for record in &records {
            for deal in &mut self.deals {
                if deal.apply_record(record) {
                    changes += 1;
                }
            }
        }
        tracing::info!(records = records.len(), changes, "readout ingested");
        changes
    }

    /// Release every settled deal. Released deals are dropped; deals whose
    /// release failed stay for inspection.
    pub fn release_settled(&mut self, engine: &mut SettlementEngine) -> Vec<ReleaseOutcome> {
        let mut outcomes = Vec::new();
        let authority = self.authority;
        self.deals.retain(|deal| {
            if !deal.is_settled() {
                return true;
            }
            let result = engine.release_funds(authority, deal.seller(), deal.buyer());
            let released = result.is_ok();
            if let Err(e) = &result {
                tracing::warn!(deal = %deal.id(), error = %e, "release failed");
            }
            outcomes.push(ReleaseOutcome {
                deal: deal.id(),
                result,
            });
            !released
        });
        outcomes
    }

    #[must_use]
    pub fn deals(&self) -> &[Deal] {
        &self.deals
    }

    #[must_use]
    pub fn deal(&self, id: &OfferId) -> Option<&Deal> {
        self.deals.iter().find(|d| d.id() == *id)
    }
}

fn open_offer(book: &OfferBook, id: &OfferId) -> Result<FiatOffer> {
    match (book.get(id), book.status(id)) {
        (Some(offer), Some(OfferStatus::Open)) => Ok(offer.clone()),
        _ => Err(RailError::OfferNotFound(*id)),
    }
}
