//! Offer book for the off-ledger side channel.
//!
//! ```text
//!   submit(offramp) ──▶ PENDING ──promote_funded──▶ OPEN ──take_open──▶ (deal)
//!   submit(onramp)  ───────────────────────────────▶ OPEN
//! ```
//!
//! An offramp (DD for fiat) offer only becomes open once the escrow of the
//! offering key holds exactly the advertised amount. Onramp offers carry no
//! on-ledger custody and are open immediately. Every offer must be signed
//! over its canonical payload; the check goes through an
//! [`AttestationVerifier`].

use std::collections::BTreeMap;

use ddrail_ledger::{AttestationVerifier, verify_attestation};
use ddrail_types::{FiatOffer, OfferDirection, OfferId, OfferRequest, OfferView, RailError, Result};

use crate::engine::SettlementEngine;

/// Where an offer stands in the book.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OfferStatus {
    /// Waiting for the matching escrow to be funded.
    Pending,
    /// Available for pairing.
    Open,
}

/// Result of one [`OfferBook::promote_funded`] pass.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct PromotionReport {
    pub promoted: Vec<OfferId>,
    /// Pending offers whose escrow holds a different amount. They stay pending.
    pub stale: Vec<OfferId>,
}

/// Signed offers, keyed by id (ids sort by creation time).
#[derive(Debug)]
pub struct OfferBook {
    offers: BTreeMap<OfferId, (FiatOffer, OfferStatus)>,
    decimals: u8,
}

impl OfferBook {
    /// Create an empty book whose listings render amounts with `decimals`.
    #[must_use]
    pub fn new(decimals: u8) -> Self {
        Self {
            offers: BTreeMap::new(),
            decimals,
        }
    }

    /// Validate and record a signed offer.
    ///
    /// # Errors
    /// - `MalformedOffer` / `InvalidAmount` if the request does not decode
    /// - `AttestationInvalid` if the signature does not verify
    pub fn submit(
        &mut self,
        request: &OfferRequest,
        direction: OfferDirection,
        verifier: &dyn AttestationVerifier,
    ) -> Result<OfferId> {
        let attestation = request.decode()?;
        verify_attestation(&attestation, verifier).inspect_err(|e| {
            tracing::warn!(signer = %attestation.signer, error = %e, "rejected offer");
        })?;

        let offer = FiatOffer::from_attestation(attestation, direction);
        let id = offer.id;
        let status = match direction {
            OfferDirection::DdToFiat => OfferStatus::Pending,
            OfferDirection::FiatToDd => OfferStatus::Open,
        };
        tracing::info!(
            %id,
            %direction,
            amount = offer.amount,
            signer = %offer.public_key,
            ?status,
            "offer accepted"
        );
        self.offers.insert(id, (offer, status));
        Ok(id)
    }

    /// Open every pending offer whose escrow now holds exactly its amount.
    ///
    /// Offers without an escrow are left pending for a later pass.
    pub fn promote_funded(&mut self, engine: &SettlementEngine) -> PromotionReport {
        let mut report = PromotionReport::default();
        for (id, (offer, status)) in &mut self.offers {
            if *status != OfferStatus::Pending {
                continue;
            }
            let Some(escrow) = engine.escrow(&offer.public_key) else {
                continue;
            };
            if escrow.locked_amount == offer.amount {
                *status = OfferStatus::Open;
                report.promoted.push(*id);
            } else {
                tracing::error!(
                    %id,
                    expected = offer.amount,
                    locked = escrow.locked_amount,
                    "stale offer"
                );
                report.stale.push(*id);
            }
        }
        report
    }

    /// Open offers in creation order, in listing shape.
    #[must_use]
    pub fn open_offers(&self) -> Vec<OfferView> {
        self.offers
            .values()
            .filter(|(_, status)| *status == OfferStatus::Open)
            .map(|(offer, _)| offer.view(self.decimals))
            .collect()
    }

    #[must_use]
    pub fn get(&self, id: &OfferId) -> Option<&FiatOffer> {
        self.offers.get(id).map(|(offer, _)| offer)
    }

    #[must_use]
    pub fn status(&self, id: &OfferId) -> Option<OfferStatus> {
        self.offers.get(id).map(|(_, status)| *status)
    }

    /// Remove an offer whatever its status.
    ///
    /// # Errors
    /// Returns `OfferNotFound` for an unknown id.
    pub fn withdraw(&mut self, id: &OfferId) -> Result<FiatOffer> {
        self.offers
            .remove(id)
            .map(|(offer, _)| offer)
            .ok_or(RailError::OfferNotFound(*id))
    }

    /// Remove an open offer so it can be paired into a deal.
    ///
    /// # Errors
    /// Returns `OfferNotFound` if the id is unknown or still pending.
    pub fn take_open(&mut self, id: &OfferId) -> Result<FiatOffer> {
        if self.status(id) == Some(OfferStatus::Open) {
            self.withdraw(id)
        } else {
            Err(RailError::OfferNotFound(*id))
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.offers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.offers.is_empty()
    }
}
