//! Off-ledger offers advertised through the matching side channel.
//!
//! A user proves intent by signing the canonical byte sequence
//!
//! ```text
//! amount \n bankAccount \n cryptoAddress
//! ```
//!
//! (fields in this fixed order, newline-separated, no escaping). The
//! settlement engine never checks this signature itself; the offer book does,
//! through an injectable verifier.

use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};

use crate::token::ui_amount;
use crate::{Identity, OfferId, RailError, Result};

/// Which way value flows for the offering user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OfferDirection {
    /// Sell DD for fiat. Backed by an on-ledger escrow.
    #[serde(rename = "offramp")]
    DdToFiat,
    /// Buy DD with fiat. No on-ledger custody.
    #[serde(rename = "onramp")]
    FiatToDd,
}

impl fmt::Display for OfferDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DdToFiat => write!(f, "OFFRAMP"),
            Self::FiatToDd => write!(f, "ONRAMP"),
        }
    }
}

/// Body of `POST /offer-dd` and `POST /offer-fiat`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct OfferRequest {
    /// Base units. Accepted as a bare JSON number or a quoted string.
    #[serde(deserialize_with = "quoted_or_bare_number")]
    pub amount: u128,
    pub bank_account: String,
    /// Base58 ed25519 public key of the offering user.
    pub public_key: String,
    /// Base58 ed25519 signature over [`OfferRequest::canonical_payload`].
    pub signature: String,
}

impl OfferRequest {
    /// The exact bytes the user signs.
    #[must_use]
    pub fn canonical_payload(&self) -> Vec<u8> {
        format!(
            "{}\n{}\n{}",
            self.amount, self.bank_account, self.public_key
        )
        .into_bytes()
    }

    /// Decode key, signature and amount into an [`Attestation`].
    ///
    /// This only checks shape (base58, lengths, amount range). Whether the
    /// signature is valid is up to an attestation verifier.
    ///
    /// # Errors
    /// - `MalformedOffer` if the key or signature are not base58 of the right length
    /// - `InvalidAmount` if the amount is zero or exceeds `u64`
    pub fn decode(&self) -> Result<Attestation> {
        let signer = Identity::from_base58(&self.public_key)?;

        let signature = bs58::decode(&self.signature)
            .into_vec()
            .map_err(|e| RailError::MalformedOffer {
                reason: format!("while decoding signature: {e}"),
            })?;
        if signature.len() != 64 {
            return Err(RailError::MalformedOffer {
                reason: format!("expected signature to be 64 bytes, got {}", signature.len()),
            });
        }

        let amount = u64::try_from(self.amount).map_err(|_| RailError::InvalidAmount {
            reason: format!("{} exceeds the largest representable amount", self.amount),
        })?;
        if amount == 0 {
            return Err(RailError::InvalidAmount {
                reason: "offer amount must be positive".to_string(),
            });
        }

        Ok(Attestation {
            amount,
            bank_account: self.bank_account.clone(),
            signer,
            payload: self.canonical_payload(),
            signature,
        })
    }
}

/// A decoded, not yet verified, offer attestation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attestation {
    pub amount: u64,
    pub bank_account: String,
    pub signer: Identity,
    pub payload: Vec<u8>,
    pub signature: Vec<u8>,
}

/// An offer recorded in the book. Never mutated in place.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FiatOffer {
    pub id: OfferId,
    pub direction: OfferDirection,
    pub amount: u64,
    pub bank_account: String,
    pub public_key: Identity,
    pub signature: Vec<u8>,
    pub created_at: DateTime<Utc>,
}

impl FiatOffer {
    #[must_use]
    pub fn from_attestation(attestation: Attestation, direction: OfferDirection) -> Self {
        Self {
            id: OfferId::new(),
            direction,
            amount: attestation.amount,
            bank_account: attestation.bank_account,
            public_key: attestation.signer,
            signature: attestation.signature,
            created_at: Utc::now(),
        }
    }

    /// Public listing shape (`GET /offer`).
    #[must_use]
    pub fn view(&self, decimals: u8) -> OfferView {
        OfferView {
            id: self.id,
            bank_account: self.bank_account.clone(),
            public_key: self.public_key,
            amount: ui_amount(self.amount, decimals),
            direction: self.direction,
        }
    }
}

/// JSON listing entry for an open offer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct OfferView {
    pub id: OfferId,
    pub bank_account: String,
    pub public_key: Identity,
    pub amount: Decimal,
    pub direction: OfferDirection,
}

/// Accept both quoted and bare numbers.
fn quoted_or_bare_number<'de, D>(d: D) -> std::result::Result<u128, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum StringOrNumber {
        // serde's untagged enums cannot buffer u128 numbers; bare numbers
        // are limited to u64, quoted ones are not.
        Number(u64),
        String(String),
    }

    match StringOrNumber::deserialize(d)? {
        StringOrNumber::Number(n) => Ok(u128::from(n)),
        StringOrNumber::String(s) => s.parse::<u128>().map_err(serde::de::Error::custom),
    }
}
