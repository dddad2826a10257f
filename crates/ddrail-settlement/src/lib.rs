//! # ddrail-settlement
//!
//! **Settlement plane**: the engine that mints DD against reserve deposits,
//! redeems it, escrows it for OTC fiat exchanges and releases escrows on the
//! settlement authority's signature.
//!
//! ## Modules
//!
//! - [`engine`]: `SettlementEngine`, the single-writer state machine
//! - [`supply_conservation`]: `issued - retired == DD supply == vault balance`
//! - [`journal`]: hash-chained audit trail of every state transition
//! - [`offers`]: signed offer book fed by the matching side channel
//! - [`readout`]: bank statement parser
//! - [`reconcile`]: deals, fiat-leg confirmation and release
//! - [`telemetry`]: tracing subscriber setup
//!
//! ## Deal flow
//!
//! ```text
//! deposit ─▶ offer_dd ─▶ OfferBook (pending ─▶ open) ─▶ Deal
//!        readout ─▶ buyer_sent_fiat + seller_received_fiat ─▶ release_funds
//! ```

pub mod engine;
pub mod journal;
pub mod offers;
pub mod readout;
pub mod reconcile;
pub mod supply_conservation;
pub mod telemetry;

pub use engine::SettlementEngine;
pub use journal::Journal;
pub use offers::{OfferBook, OfferStatus, PromotionReport};
pub use readout::{BankStatementRecord, parse_statement};
pub use reconcile::{Deal, ReleaseOutcome, SettlementDesk};
pub use supply_conservation::SupplyConservation;
pub use telemetry::init_tracing;
