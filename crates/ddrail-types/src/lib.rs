//! # ddrail-types
//!
//! Shared types, errors, and configuration for the **ddrail** custody and
//! settlement engine.
//!
//! This crate is the leaf dependency of the workspace; every other crate
//! depends on it. It defines:
//!
//! - **Identifiers**: [`Identity`], [`OfferId`]
//! - **Derived addresses**: [`address::derive_address`] and the per-account helpers
//! - **Token model**: [`MintAccount`], [`TokenAccount`]
//! - **Program state**: [`ProgramState`]
//! - **Escrow model**: [`EscrowRecord`]
//! - **Offer model**: [`OfferRequest`], [`Attestation`], [`FiatOffer`], [`OfferDirection`]
//! - **Audit journal**: [`LedgerEvent`], [`JournalEntry`]
//! - **Configuration**: [`EngineConfig`], [`TreasuryConfig`], [`LoggingConfig`]
//! - **Errors**: [`RailError`] with `RAIL_ERR_` prefix codes
//! - **Constants**: versions, decimals, seed tags

pub mod address;
pub mod config;
pub mod constants;
pub mod error;
pub mod escrow;
pub mod ids;
pub mod journal;
pub mod offer;
pub mod state;
pub mod token;

pub use config::*;
pub use error::*;
pub use escrow::*;
pub use ids::*;
pub use journal::*;
pub use offer::*;
pub use state::*;
pub use token::*;

// Constants and address helpers are accessed via their modules
// (`ddrail_types::constants::FOO`, `ddrail_types::address::escrow_address`).
