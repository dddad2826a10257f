//! Escrow ledger: locks DD for OTC fiat exchanges.
//!
//! Opening an escrow moves DD from the owner's balance into a custody account
//! derived from the owner's identity, and records the locked amount. Only the
//! settlement authority can release it, which pays everything the custody
//! account holds to a beneficiary and closes it.
//!
//! ```text
//!   owner balance ──open──▶ custody(owner) ──release──▶ beneficiary balance
//! ```
//!
//! A record exists exactly while its custody account holds at least the
//! locked amount. Custody can only grow from outside: transfers into it need
//! no consent, and only the program signs for it.

use std::collections::HashMap;

use ddrail_types::address::escrow_address;
use ddrail_types::{EscrowPayout, EscrowRecord, Identity, ProgramState, RailError, Result};

use crate::authority::require_authority;
use crate::mint::DdMint;
use crate::token_ledger::TokenLedger;

/// Open escrows of DD, one per owner.
#[derive(Debug)]
pub struct EscrowLedger {
    dd: DdMint,
    records: HashMap<Identity, EscrowRecord>,
}

impl EscrowLedger {
    #[must_use]
    pub fn new(dd: DdMint) -> Self {
        Self {
            dd,
            records: HashMap::new(),
        }
    }

    /// Lock `amount` DD of `owner` in a fresh escrow.
    ///
    /// # Errors
    /// - `NotInitialized` before `initialize`
    /// - `InvalidAmount` for a zero amount
    /// - `EscrowAlreadyOpen` if `owner` already has an escrow
    /// - `InsufficientFunds` if `owner` holds less than `amount` DD
    pub fn open(
        &mut self,
        ledger: &mut TokenLedger,
        state: &ProgramState,
        owner: Identity,
        amount: u64,
    ) -> Result<EscrowRecord> {
        state.ensure_initialized()?;
        if amount == 0 {
            return Err(RailError::InvalidAmount {
                reason: "escrow amount must be positive".to_string(),
            });
        }
        let custody = escrow_address(ledger.program_id(), &owner);
        if self.records.contains_key(&owner) || ledger.account(&custody).is_some() {
            return Err(RailError::EscrowAlreadyOpen(owner));
        }

        let dd_mint = self.dd.address();
        let source = ledger.associated_address(&owner, &dd_mint);
        let available = ledger.balance(&source);
        if available < amount {
            return Err(RailError::InsufficientFunds {
                needed: amount,
                available,
            });
        }

        ledger.atomic(|l| {
            l.create_program_account(custody, dd_mint)?;
            l.transfer(source, custody, owner, amount)
        })?;

        let record = EscrowRecord::new(owner, custody, amount);
        self.records.insert(owner, record);
        tracing::info!(owner = %owner, custody = %custody, amount, "escrow opened");
        Ok(record)
    }

    /// Pay everything in `owner`'s escrow to `beneficiary` and close it.
    ///
    /// The caller is checked before the escrow is looked up, so an
    /// unauthorized caller learns nothing about escrow state. DD added to
    /// custody after opening is paid out with the locked amount.
    /// `postcondition` runs on the ledger after the payout, inside the same
    /// atomic block; if it fails the release is undone.
    ///
    /// # Errors
    /// - `NotInitialized` before `initialize`
    /// - `Unauthorized` unless `caller` is the settlement authority
    /// - `NoEscrow` if `owner` has no open escrow
    /// - `SupplyInvariantViolation` if custody holds less than the record locks
    /// - whatever `postcondition` returns
    pub fn release(
        &mut self,
        ledger: &mut TokenLedger,
        state: &ProgramState,
        caller: Identity,
        owner: Identity,
        beneficiary: Identity,
        postcondition: impl FnOnce(&TokenLedger) -> Result<()>,
    ) -> Result<EscrowPayout> {
        state.ensure_initialized()?;
        require_authority(&caller, &state.settlement_authority, "release_funds")?;

        let record = *self
            .records
            .get(&owner)
            .ok_or(RailError::NoEscrow(owner))?;
        let held = ledger.balance(&record.custody);
        if held < record.locked_amount {
            tracing::error!(
                owner = %owner,
                held,
                locked = record.locked_amount,
                "escrow custody fell below its record"
            );
            return Err(RailError::SupplyInvariantViolation {
                reason: format!(
                    "custody {} holds {held}, record locks {}",
                    record.custody, record.locked_amount
                ),
            });
        }

        let dd_mint = self.dd.address();
        ledger.atomic(|l| {
            let destination = l.ensure_associated_account(beneficiary, dd_mint)?;
            l.transfer_signed(record.custody, destination, record.custody, held)?;
            l.close_signed(record.custody, record.custody)?;
            postcondition(&*l)
        })?;
        self.records.remove(&owner);

        let payout = EscrowPayout { record, paid: held };
        if payout.surplus() > 0 {
            tracing::warn!(
                owner = %owner,
                surplus = payout.surplus(),
                "escrow custody held more than locked; surplus paid out"
            );
        }
        tracing::info!(
            owner = %owner,
            beneficiary = %beneficiary,
            amount = held,
            "escrow released"
        );
        Ok(payout)
    }

    #[must_use]
    pub fn get(&self, owner: &Identity) -> Option<&EscrowRecord> {
        self.records.get(owner)
    }

    #[must_use]
    pub fn is_open(&self, owner: &Identity) -> bool {
        self.records.contains_key(owner)
    }

    /// Number of open escrows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Total DD locked across all escrows.
    #[must_use]
    pub fn locked_total(&self) -> u128 {
        self.records
            .values()
            .map(|r| u128::from(r.locked_amount))
            .sum()
    }
}
