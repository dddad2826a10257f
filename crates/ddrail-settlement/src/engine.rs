//! The settlement engine: a single-writer state machine over the custody
//! plane.
//!
//! ```text
//!  initialize ─▶ configure ─▶ deposit ⇄ redeem
//!                                │
//!                             offer_dd ─▶ (escrow) ─▶ release_funds
//!                             offer_fiat (journal only)
//! ```
//!
//! Every operation takes `&mut self` and runs its balance mutations inside
//! one [`TokenLedger::atomic`] block: it either lands completely or leaves
//! ledger, escrow records, supply counters and journal untouched. Sharing an
//! engine across threads goes through `Arc<Mutex<SettlementEngine>>`.

use ddrail_ledger::authority::require_authority;
use ddrail_ledger::{DdMint, EscrowLedger, ReserveVault, TokenLedger};
use ddrail_types::address::escrow_address;
use ddrail_types::constants::PROGRAM_VERSION;
use ddrail_types::{
    EngineConfig, EscrowPayout, EscrowRecord, Identity, LedgerEvent, ProgramState, RailError,
    Result,
};

use crate::journal::Journal;
use crate::supply_conservation::SupplyConservation;

/// Custody and settlement engine for one program deployment.
#[derive(Debug)]
pub struct SettlementEngine {
    config: EngineConfig,
    state: ProgramState,
    ledger: TokenLedger,
    dd_mint: DdMint,
    vault: Option<ReserveVault>,
    escrows: EscrowLedger,
    supply: SupplyConservation,
    journal: Journal,
}

impl SettlementEngine {
    /// Create an engine with an uninitialized program state.
    #[must_use]
    pub fn new(config: EngineConfig) -> Self {
        let ledger = TokenLedger::new(config.program_id);
        let dd_mint = DdMint::for_program(&config.program_id);
        Self {
            config,
            state: ProgramState::uninitialized(),
            ledger,
            dd_mint,
            vault: None,
            escrows: EscrowLedger::new(dd_mint),
            supply: SupplyConservation::new(),
            journal: Journal::new(),
        }
    }

    // -----------------------------------------------------------------
    // Administration
    // -----------------------------------------------------------------

    /// Create the program state and record the settlement authority.
    ///
    /// # Errors
    /// - `Unauthorized` unless `signer` is the upgrade authority
    /// - `AlreadyInitialized` if the state already exists
    pub fn initialize(&mut self, signer: Identity, settlement_authority: Identity) -> Result<()> {
        require_authority(&signer, &self.config.upgrade_authority, "initialize")?;
        if self.state.is_initialized() {
            return Err(RailError::AlreadyInitialized {
                version: self.state.version,
            });
        }

        self.state = ProgramState {
            version: PROGRAM_VERSION,
            settlement_authority,
            reserve_mint: None,
        };
        self.journal.append(LedgerEvent::Initialized {
            version: PROGRAM_VERSION,
            settlement_authority,
        })?;
        tracing::info!(
            version = PROGRAM_VERSION,
            settlement_authority = %settlement_authority,
            "program initialized"
        );
        Ok(())
    }

    /// Bind the accepted reserve asset, creating the DD mint and the vault.
    ///
    /// Calling again with the same mint is a no-op. Calling with a different
    /// mint re-binds the vault, which is only allowed while it is empty.
    ///
    /// # Errors
    /// - `Unauthorized` unless `signer` is the upgrade authority
    /// - `NotInitialized` before `initialize`
    /// - `InvalidMintBinding` if the reserve mint is unknown, has another
    ///   precision than DD, or the vault still holds the previous asset
    pub fn configure(&mut self, signer: Identity, reserve_mint: Identity) -> Result<()> {
        require_authority(&signer, &self.config.upgrade_authority, "configure")?;
        self.state.ensure_initialized()?;

        let program_id = self.config.program_id;
        let decimals = self.config.dd_decimals;
        let dd_mint = self.dd_mint;
        let binding = self.ledger.atomic(|l| {
            dd_mint.ensure_created(l, decimals)?;
            ReserveVault::bind(l, &program_id, reserve_mint, decimals)
        })?;

        self.state.reserve_mint = Some(reserve_mint);
        self.vault = Some(binding.vault);
        self.journal.append(LedgerEvent::Configured {
            reserve_mint,
            vault: binding.vault.address(),
            dd_mint: dd_mint.address(),
            rebound_from: binding.rebound_from,
        })?;

        if let Some(previous) = binding.rebound_from {
            tracing::warn!(
                previous = %previous,
                reserve_mint = %reserve_mint,
                "reserve asset re-bound"
            );
        } else {
            tracing::info!(
                reserve_mint = %reserve_mint,
                vault = %binding.vault.address(),
                dd_mint = %dd_mint.address(),
                created = binding.created,
                "reserve asset configured"
            );
        }
        Ok(())
    }

    // -----------------------------------------------------------------
    // User operations
    // -----------------------------------------------------------------

    /// Move `amount` reserve units from `user` into the vault and mint the
    /// same amount of DD to `user`.
    ///
    /// # Errors
    /// - `NotInitialized` / `NotConfigured`
    /// - `WrongMint` if `reserve_mint` is not the bound reserve asset
    /// - `InvalidAmount` for a zero amount
    /// - `InsufficientFunds` if `user` holds less than `amount`
    pub fn deposit(&mut self, user: Identity, reserve_mint: Identity, amount: u64) -> Result<()> {
        self.state.ensure_initialized()?;
        self.state.ensure_reserve_mint(&reserve_mint)?;
        ensure_positive(amount, "deposit")?;
        let vault = self.vault()?;

        let dd_mint = self.dd_mint;
        let mut supply = self.supply;
        supply.record_issue(amount);
        self.ledger
            .atomic(|l| {
                vault.custody(l, user, amount)?;
                dd_mint.issue(l, user, amount)?;
                supply.verify(dd_mint.supply(l), vault.balance(l))
            })
            .inspect_err(log_fatal)?;

        self.supply = supply;
        self.journal.append(LedgerEvent::Deposited { user, amount })?;
        tracing::info!(user = %user, amount, "deposit");
        Ok(())
    }

    /// Burn `amount` DD from `user` and pay the same amount of reserve asset
    /// out of the vault.
    ///
    /// # Errors
    /// - `NotInitialized` / `NotConfigured`
    /// - `WrongMint` if `reserve_mint` is not the bound reserve asset
    /// - `InvalidAmount` for a zero amount
    /// - `InsufficientFunds` if `user` holds less than `amount` DD
    /// - `SupplyInvariantViolation` if the vault cannot cover the payout
    pub fn redeem(&mut self, user: Identity, reserve_mint: Identity, amount: u64) -> Result<()> {
        self.state.ensure_initialized()?;
        self.state.ensure_reserve_mint(&reserve_mint)?;
        ensure_positive(amount, "redeem")?;
        let vault = self.vault()?;

        let dd_mint = self.dd_mint;
        let mut supply = self.supply;
        supply.record_retire(amount);
        self.ledger
            .atomic(|l| {
                dd_mint.retire(l, user, amount)?;
                vault.disburse(l, user, amount)?;
                supply.verify(dd_mint.supply(l), vault.balance(l))
            })
            .inspect_err(log_fatal)?;

        self.supply = supply;
        self.journal.append(LedgerEvent::Redeemed { user, amount })?;
        tracing::info!(user = %user, amount, "redeem");
        Ok(())
    }

    /// Lock `amount` DD of `user` in escrow for an OTC fiat exchange.
    ///
    /// # Errors
    /// - `NotInitialized`
    /// - `InvalidAmount` for a zero amount
    /// - `EscrowAlreadyOpen` if `user` already has an escrow
    /// - `InsufficientFunds` if `user` holds less than `amount` DD
    pub fn offer_dd(&mut self, user: Identity, amount: u64) -> Result<EscrowRecord> {
        let record = self
            .escrows
            .open(&mut self.ledger, &self.state, user, amount)?;
        self.journal.append(LedgerEvent::EscrowOpened {
            owner: user,
            custody: record.custody,
            amount,
        })?;
        Ok(record)
    }

    /// Record intent to buy DD for fiat. Moves no funds.
    ///
    /// # Errors
    /// - `NotInitialized`
    /// - `InvalidAmount` for a zero amount
    pub fn offer_fiat(&mut self, user: Identity, amount: u64) -> Result<()> {
        self.state.ensure_initialized()?;
        ensure_positive(amount, "offer")?;
        self.journal.append(LedgerEvent::FiatOffered { user, amount })?;
        tracing::info!(user = %user, amount, "fiat offer recorded");
        Ok(())
    }

    /// Pay everything in `owner`'s escrow to `beneficiary` and close it.
    /// Settlement authority only.
    ///
    /// Supply conservation is re-checked before the release commits.
    ///
    /// # Errors
    /// - `NotInitialized`
    /// - `Unauthorized` unless `caller` is the settlement authority,
    ///   whatever the escrow state
    /// - `NoEscrow` if `owner` has no open escrow (including a replay after
    ///   a successful release)
    /// - `SupplyInvariantViolation` on custody or supply drift
    pub fn release_funds(
        &mut self,
        caller: Identity,
        owner: Identity,
        beneficiary: Identity,
    ) -> Result<EscrowPayout> {
        let dd_mint = self.dd_mint;
        let vault = self.vault;
        let supply = self.supply;
        let payout = self
            .escrows
            .release(&mut self.ledger, &self.state, caller, owner, beneficiary, |l| {
                supply.verify(dd_mint.supply(l), vault.map_or(0, |v| v.balance(l)))
            })
            .inspect_err(log_fatal)?;
        self.journal.append(LedgerEvent::FundsReleased {
            authority: caller,
            owner,
            beneficiary,
            amount: payout.paid,
        })?;
        Ok(payout)
    }

    // -----------------------------------------------------------------
    // Observation
    // -----------------------------------------------------------------

    /// Check `issued - retired == DD supply <= vault balance`.
    ///
    /// # Errors
    /// Returns `SupplyInvariantViolation` on drift.
    pub fn verify_parity(&self) -> Result<()> {
        self.supply
            .verify(self.dd_supply(), self.vault_balance())
            .inspect_err(log_fatal)
    }

    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    #[must_use]
    pub fn state(&self) -> &ProgramState {
        &self.state
    }

    #[must_use]
    pub fn ledger(&self) -> &TokenLedger {
        &self.ledger
    }

    /// Direct access to the token substrate for activity outside the
    /// engine, such as the reserve issuer minting or users transferring.
    /// Program-owned accounts cannot be signed for through it.
    pub fn ledger_mut(&mut self) -> &mut TokenLedger {
        &mut self.ledger
    }

    #[must_use]
    pub fn dd_mint(&self) -> &DdMint {
        &self.dd_mint
    }

    #[must_use]
    pub fn reserve_vault(&self) -> Option<&ReserveVault> {
        self.vault.as_ref()
    }

    #[must_use]
    pub fn escrow(&self, owner: &Identity) -> Option<&EscrowRecord> {
        self.escrows.get(owner)
    }

    #[must_use]
    pub fn escrows(&self) -> &EscrowLedger {
        &self.escrows
    }

    /// Custody address an escrow of `owner` lives at.
    #[must_use]
    pub fn escrow_custody(&self, owner: &Identity) -> Identity {
        escrow_address(&self.config.program_id, owner)
    }

    #[must_use]
    pub fn journal(&self) -> &Journal {
        &self.journal
    }

    #[must_use]
    pub fn supply(&self) -> &SupplyConservation {
        &self.supply
    }

    #[must_use]
    pub fn dd_balance(&self, user: &Identity) -> u64 {
        self.dd_mint.balance_of(&self.ledger, user)
    }

    /// Reserve-asset balance of `user`, zero before `configure`.
    #[must_use]
    pub fn reserve_balance(&self, user: &Identity) -> u64 {
        self.state
            .reserve_mint
            .map_or(0, |mint| self.ledger.associated_balance(user, &mint))
    }

    /// DD held in `owner`'s escrow custody.
    #[must_use]
    pub fn escrow_balance(&self, owner: &Identity) -> u64 {
        self.ledger.balance(&self.escrow_custody(owner))
    }

    #[must_use]
    pub fn dd_supply(&self) -> u64 {
        self.dd_mint.supply(&self.ledger)
    }

    #[must_use]
    pub fn vault_balance(&self) -> u64 {
        self.vault.map_or(0, |v| v.balance(&self.ledger))
    }

    /// Reserve units in the vault beyond what backs the DD supply.
    #[must_use]
    pub fn vault_surplus(&self) -> u64 {
        self.vault_balance().saturating_sub(self.dd_supply())
    }

    fn vault(&self) -> Result<ReserveVault> {
        self.vault.ok_or(RailError::NotConfigured)
    }
}

fn ensure_positive(amount: u64, operation: &str) -> Result<()> {
    if amount == 0 {
        return Err(RailError::InvalidAmount {
            reason: format!("{operation} amount must be positive"),
        });
    }
    Ok(())
}

fn log_fatal(err: &RailError) {
    if let RailError::SupplyInvariantViolation { reason } = err {
        tracing::error!(%reason, "supply invariant violated");
    }
}
