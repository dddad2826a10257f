//! Token substrate for the custody plane.
//!
//! Tracks mints and token accounts keyed by address. Every primitive
//! validates completely before it mutates, so a single primitive either
//! applies or leaves the ledger unchanged. Multi-step operations run inside
//! [`TokenLedger::atomic`], which rolls back every touched account and mint
//! if any step fails.
//!
//! ## Signers
//!
//! Outside callers create a mint only at the public key of an ed25519 key
//! they hold, and create token accounts only at associated addresses.
//! Derived addresses have no secret key, so nobody can occupy one ahead of
//! the program.
//!
//! Accounts and mints the program creates at its derived addresses are their
//! own authority. Such an address is a *program signer*: the public
//! movement primitives refuse it as `authority`, and only the crate-private
//! `*_signed` variants, reached through the vault, escrow and DD mint, may
//! sign for it.

use std::collections::{HashMap, HashSet};

use ddrail_types::address::associated_balance_address;
use ddrail_types::{Identity, MintAccount, RailError, Result, TokenAccount};
use ed25519_dalek::SigningKey;

/// Prior value of an entry touched inside an atomic block.
#[derive(Debug)]
enum Undo {
    Account(Identity, Option<TokenAccount>),
    Mint(Identity, Option<MintAccount>),
}

/// Mints and token accounts of one program deployment.
#[derive(Debug)]
pub struct TokenLedger {
    /// Scope of the associated balance addresses.
    program_id: Identity,
    accounts: HashMap<Identity, TokenAccount>,
    mints: HashMap<Identity, MintAccount>,
    /// Derived addresses the program signs for. Never shrinks; a rolled-back
    /// creation leaves its address registered.
    program_signers: HashSet<Identity>,
    /// Active undo log; `Some` only inside [`TokenLedger::atomic`].
    undo: Option<Vec<Undo>>,
}

impl TokenLedger {
    /// Create an empty ledger.
    #[must_use]
    pub fn new(program_id: Identity) -> Self {
        Self {
            program_id,
            accounts: HashMap::new(),
            mints: HashMap::new(),
            program_signers: HashSet::new(),
            undo: None,
        }
    }

    #[must_use]
    pub fn program_id(&self) -> &Identity {
        &self.program_id
    }

    /// Run `f` as one all-or-nothing unit.
    ///
    /// If `f` returns `Err`, every account and mint it touched is restored
    /// to its value before the call. Blocks may nest; an inner failure rolls
    /// back only the inner block.
    pub fn atomic<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        let outer = self.undo.replace(Vec::new());
        let result = f(self);
        let log = std::mem::replace(&mut self.undo, outer).unwrap_or_default();

        match result {
            Ok(value) => {
                if let Some(outer_log) = self.undo.as_mut() {
                    outer_log.extend(log);
                }
                Ok(value)
            }
            Err(err) => {
                tracing::debug!(steps = log.len(), error = %err, "rolling back atomic block");
                self.rollback(log);
                Err(err)
            }
        }
    }

    fn rollback(&mut self, log: Vec<Undo>) {
        for entry in log.into_iter().rev() {
            match entry {
                Undo::Account(key, Some(account)) => {
                    self.accounts.insert(key, account);
                }
                Undo::Account(key, None) => {
                    self.accounts.remove(&key);
                }
                Undo::Mint(key, Some(mint)) => {
                    self.mints.insert(key, mint);
                }
                Undo::Mint(key, None) => {
                    self.mints.remove(&key);
                }
            }
        }
    }

    fn remember_account(&mut self, key: Identity) {
        let prior = self.accounts.get(&key).copied();
        if let Some(log) = self.undo.as_mut() {
            log.push(Undo::Account(key, prior));
        }
    }

    fn remember_mint(&mut self, key: Identity) {
        let prior = self.mints.get(&key).copied();
        if let Some(log) = self.undo.as_mut() {
            log.push(Undo::Mint(key, prior));
        }
    }

    fn ensure_vacant(&self, address: &Identity) -> Result<()> {
        if self.accounts.contains_key(address) || self.mints.contains_key(address) {
            return Err(RailError::AccountAlreadyExists(*address));
        }
        Ok(())
    }

    fn ensure_outside_signer(&self, authority: &Identity) -> Result<()> {
        if self.program_signers.contains(authority) {
            tracing::warn!(authority = %authority, "program signer named outside the program");
            return Err(RailError::ProgramSignerRequired(*authority));
        }
        Ok(())
    }

    /// Whether `address` is a derived address only the program signs for.
    #[must_use]
    pub fn is_program_signer(&self, address: &Identity) -> bool {
        self.program_signers.contains(address)
    }

    // -----------------------------------------------------------------
    // Creation
    // -----------------------------------------------------------------

    /// Create a mint at the public key of `mint_key` and return its address.
    ///
    /// Holding the secret key is what entitles the caller to the address.
    ///
    /// # Errors
    /// Returns `AccountAlreadyExists` if anything lives at the address.
    pub fn create_mint(&mut self, mint_key: &SigningKey, decimals: u8, authority: Identity) -> Result<Identity> {
        let address = Identity::from_verifying_key(&mint_key.verifying_key());
        self.insert_mint(address, decimals, authority)?;
        Ok(address)
    }

    /// Create a mint at a derived address that is its own mint authority.
    pub(crate) fn create_program_mint(&mut self, address: Identity, decimals: u8) -> Result<()> {
        self.insert_mint(address, decimals, address)?;
        self.program_signers.insert(address);
        Ok(())
    }

    fn insert_mint(&mut self, address: Identity, decimals: u8, authority: Identity) -> Result<()> {
        self.ensure_vacant(&address)?;
        self.remember_mint(address);
        self.mints.insert(address, MintAccount::new(decimals, authority));
        tracing::debug!(mint = %address, decimals, "mint created");
        Ok(())
    }

    /// Create an empty account for `mint` at a derived address that is its
    /// own authority.
    pub(crate) fn create_program_account(&mut self, address: Identity, mint: Identity) -> Result<()> {
        self.insert_account(address, mint, address)?;
        self.program_signers.insert(address);
        Ok(())
    }

    fn insert_account(&mut self, address: Identity, mint: Identity, authority: Identity) -> Result<()> {
        if !self.mints.contains_key(&mint) {
            return Err(RailError::MintNotFound(mint));
        }
        self.ensure_vacant(&address)?;
        self.remember_account(address);
        self.accounts.insert(address, TokenAccount::new(mint, authority));
        tracing::debug!(account = %address, mint = %mint, "token account created");
        Ok(())
    }

    /// Address of `owner`'s canonical balance account for `mint`.
    #[must_use]
    pub fn associated_address(&self, owner: &Identity, mint: &Identity) -> Identity {
        associated_balance_address(&self.program_id, owner, mint)
    }

    /// Return `owner`'s balance account for `mint`, creating it if absent.
    ///
    /// Anyone may create it; the account's authority is always `owner`.
    ///
    /// # Errors
    /// - `MintNotFound` if `mint` does not exist
    /// - `WrongMint` if the derived address holds another mint
    pub fn ensure_associated_account(&mut self, owner: Identity, mint: Identity) -> Result<Identity> {
        let address = self.associated_address(&owner, &mint);
        match self.accounts.get(&address) {
            Some(existing) if existing.mint != mint => Err(RailError::WrongMint {
                expected: mint,
                actual: existing.mint,
            }),
            Some(_) => Ok(address),
            None => {
                self.insert_account(address, mint, owner)?;
                Ok(address)
            }
        }
    }

    // -----------------------------------------------------------------
    // Movements
    // -----------------------------------------------------------------

    /// Issue `amount` new units of `mint` into `destination`.
    ///
    /// # Errors
    /// - `ProgramSignerRequired` if `authority` is a program signer
    /// - `MintNotFound` / `AccountNotFound`
    /// - `Unauthorized` unless `authority` is the mint authority
    /// - `WrongMint` if `destination` holds another mint
    /// - `AmountOverflow` if supply or balance would overflow
    pub fn mint_to(
        &mut self,
        mint: Identity,
        destination: Identity,
        authority: Identity,
        amount: u64,
    ) -> Result<()> {
        self.ensure_outside_signer(&authority)?;
        self.mint_signed(mint, destination, authority, amount)
    }

    /// [`TokenLedger::mint_to`] with the program signing.
    pub(crate) fn mint_signed(
        &mut self,
        mint: Identity,
        destination: Identity,
        authority: Identity,
        amount: u64,
    ) -> Result<()> {
        let mint_account = self.mints.get(&mint).ok_or(RailError::MintNotFound(mint))?;
        if mint_account.authority != authority {
            return Err(RailError::Unauthorized {
                caller: authority,
                required: mint_account.authority,
            });
        }
        let dest = self
            .accounts
            .get(&destination)
            .ok_or(RailError::AccountNotFound(destination))?;
        if dest.mint != mint {
            return Err(RailError::WrongMint {
                expected: mint,
                actual: dest.mint,
            });
        }
        let new_supply = mint_account
            .supply
            .checked_add(amount)
            .ok_or(RailError::AmountOverflow)?;
        let new_balance = dest.amount.checked_add(amount).ok_or(RailError::AmountOverflow)?;

        self.remember_mint(mint);
        self.remember_account(destination);
        if let Some(m) = self.mints.get_mut(&mint) {
            m.supply = new_supply;
        }
        if let Some(a) = self.accounts.get_mut(&destination) {
            a.amount = new_balance;
        }
        tracing::debug!(mint = %mint, to = %destination, amount, "minted");
        Ok(())
    }

    /// Destroy `amount` units held in `source`.
    ///
    /// # Errors
    /// - `ProgramSignerRequired` if `authority` is a program signer
    /// - `AccountNotFound` / `MintNotFound`
    /// - `WrongMint` if `source` holds another mint
    /// - `Unauthorized` unless `authority` owns `source`
    /// - `InsufficientFunds` if `source` holds less than `amount`
    pub fn burn(
        &mut self,
        mint: Identity,
        source: Identity,
        authority: Identity,
        amount: u64,
    ) -> Result<()> {
        self.ensure_outside_signer(&authority)?;
        let src = self
            .accounts
            .get(&source)
            .ok_or(RailError::AccountNotFound(source))?;
        if src.mint != mint {
            return Err(RailError::WrongMint {
                expected: mint,
                actual: src.mint,
            });
        }
        if src.authority != authority {
            return Err(RailError::Unauthorized {
                caller: authority,
                required: src.authority,
            });
        }
        if src.amount < amount {
            return Err(RailError::InsufficientFunds {
                needed: amount,
                available: src.amount,
            });
        }
        let mint_account = self.mints.get(&mint).ok_or(RailError::MintNotFound(mint))?;
        let new_supply = mint_account.supply.checked_sub(amount).ok_or_else(|| {
            RailError::SupplyInvariantViolation {
                reason: format!(
                    "burning {amount} exceeds outstanding supply {} of {mint}",
                    mint_account.supply
                ),
            }
        })?;
        let new_balance = src.amount - amount;

        self.remember_mint(mint);
        self.remember_account(source);
        if let Some(m) = self.mints.get_mut(&mint) {
            m.supply = new_supply;
        }
        if let Some(a) = self.accounts.get_mut(&source) {
            a.amount = new_balance;
        }
        tracing::debug!(mint = %mint, from = %source, amount, "burned");
        Ok(())
    }

    /// Move `amount` from `source` to `destination` (same mint).
    ///
    /// The destination's consent is not required, so program-owned accounts
    /// can receive unsolicited transfers.
    ///
    /// # Errors
    /// - `ProgramSignerRequired` if `authority` is a program signer
    /// - `AccountNotFound`
    /// - `WrongMint` if the accounts hold different mints
    /// - `Unauthorized` unless `authority` owns `source`
    /// - `InsufficientFunds` / `AmountOverflow`
    pub fn transfer(
        &mut self,
        source: Identity,
        destination: Identity,
        authority: Identity,
        amount: u64,
    ) -> Result<()> {
        self.ensure_outside_signer(&authority)?;
        self.transfer_signed(source, destination, authority, amount)
    }

    /// [`TokenLedger::transfer`] with the program signing.
    pub(crate) fn transfer_signed(
        &mut self,
        source: Identity,
        destination: Identity,
        authority: Identity,
        amount: u64,
    ) -> Result<()> {
        let src = self
            .accounts
            .get(&source)
            .ok_or(RailError::AccountNotFound(source))?;
        let dst = self
            .accounts
            .get(&destination)
            .ok_or(RailError::AccountNotFound(destination))?;
        if src.mint != dst.mint {
            return Err(RailError::WrongMint {
                expected: src.mint,
                actual: dst.mint,
            });
        }
        if src.authority != authority {
            return Err(RailError::Unauthorized {
                caller: authority,
                required: src.authority,
            });
        }
        if src.amount < amount {
            return Err(RailError::InsufficientFunds {
                needed: amount,
                available: src.amount,
            });
        }
        if source == destination {
            return Ok(());
        }
        let new_dst = dst.amount.checked_add(amount).ok_or(RailError::AmountOverflow)?;
        let new_src = src.amount - amount;

        self.remember_account(source);
        self.remember_account(destination);
        if let Some(a) = self.accounts.get_mut(&source) {
            a.amount = new_src;
        }
        if let Some(a) = self.accounts.get_mut(&destination) {
            a.amount = new_dst;
        }
        tracing::debug!(from = %source, to = %destination, amount, "transferred");
        Ok(())
    }

    /// Remove an empty token account.
    ///
    /// # Errors
    /// - `ProgramSignerRequired` if `authority` is a program signer
    /// - `AccountNotFound`
    /// - `Unauthorized` unless `authority` owns the account
    /// - `AccountNotEmpty` if it still holds a balance
    pub fn close_account(&mut self, address: Identity, authority: Identity) -> Result<TokenAccount> {
        self.ensure_outside_signer(&authority)?;
        self.close_signed(address, authority)
    }

    /// [`TokenLedger::close_account`] with the program signing.
    pub(crate) fn close_signed(&mut self, address: Identity, authority: Identity) -> Result<TokenAccount> {
        let account = *self
            .accounts
            .get(&address)
            .ok_or(RailError::AccountNotFound(address))?;
        if account.authority != authority {
            return Err(RailError::Unauthorized {
                caller: authority,
                required: account.authority,
            });
        }
        if !account.is_empty() {
            return Err(RailError::AccountNotEmpty {
                address,
                amount: account.amount,
            });
        }
        self.remember_account(address);
        self.accounts.remove(&address);
        tracing::debug!(account = %address, "token account closed");
        Ok(account)
    }

    // -----------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------

    #[must_use]
    pub fn account(&self, address: &Identity) -> Option<&TokenAccount> {
        self.accounts.get(address)
    }

    #[must_use]
    pub fn mint(&self, address: &Identity) -> Option<&MintAccount> {
        self.mints.get(address)
    }

    /// Balance at `address`, zero if the account does not exist.
    #[must_use]
    pub fn balance(&self, address: &Identity) -> u64 {
        self.accounts.get(address).map_or(0, |a| a.amount)
    }

    /// Balance of `owner`'s associated account for `mint`.
    #[must_use]
    pub fn associated_balance(&self, owner: &Identity, mint: &Identity) -> u64 {
        self.balance(&self.associated_address(owner, mint))
    }

    /// Outstanding supply of `mint`, zero if it does not exist.
    #[must_use]
    pub fn supply(&self, mint: &Identity) -> u64 {
        self.mints.get(mint).map_or(0, |m| m.supply)
    }

    /// Sum of every account balance of `mint`.
    #[must_use]
    pub fn circulating(&self, mint: &Identity) -> u128 {
        self.accounts
            .values()
            .filter(|a| a.mint == *mint)
            .map(|a| u128::from(a.amount))
            .sum()
    }

    #[must_use]
    pub fn account_count(&self) -> usize {
        self.accounts.len()
    }
}
