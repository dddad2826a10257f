//! Reserve vault: the program-owned account holding the backing asset.
//!
//! The vault's authority is its own derived address. Funds leave it only
//! through [`ReserveVault::disburse`], which the settlement engine calls
//! during redemption.

use ddrail_types::address::reserve_vault_address;
use ddrail_types::{Identity, RailError, Result};

use crate::token_ledger::TokenLedger;

/// Handle to the bound reserve vault.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReserveVault {
    address: Identity,
    reserve_mint: Identity,
}

/// Outcome of [`ReserveVault::bind`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VaultBinding {
    pub vault: ReserveVault,
    /// Whether the vault account was created by this call.
    pub created: bool,
    /// Previous reserve mint, if the vault was re-bound.
    pub rebound_from: Option<Identity>,
}

impl ReserveVault {
    /// Bind the vault of `program_id` to `reserve_mint`.
    ///
    /// - No vault yet: create it.
    /// - Vault already holds `reserve_mint`: no-op.
    /// - Vault holds another mint and is empty: close it and recreate.
    ///
    /// # Errors
    /// `InvalidMintBinding` if `reserve_mint` does not exist, has a precision
    /// other than `decimals`, or the vault holds funds of another mint.
    pub fn bind(
        ledger: &mut TokenLedger,
        program_id: &Identity,
        reserve_mint: Identity,
        decimals: u8,
    ) -> Result<VaultBinding> {
        let mint = ledger
            .mint(&reserve_mint)
            .ok_or_else(|| RailError::InvalidMintBinding {
                reason: format!("reserve mint {reserve_mint} does not exist"),
            })?;
        if mint.decimals != decimals {
            return Err(RailError::InvalidMintBinding {
                reason: format!(
                    "reserve mint has {} decimals, DD has {decimals}",
                    mint.decimals
                ),
            });
        }

        let address = reserve_vault_address(program_id);
        let vault = Self {
            address,
            reserve_mint,
        };

        match ledger.account(&address).copied() {
            None => {
                ledger.create_program_account(address, reserve_mint)?;
                Ok(VaultBinding {
                    vault,
                    created: true,
                    rebound_from: None,
                })
            }
            Some(existing) if existing.mint == reserve_mint => Ok(VaultBinding {
                vault,
                created: false,
                rebound_from: None,
            }),
            Some(existing) => {
                if !existing.is_empty() {
                    return Err(RailError::InvalidMintBinding {
                        reason: format!(
                            "vault still holds {} of {}",
                            existing.amount, existing.mint
                        ),
                    });
                }
                ledger.atomic(|l| {
                    l.close_signed(address, address)?;
                    l.create_program_account(address, reserve_mint)
                })?;
                Ok(VaultBinding {
                    vault,
                    created: true,
                    rebound_from: Some(existing.mint),
                })
            }
        }
    }

    #[must_use]
    pub fn address(&self) -> Identity {
        self.address
    }

    #[must_use]
    pub fn reserve_mint(&self) -> Identity {
        self.reserve_mint
    }

    /// Move `amount` of the reserve asset from `depositor`'s associated
    /// account into the vault.
    ///
    /// # Errors
    /// - `InsufficientFunds` if the depositor holds less than `amount`
    /// - ledger errors otherwise
    pub fn custody(&self, ledger: &mut TokenLedger, depositor: Identity, amount: u64) -> Result<()> {
        let source = ledger.associated_address(&depositor, &self.reserve_mint);
        let available = ledger.balance(&source);
        if available < amount {
            return Err(RailError::InsufficientFunds {
                needed: amount,
                available,
            });
        }
        ledger.transfer(source, self.address, depositor, amount)
    }

    /// Pay `amount` out of the vault to `recipient`'s associated account,
    /// creating it if absent.
    ///
    /// # Errors
    /// `SupplyInvariantViolation` if the vault holds less than `amount`.
    pub fn disburse(&self, ledger: &mut TokenLedger, recipient: Identity, amount: u64) -> Result<()> {
        let held = ledger.balance(&self.address);
        if held < amount {
            return Err(RailError::SupplyInvariantViolation {
                reason: format!("vault holds {held}, cannot pay out {amount}"),
            });
        }
        ledger.atomic(|l| {
            let destination = l.ensure_associated_account(recipient, self.reserve_mint)?;
            l.transfer_signed(self.address, destination, self.address, amount)
        })
    }

    #[must_use]
    pub fn balance(&self, ledger: &TokenLedger) -> u64 {
        ledger.balance(&self.address)
    }
}
