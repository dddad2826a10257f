//! DD mint registry.
//!
//! The DD mint lives at a program-derived address and is its own mint
//! authority, so only code holding the program's derivation can issue new
//! units. Issuance and retirement are the only supply-changing paths; both
//! are driven by the settlement engine in lockstep with the reserve vault.

use ddrail_types::address::dd_mint_address;
use ddrail_types::{Identity, RailError, Result};

use crate::token_ledger::TokenLedger;

/// Handle to the program's DD mint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DdMint {
    address: Identity,
}

impl DdMint {
    /// The DD mint of `program_id`.
    #[must_use]
    pub fn for_program(program_id: &Identity) -> Self {
        Self {
            address: dd_mint_address(program_id),
        }
    }

    #[must_use]
    pub fn address(&self) -> Identity {
        self.address
    }

    /// Mint authority; the derived address itself.
    #[must_use]
    pub fn authority(&self) -> Identity {
        self.address
    }

    /// Create the mint if absent. Returns `true` if it was created.
    ///
    /// # Errors
    /// Returns `InvalidMintBinding` if something already lives at the address
    /// with another precision or authority.
    pub fn ensure_created(&self, ledger: &mut TokenLedger, decimals: u8) -> Result<bool> {
        if let Some(existing) = ledger.mint(&self.address) {
            if existing.decimals != decimals || existing.authority != self.address {
                return Err(RailError::InvalidMintBinding {
                    reason: format!(
                        "DD mint {} exists with {} decimals under {}",
                        self.address, existing.decimals, existing.authority
                    ),
                });
            }
            return Ok(false);
        }
        ledger.create_program_mint(self.address, decimals)?;
        Ok(true)
    }

    /// Issue `amount` DD to `holder`'s associated account, creating it if needed.
    ///
    /// # Errors
    /// Propagates ledger errors (`MintNotFound`, `AmountOverflow`).
    pub fn issue(&self, ledger: &mut TokenLedger, holder: Identity, amount: u64) -> Result<()> {
        ledger.atomic(|l| {
            let destination = l.ensure_associated_account(holder, self.address)?;
            l.mint_signed(self.address, destination, self.address, amount)
        })
    }

    /// Burn `amount` DD from `holder`'s associated account, signed by `holder`.
    ///
    /// # Errors
    /// - `InsufficientFunds` if the holder has less than `amount`
    /// - `AccountNotFound` if the holder never held DD
    pub fn retire(&self, ledger: &mut TokenLedger, holder: Identity, amount: u64) -> Result<()> {
        let source = ledger.associated_address(&holder, &self.address);
        let available = ledger.balance(&source);
        if available < amount {
            return Err(RailError::InsufficientFunds {
                needed: amount,
                available,
            });
        }
        ledger.burn(self.address, source, holder, amount)
    }

    #[must_use]
    pub fn supply(&self, ledger: &TokenLedger) -> u64 {
        ledger.supply(&self.address)
    }

    #[must_use]
    pub fn balance_of(&self, ledger: &TokenLedger, holder: &Identity) -> u64 {
        ledger.associated_balance(holder, &self.address)
    }
}
