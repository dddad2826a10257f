//! The singleton program state.
//!
//! Created by `initialize`, bound to a reserve asset by `configure`, and
//! otherwise read-only. Every user operation receives it explicitly and
//! refuses to run while `version == 0`.

use serde::{Deserialize, Serialize};

use crate::constants::PROGRAM_VERSION;
use crate::{Identity, RailError, Result};

/// Program-wide configuration recorded on the ledger.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProgramState {
    /// 0 until `initialize` runs.
    pub version: u8,
    /// The only identity permitted to release escrowed funds.
    pub settlement_authority: Identity,
    /// The only reserve-asset mint accepted by deposit / redeem.
    /// `None` until `configure` runs.
    pub reserve_mint: Option<Identity>,
}

impl ProgramState {
    /// An uninitialized state (version 0).
    #[must_use]
    pub fn uninitialized() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.version != 0
    }

    /// Guard for every non-administrative operation.
    pub fn ensure_initialized(&self) -> Result<()> {
        if self.version == PROGRAM_VERSION {
            Ok(())
        } else {
            Err(RailError::NotInitialized)
        }
    }

    /// The bound reserve mint.
    ///
    /// # Errors
    /// Returns [`RailError::NotConfigured`] before `configure` has run.
    pub fn reserve_mint(&self) -> Result<Identity> {
        self.reserve_mint.ok_or(RailError::NotConfigured)
    }

    /// Check that `mint` is the accepted reserve asset.
    pub fn ensure_reserve_mint(&self, mint: &Identity) -> Result<()> {
        let expected = self.reserve_mint()?;
        if expected != *mint {
            return Err(RailError::WrongMint {
                expected,
                actual: *mint,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uninitialized_refuses() {
        let state = ProgramState::uninitialized();
        assert!(!state.is_initialized());
        assert_eq!(state.ensure_initialized(), Err(RailError::NotInitialized));
    }

    #[test]
    fn initialized_passes() {
        let state = ProgramState {
            version: PROGRAM_VERSION,
            settlement_authority: Identity::random(),
            reserve_mint: None,
        };
        assert!(state.ensure_initialized().is_ok());
        assert_eq!(state.reserve_mint(), Err(RailError::NotConfigured));
    }

    #[test]
    fn reserve_mint_mismatch_is_wrong_mint() {
        let usdc = Identity::random();
        let other = Identity::random();
        let state = ProgramState {
            version: PROGRAM_VERSION,
            settlement_authority: Identity::random(),
            reserve_mint: Some(usdc),
        };
        assert!(state.ensure_reserve_mint(&usdc).is_ok());
        assert_eq!(
            state.ensure_reserve_mint(&other),
            Err(RailError::WrongMint {
                expected: usdc,
                actual: other
            })
        );
    }
}
