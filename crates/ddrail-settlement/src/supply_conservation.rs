//! Supply conservation invariant checker.
//!
//! Invariant enforced after every deposit, redeem and release:
//! ```text
//! Σ(issued) - Σ(retired) == DD supply <= vault balance
//! ```
//!
//! DD is only ever issued against reserve units entering the vault and only
//! ever retired against reserve units leaving it, so supply and backing move
//! together. The vault may hold more than the supply: anyone can transfer
//! the reserve asset into it, and such a donation backs nothing. A supply
//! mismatch, or a vault short of the supply, means custody and issuance
//! have drifted apart, and the operation that observed it is rejected.

use ddrail_types::{RailError, Result};

/// Cumulative DD issuance and retirement since genesis.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SupplyConservation {
    issued: u128,
    retired: u128,
}

impl SupplyConservation {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record DD issued by a deposit.
    pub fn record_issue(&mut self, amount: u64) {
        self.issued += u128::from(amount);
    }

    /// Record DD retired by a redemption.
    pub fn record_retire(&mut self, amount: u64) {
        self.retired += u128::from(amount);
    }

    /// Expected outstanding supply: issued - retired.
    ///
    /// # Errors
    /// Returns `SupplyInvariantViolation` if more was retired than issued.
    pub fn expected_supply(&self) -> Result<u128> {
        self.issued
            .checked_sub(self.retired)
            .ok_or_else(|| RailError::SupplyInvariantViolation {
                reason: format!("retired {} exceeds issued {}", self.retired, self.issued),
            })
    }

    /// Check the observed DD supply and vault balance against the counters.
    ///
    /// # Errors
    /// Returns [`RailError::SupplyInvariantViolation`] if the supply differs
    /// from issued - retired or the vault holds less than that.
    pub fn verify(&self, dd_supply: u64, vault_balance: u64) -> Result<()> {
        let expected = self.expected_supply()?;
        if u128::from(dd_supply) != expected || u128::from(vault_balance) < expected {
            return Err(RailError::SupplyInvariantViolation {
                reason: format!(
                    "DD supply {dd_supply}, vault {vault_balance}, expected {expected} \
                     (issued={}, retired={})",
                    self.issued, self.retired
                ),
            });
        }
        Ok(())
    }

    #[must_use]
    pub fn total_issued(&self) -> u128 {
        self.issued
    }

    #[must_use]
    pub fn total_retired(&self) -> u128 {
        self.retired
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_supply_is_zero() {
        let sc = SupplyConservation::new();
        assert_eq!(sc.expected_supply().unwrap(), 0);
        assert!(sc.verify(0, 0).is_ok());
    }

    #[test]
    fn issue_and_retire_track_expected() {
        let mut sc = SupplyConservation::new();
        sc.record_issue(223_000_000);
        sc.record_retire(123_000_000);
        assert_eq!(sc.expected_supply().unwrap(), 100_000_000);
        assert!(sc.verify(100_000_000, 100_000_000).is_ok());
    }

    #[test]
    fn verify_fails_on_supply_drift() {
        let mut sc = SupplyConservation::new();
        sc.record_issue(10);
        let err = sc.verify(11, 10).unwrap_err();
        assert!(matches!(err, RailError::SupplyInvariantViolation { .. }));
        assert!(err.to_string().contains("RAIL_ERR_800"));
    }

    #[test]
    fn verify_fails_on_vault_shortfall() {
        let mut sc = SupplyConservation::new();
        sc.record_issue(10);
        assert!(sc.verify(10, 9).is_err());
    }

    #[test]
    fn vault_surplus_is_not_a_violation() {
        let mut sc = SupplyConservation::new();
        sc.record_issue(10);
        assert!(sc.verify(10, 11).is_ok());
        assert!(SupplyConservation::new().verify(0, 5).is_ok());
        // A surplus does not cover missing supply.
        assert!(sc.verify(9, 11).is_err());
    }

    #[test]
    fn over_retirement_is_violation() {
        let mut sc = SupplyConservation::new();
        sc.record_issue(5);
        sc.record_retire(6);
        assert!(matches!(
            sc.expected_supply(),
            Err(RailError::SupplyInvariantViolation { .. })
        ));
    }
}
