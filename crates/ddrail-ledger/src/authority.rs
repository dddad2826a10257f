//! Authority gate for privileged operations.

use ddrail_types::{Identity, RailError, Result};

/// `true` iff `caller` is the `required` identity.
#[must_use]
pub fn is_authorized(caller: &Identity, required: &Identity) -> bool {
    caller == required
}

/// Reject `caller` unless it is `required`.
///
/// # Errors
/// Returns `Unauthorized` and logs the rejected call at `warn`.
pub fn require_authority(caller: &Identity, required: &Identity, operation: &str) -> Result<()> {
    if is_authorized(caller, required) {
        return Ok(());
    }
    tracing::warn!(
        operation,
        caller = %caller,
        required = %required,
        "rejected privileged call"
    );
    Err(RailError::Unauthorized {
        caller: *caller,
        required: *required,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_identity_only() {
        let admin = Identity::random();
        let other = Identity::random();
        assert!(is_authorized(&admin, &admin));
        assert!(!is_authorized(&other, &admin));
        require_authority(&admin, &admin, "release_funds").unwrap();
        assert_eq!(
            require_authority(&other, &admin, "release_funds").unwrap_err(),
            RailError::Unauthorized {
                caller: other,
                required: admin
            }
        );
    }
}
