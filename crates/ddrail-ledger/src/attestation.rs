//! Offer attestation verification.
//!
//! Offers carry an ed25519 signature over their canonical payload. The
//! verifier is a trait so the offer book can be driven by a stub in tests.

use ddrail_types::{Attestation, Identity, RailError, Result};
use ed25519_dalek::{Signature, Verifier, VerifyingKey};

/// Checks that `signer` signed `payload`.
pub trait AttestationVerifier {
    fn verify(&self, payload: &[u8], signature: &[u8], signer: &Identity) -> bool;
}

/// ed25519 signature check.
#[derive(Debug, Clone, Copy, Default)]
pub struct Ed25519Verifier;

impl AttestationVerifier for Ed25519Verifier {
    fn verify(&self, payload: &[u8], signature: &[u8], signer: &Identity) -> bool {
        let Ok(key) = VerifyingKey::from_bytes(signer.as_bytes()) else {
            return false;
        };
        let Ok(signature) = Signature::from_slice(signature) else {
            return false;
        };
        key.verify(payload, &signature).is_ok()
    }
}

/// Verify a decoded attestation.
///
/// # Errors
/// Returns `AttestationInvalid` if the signature does not check out.
pub fn verify_attestation(attestation: &Attestation, verifier: &dyn AttestationVerifier) -> Result<()> {
    if verifier.verify(&attestation.payload, &attestation.signature, &attestation.signer) {
        Ok(())
    } else {
        Err(RailError::AttestationInvalid {
            reason: format!("signature does not match key {}", attestation.signer),
        })
    }
}

#[cfg(test)]
mod tests {
    use ed25519_dalek::{Signer, SigningKey};

    use super::*;

    fn signed(payload: &[u8]) -> (SigningKey, Attestation) {
        let key = SigningKey::from_bytes(&rand::random());
        let signature = key.sign(payload);
        let attestation = Attestation {
            amount: 1,
            bank_account: "acc".into(),
            signer: Identity::from_verifying_key(&key.verifying_key()),
            payload: payload.to_vec(),
            signature: signature.to_bytes().to_vec(),
        };
        (key, attestation)
    }

    #[test]
    fn valid_signature_passes() {
        let (_, att) = signed(b"1\nacc\nkey");
        verify_attestation(&att, &Ed25519Verifier).unwrap();
    }

    #[test]
    fn tampered_payload_fails() {
        let (_, mut att) = signed(b"1\nacc\nkey");
        att.payload = b"2\nacc\nkey".to_vec();
        assert!(matches!(
            verify_attestation(&att, &Ed25519Verifier),
            Err(RailError::AttestationInvalid { .. })
        ));
    }

    #[test]
    fn wrong_signer_fails() {
        let (_, mut att) = signed(b"payload");
        let (other, _) = signed(b"payload");
        att.signer = Identity::from_verifying_key(&other.verifying_key());
        assert!(!Ed25519Verifier.verify(&att.payload, &att.signature, &att.signer));
    }

    #[test]
    fn garbage_signature_is_rejected_not_panicking() {
        let (_, att) = signed(b"payload");
        assert!(!Ed25519Verifier.verify(&att.payload, &[0u8; 10], &att.signer));
    }
}
