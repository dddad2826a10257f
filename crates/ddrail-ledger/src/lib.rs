//! # ddrail-ledger
//!
//! **Custody plane**: the token substrate and the program-owned accounts
//! built on it.
//!
//! ## Components
//!
//! 1. **TokenLedger**: mints, token accounts and all-or-nothing atomic blocks
//! 2. **DdMint**: the derived DD mint, sole issuer of DD
//! 3. **ReserveVault**: program-owned custody of the reserve asset
//! 4. **EscrowLedger**: per-user DD escrows, released only by the settlement authority
//! 5. **authority**: exact-identity gate for privileged calls
//! 6. **AttestationVerifier**: ed25519 check of signed offers
//!
//! ```text
//! reserve ──custody──▶ ReserveVault        DdMint ──issue──▶ user DD
//! user DD ──open──▶ EscrowLedger ──release (authority)──▶ beneficiary DD
//! ```

pub mod attestation;
pub mod authority;
pub mod escrow;
pub mod mint;
pub mod token_ledger;
pub mod vault;

pub use attestation::{AttestationVerifier, Ed25519Verifier, verify_attestation};
pub use escrow::EscrowLedger;
pub use mint::DdMint;
pub use token_ledger::TokenLedger;
pub use vault::{ReserveVault, VaultBinding};
