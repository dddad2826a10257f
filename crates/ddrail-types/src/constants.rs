//! System-wide constants for the ddrail settlement engine.

/// Program state version written by `initialize` / `configure`.
/// A state at version 0 is uninitialized and refuses user operations.
pub const PROGRAM_VERSION: u8 = 1;

/// Decimal places of the DD token. The reserve asset must match so that
/// parity is 1:1 in base units.
pub const DD_DECIMALS: u8 = 6;

/// Seed tag of the singleton program state account.
pub const STATE_SEED: &[u8] = b"";

/// Seed tag of the DD mint.
pub const DD_MINT_SEED: &[u8] = b"mint/dd";

/// Seed tag of the reserve-asset vault.
pub const RESERVE_VAULT_SEED: &[u8] = b"vault/usdc";

/// Seed tag of per-user escrow custody accounts (followed by the owner key).
pub const ESCROW_SEED: &[u8] = b"escrow";

/// Seed tag of per-user, per-mint balance accounts.
pub const BALANCE_SEED: &[u8] = b"balance";

/// Marker appended to every address derivation.
pub const DERIVATION_MARKER: &[u8] = b"ProgramDerivedAddress";

/// Domain tag mixed into the first journal digest.
pub const JOURNAL_GENESIS_TAG: &[u8] = b"ddrail:journal:v1:";

/// Default tracing filter directive.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Engine name.
pub const ENGINE_NAME: &str = "ddrail";
