//! Configuration types for the engine, the treasury operator, and logging.

use std::str::FromStr;

use ed25519_dalek::SigningKey;
use serde::{Deserialize, Serialize};

use crate::constants::{DD_DECIMALS, DEFAULT_LOG_FILTER};
use crate::{Identity, RailError, Result};

/// Deployment-time configuration of one engine instance.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EngineConfig {
    /// Program id every derived address is scoped to.
    pub program_id: Identity,
    /// Deploy / upgrade authority: the only caller of `initialize` and `configure`.
    pub upgrade_authority: Identity,
    /// Decimal places of DD (and therefore of the accepted reserve asset).
    #[serde(default = "default_dd_decimals")]
    pub dd_decimals: u8,
}

fn default_dd_decimals() -> u8 {
    DD_DECIMALS
}

impl EngineConfig {
    #[must_use]
    pub fn new(program_id: Identity, upgrade_authority: Identity) -> Self {
        Self {
            program_id,
            upgrade_authority,
            dd_decimals: DD_DECIMALS,
        }
    }

    /// Parse from a JSON document.
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| RailError::Configuration(e.to_string()))
    }
}

/// What the settlement desk (the treasury operator) needs to release funds.
///
/// Values are read from the environment:
/// `PROGRAM_ID`, `DD_MINT`, `TREASURER_SECRET_KEY`.
#[derive(Debug, Clone, Default)]
pub struct TreasuryConfig {
    program_id: Option<Identity>,
    dd_mint: Option<Identity>,
    treasurer_key: Option<SigningKey>,
}

impl TreasuryConfig {
    /// Read from process environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read through an arbitrary lookup. Unparsable values count as missing.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            program_id: lookup("PROGRAM_ID").and_then(|key| Identity::from_str(&key).ok()),
            dd_mint: lookup("DD_MINT").and_then(|key| Identity::from_str(&key).ok()),
            treasurer_key: lookup("TREASURER_SECRET_KEY")
                .and_then(|key| parse_secret_key(&key).ok()),
        }
    }

    /// Names of the variables that are absent or unparsable.
    #[must_use]
    pub fn missing_keys(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.program_id.is_none() {
            missing.push("PROGRAM_ID");
        }
        if self.dd_mint.is_none() {
            missing.push("DD_MINT");
        }
        if self.treasurer_key.is_none() {
            missing.push("TREASURER_SECRET_KEY");
        }
        missing
    }

    /// Fail unless every variable is present.
    pub fn require_complete(&self) -> Result<()> {
        let missing = self.missing_keys();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(RailError::Configuration(format!(
                "missing env: {}",
                missing.join(", ")
            )))
        }
    }

    pub fn program_id(&self) -> Option<&Identity> {
        self.program_id.as_ref()
    }

    pub fn dd_mint(&self) -> Option<&Identity> {
        self.dd_mint.as_ref()
    }

    pub fn treasurer_key(&self) -> Option<&SigningKey> {
        self.treasurer_key.as_ref()
    }

    /// Public identity of the treasurer key, if configured.
    pub fn treasurer(&self) -> Option<Identity> {
        self.treasurer_key
            .as_ref()
            .map(|key| Identity::from_verifying_key(&key.verifying_key()))
    }
}

/// Parse a JSON byte array holding either a 64-byte keypair (secret || public)
/// or a bare 32-byte secret.
pub fn parse_secret_key(json: &str) -> Result<SigningKey> {
    let bytes: Vec<u8> = serde_json::from_str(json)
        .map_err(|e| RailError::Configuration(format!("bad secret key: {e}")))?;
    match bytes.len() {
        64 => {
            let mut keypair = [0u8; 64];
            keypair.copy_from_slice(&bytes);
            SigningKey::from_keypair_bytes(&keypair)
                .map_err(|e| RailError::Configuration(format!("bad keypair: {e}")))
        }
        32 => {
            let mut secret = [0u8; 32];
            secret.copy_from_slice(&bytes);
            Ok(SigningKey::from_bytes(&secret))
        }
        n => Err(RailError::Configuration(format!(
            "secret key must be 32 or 64 bytes, got {n}"
        ))),
    }
}

/// Output format of the tracing subscriber.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default `EnvFilter` directive; `RUST_LOG` overrides it.
    pub filter: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: DEFAULT_LOG_FILTER.to_string(),
            format: LogFormat::Pretty,
        }
    }
}
