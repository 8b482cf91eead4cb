//! # Client Configuration & Constants
//!
//! Every magic number the client needs lives here: the program id, the vault
//! namespace literal, the lamport scale, and the network defaults. Anything
//! that has to match the deployed program byte-for-byte is a constant;
//! anything an operator may reasonably change is a [`ClientConfig`] field.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::OnceLock;
use std::time::Duration;
use thiserror::Error;

use crate::crypto::keys::Pubkey;

// ---------------------------------------------------------------------------
// Program Identity
// ---------------------------------------------------------------------------

/// Base58 address of the deployed time-vault lock program.
pub const PROGRAM_ID: &str = "4n8pDPEUzwXcTUmRrw61iTzfQssJBoxZWDusopTXN4hA";

/// Namespace literal prepended to the owner key when deriving a vault address.
/// Must match the `seeds` declared by the program's `Initialize` accounts.
pub const VAULT_SEED: &[u8] = b"time-vault";

/// Account name used for the record discriminator (`sha256("account:Vault")`).
pub const VAULT_ACCOUNT_NAME: &str = "Vault";

/// Space the program allocates for a vault account, including the discriminator.
pub const VAULT_ACCOUNT_SPACE: usize = 256;

/// The system program lives at the all-zero address.
pub const SYSTEM_PROGRAM_ID: Pubkey = Pubkey::new_from_array([0u8; 32]);

/// Parsed [`PROGRAM_ID`].
pub fn program_id() -> Pubkey {
    static ID: OnceLock<Pubkey> = OnceLock::new();
    *ID.get_or_init(|| {
        PROGRAM_ID
            .parse()
            .expect("PROGRAM_ID is a valid base58 public key")
    })
}

// ---------------------------------------------------------------------------
// Currency
// ---------------------------------------------------------------------------

/// Lamports per SOL. The base unit of every on-chain amount.
pub const LAMPORTS_PER_SOL: u64 = 1_000_000_000;

/// Number of fractional digits a display amount may carry.
pub const SOL_DECIMALS: usize = 9;

/// Fee charged per transaction signature.
pub const LAMPORTS_PER_SIGNATURE: u64 = 5_000;

/// Bytes of account metadata the rent calculation charges on top of the data.
pub const ACCOUNT_STORAGE_OVERHEAD: u64 = 128;

/// Rent rate, lamports per byte-year.
pub const LAMPORTS_PER_BYTE_YEAR: u64 = 3_480;

/// Years of rent an account must hold to be exempt.
pub const RENT_EXEMPTION_YEARS: u64 = 2;

/// Minimum balance for an account of `data_len` bytes to be rent exempt.
pub fn rent_exempt_minimum(data_len: usize) -> u64 {
    (ACCOUNT_STORAGE_OVERHEAD + data_len as u64) * LAMPORTS_PER_BYTE_YEAR * RENT_EXEMPTION_YEARS
}

// ---------------------------------------------------------------------------
// Network Defaults
// ---------------------------------------------------------------------------

/// A local test validator. Plain HTTP only.
pub const DEFAULT_RPC_URL: &str = "http://localhost:8899";

/// How long a submission may wait for its commitment level.
pub const DEFAULT_CONFIRM_TIMEOUT: Duration = Duration::from_secs(30);

/// Delay between signature status polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Confirmation level for reads and submissions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Commitment {
    /// Seen by the connected node.
    Processed,
    /// Voted on by a supermajority.
    #[default]
    Confirmed,
    /// Rooted.
    Finalized,
}

impl Commitment {
    /// Wire name used in JSON-RPC parameters.
    pub fn as_str(&self) -> &'static str {
        match self {
            Commitment::Processed => "processed",
            Commitment::Confirmed => "confirmed",
            Commitment::Finalized => "finalized",
        }
    }

    /// Whether a reported confirmation status satisfies this commitment.
    pub fn is_satisfied_by(&self, status: &str) -> bool {
        let rank = |s: &str| match s {
            "processed" => Some(0),
            "confirmed" => Some(1),
            "finalized" => Some(2),
            _ => None,
        };
        match (rank(status), rank(self.as_str())) {
            (Some(got), Some(want)) => got >= want,
            _ => false,
        }
    }
}

impl fmt::Display for Commitment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Commitment {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "processed" => Ok(Commitment::Processed),
            "confirmed" => Ok(Commitment::Confirmed),
            "finalized" => Ok(Commitment::Finalized),
            other => Err(ConfigError::InvalidCommitment(other.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// ClientConfig
// ---------------------------------------------------------------------------

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed config file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("unknown commitment level: {0}")]
    InvalidCommitment(String),

    #[error("invalid program id: {0}")]
    InvalidProgramId(String),
}

/// Runtime settings for a client session.
///
/// Every field has a default, so a config file only needs the keys it wants
/// to change:
///
/// ```json
/// { "rpc_url": "http://127.0.0.1:8899", "commitment": "finalized" }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// JSON-RPC endpoint.
    pub rpc_url: String,
    /// Commitment for reads and confirmations.
    pub commitment: Commitment,
    /// Base58 program id. Overridable for redeployments to a new address.
    pub program_id: String,
    /// Upper bound on waiting for a submission to confirm.
    pub confirm_timeout_ms: u64,
    /// Delay between status polls.
    pub poll_interval_ms: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            rpc_url: DEFAULT_RPC_URL.to_string(),
            commitment: Commitment::default(),
            program_id: PROGRAM_ID.to_string(),
            confirm_timeout_ms: DEFAULT_CONFIRM_TIMEOUT.as_millis() as u64,
            poll_interval_ms: DEFAULT_POLL_INTERVAL.as_millis() as u64,
        }
    }
}

impl ClientConfig {
    /// Loads a JSON config file. Missing keys fall back to defaults.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        let config: ClientConfig = serde_json::from_str(&raw)?;
        config.program_pubkey()?;
        Ok(config)
    }

    /// The configured program id as a key.
    pub fn program_pubkey(&self) -> Result<Pubkey, ConfigError> {
        self.program_id
            .parse()
            .map_err(|_| ConfigError::InvalidProgramId(self.program_id.clone()))
    }

    /// Program-facing settings derived from this config.
    pub fn program(&self) -> Result<ProgramConfig, ConfigError> {
        Ok(ProgramConfig {
            program_id: self.program_pubkey()?,
            commitment: self.commitment,
        })
    }

    pub fn confirm_timeout(&self) -> Duration {
        Duration::from_millis(self.confirm_timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// The subset of configuration a bound client needs: which program to talk
/// to and at which commitment to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgramConfig {
    pub program_id: Pubkey,
    pub commitment: Commitment,
}

impl Default for ProgramConfig {
    fn default() -> Self {
        Self {
            program_id: program_id(),
            commitment: Commitment::default(),
        }
    }
}
