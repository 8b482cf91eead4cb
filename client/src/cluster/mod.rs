//! # Cluster Connections
//!
//! The network side of the client. Everything the lifecycle needs from a
//! cluster fits in three calls:
//!
//! | Call               | Used for                                        |
//! |--------------------|-------------------------------------------------|
//! | `get_account`      | "is there a vault at this address?"             |
//! | `latest_blockhash` | anchoring a new transaction                     |
//! | `send_and_confirm` | submitting initialize/unlock and waiting for it |
//!
//! Two implementations ship with the crate:
//!
//! - [`RpcConnection`] speaks JSON-RPC 2.0 to a validator over HTTP.
//! - [`LocalCluster`] keeps an in-process ledger that behaves like a cluster
//!   with the time-vault program deployed. Tests and offline demos use it.

pub mod http;
pub mod local;
pub mod rpc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::Commitment;
use crate::crypto::keys::{Hash, Pubkey, Signature};
use crate::program::ProgramError;
use crate::transaction::Transaction;

pub use local::LocalCluster;
pub use rpc::RpcConnection;

/// An on-chain account as returned by a read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub lamports: u64,
    pub owner: Pubkey,
    pub data: Vec<u8>,
    pub executable: bool,
}

/// Errors talking to a cluster.
#[derive(Debug, Error)]
pub enum ClusterError {
    #[error("network error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid endpoint: {0}")]
    Endpoint(String),

    #[error("HTTP {status} from {endpoint}")]
    Http { status: u16, endpoint: String },

    #[error("RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("malformed response: {0}")]
    Decode(String),

    /// The program (or the system program on its behalf) failed the
    /// instruction.
    #[error("{0}")]
    Program(ProgramError),

    /// The runtime refused the transaction for a reason other than a program
    /// error: bad signature, stale blockhash, insufficient fee balance.
    #[error("transaction rejected: {0}")]
    Rejected(String),

    #[error("transaction {signature} not confirmed after {elapsed_ms}ms")]
    Timeout { signature: Signature, elapsed_ms: u64 },

    #[error("cluster unavailable: {0}")]
    Unavailable(String),
}

impl ClusterError {
    /// Short category name for user-facing failure notices.
    pub fn category(&self) -> &str {
        match self {
            ClusterError::Io(_) | ClusterError::Endpoint(_) | ClusterError::Unavailable(_) => {
                "NetworkError"
            }
            ClusterError::Http { .. } => "HttpError",
            ClusterError::Rpc { .. } => "RpcError",
            ClusterError::Decode(_) => "DecodeError",
            ClusterError::Program(e) => &e.name,
            ClusterError::Rejected(_) => "TransactionError",
            ClusterError::Timeout { .. } => "TimeoutError",
        }
    }

    pub fn program_error(&self) -> Option<&ProgramError> {
        match self {
            ClusterError::Program(e) => Some(e),
            _ => None,
        }
    }
}

/// A cluster the client can read from and submit to.
#[async_trait]
pub trait Connection: Send + Sync {
    /// Fetch an account. `Ok(None)` means the address holds no account.
    async fn get_account(
        &self,
        address: &Pubkey,
        commitment: Commitment,
    ) -> Result<Option<Account>, ClusterError>;

    async fn latest_blockhash(&self, commitment: Commitment) -> Result<Hash, ClusterError>;

    /// Submit a signed transaction and wait until it reaches `commitment`.
    async fn send_and_confirm(
        &self,
        tx: &Transaction,
        commitment: Commitment,
    ) -> Result<Signature, ClusterError>;
}
