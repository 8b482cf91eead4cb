//! # CLI Interface
//!
//! Defines the command-line argument structure for `timevault` using
//! `clap` derive. Global flags pick the cluster and the wallet; subcommands
//! map onto the vault lifecycle plus two housekeeping commands.

use clap::{ArgGroup, Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::logging::LogFormat;

/// Time-vault client.
///
/// Lock SOL until a chosen instant and release it once the instant has
/// passed.
#[derive(Parser, Debug)]
#[command(
    name = "timevault",
    about = "Lock SOL until a date, then unlock it",
    version,
    propagate_version = true
)]
pub struct TimevaultCli {
    #[command(flatten)]
    pub global: GlobalArgs,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Flags shared by every subcommand.
#[derive(Args, Debug)]
pub struct GlobalArgs {
    /// JSON-RPC endpoint of the cluster. Overrides the config file.
    #[arg(long, global = true, env = "TIMEVAULT_RPC_URL")]
    pub rpc_url: Option<String>,

    /// Wallet keypair file (Solana CLI JSON format).
    ///
    /// A missing file means no wallet is connected.
    #[arg(long, short = 'k', global = true, env = "TIMEVAULT_KEYPAIR")]
    pub keypair: Option<PathBuf>,

    /// Client configuration file (JSON).
    #[arg(long, short = 'c', global = true, env = "TIMEVAULT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Commitment for reads and confirmations: processed, confirmed or finalized.
    #[arg(long, global = true)]
    pub commitment: Option<String>,

    /// Log output format.
    #[arg(
        long,
        global = true,
        env = "TIMEVAULT_LOG_FORMAT",
        value_enum,
        default_value_t = LogFormat::Pretty
    )]
    pub log_format: LogFormat,

    /// Run against a fresh in-process cluster instead of `--rpc-url`.
    ///
    /// The wallet is funded with 10 SOL and the cluster is discarded on exit.
    #[arg(long, global = true)]
    pub local: bool,
}

/// Top-level subcommands for the `timevault` binary.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print the vault address for a wallet. No network access.
    Address(AddressArgs),
    /// Show the vault for the connected wallet.
    Status,
    /// Lock SOL in a new vault.
    Lock(LockArgs),
    /// Release the vault back to the wallet.
    Unlock,
    /// Copy the program interface files from a build into the client tree.
    SyncIdl(SyncIdlArgs),
    /// Print version information and exit.
    Version,
}

/// Arguments for the `address` subcommand.
#[derive(Args, Debug)]
pub struct AddressArgs {
    /// Owner public key (base58). Defaults to the connected wallet.
    #[arg(long)]
    pub owner: Option<String>,
}

/// Arguments for the `lock` subcommand.
#[derive(Args, Debug)]
#[command(group(ArgGroup::new("until").required(true).args(["unlock_at", "lock_for"])))]
pub struct LockArgs {
    /// Amount of SOL to lock, e.g. `1.5`.
    #[arg(long, short = 'a')]
    pub amount: String,

    /// Unlock instant, RFC 3339 (e.g. `2026-12-31T12:00:00Z`).
    #[arg(long)]
    pub unlock_at: Option<String>,

    /// Lock duration in seconds from now.
    #[arg(long)]
    pub lock_for: Option<u64>,
}

/// Arguments for the `sync-idl` subcommand.
#[derive(Args, Debug)]
pub struct SyncIdlArgs {
    /// Build output directory holding `idl/` and `types/`.
    #[arg(long, default_value = "target")]
    pub from: PathBuf,

    /// Destination directory in the client tree.
    #[arg(long, default_value = "app/src/idl")]
    pub to: PathBuf,
}
