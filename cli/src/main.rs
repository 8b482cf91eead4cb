// Copyright (c) 2026 Time Vault Contributors. MIT License.
// See LICENSE for details.

//! # Time Vault CLI
//!
//! Entry point for the `timevault` binary. Parses CLI arguments, initializes
//! logging, binds the wallet to a cluster and drives the vault controller.
//!
//! The binary supports six subcommands:
//!
//! - `address` : print the vault address for a wallet
//! - `status`  : show the connected wallet's vault
//! - `lock`    : lock SOL in a new vault
//! - `unlock`  : release the vault
//! - `sync-idl`: copy the program interface files after a deployment
//! - `version` : print build version information

mod artifacts;
mod cli;
mod logging;

use anyhow::{anyhow, bail, Context, Result};
use chrono::{DateTime, Duration, Utc};
use clap::Parser;
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;

use timevault_client::binder::{bind, WalletSession};
use timevault_client::clock::{Clock, SystemClock};
use timevault_client::cluster::{Connection, LocalCluster, RpcConnection};
use timevault_client::config::{ClientConfig, Commitment, ProgramConfig, LAMPORTS_PER_SOL};
use timevault_client::crypto::keys::{Keypair, Pubkey};
use timevault_client::lifecycle::{ControllerError, InitRequest, Phase, VaultController};
use timevault_client::locator::VaultLocator;
use timevault_client::notify::{Notification, Notifier};
use timevault_client::wallet::load_keypair_file;

use cli::{Commands, GlobalArgs, TimevaultCli};
use logging::LogFormat;

/// SOL given to the wallet on a fresh `--local` cluster.
const LOCAL_AIRDROP_SOL: u64 = 10;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = TimevaultCli::parse();
    logging::init_logging(cli.global.log_format);

    match cli.command {
        Commands::Version => {
            print_version();
            Ok(())
        }
        Commands::Address(args) => show_address(&cli.global, args.owner.as_deref()),
        Commands::SyncIdl(args) => {
            let config = load_config(&cli.global)?;
            let program = config.program()?;
            let synced = artifacts::sync_idl(&args.from, &args.to, &program.program_id)?;
            println!("idl.ts   -> {}", synced.types.display());
            println!("idl.json -> {}", synced.idl.display());
            Ok(())
        }
        Commands::Status => {
            let session = Session::open(&cli.global).await?;
            session.print_status(cli.global.log_format);
            Ok(())
        }
        Commands::Lock(args) => {
            let session = Session::open(&cli.global).await?;
            let unlock_at = match (args.unlock_at, args.lock_for) {
                (Some(at), _) => DateTime::parse_from_rfc3339(&at)
                    .with_context(|| format!("invalid --unlock-at `{}`", at))?
                    .with_timezone(&Utc),
                (None, Some(secs)) => {
                    let secs = i64::try_from(secs).context("--lock-for is too large")?;
                    SystemClock.now() + Duration::seconds(secs)
                }
                (None, None) => bail!("either --unlock-at or --lock-for is required"),
            };
            let request = InitRequest::new(args.amount, unlock_at);
            let signature = session
                .controller
                .initiate_vault(&request)
                .await
                .map_err(explain)?;
            println!("signature: {}", signature);
            session.print_status(cli.global.log_format);
            Ok(())
        }
        Commands::Unlock => {
            let session = Session::open(&cli.global).await?;
            let signature = session.controller.release_vault().await.map_err(explain)?;
            println!("signature: {}", signature);
            Ok(())
        }
    }
}

/// Prints notifications to stdout.
struct StdoutNotifier;

impl Notifier for StdoutNotifier {
    fn notify(&self, n: Notification) {
        if n.is_destructive() {
            println!("[!] {}", n);
        } else {
            println!("{}", n);
        }
    }
}

/// A bound controller, refreshed once.
struct Session {
    controller: VaultController,
    owner: Option<Pubkey>,
    locator: VaultLocator,
}

impl Session {
    async fn open(global: &GlobalArgs) -> Result<Self> {
        let config = load_config(global)?;
        let program = config.program()?;
        let keypair = load_wallet(global)?;
        let owner = keypair.as_ref().map(Keypair::pubkey);

        let connection: Arc<dyn Connection> = if global.local {
            let cluster = LocalCluster::with_program_id(program.program_id);
            if let Some(owner) = &owner {
                cluster.airdrop(owner, LOCAL_AIRDROP_SOL * LAMPORTS_PER_SOL);
            }
            tracing::info!("using in-process cluster");
            Arc::new(cluster)
        } else {
            tracing::info!(rpc_url = %config.rpc_url, commitment = %program.commitment, "connecting");
            Arc::new(RpcConnection::from_config(&config)?)
        };

        let session = match keypair {
            Some(keypair) => WalletSession::connected(keypair),
            None => WalletSession::Disconnected,
        };
        let binding = bind(&session, connection, &program);
        let controller =
            VaultController::new(binding, Arc::new(SystemClock), Arc::new(StdoutNotifier));

        if let Err(e) = controller.refresh().await {
            return Err(explain(e)).context("failed to read vault");
        }
        Ok(Self {
            controller,
            owner,
            locator: VaultLocator::new(program.program_id),
        })
    }

    fn print_status(&self, format: LogFormat) {
        let phase = self.controller.phase();
        let vault = self
            .owner
            .and_then(|owner| self.locator.locate(&owner).ok());
        let view = self.controller.view();

        if format == LogFormat::Json {
            let status = json!({
                "owner": self.owner.map(|o| o.to_string()),
                "vault": vault.map(|v| v.address.to_string()),
                "phase": phase.name(),
                "view": view,
            });
            println!("{}", status);
            return;
        }

        match self.owner {
            Some(owner) => println!("wallet : {}", owner),
            None => println!("wallet : not connected"),
        }
        if let Some(vault) = vault {
            println!("vault  : {}", vault);
        }
        println!("phase  : {}", phase);
        if let (Phase::Initialized(_), Some(view)) = (phase, view) {
            println!("amount : {} SOL", view.amount);
            println!("unlock : {}", view.unlock_at_display);
            if view.unlockable {
                println!("state  : unlockable now");
            } else {
                println!("state  : locked, {} remaining", view.remaining_display);
            }
        }
    }
}

/// Attach a hint to controller errors a user can act on.
fn explain(e: ControllerError) -> anyhow::Error {
    match e {
        ControllerError::NotBound => {
            anyhow!("no wallet connected: pass --keypair or set TIMEVAULT_KEYPAIR")
        }
        ControllerError::Validation(errors) => {
            let fields: Vec<String> = errors.0.iter().map(ToString::to_string).collect();
            anyhow!("invalid input:\n  {}", fields.join("\n  "))
        }
        other => anyhow::Error::new(other),
    }
}

fn load_config(global: &GlobalArgs) -> Result<ClientConfig> {
    let mut config = match &global.config {
        Some(path) => ClientConfig::from_file(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => ClientConfig::default(),
    };
    if let Some(url) = &global.rpc_url {
        config.rpc_url = url.clone();
    }
    if let Some(commitment) = &global.commitment {
        config.commitment = commitment.parse::<Commitment>()?;
    }
    Ok(config)
}

/// `--keypair`, else the Solana CLI default location.
fn keypair_path(global: &GlobalArgs) -> Option<PathBuf> {
    global.keypair.clone().or_else(|| {
        std::env::var_os("HOME")
            .map(|home| PathBuf::from(home).join(".config").join("solana").join("id.json"))
    })
}

fn load_wallet(global: &GlobalArgs) -> Result<Option<Keypair>> {
    let Some(path) = keypair_path(global) else {
        return Ok(None);
    };
    let keypair = load_keypair_file(&path)
        .with_context(|| format!("failed to load keypair {}", path.display()))?;
    if keypair.is_none() {
        tracing::info!(path = %path.display(), "no keypair file, continuing without a wallet");
    }
    Ok(keypair)
}

fn show_address(global: &GlobalArgs, owner: Option<&str>) -> Result<()> {
    let config = load_config(global)?;
    let program: ProgramConfig = config.program()?;
    let owner: Pubkey = match owner {
        Some(text) => text
            .parse()
            .with_context(|| format!("invalid owner `{}`", text))?,
        None => load_wallet(global)?
            .map(|k| k.pubkey())
            .ok_or_else(|| anyhow!("no wallet connected: pass --owner or --keypair"))?,
    };
    let vault = VaultLocator::new(program.program_id).locate(&owner)?;
    println!("owner   : {}", owner);
    println!("program : {}", program.program_id);
    println!("vault   : {}", vault.address);
    println!("bump    : {}", vault.bump);
    Ok(())
}

/// Prints version information to stdout.
fn print_version() {
    println!("timevault {}", env!("CARGO_PKG_VERSION"));
    println!("program   {}", timevault_client::config::PROGRAM_ID);
    println!("rustc     {}", rustc_version());
}

/// Returns the Rust compiler version used to build this binary.
fn rustc_version() -> &'static str {
    option_env!("RUSTC_VERSION").unwrap_or("unknown")
}
