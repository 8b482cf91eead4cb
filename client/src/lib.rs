// Copyright (c) 2026 Time Vault Contributors. MIT License.
// See LICENSE for details.

//! # Time Vault Client Library
//!
//! Client side of the time-vault lock program: lock an amount of SOL until a
//! chosen instant, then take it back once the instant has passed. The program
//! does the enforcing; this crate decides what to show and what to send.
//!
//! ## Architecture
//!
//! Three pieces do the real work:
//!
//! - **binder**: wallet session + cluster connection in, bound client handle
//!   out. No wallet is a state, not an error.
//! - **locator**: the vault's program-derived address for an owner. Pure
//!   math, no network.
//! - **lifecycle**: the `Loading → Uninitialized ↔ Initialized` state
//!   machine, input validation, and the display values derived from a record.
//!
//! Everything else supports them:
//!
//! - **crypto**: keys, signatures, SHA-256, program-derived addresses.
//! - **program**: the program's interface: instruction encoding, the vault
//!   account layout, and its error table.
//! - **transaction**: legacy message compilation and signing.
//! - **wallet**: the signing collaborator trait and keypair-file wallets.
//! - **cluster**: the `Connection` trait, a JSON-RPC connection, and an
//!   in-process cluster for tests and offline runs.
//! - **clock** / **notify**: injected time source and notification sink.
//! - **config**: program constants and client settings.
//!
//! ## Design Notes
//!
//! 1. Absence of a vault is `VaultLookup::NotFound`, never an error. A failed
//!    read is an error and leaves the phase alone.
//! 2. Amounts never touch floating point.
//! 3. One request in flight per controller; late results after teardown are
//!    dropped on the floor.

pub mod binder;
pub mod clock;
pub mod cluster;
pub mod config;
pub mod crypto;
pub mod lifecycle;
pub mod locator;
pub mod notify;
pub mod program;
pub mod transaction;
pub mod wallet;

pub use binder::{bind, Binding, ClientError, VaultClient, VaultLookup, WalletSession};
pub use lifecycle::{ControllerError, InitRequest, Phase, VaultController};
pub use locator::{VaultAddress, VaultLocator};
