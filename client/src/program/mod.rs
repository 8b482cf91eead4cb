//! # Time-Vault Program Interface
//!
//! Everything the client must agree on with the deployed program: how
//! instructions are encoded, how the vault account is laid out, and what the
//! program's error numbers mean. This is the Rust rendering of the program's
//! generated interface description.

pub mod error;
pub mod instruction;
pub mod state;

pub use error::{ProgramError, TIME_LOCK_NOT_REACHED};
pub use instruction::{InitializeArgs, InstructionError, VaultInstruction};
pub use state::{StateError, VaultRecord};
