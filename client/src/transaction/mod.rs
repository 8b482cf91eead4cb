//! # Transaction Module
//!
//! Compiling instructions into a message, signing it, and encoding it for the
//! wire.
//!
//! ```text
//! types.rs   : AccountMeta, Instruction, CompiledInstruction
//! message.rs : key ordering, header counts, short_vec encoding
//! signing.rs : Transaction, signature slots, wallet-driven signing
//! ```
//!
//! Lifecycle: build an [`Instruction`] (see [`crate::program::instruction`]),
//! compile it into a [`Message`] against a recent blockhash, wrap it as an
//! unsigned [`Transaction`], have the wallet [`sign_transaction`], then hand
//! it to a [`crate::cluster::Connection`].

pub mod message;
pub mod signing;
pub mod types;

pub use message::{Message, MessageError, MessageHeader};
pub use signing::{sign_transaction, Transaction};
pub use types::{AccountMeta, CompiledInstruction, Instruction};
