//! # Cryptographic Primitives
//!
//! Thin, typed wrappers around audited implementations:
//!
//! - **Ed25519** (`ed25519-dalek`) for wallet signatures.
//! - **Edwards point decompression** (`curve25519-dalek`) to tell whether a
//!   derived address lies on the curve.
//! - **SHA-256** (`sha2`) for address derivation and discriminators.
//!
//! Nothing here is novel cryptography; it only has to agree bit-for-bit with
//! the chain.

pub mod hash;
pub mod keys;
pub mod pda;

pub use hash::{account_discriminator, instruction_discriminator, sha256};
pub use keys::{Hash, KeyError, Keypair, Pubkey, Signature};
pub use pda::{create_program_address, try_find_program_address, PdaError};
