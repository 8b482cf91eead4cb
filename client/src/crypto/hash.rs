//! # Hashing Utilities
//!
//! SHA-256 is the only hash the program interface needs. It shows up in three
//! places: program-derived address derivation, the 8-byte instruction
//! discriminators (`sha256("global:<ix>")`), and the 8-byte account
//! discriminators (`sha256("account:<Type>")`).

use sha2::{Digest, Sha256};

/// Length of instruction and account discriminators.
pub const DISCRIMINATOR_LENGTH: usize = 8;

/// SHA-256 over the concatenation of `parts`.
///
/// Takes slices instead of one buffer so PDA derivation can hash its seeds
/// without allocating.
pub fn sha256_concat(parts: &[&[u8]]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part);
    }
    hasher.finalize().into()
}

/// SHA-256 of a single buffer.
pub fn sha256(data: &[u8]) -> [u8; 32] {
    sha256_concat(&[data])
}

fn discriminator(namespace: &str, name: &str) -> [u8; DISCRIMINATOR_LENGTH] {
    let preimage = format!("{}:{}", namespace, name);
    let digest = sha256(preimage.as_bytes());
    let mut out = [0u8; DISCRIMINATOR_LENGTH];
    out.copy_from_slice(&digest[..DISCRIMINATOR_LENGTH]);
    out
}

/// Discriminator prefixed to the data of instruction `name`.
pub fn instruction_discriminator(name: &str) -> [u8; DISCRIMINATOR_LENGTH] {
    discriminator("global", name)
}

/// Discriminator prefixed to the data of accounts of type `name`.
pub fn account_discriminator(name: &str) -> [u8; DISCRIMINATOR_LENGTH] {
    discriminator("account", name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sha256_known_vector() {
        assert_eq!(
            hex::encode(sha256(b"abc")),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn concat_matches_single_buffer() {
        assert_eq!(sha256_concat(&[b"time", b"-", b"vault"]), sha256(b"time-vault"));
    }

    #[test]
    fn discriminators_match_deployed_program() {
        assert_eq!(hex::encode(instruction_discriminator("initialize")), "afaf6d1f0d989bed");
        assert_eq!(hex::encode(instruction_discriminator("unlock")), "659b28159ebd38cb");
        assert_eq!(hex::encode(account_discriminator("Vault")), "d308e82b02987577");
    }

    #[test]
    fn discriminators_are_namespaced() {
        assert_ne!(
            instruction_discriminator("initialize"),
            instruction_discriminator("unlock")
        );
        assert_ne!(
            instruction_discriminator("Vault"),
            account_discriminator("Vault")
        );
        assert_eq!(
            account_discriminator("Vault")[..],
            sha256(b"account:Vault")[..DISCRIMINATOR_LENGTH]
        );
    }
}
