//! The vault account as stored on chain.
//!
//! Layout: 8-byte account discriminator, then the fields below as fixed-width
//! little-endian integers in declaration order (25 bytes). The program
//! allocates 256 bytes for the account; everything past the record is zero
//! padding and is ignored here.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::{VAULT_ACCOUNT_NAME, VAULT_ACCOUNT_SPACE};
use crate::crypto::hash::{account_discriminator, DISCRIMINATOR_LENGTH};
use crate::crypto::keys::Pubkey;

/// Errors decoding a vault account.
#[derive(Debug, Error)]
pub enum StateError {
    #[error("account {address} is owned by {owner}, not the time-vault program")]
    WrongOwner { address: Pubkey, owner: Pubkey },

    #[error("account data too short: {len} bytes, need {need}")]
    TooShort { len: usize, need: usize },

    #[error("account discriminator does not match `Vault`")]
    DiscriminatorMismatch,

    #[error("failed to decode vault fields: {0}")]
    Decode(#[from] bincode::Error),
}

/// A time-vault record.
///
/// `start_clock` is the chain's unix timestamp (seconds) when the vault was
/// created. `end_clock` is the lock duration exactly as passed to
/// `initialize`, which this client always sends in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultRecord {
    pub start_clock: i64,
    pub end_clock: i64,
    pub amount: u64,
    pub bump: u8,
}

impl VaultRecord {
    /// Bytes of the record after the discriminator.
    pub const FIELDS_LEN: usize = 8 + 8 + 8 + 1;

    /// Bytes a reader needs to decode a record.
    pub const ENCODED_LEN: usize = DISCRIMINATOR_LENGTH + Self::FIELDS_LEN;

    pub fn discriminator() -> [u8; DISCRIMINATOR_LENGTH] {
        account_discriminator(VAULT_ACCOUNT_NAME)
    }

    /// Decode from raw account data. Trailing padding is allowed.
    pub fn decode(data: &[u8]) -> Result<Self, StateError> {
        if data.len() < Self::ENCODED_LEN {
            return Err(StateError::TooShort {
                len: data.len(),
                need: Self::ENCODED_LEN,
            });
        }
        if data[..DISCRIMINATOR_LENGTH] != Self::discriminator() {
            return Err(StateError::DiscriminatorMismatch);
        }
        Ok(bincode::deserialize(&data[DISCRIMINATOR_LENGTH..Self::ENCODED_LEN])?)
    }

    /// Decode an account, checking that the program owns it.
    pub fn decode_account(
        address: &Pubkey,
        owner: &Pubkey,
        program_id: &Pubkey,
        data: &[u8],
    ) -> Result<Self, StateError> {
        if owner != program_id {
            return Err(StateError::WrongOwner {
                address: *address,
                owner: *owner,
            });
        }
        Self::decode(data)
    }

    /// Encode into a full-size account buffer, zero padded.
    pub fn encode(&self) -> Result<Vec<u8>, StateError> {
        let mut data = Vec::with_capacity(VAULT_ACCOUNT_SPACE);
        data.extend_from_slice(&Self::discriminator());
        data.extend_from_slice(&bincode::serialize(self)?);
        data.resize(VAULT_ACCOUNT_SPACE, 0);
        Ok(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> VaultRecord {
        VaultRecord {
            start_clock: 1_760_000_000,
            end_clock: 60,
            amount: 1_500_000_000,
            bump: 254,
        }
    }

    #[test]
    fn encoded_layout_is_fixed_width_little_endian() {
        let data = sample().encode().unwrap();
        assert_eq!(data.len(), VAULT_ACCOUNT_SPACE);
        assert_eq!(&data[8..16], &1_760_000_000i64.to_le_bytes());
        assert_eq!(&data[16..24], &60i64.to_le_bytes());
        assert_eq!(&data[24..32], &1_500_000_000u64.to_le_bytes());
        assert_eq!(data[32], 254);
        assert!(data[VaultRecord::ENCODED_LEN..].iter().all(|b| *b == 0));
    }

    #[test]
    fn decode_reads_sliced_data() {
        let data = sample().encode().unwrap();
        let decoded = VaultRecord::decode(&data[..VaultRecord::ENCODED_LEN]).unwrap();
        assert_eq!(decoded, sample());
    }

    #[test]
    fn foreign_discriminator_is_rejected() {
        let mut data = sample().encode().unwrap();
        data[0] ^= 1;
        assert!(matches!(
            VaultRecord::decode(&data),
            Err(StateError::DiscriminatorMismatch)
        ));
    }

    #[test]
    fn short_data_is_rejected() {
        assert!(matches!(
            VaultRecord::decode(&[0u8; 10]),
            Err(StateError::TooShort { len: 10, need: 33 })
        ));
    }

    #[test]
    fn foreign_owner_is_rejected() {
        let program = Pubkey::new_from_array([1; 32]);
        let other = Pubkey::new_from_array([2; 32]);
        let data = sample().encode().unwrap();
        assert!(matches!(
            VaultRecord::decode_account(&other, &other, &program, &data),
            Err(StateError::WrongOwner { .. })
        ));
    }
}
