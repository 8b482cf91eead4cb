//! Vault Locator.
//!
//! Every owner has exactly one vault, at the program-derived address of
//! `["time-vault", owner]`. Locating it is pure computation: no lookups, no
//! network, same owner in, same address out.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::config::{program_id, VAULT_SEED};
use crate::crypto::keys::Pubkey;
use crate::crypto::pda::try_find_program_address;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LocateError {
    /// Every bump put the address on the curve. Not expected to happen for
    /// any real key.
    #[error("no off-curve vault address exists for owner {0}")]
    NoViableBump(Pubkey),
}

/// A derived vault address and the bump that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VaultAddress {
    pub address: Pubkey,
    pub bump: u8,
}

impl fmt::Display for VaultAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (bump {})", self.address, self.bump)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VaultLocator {
    program_id: Pubkey,
}

impl Default for VaultLocator {
    fn default() -> Self {
        Self::new(program_id())
    }
}

impl VaultLocator {
    pub fn new(program_id: Pubkey) -> Self {
        Self { program_id }
    }

    pub fn program_id(&self) -> &Pubkey {
        &self.program_id
    }

    /// The vault address for `owner`.
    pub fn locate(&self, owner: &Pubkey) -> Result<VaultAddress, LocateError> {
        let (address, bump) =
            try_find_program_address(&[VAULT_SEED, owner.as_ref()], &self.program_id)
                .ok_or(LocateError::NoViableBump(*owner))?;
        tracing::debug!(%owner, %address, bump, "vault located");
        Ok(VaultAddress { address, bump })
    }
}
