//! Instruction builders for the time-vault program.
//!
//! Both instructions take the same three accounts, in this order:
//!
//! | # | Account          | Signer | Writable |
//! |---|------------------|--------|----------|
//! | 0 | `user`           | yes    | yes      |
//! | 1 | `time_vault_pda` | no     | yes      |
//! | 2 | `system_program` | no     | no       |

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::SYSTEM_PROGRAM_ID;
use crate::crypto::hash::{instruction_discriminator, DISCRIMINATOR_LENGTH};
use crate::crypto::keys::Pubkey;
use crate::transaction::types::{AccountMeta, Instruction};

pub const INITIALIZE: &str = "initialize";
pub const UNLOCK: &str = "unlock";

/// Arguments of `initialize`, in wire order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitializeArgs {
    /// Lock duration in seconds, stored as the record's `end_clock`.
    pub end_clock: i64,
    /// Lamports moved from the user into the vault.
    pub nbr_lamports: u64,
}

/// A decoded time-vault instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VaultInstruction {
    Initialize(InitializeArgs),
    Unlock,
}

#[derive(Debug, Error)]
pub enum InstructionError {
    #[error("instruction data shorter than a discriminator")]
    MissingDiscriminator,

    #[error("unknown instruction discriminator {0}")]
    UnknownDiscriminator(String),

    #[error("failed to encode or decode instruction arguments: {0}")]
    Args(#[from] bincode::Error),
}

impl VaultInstruction {
    pub fn name(&self) -> &'static str {
        match self {
            VaultInstruction::Initialize(_) => INITIALIZE,
            VaultInstruction::Unlock => UNLOCK,
        }
    }

    pub fn encode(&self) -> Result<Vec<u8>, InstructionError> {
        let mut data = instruction_discriminator(self.name()).to_vec();
        if let VaultInstruction::Initialize(args) = self {
            data.extend_from_slice(&bincode::serialize(args)?);
        }
        Ok(data)
    }

    pub fn decode(data: &[u8]) -> Result<Self, InstructionError> {
        if data.len() < DISCRIMINATOR_LENGTH {
            return Err(InstructionError::MissingDiscriminator);
        }
        let (disc, rest) = data.split_at(DISCRIMINATOR_LENGTH);
        if disc == instruction_discriminator(INITIALIZE) {
            Ok(VaultInstruction::Initialize(bincode::deserialize(rest)?))
        } else if disc == instruction_discriminator(UNLOCK) {
            Ok(VaultInstruction::Unlock)
        } else {
            Err(InstructionError::UnknownDiscriminator(hex::encode(disc)))
        }
    }
}

fn vault_accounts(user: &Pubkey, vault: &Pubkey) -> Vec<AccountMeta> {
    vec![
        AccountMeta::new(*user, true),
        AccountMeta::new(*vault, false),
        AccountMeta::new_readonly(SYSTEM_PROGRAM_ID, false),
    ]
}

/// `initialize(end_clock, nbr_lamports)` signed by `user`.
pub fn initialize(
    program_id: &Pubkey,
    user: &Pubkey,
    vault: &Pubkey,
    end_clock: i64,
    nbr_lamports: u64,
) -> Result<Instruction, InstructionError> {
    let data = VaultInstruction::Initialize(InitializeArgs {
        end_clock,
        nbr_lamports,
    })
    .encode()?;
    Ok(Instruction {
        program_id: *program_id,
        accounts: vault_accounts(user, vault),
        data,
    })
}

/// `unlock()` signed by `user`.
pub fn unlock(
    program_id: &Pubkey,
    user: &Pubkey,
    vault: &Pubkey,
) -> Result<Instruction, InstructionError> {
    Ok(Instruction {
        program_id: *program_id,
        accounts: vault_accounts(user, vault),
        data: VaultInstruction::Unlock.encode()?,
    })
}
