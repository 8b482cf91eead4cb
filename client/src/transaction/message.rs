//! Legacy message compilation and wire encoding.
//!
//! A message is the part of a transaction every signer signs:
//!
//! ```text
//! header (3 bytes) | short_vec<pubkey> keys | blockhash (32) | short_vec<instruction>
//! ```
//!
//! Account keys are ordered writable signers, read-only signers, writable
//! non-signers, read-only non-signers; the fee payer is always key 0. The
//! header counts let the runtime recover each key's flags from its position.

use thiserror::Error;

use super::types::{CompiledInstruction, Instruction};
use crate::crypto::keys::{Hash, Pubkey};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MessageError {
    #[error("message references {0} accounts; at most 256 fit an index byte")]
    TooManyAccounts(usize),

    #[error("short_vec length {0} does not fit in 16 bits")]
    LengthOverflow(usize),

    #[error("truncated short_vec length prefix")]
    TruncatedLength,
}

/// Append a compact-u16 length: 7 bits per byte, high bit means "more".
pub fn encode_length(buf: &mut Vec<u8>, len: usize) -> Result<(), MessageError> {
    if len > u16::MAX as usize {
        return Err(MessageError::LengthOverflow(len));
    }
    let mut rem = len;
    loop {
        let mut byte = (rem & 0x7f) as u8;
        rem >>= 7;
        if rem == 0 {
            buf.push(byte);
            return Ok(());
        }
        byte |= 0x80;
        buf.push(byte);
    }
}

/// Read a compact-u16 length, returning it and the bytes consumed.
pub fn decode_length(bytes: &[u8]) -> Result<(usize, usize), MessageError> {
    let mut len = 0usize;
    for (i, byte) in bytes.iter().take(3).enumerate() {
        len |= ((byte & 0x7f) as usize) << (7 * i);
        if byte & 0x80 == 0 {
            return Ok((len, i + 1));
        }
    }
    Err(MessageError::TruncatedLength)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MessageHeader {
    pub num_required_signatures: u8,
    pub num_readonly_signed_accounts: u8,
    pub num_readonly_unsigned_accounts: u8,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub header: MessageHeader,
    pub account_keys: Vec<Pubkey>,
    pub recent_blockhash: Hash,
    pub instructions: Vec<CompiledInstruction>,
}

struct KeyEntry {
    pubkey: Pubkey,
    is_signer: bool,
    is_writable: bool,
}

impl Message {
    /// Compile `instructions` with `payer` as fee payer.
    pub fn new(
        instructions: &[Instruction],
        payer: &Pubkey,
        recent_blockhash: Hash,
    ) -> Result<Self, MessageError> {
        let mut entries: Vec<KeyEntry> = vec![KeyEntry {
            pubkey: *payer,
            is_signer: true,
            is_writable: true,
        }];
        let mut upsert = |pubkey: Pubkey, is_signer: bool, is_writable: bool| {
            match entries.iter_mut().find(|e| e.pubkey == pubkey) {
                Some(e) => {
                    e.is_signer |= is_signer;
                    e.is_writable |= is_writable;
                }
                None => entries.push(KeyEntry {
                    pubkey,
                    is_signer,
                    is_writable,
                }),
            }
        };
        for ix in instructions {
            for meta in &ix.accounts {
                upsert(meta.pubkey, meta.is_signer, meta.is_writable);
            }
            upsert(ix.program_id, false, false);
        }

        // Stable sort keeps the payer first and first-seen order within groups.
        entries.sort_by_key(|e| match (e.is_signer, e.is_writable) {
            (true, true) => 0,
            (true, false) => 1,
            (false, true) => 2,
            (false, false) => 3,
        });
        if entries.len() > 256 {
            return Err(MessageError::TooManyAccounts(entries.len()));
        }

        let header = MessageHeader {
            num_required_signatures: entries.iter().filter(|e| e.is_signer).count() as u8,
            num_readonly_signed_accounts: entries
                .iter()
                .filter(|e| e.is_signer && !e.is_writable)
                .count() as u8,
            num_readonly_unsigned_accounts: entries
                .iter()
                .filter(|e| !e.is_signer && !e.is_writable)
                .count() as u8,
        };
        let account_keys: Vec<Pubkey> = entries.into_iter().map(|e| e.pubkey).collect();
        let index_of = |key: &Pubkey| {
            account_keys
                .iter()
                .position(|k| k == key)
                .map(|i| i as u8)
                .unwrap_or_default()
        };

        let instructions = instructions
            .iter()
            .map(|ix| CompiledInstruction {
                program_id_index: index_of(&ix.program_id),
                accounts: ix.accounts.iter().map(|m| index_of(&m.pubkey)).collect(),
                data: ix.data.clone(),
            })
            .collect();

        Ok(Self {
            header,
            account_keys,
            recent_blockhash,
            instructions,
        })
    }

    /// Keys that must sign, in signature order.
    pub fn signer_keys(&self) -> &[Pubkey] {
        &self.account_keys[..self.header.num_required_signatures as usize]
    }

    pub fn is_signer(&self, index: usize) -> bool {
        index < self.header.num_required_signatures as usize
    }

    pub fn is_writable(&self, index: usize) -> bool {
        let h = &self.header;
        let signed = h.num_required_signatures as usize;
        if index < signed {
            index < signed - h.num_readonly_signed_accounts as usize
        } else {
            index < self.account_keys.len() - h.num_readonly_unsigned_accounts as usize
        }
    }

    /// Wire encoding; these are the bytes signers sign.
    pub fn serialize(&self) -> Result<Vec<u8>, MessageError> {
        let mut buf = Vec::with_capacity(256);
        buf.push(self.header.num_required_signatures);
        buf.push(self.header.num_readonly_signed_accounts);
        buf.push(self.header.num_readonly_unsigned_accounts);

        encode_length(&mut buf, self.account_keys.len())?;
        for key in &self.account_keys {
            buf.extend_from_slice(key.as_ref());
        }
        buf.extend_from_slice(self.recent_blockhash.as_bytes());

        encode_length(&mut buf, self.instructions.len())?;
        for ix in &self.instructions {
            buf.push(ix.program_id_index);
            encode_length(&mut buf, ix.accounts.len())?;
            buf.extend_from_slice(&ix.accounts);
            encode_length(&mut buf, ix.data.len())?;
            buf.extend_from_slice(&ix.data);
        }
        Ok(buf)
    }
}
