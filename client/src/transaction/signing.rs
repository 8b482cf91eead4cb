//! Signed transactions.
//!
//! Signing is a separate step from compiling because the key may not be
//! local: the wallet collaborator can be a hardware device or a browser
//! extension that prompts the user and may refuse. The signature bytes are
//! over [`Message::serialize`].

use super::message::{encode_length, Message, MessageError};
use crate::crypto::keys::Signature;
use crate::wallet::{WalletError, WalletSigner};

/// A message plus one signature slot per required signer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    pub signatures: Vec<Signature>,
    pub message: Message,
}

impl Transaction {
    /// Wrap a message with zeroed signature slots.
    pub fn new_unsigned(message: Message) -> Self {
        let slots = message.header.num_required_signatures as usize;
        Self {
            signatures: vec![Signature::default(); slots],
            message,
        }
    }

    /// The fee payer's signature, which is also the transaction id.
    pub fn signature(&self) -> Option<&Signature> {
        self.signatures.first()
    }

    pub fn is_signed(&self) -> bool {
        self.signatures.iter().all(|s| *s != Signature::default())
    }

    /// Check every signature against its signer key.
    pub fn verify(&self) -> Result<bool, MessageError> {
        let bytes = self.message.serialize()?;
        Ok(self.signatures.len() == self.message.signer_keys().len()
            && self
                .signatures
                .iter()
                .zip(self.message.signer_keys())
                .all(|(sig, key)| sig.verify(key, &bytes)))
    }

    /// Wire encoding: `short_vec<signature> | message`.
    pub fn serialize(&self) -> Result<Vec<u8>, MessageError> {
        let mut buf = Vec::with_capacity(64 * self.signatures.len() + 256);
        encode_length(&mut buf, self.signatures.len())?;
        for sig in &self.signatures {
            buf.extend_from_slice(sig.as_bytes());
        }
        buf.extend_from_slice(&self.message.serialize()?);
        Ok(buf)
    }
}

/// Ask `wallet` to sign `tx` in the slot matching its key.
///
/// # Errors
///
/// [`WalletError::NotASigner`] if the wallet's key is not a required signer,
/// or whatever the wallet returns (most commonly [`WalletError::Declined`]).
pub async fn sign_transaction(
    tx: &mut Transaction,
    wallet: &dyn WalletSigner,
) -> Result<(), WalletError> {
    let owner = wallet.pubkey();
    let slot = tx
        .message
        .signer_keys()
        .iter()
        .position(|k| *k == owner)
        .ok_or(WalletError::NotASigner(owner))?;
    let bytes = tx
        .message
        .serialize()
        .map_err(|e| WalletError::Encoding(e.to_string()))?;
    tx.signatures[slot] = wallet.sign_message(&bytes).await?;
    Ok(())
}
