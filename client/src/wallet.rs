//! # Wallet Signing
//!
//! The wallet is an external collaborator: it owns the secret key, shows the
//! user what they are about to sign, and may say no. The client only ever sees
//! it through [`WalletSigner`].
//!
//! [`Keypair`] implements the trait directly, which is what the terminal
//! front-end and the tests use.

use async_trait::async_trait;
use std::path::Path;
use thiserror::Error;

use crate::crypto::keys::{KeyError, Keypair, Pubkey, Signature};

#[derive(Debug, Error)]
pub enum WalletError {
    /// The user (or the device) refused to sign.
    #[error("signing request declined by the wallet")]
    Declined,

    /// The wallet's key is not among the transaction's required signers.
    #[error("wallet {0} is not a required signer of this transaction")]
    NotASigner(Pubkey),

    #[error("failed to encode message for signing: {0}")]
    Encoding(String),

    #[error("failed to load wallet keypair: {0}")]
    Keypair(#[from] KeyError),
}

/// Something that can sign on behalf of one public key.
#[async_trait]
pub trait WalletSigner: Send + Sync {
    fn pubkey(&self) -> Pubkey;

    async fn sign_message(&self, message: &[u8]) -> Result<Signature, WalletError>;
}

#[async_trait]
impl WalletSigner for Keypair {
    fn pubkey(&self) -> Pubkey {
        Keypair::pubkey(self)
    }

    async fn sign_message(&self, message: &[u8]) -> Result<Signature, WalletError> {
        Ok(Keypair::sign_message(self, message))
    }
}

/// Load a keypair file if it exists.
///
/// A missing file means "no wallet connected" and yields `Ok(None)`; a file
/// that exists but does not parse is an error.
pub fn load_keypair_file(path: impl AsRef<Path>) -> Result<Option<Keypair>, WalletError> {
    let path = path.as_ref();
    if !path.exists() {
        tracing::debug!(path = %path.display(), "no keypair file, wallet disconnected");
        return Ok(None);
    }
    let keypair = Keypair::read_json_file(path)?;
    tracing::debug!(owner = %keypair.pubkey(), "wallet keypair loaded");
    Ok(Some(keypair))
}
