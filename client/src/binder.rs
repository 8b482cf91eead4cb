//! # Connection Binder
//!
//! Turns a wallet session plus a cluster connection into a handle that can
//! read the owner's vault and submit instructions for it. No wallet means no
//! handle: [`bind`] returns [`Binding::Disconnected`], which is a normal
//! state and never an error.
//!
//! The handle holds only shared references to its collaborators. A new
//! session or connection means calling [`bind`] again; the old handle is
//! simply dropped.

use std::fmt;
use std::sync::Arc;
use thiserror::Error;

use crate::cluster::{ClusterError, Connection};
use crate::config::ProgramConfig;
use crate::crypto::keys::{Pubkey, Signature};
use crate::locator::{LocateError, VaultAddress, VaultLocator};
use crate::program::{instruction, InstructionError, StateError, VaultRecord};
use crate::transaction::{sign_transaction, Instruction, Message, MessageError, Transaction};
use crate::wallet::{WalletError, WalletSigner};

/// Whatever went wrong between the client and the chain.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error(transparent)]
    Wallet(#[from] WalletError),

    #[error(transparent)]
    Cluster(#[from] ClusterError),

    #[error(transparent)]
    Locate(#[from] LocateError),

    #[error("vault account unreadable: {0}")]
    State(#[from] StateError),

    #[error("failed to encode instruction: {0}")]
    Instruction(#[from] InstructionError),

    #[error("failed to compile transaction: {0}")]
    Message(#[from] MessageError),
}

impl ClientError {
    /// Name carried into failure notifications.
    pub fn category(&self) -> &str {
        match self {
            ClientError::Wallet(WalletError::Declined) => "SigningDeclined",
            ClientError::Wallet(_) => "WalletError",
            ClientError::Cluster(e) => e.category(),
            ClientError::Locate(_) => "LocateError",
            ClientError::State(_) => "DecodeError",
            ClientError::Instruction(_) | ClientError::Message(_) => "EncodingError",
        }
    }

    /// The program's `NotReached` rejection.
    pub fn is_time_lock_not_reached(&self) -> bool {
        match self {
            ClientError::Cluster(e) => e
                .program_error()
                .is_some_and(|p| p.is_time_lock_not_reached()),
            _ => false,
        }
    }
}

/// The wallet side of a session.
#[derive(Clone, Default)]
pub enum WalletSession {
    #[default]
    Disconnected,
    Connected(Arc<dyn WalletSigner>),
}

impl WalletSession {
    pub fn connected(signer: impl WalletSigner + 'static) -> Self {
        WalletSession::Connected(Arc::new(signer))
    }

    pub fn owner(&self) -> Option<Pubkey> {
        match self {
            WalletSession::Disconnected => None,
            WalletSession::Connected(signer) => Some(signer.pubkey()),
        }
    }
}

impl fmt::Debug for WalletSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WalletSession::Disconnected => f.write_str("Disconnected"),
            WalletSession::Connected(signer) => {
                f.debug_tuple("Connected").field(&signer.pubkey()).finish()
            }
        }
    }
}

/// Result of binding a session to a connection.
#[derive(Debug, Clone, Default)]
pub enum Binding {
    #[default]
    Disconnected,
    Connected(VaultClient),
}

impl Binding {
    pub fn client(&self) -> Option<&VaultClient> {
        match self {
            Binding::Disconnected => None,
            Binding::Connected(client) => Some(client),
        }
    }

    pub fn is_connected(&self) -> bool {
        matches!(self, Binding::Connected(_))
    }
}

/// Bind a wallet session to a connection.
pub fn bind(
    session: &WalletSession,
    connection: Arc<dyn Connection>,
    program: &ProgramConfig,
) -> Binding {
    match session {
        WalletSession::Disconnected => {
            tracing::debug!("no wallet session, client unbound");
            Binding::Disconnected
        }
        WalletSession::Connected(signer) => {
            let client = VaultClient::new(signer.clone(), connection, *program);
            tracing::debug!(owner = %client.owner(), "client bound");
            Binding::Connected(client)
        }
    }
}

/// What a vault read found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VaultLookup {
    Found(VaultRecord),
    NotFound,
}

/// A handle bound to one owner's vault.
#[derive(Clone)]
pub struct VaultClient {
    signer: Arc<dyn WalletSigner>,
    connection: Arc<dyn Connection>,
    program: ProgramConfig,
    locator: VaultLocator,
}

impl fmt::Debug for VaultClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VaultClient")
            .field("owner", &self.owner())
            .field("program", &self.program)
            .finish_non_exhaustive()
    }
}

impl VaultClient {
    pub fn new(
        signer: Arc<dyn WalletSigner>,
        connection: Arc<dyn Connection>,
        program: ProgramConfig,
    ) -> Self {
        Self {
            signer,
            connection,
            locator: VaultLocator::new(program.program_id),
            program,
        }
    }

    pub fn owner(&self) -> Pubkey {
        self.signer.pubkey()
    }

    pub fn program(&self) -> &ProgramConfig {
        &self.program
    }

    pub fn vault_address(&self) -> Result<VaultAddress, LocateError> {
        self.locator.locate(&self.owner())
    }

    /// Read the vault record. No account at the vault address is
    /// [`VaultLookup::NotFound`].
    pub async fn fetch_vault(&self) -> Result<VaultLookup, ClientError> {
        let vault = self.vault_address()?;
        let account = self
            .connection
            .get_account(&vault.address, self.program.commitment)
            .await?;
        let Some(account) = account else {
            tracing::debug!(vault = %vault.address, "no vault account");
            return Ok(VaultLookup::NotFound);
        };
        let record = VaultRecord::decode_account(
            &vault.address,
            &account.owner,
            &self.program.program_id,
            &account.data,
        )?;
        tracing::debug!(vault = %vault.address, ?record, "vault fetched");
        Ok(VaultLookup::Found(record))
    }

    /// Lock `amount_lamports` for `duration_secs` seconds.
    pub async fn initialize(
        &self,
        duration_secs: i64,
        amount_lamports: u64,
    ) -> Result<Signature, ClientError> {
        let owner = self.owner();
        let vault = self.vault_address()?;
        let ix = instruction::initialize(
            &self.program.program_id,
            &owner,
            &vault.address,
            duration_secs,
            amount_lamports,
        )?;
        tracing::info!(%owner, vault = %vault.address, duration_secs, amount_lamports, "submitting initialize");
        self.submit(ix).await
    }

    /// Close the vault back into the owner's account.
    pub async fn unlock(&self) -> Result<Signature, ClientError> {
        let owner = self.owner();
        let vault = self.vault_address()?;
        let ix = instruction::unlock(&self.program.program_id, &owner, &vault.address)?;
        tracing::info!(%owner, vault = %vault.address, "submitting unlock");
        self.submit(ix).await
    }

    async fn submit(&self, ix: Instruction) -> Result<Signature, ClientError> {
        let commitment = self.program.commitment;
        let blockhash = self.connection.latest_blockhash(commitment).await?;
        let message = Message::new(&[ix], &self.owner(), blockhash)?;
        let mut tx = Transaction::new_unsigned(message);
        sign_transaction(&mut tx, self.signer.as_ref()).await?;

        match self.connection.send_and_confirm(&tx, commitment).await {
            Ok(signature) => {
                tracing::info!(%signature, %commitment, "transaction confirmed");
                Ok(signature)
            }
            Err(e) => {
                tracing::warn!(error = %e, "transaction failed");
                Err(e.into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::LocalCluster;
    use crate::config::LAMPORTS_PER_SOL;
    use crate::crypto::keys::Keypair;
    use crate::program::ProgramError;
    use async_trait::async_trait;

    struct Refuses(Keypair);

    #[async_trait]
    impl WalletSigner for Refuses {
        fn pubkey(&self) -> Pubkey {
            self.0.pubkey()
        }

        async fn sign_message(&self, _message: &[u8]) -> Result<Signature, WalletError> {
            Err(WalletError::Declined)
        }
    }

    fn connected(cluster: &Arc<LocalCluster>, signer: impl WalletSigner + 'static) -> VaultClient {
        let session = WalletSession::connected(signer);
        match bind(&session, cluster.clone(), &ProgramConfig::default()) {
            Binding::Connected(client) => client,
            Binding::Disconnected => panic!("expected a bound client"),
        }
    }

    #[test]
    fn disconnected_session_binds_to_nothing() {
        let cluster: Arc<dyn Connection> = Arc::new(LocalCluster::new());
        let binding = bind(&WalletSession::Disconnected, cluster, &ProgramConfig::default());
        assert!(!binding.is_connected());
        assert!(binding.client().is_none());
    }

    #[tokio::test]
    async fn fetch_distinguishes_absent_from_present() {
        let cluster = Arc::new(LocalCluster::new());
        let user = Keypair::generate();
        cluster.airdrop(&user.pubkey(), 5 * LAMPORTS_PER_SOL);
        let client = connected(&cluster, user);

        assert_eq!(client.fetch_vault().await.unwrap(), VaultLookup::NotFound);
        client.initialize(60, LAMPORTS_PER_SOL).await.unwrap();
        match client.fetch_vault().await.unwrap() {
            VaultLookup::Found(record) => {
                assert_eq!(record.amount, LAMPORTS_PER_SOL);
                assert_eq!(record.end_clock, 60);
                assert_eq!(record.bump, client.vault_address().unwrap().bump);
            }
            VaultLookup::NotFound => panic!("vault should exist"),
        }
    }

    #[tokio::test]
    async fn foreign_account_at_vault_address_is_an_error() {
        let cluster = Arc::new(LocalCluster::new());
        let user = Keypair::generate();
        let client = connected(&cluster, user);
        cluster.airdrop(&client.vault_address().unwrap().address, 1);

        let err = client.fetch_vault().await.unwrap_err();
        assert!(matches!(err, ClientError::State(StateError::WrongOwner { .. })));
        assert_eq!(err.category(), "DecodeError");
    }

    #[tokio::test]
    async fn declined_signature_is_categorized() {
        let cluster = Arc::new(LocalCluster::new());
        let client = connected(&cluster, Refuses(Keypair::generate()));
        let err = client.initialize(60, 1).await.unwrap_err();
        assert_eq!(err.category(), "SigningDeclined");
        assert!(!err.is_time_lock_not_reached());
    }

    #[test]
    fn time_lock_classification() {
        let err = ClientError::from(ClusterError::Program(ProgramError::time_lock_not_reached()));
        assert!(err.is_time_lock_not_reached());
        assert_eq!(err.category(), "NotReached");

        let err = ClientError::from(ClusterError::Program(ProgramError::from_code(3012)));
        assert!(!err.is_time_lock_not_reached());
    }
}
