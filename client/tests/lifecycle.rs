//! Lifecycle integration tests.
//!
//! Each test drives a `VaultController` against its own in-process cluster.
//! The controller clock and the chain clock start on the same whole second
//! and are advanced together, so unlock instants can be compared exactly.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, TimeZone, Utc};
use tokio::sync::Notify;

use timevault_client::binder::{bind, Binding, ClientError, WalletSession};
use timevault_client::clock::FixedClock;
use timevault_client::cluster::{Account, ClusterError, Connection, LocalCluster};
use timevault_client::config::{
    rent_exempt_minimum, Commitment, ProgramConfig, LAMPORTS_PER_SIGNATURE, LAMPORTS_PER_SOL,
    VAULT_ACCOUNT_SPACE,
};
use timevault_client::crypto::keys::{Hash, Keypair, Pubkey, Signature};
use timevault_client::lifecycle::{
    format_instant, ControllerError, Field, InitRequest, Phase, VaultController,
};
use timevault_client::notify::RecordingNotifier;
use timevault_client::transaction::Transaction;
use timevault_client::wallet::{WalletError, WalletSigner};

const T0: i64 = 1_700_000_000;

// ---------------------------------------------------------------------------
// Test Helpers
// ---------------------------------------------------------------------------

struct Harness {
    cluster: Arc<LocalCluster>,
    clock: Arc<FixedClock>,
    notifier: Arc<RecordingNotifier>,
    controller: Arc<VaultController>,
    owner: Pubkey,
}

impl Harness {
    fn with_connection(
        signer: Option<Arc<dyn WalletSigner>>,
        connection: Arc<dyn Connection>,
        cluster: Arc<LocalCluster>,
    ) -> Self {
        cluster.set_unix_timestamp(T0);
        let clock = Arc::new(FixedClock::at_unix(T0).unwrap());
        let notifier = Arc::new(RecordingNotifier::new());
        let owner = signer.as_ref().map(|s| s.pubkey()).unwrap_or_default();
        if signer.is_some() {
            cluster.airdrop(&owner, 10 * LAMPORTS_PER_SOL);
        }
        let session = match signer {
            Some(signer) => WalletSession::Connected(signer),
            None => WalletSession::Disconnected,
        };
        let binding = bind(&session, connection, &ProgramConfig::default());
        let controller = Arc::new(VaultController::new(binding, clock.clone(), notifier.clone()));
        Self {
            cluster,
            clock,
            notifier,
            controller,
            owner,
        }
    }

    fn new() -> Self {
        let cluster = Arc::new(LocalCluster::new());
        Self::with_connection(Some(Arc::new(Keypair::generate())), cluster.clone(), cluster)
    }

    fn disconnected() -> Self {
        let cluster = Arc::new(LocalCluster::new());
        Self::with_connection(None, cluster.clone(), cluster)
    }

    fn advance(&self, seconds: i64) {
        self.cluster.advance_clock(seconds);
        self.clock.advance(Duration::seconds(seconds));
    }

    fn in_seconds(&self, seconds: i64) -> chrono::DateTime<Utc> {
        Utc.timestamp_opt(T0, 0).unwrap() + Duration::seconds(seconds)
    }

    async fn locked(&self, amount: &str, seconds: i64) {
        assert_eq!(self.controller.refresh().await.unwrap(), Phase::Uninitialized);
        self.controller
            .initiate_vault(&InitRequest::new(amount, self.in_seconds(seconds)))
            .await
            .unwrap();
    }
}

/// A wallet that refuses every signing request.
struct DecliningWallet(Keypair);

#[async_trait]
impl WalletSigner for DecliningWallet {
    fn pubkey(&self) -> Pubkey {
        self.0.pubkey()
    }

    async fn sign_message(&self, _message: &[u8]) -> Result<Signature, WalletError> {
        Err(WalletError::Declined)
    }
}

/// Holds every account read until the gate is opened.
struct GatedConnection {
    inner: Arc<LocalCluster>,
    gate: Arc<Notify>,
}

#[async_trait]
impl Connection for GatedConnection {
    async fn get_account(
        &self,
        address: &Pubkey,
        commitment: Commitment,
    ) -> Result<Option<Account>, ClusterError> {
        self.gate.notified().await;
        self.inner.get_account(address, commitment).await
    }

    async fn latest_blockhash(&self, commitment: Commitment) -> Result<Hash, ClusterError> {
        self.inner.latest_blockhash(commitment).await
    }

    async fn send_and_confirm(
        &self,
        tx: &Transaction,
        commitment: Commitment,
    ) -> Result<Signature, ClusterError> {
        self.inner.send_and_confirm(tx, commitment).await
    }
}

fn gated() -> (Harness, Arc<Notify>) {
    let cluster = Arc::new(LocalCluster::new());
    let gate = Arc::new(Notify::new());
    let connection = Arc::new(GatedConnection {
        inner: cluster.clone(),
        gate: gate.clone(),
    });
    let harness =
        Harness::with_connection(Some(Arc::new(Keypair::generate())), connection, cluster);
    (harness, gate)
}

async fn wait_until_busy(controller: &VaultController) {
    while !controller.is_busy() {
        tokio::task::yield_now().await;
    }
}

// ---------------------------------------------------------------------------
// Scenarios
// ---------------------------------------------------------------------------

#[tokio::test]
async fn no_wallet_stays_loading() {
    let h = Harness::disconnected();
    for _ in 0..3 {
        assert_eq!(h.controller.refresh().await.unwrap(), Phase::Loading);
    }
    assert_eq!(h.controller.phase(), Phase::Loading);
    assert!(h.controller.view().is_none());
}

#[tokio::test]
async fn wallet_without_vault_is_uninitialized() {
    let h = Harness::new();
    assert_eq!(h.controller.phase(), Phase::Loading);
    assert_eq!(h.controller.refresh().await.unwrap(), Phase::Uninitialized);
    assert!(h.notifier.notifications().is_empty());
}

#[tokio::test]
async fn initiate_locks_one_sol_for_a_minute() {
    let h = Harness::new();
    h.locked("1", 60).await;

    let record = match h.controller.phase() {
        Phase::Initialized(record) => record,
        other => panic!("expected Initialized, got {}", other),
    };
    assert_eq!(record.start_clock, T0);
    assert_eq!(record.end_clock, 60);
    assert_eq!(record.amount, LAMPORTS_PER_SOL);

    let view = h.controller.view().unwrap();
    assert_eq!(view.unlock_at, h.in_seconds(60));
    assert_eq!(view.amount, "1");
    assert!(!view.unlockable);

    let note = h.notifier.last().unwrap();
    assert_eq!(note.title, "Vault Initialized");
    assert_eq!(
        note.description,
        format!("Amount: 1 SOL, Unlock date: {}", format_instant(h.in_seconds(60)))
    );
    assert!(!note.is_destructive());

    assert_eq!(
        h.cluster.balance(&h.owner),
        10 * LAMPORTS_PER_SOL
            - LAMPORTS_PER_SOL
            - rent_exempt_minimum(VAULT_ACCOUNT_SPACE)
            - LAMPORTS_PER_SIGNATURE
    );
}

#[tokio::test]
async fn early_release_is_time_locked() {
    let h = Harness::new();
    h.locked("1", 60).await;
    h.advance(59);

    let err = h.controller.release_vault().await.unwrap_err();
    match &err {
        ControllerError::Client(e) => {
            assert!(e.is_time_lock_not_reached());
            assert_eq!(
                e.to_string(),
                "AnchorError occurred. Error Code: NotReached. Error Number: 6000. Error Message: Time Lock Not Reached."
            );
        }
        other => panic!("unexpected error {:?}", other),
    }
    assert!(matches!(h.controller.phase(), Phase::Initialized(_)));

    let note = h.notifier.last().unwrap();
    assert_eq!(note.title, "Vault still locked");
    assert!(note.is_destructive());
    assert!(note.description.contains(&format_instant(h.in_seconds(60))));
}

#[tokio::test]
async fn release_after_unlock_instant_returns_funds() {
    let h = Harness::new();
    let before = h.cluster.balance(&h.owner);
    h.locked("1.5", 60).await;
    h.advance(60);
    assert!(h.controller.view().unwrap().unlockable);

    h.controller.release_vault().await.unwrap();
    assert_eq!(h.controller.phase(), Phase::Uninitialized);
    assert_eq!(h.cluster.balance(&h.owner), before - 2 * LAMPORTS_PER_SIGNATURE);

    let note = h.notifier.last().unwrap();
    assert_eq!(note.title, "Success");
    assert_eq!(note.description, format!("1.5 $SOL unlocked to {}", h.owner));

    assert_eq!(h.controller.refresh().await.unwrap(), Phase::Uninitialized);
}

#[tokio::test]
async fn vault_can_be_reopened_after_release() {
    let h = Harness::new();
    h.locked("1", 10).await;
    h.advance(10);
    h.controller.release_vault().await.unwrap();

    h.controller
        .initiate_vault(&InitRequest::new("2", h.in_seconds(100)))
        .await
        .unwrap();
    assert_eq!(h.controller.view().unwrap().amount, "2");
}

// ---------------------------------------------------------------------------
// Validation and guards
// ---------------------------------------------------------------------------

#[tokio::test]
async fn invalid_input_blocks_submission() {
    let h = Harness::new();
    h.controller.refresh().await.unwrap();
    let balance = h.cluster.balance(&h.owner);

    let err = h
        .controller
        .initiate_vault(&InitRequest::new("0", h.in_seconds(0)))
        .await
        .unwrap_err();
    match err {
        ControllerError::Validation(errors) => {
            assert_eq!(errors.fields(), vec![Field::Amount, Field::UnlockDate]);
        }
        other => panic!("unexpected error {:?}", other),
    }
    assert_eq!(h.controller.phase(), Phase::Uninitialized);
    assert_eq!(h.cluster.balance(&h.owner), balance);
    assert!(h.notifier.notifications().is_empty());
}

#[tokio::test]
async fn actions_without_wallet_are_refused() {
    let h = Harness::disconnected();
    assert!(matches!(
        h.controller.release_vault().await,
        Err(ControllerError::NotBound)
    ));
    assert!(matches!(
        h.controller
            .initiate_vault(&InitRequest::new("1", h.in_seconds(60)))
            .await,
        Err(ControllerError::NotBound)
    ));
}

#[tokio::test]
async fn actions_check_the_phase() {
    let h = Harness::new();
    let err = h
        .controller
        .initiate_vault(&InitRequest::new("1", h.in_seconds(60)))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ControllerError::InvalidPhase {
            phase: "Loading",
            ..
        }
    ));

    h.controller.refresh().await.unwrap();
    assert!(matches!(
        h.controller.release_vault().await,
        Err(ControllerError::InvalidPhase {
            phase: "Uninitialized",
            ..
        })
    ));
}

// ---------------------------------------------------------------------------
// Failures
// ---------------------------------------------------------------------------

#[tokio::test]
async fn network_failure_does_not_flip_phase() {
    let h = Harness::new();
    h.controller.refresh().await.unwrap();
    h.cluster.set_offline(true);

    for _ in 0..3 {
        let err = h.controller.refresh().await.unwrap_err();
        assert!(matches!(
            err,
            ControllerError::Client(ClientError::Cluster(ClusterError::Unavailable(_)))
        ));
        assert_eq!(h.controller.phase(), Phase::Uninitialized);
    }
}

#[tokio::test]
async fn declined_signing_is_reported() {
    let cluster = Arc::new(LocalCluster::new());
    let wallet: Arc<dyn WalletSigner> = Arc::new(DecliningWallet(Keypair::generate()));
    let h = Harness::with_connection(Some(wallet), cluster.clone(), cluster);
    h.controller.refresh().await.unwrap();

    let err = h
        .controller
        .initiate_vault(&InitRequest::new("1", h.in_seconds(60)))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ControllerError::Client(ClientError::Wallet(WalletError::Declined))
    ));
    assert_eq!(h.controller.phase(), Phase::Uninitialized);

    let note = h.notifier.last().unwrap();
    assert_eq!(note.title, "Failed to init vault");
    assert_eq!(note.description, "error: SigningDeclined");
    assert!(note.is_destructive());
}

#[tokio::test]
async fn program_rejection_carries_category() {
    let h = Harness::new();
    h.controller.refresh().await.unwrap();

    h.controller
        .initiate_vault(&InitRequest::new("50", h.in_seconds(60)))
        .await
        .unwrap_err();
    assert_eq!(h.controller.phase(), Phase::Uninitialized);
    assert_eq!(
        h.notifier.last().unwrap().description,
        "error: ResultWithNegativeLamports"
    );
}

#[tokio::test]
async fn rejected_unlock_keeps_vault() {
    let h = Harness::new();
    h.locked("1", 60).await;
    h.advance(60);
    h.cluster.reject_next_submission("BlockhashNotFound");

    h.controller.release_vault().await.unwrap_err();
    assert!(matches!(h.controller.phase(), Phase::Initialized(_)));
    let note = h.notifier.last().unwrap();
    assert_eq!(note.title, "Failed to unlock vault");
    assert_eq!(note.description, "error: TransactionError");
}

// ---------------------------------------------------------------------------
// Concurrency
// ---------------------------------------------------------------------------

#[tokio::test]
async fn second_request_while_in_flight_is_busy() {
    let (h, gate) = gated();
    let first = tokio::spawn({
        let controller = h.controller.clone();
        async move { controller.refresh().await }
    });
    wait_until_busy(&h.controller).await;

    assert!(matches!(
        h.controller.refresh().await,
        Err(ControllerError::Busy)
    ));
    assert!(matches!(
        h.controller
            .initiate_vault(&InitRequest::new("1", h.in_seconds(60)))
            .await,
        Err(ControllerError::Busy)
    ));

    gate.notify_one();
    assert_eq!(first.await.unwrap().unwrap(), Phase::Uninitialized);
    assert!(!h.controller.is_busy());
}

#[tokio::test]
async fn result_after_teardown_is_discarded() {
    let (h, gate) = gated();
    let pending = tokio::spawn({
        let controller = h.controller.clone();
        async move { controller.refresh().await }
    });
    wait_until_busy(&h.controller).await;

    h.controller.teardown();
    gate.notify_one();
    assert!(matches!(
        pending.await.unwrap(),
        Err(ControllerError::Detached)
    ));
    assert_eq!(h.controller.phase(), Phase::Loading);
    assert!(matches!(
        h.controller.refresh().await,
        Err(ControllerError::Detached)
    ));
}

#[tokio::test]
async fn result_after_rebind_is_discarded() {
    let (h, gate) = gated();
    let pending = tokio::spawn({
        let controller = h.controller.clone();
        async move { controller.refresh().await }
    });
    wait_until_busy(&h.controller).await;

    h.controller.rebind(Binding::Disconnected);
    gate.notify_one();
    assert!(matches!(
        pending.await.unwrap(),
        Err(ControllerError::Detached)
    ));
    assert_eq!(h.controller.phase(), Phase::Loading);
    assert_eq!(h.controller.refresh().await.unwrap(), Phase::Loading);
}

#[tokio::test]
async fn rebound_wallet_is_not_blocked_by_stale_request() {
    let (h, gate) = gated();
    let pending = tokio::spawn({
        let controller = h.controller.clone();
        async move { controller.refresh().await }
    });
    wait_until_busy(&h.controller).await;

    let other = WalletSession::Connected(Arc::new(Keypair::generate()));
    h.controller
        .rebind(bind(&other, h.cluster.clone(), &ProgramConfig::default()));
    assert!(!h.controller.is_busy());
    assert_eq!(h.controller.refresh().await.unwrap(), Phase::Uninitialized);

    gate.notify_one();
    assert!(matches!(
        pending.await.unwrap(),
        Err(ControllerError::Detached)
    ));
    assert_eq!(h.controller.phase(), Phase::Uninitialized);
    assert!(!h.controller.is_busy());
}

#[tokio::test]
async fn stale_request_does_not_release_a_newer_one() {
    let (h, gate) = gated();
    let stale = tokio::spawn({
        let controller = h.controller.clone();
        async move { controller.refresh().await }
    });
    wait_until_busy(&h.controller).await;

    // Same gated connection, so the new read also waits.
    h.controller.rebind(h.controller.binding());
    let current = tokio::spawn({
        let controller = h.controller.clone();
        async move { controller.refresh().await }
    });
    wait_until_busy(&h.controller).await;

    gate.notify_one();
    let first = stale.await.unwrap();
    assert!(matches!(first, Err(ControllerError::Detached)));
    assert!(h.controller.is_busy());

    gate.notify_one();
    assert_eq!(current.await.unwrap().unwrap(), Phase::Uninitialized);
    assert!(!h.controller.is_busy());
}
