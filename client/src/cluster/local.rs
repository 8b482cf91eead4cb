//! # In-Process Cluster
//!
//! A [`Connection`] backed by an in-memory ledger that behaves like a
//! single-validator cluster with the time-vault program deployed. It exists so
//! the lifecycle can be exercised end to end without a validator:
//!
//! - signatures, blockhash recency and duplicate submissions are checked;
//! - a 5000-lamport fee per signature is charged to the fee payer;
//! - `initialize` creates a rent-exempt 256-byte vault account funded with
//!   rent plus the locked amount;
//! - `unlock` enforces `start_clock + end_clock <= now` and closes the vault
//!   back into the owner;
//! - the chain clock is settable, and the cluster can be taken offline or told
//!   to reject the next submission.
//!
//! A failing transaction leaves the ledger untouched, as a preflight
//! simulation would.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet, VecDeque};

use super::{Account, ClusterError, Connection};
use crate::config::{
    program_id, rent_exempt_minimum, Commitment, LAMPORTS_PER_SIGNATURE, SYSTEM_PROGRAM_ID,
    VAULT_ACCOUNT_SPACE, VAULT_SEED,
};
use crate::crypto::hash::sha256_concat;
use crate::crypto::keys::{Hash, Pubkey, Signature};
use crate::crypto::pda::try_find_program_address;
use crate::program::{InitializeArgs, ProgramError, VaultInstruction, VaultRecord};
use crate::transaction::{CompiledInstruction, Transaction};

/// How many recent blockhashes stay valid.
const MAX_RECENT_BLOCKHASHES: usize = 150;

struct Ledger {
    accounts: HashMap<Pubkey, Account>,
    unix_timestamp: i64,
    slot: u64,
    recent_blockhashes: VecDeque<Hash>,
    processed: HashSet<Signature>,
    offline: bool,
    reject_next: Option<String>,
}

impl Ledger {
    fn latest_blockhash(&self) -> Hash {
        self.recent_blockhashes.back().copied().unwrap_or_default()
    }

    fn advance_slot(&mut self) {
        self.slot += 1;
        let next = sha256_concat(&[
            self.latest_blockhash().as_bytes(),
            &self.slot.to_le_bytes(),
        ]);
        self.recent_blockhashes.push_back(Hash::new_from_array(next));
        while self.recent_blockhashes.len() > MAX_RECENT_BLOCKHASHES {
            self.recent_blockhashes.pop_front();
        }
    }

    fn check_online(&self) -> Result<(), ClusterError> {
        if self.offline {
            return Err(ClusterError::Unavailable("local cluster is offline".into()));
        }
        Ok(())
    }
}

/// An in-memory cluster running the time-vault program.
pub struct LocalCluster {
    program_id: Pubkey,
    ledger: Mutex<Ledger>,
}

impl Default for LocalCluster {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalCluster {
    /// A fresh ledger with the chain clock at the current wall-clock second.
    pub fn new() -> Self {
        Self::with_program_id(program_id())
    }

    pub fn with_program_id(program_id: Pubkey) -> Self {
        let mut ledger = Ledger {
            accounts: HashMap::new(),
            unix_timestamp: chrono::Utc::now().timestamp(),
            slot: 0,
            recent_blockhashes: VecDeque::new(),
            processed: HashSet::new(),
            offline: false,
            reject_next: None,
        };
        ledger.advance_slot();
        Self {
            program_id,
            ledger: Mutex::new(ledger),
        }
    }

    pub fn program_id(&self) -> Pubkey {
        self.program_id
    }

    /// Credit `lamports` to `to`, creating a system account if needed.
    pub fn airdrop(&self, to: &Pubkey, lamports: u64) {
        let mut ledger = self.ledger.lock();
        let account = ledger.accounts.entry(*to).or_insert_with(|| Account {
            lamports: 0,
            owner: SYSTEM_PROGRAM_ID,
            data: Vec::new(),
            executable: false,
        });
        account.lamports = account.lamports.saturating_add(lamports);
        tracing::debug!(%to, lamports, "airdrop");
    }

    pub fn balance(&self, address: &Pubkey) -> u64 {
        self.ledger
            .lock()
            .accounts
            .get(address)
            .map(|a| a.lamports)
            .unwrap_or(0)
    }

    pub fn account(&self, address: &Pubkey) -> Option<Account> {
        self.ledger.lock().accounts.get(address).cloned()
    }

    /// Chain clock, unix seconds.
    pub fn unix_timestamp(&self) -> i64 {
        self.ledger.lock().unix_timestamp
    }

    pub fn set_unix_timestamp(&self, unix_timestamp: i64) {
        self.ledger.lock().unix_timestamp = unix_timestamp;
    }

    pub fn advance_clock(&self, seconds: i64) {
        let mut ledger = self.ledger.lock();
        ledger.unix_timestamp = ledger.unix_timestamp.saturating_add(seconds);
    }

    /// While offline every call fails with [`ClusterError::Unavailable`].
    pub fn set_offline(&self, offline: bool) {
        self.ledger.lock().offline = offline;
    }

    /// Reject the next submission with [`ClusterError::Rejected`].
    pub fn reject_next_submission(&self, reason: impl Into<String>) {
        self.ledger.lock().reject_next = Some(reason.into());
    }

    fn process(&self, ledger: &mut Ledger, tx: &Transaction) -> Result<Signature, ClusterError> {
        if let Some(reason) = ledger.reject_next.take() {
            return Err(ClusterError::Rejected(reason));
        }
        let signature = *tx
            .signature()
            .ok_or_else(|| ClusterError::Rejected("MissingSignatureForFee".into()))?;
        let verified = tx
            .verify()
            .map_err(|e| ClusterError::Rejected(e.to_string()))?;
        if !verified {
            return Err(ClusterError::Rejected("SignatureFailure".into()));
        }
        if !ledger
            .recent_blockhashes
            .contains(&tx.message.recent_blockhash)
        {
            return Err(ClusterError::Rejected("BlockhashNotFound".into()));
        }
        if ledger.processed.contains(&signature) {
            return Err(ClusterError::Rejected("AlreadyProcessed".into()));
        }

        let mut accounts = ledger.accounts.clone();
        let payer = tx
            .message
            .account_keys
            .first()
            .copied()
            .ok_or_else(|| ClusterError::Rejected("MissingFeePayer".into()))?;
        let fee = LAMPORTS_PER_SIGNATURE * tx.signatures.len() as u64;
        match accounts.get_mut(&payer) {
            Some(account) if account.lamports >= fee => account.lamports -= fee,
            _ => return Err(ClusterError::Rejected("InsufficientFundsForFee".into())),
        }

        for ix in &tx.message.instructions {
            self.execute(&mut accounts, ledger.unix_timestamp, tx, ix)?;
        }

        ledger.accounts = accounts;
        ledger.processed.insert(signature);
        ledger.advance_slot();
        Ok(signature)
    }

    fn execute(
        &self,
        accounts: &mut HashMap<Pubkey, Account>,
        now: i64,
        tx: &Transaction,
        ix: &CompiledInstruction,
    ) -> Result<(), ClusterError> {
        let keys = &tx.message.account_keys;
        let key_at = |i: u8| {
            keys.get(i as usize)
                .copied()
                .ok_or_else(|| ClusterError::Rejected("InvalidAccountIndex".into()))
        };
        let program = key_at(ix.program_id_index)?;
        if program != self.program_id {
            return Err(ClusterError::Rejected(format!(
                "ProgramAccountNotFound: {}",
                program
            )));
        }
        let instruction = VaultInstruction::decode(&ix.data)
            .map_err(|_| ClusterError::Program(ProgramError::from_code(101)))?;

        if ix.accounts.len() < 3 {
            return Err(ClusterError::Rejected("NotEnoughAccountKeys".into()));
        }
        let user = key_at(ix.accounts[0])?;
        let vault = key_at(ix.accounts[1])?;
        if !tx.message.is_signer(ix.accounts[0] as usize) {
            return Err(ClusterError::Program(ProgramError::from_code(3010)));
        }
        let (expected, bump) =
            try_find_program_address(&[VAULT_SEED, user.as_ref()], &self.program_id)
                .ok_or_else(|| ClusterError::Program(ProgramError::from_code(2006)))?;
        if vault != expected {
            return Err(ClusterError::Program(ProgramError::from_code(2006)));
        }

        match instruction {
            VaultInstruction::Initialize(args) => {
                Self::initialize(accounts, now, &self.program_id, user, vault, bump, args)
            }
            VaultInstruction::Unlock => Self::unlock(accounts, now, &self.program_id, user, vault),
        }
    }

    fn initialize(
        accounts: &mut HashMap<Pubkey, Account>,
        now: i64,
        program_id: &Pubkey,
        user: Pubkey,
        vault: Pubkey,
        bump: u8,
        args: InitializeArgs,
    ) -> Result<(), ClusterError> {
        if accounts.contains_key(&vault) {
            return Err(ClusterError::Program(ProgramError::from_code(0)));
        }
        let insufficient = || ClusterError::Program(ProgramError::from_code(1));
        let required = rent_exempt_minimum(VAULT_ACCOUNT_SPACE)
            .checked_add(args.nbr_lamports)
            .ok_or_else(insufficient)?;
        let payer = accounts.get_mut(&user).ok_or_else(insufficient)?;
        payer.lamports = payer.lamports.checked_sub(required).ok_or_else(insufficient)?;

        let record = VaultRecord {
            start_clock: now,
            end_clock: args.end_clock,
            amount: args.nbr_lamports,
            bump,
        };
        let data = record
            .encode()
            .map_err(|e| ClusterError::Decode(e.to_string()))?;
        accounts.insert(
            vault,
            Account {
                lamports: required,
                owner: *program_id,
                data,
                executable: false,
            },
        );
        tracing::debug!(
            %user,
            %vault,
            lamports = args.nbr_lamports,
            end_clock = args.end_clock,
            "vault initialized"
        );
        Ok(())
    }

    fn unlock(
        accounts: &mut HashMap<Pubkey, Account>,
        now: i64,
        program_id: &Pubkey,
        user: Pubkey,
        vault: Pubkey,
    ) -> Result<(), ClusterError> {
        let account = accounts
            .get(&vault)
            .filter(|a| a.owner == *program_id)
            .ok_or_else(|| ClusterError::Program(ProgramError::from_code(3012)))?;
        let record = VaultRecord::decode(&account.data)
            .map_err(|_| ClusterError::Program(ProgramError::from_code(3002)))?;

        if record.start_clock.saturating_add(record.end_clock) > now {
            tracing::debug!(%vault, now, "time lock not reached yet");
            return Err(ClusterError::Program(ProgramError::time_lock_not_reached()));
        }

        let released = account.lamports;
        accounts.remove(&vault);
        let owner = accounts.entry(user).or_insert_with(|| Account {
            lamports: 0,
            owner: SYSTEM_PROGRAM_ID,
            data: Vec::new(),
            executable: false,
        });
        owner.lamports = owner.lamports.saturating_add(released);
        tracing::debug!(%user, %vault, released, "vault closed");
        Ok(())
    }
}

#[async_trait]
impl Connection for LocalCluster {
    async fn get_account(
        &self,
        address: &Pubkey,
        _commitment: Commitment,
    ) -> Result<Option<Account>, ClusterError> {
        let ledger = self.ledger.lock();
        ledger.check_online()?;
        Ok(ledger.accounts.get(address).cloned())
    }

    async fn latest_blockhash(&self, _commitment: Commitment) -> Result<Hash, ClusterError> {
        let ledger = self.ledger.lock();
        ledger.check_online()?;
        Ok(ledger.latest_blockhash())
    }

    async fn send_and_confirm(
        &self,
        tx: &Transaction,
        _commitment: Commitment,
    ) -> Result<Signature, ClusterError> {
        let mut ledger = self.ledger.lock();
        ledger.check_online()?;
        self.process(&mut ledger, tx)
    }
}
