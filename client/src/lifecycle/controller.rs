//! # Vault Lifecycle Controller
//!
//! Owns the phase for one front-end instance and is the only thing that
//! changes it:
//!
//! ```text
//!            refresh (NotFound)            initiate_vault (confirmed)
//! Loading ─────────────────────► Uninitialized ─────────────────────► Initialized
//!    │                                 ▲                                  │
//!    └──── refresh (Found) ────────────┼──────────────────────────────────►
//!                                      └──────── release_vault (confirmed) ┘
//! ```
//!
//! Rules the controller enforces:
//!
//! - without a bound client nothing leaves `Loading`;
//! - a failed read or a rejected submission never changes the phase;
//! - one request at a time, further requests get [`ControllerError::Busy`];
//! - a result that arrives after [`VaultController::teardown`] or
//!   [`VaultController::rebind`] is dropped as [`ControllerError::Detached`].
//!
//! The state lock is never held across an `.await`.

use parking_lot::Mutex;
use std::sync::Arc;
use thiserror::Error;

use super::display::{format_instant, format_sol, unlock_instant, VaultView};
use super::phase::Phase;
use super::validation::{InitRequest, ValidatedInit, ValidationErrors};
use crate::binder::{Binding, ClientError, VaultClient, VaultLookup};
use crate::clock::Clock;
use crate::crypto::keys::Signature;
use crate::notify::{Notification, Notifier};
use crate::program::VaultRecord;

#[derive(Debug, Error)]
pub enum ControllerError {
    #[error("invalid input: {0}")]
    Validation(#[from] ValidationErrors),

    /// An action was invoked with no wallet bound.
    #[error("no wallet is bound")]
    NotBound,

    #[error("cannot {operation} while {phase}")]
    InvalidPhase {
        operation: &'static str,
        phase: &'static str,
    },

    #[error("another request is still in flight")]
    Busy,

    #[error(transparent)]
    Client(#[from] ClientError),

    /// The controller was torn down or rebound while the request ran.
    #[error("result discarded: controller detached")]
    Detached,
}

struct State {
    binding: Binding,
    phase: Phase,
    epoch: u64,
    /// Epoch of the request in flight. A request from an older epoch does
    /// not block the current binding.
    in_flight: Option<u64>,
    torn_down: bool,
}

impl State {
    fn is_busy(&self) -> bool {
        self.in_flight == Some(self.epoch)
    }
}

/// Clears the in-flight mark when dropped, including on cancellation, unless
/// a request from a newer binding has taken it over.
struct InFlight<'a> {
    state: &'a Mutex<State>,
    epoch: u64,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        let mut state = self.state.lock();
        if state.in_flight == Some(self.epoch) {
            state.in_flight = None;
        }
    }
}

struct Ticket<'a> {
    _guard: InFlight<'a>,
    epoch: u64,
    client: Option<VaultClient>,
    phase: Phase,
}

pub struct VaultController {
    state: Mutex<State>,
    clock: Arc<dyn Clock>,
    notifier: Arc<dyn Notifier>,
}

impl VaultController {
    pub fn new(binding: Binding, clock: Arc<dyn Clock>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            state: Mutex::new(State {
                binding,
                phase: Phase::Loading,
                epoch: 0,
                in_flight: None,
                torn_down: false,
            }),
            clock,
            notifier,
        }
    }

    pub fn phase(&self) -> Phase {
        self.state.lock().phase
    }

    pub fn is_busy(&self) -> bool {
        self.state.lock().is_busy()
    }

    pub fn binding(&self) -> Binding {
        self.state.lock().binding.clone()
    }

    /// Presentation values for the current vault, if there is one.
    pub fn view(&self) -> Option<VaultView> {
        let phase = self.phase();
        phase
            .record()
            .map(|record| VaultView::new(record, self.clock.now()))
    }

    /// Replace the bound client. The phase goes back to `Loading` and any
    /// request still running against the old binding is detached and no
    /// longer counts as in flight.
    pub fn rebind(&self, binding: Binding) {
        let mut state = self.state.lock();
        state.epoch += 1;
        state.binding = binding;
        state.phase = Phase::Loading;
        tracing::debug!(epoch = state.epoch, "controller rebound");
    }

    /// Stop accepting requests and drop any result still in flight.
    pub fn teardown(&self) {
        self.state.lock().torn_down = true;
        tracing::debug!("controller torn down");
    }

    fn begin(&self) -> Result<Ticket<'_>, ControllerError> {
        let mut state = self.state.lock();
        if state.torn_down {
            return Err(ControllerError::Detached);
        }
        if state.is_busy() {
            return Err(ControllerError::Busy);
        }
        state.in_flight = Some(state.epoch);
        Ok(Ticket {
            _guard: InFlight {
                state: &self.state,
                epoch: state.epoch,
            },
            epoch: state.epoch,
            client: state.binding.client().cloned(),
            phase: state.phase,
        })
    }

    /// Apply `phase` if the request that produced it is still current.
    fn commit(&self, epoch: u64, phase: Phase) -> Result<(), ControllerError> {
        let mut state = self.state.lock();
        if state.torn_down || state.epoch != epoch {
            return Err(ControllerError::Detached);
        }
        if state.phase != phase {
            tracing::info!(from = %state.phase, to = %phase, "phase transition");
        }
        state.phase = phase;
        Ok(())
    }

    fn is_current(&self, epoch: u64) -> bool {
        let state = self.state.lock();
        !state.torn_down && state.epoch == epoch
    }

    /// Read the vault and settle the phase.
    ///
    /// With no bound client this is a no-op that returns `Loading`. A read
    /// failure is returned and leaves the phase as it was.
    pub async fn refresh(&self) -> Result<Phase, ControllerError> {
        let ticket = self.begin()?;
        let Some(client) = ticket.client else {
            return Ok(ticket.phase);
        };

        let phase = match client.fetch_vault().await {
            Ok(VaultLookup::Found(record)) => Phase::Initialized(record),
            Ok(VaultLookup::NotFound) => Phase::Uninitialized,
            Err(e) => {
                if !self.is_current(ticket.epoch) {
                    return Err(ControllerError::Detached);
                }
                tracing::warn!(error = %e, phase = %ticket.phase, "vault fetch failed");
                return Err(e.into());
            }
        };
        self.commit(ticket.epoch, phase)?;
        Ok(phase)
    }

    /// Lock funds in a new vault. Only valid from `Uninitialized`.
    pub async fn initiate_vault(&self, request: &InitRequest) -> Result<Signature, ControllerError> {
        let ticket = self.begin()?;
        let client = ticket.client.ok_or(ControllerError::NotBound)?;
        if ticket.phase != Phase::Uninitialized {
            return Err(ControllerError::InvalidPhase {
                operation: "initialize",
                phase: ticket.phase.name(),
            });
        }
        let now = self.clock.now();
        let valid = request.validate(now)?;

        let signature = match client
            .initialize(valid.duration_secs, valid.amount_lamports)
            .await
        {
            Ok(signature) => signature,
            Err(e) => {
                if !self.is_current(ticket.epoch) {
                    return Err(ControllerError::Detached);
                }
                self.notifier.notify(Notification::failure(
                    "Failed to init vault",
                    format!("error: {}", e.category()),
                ));
                return Err(e.into());
            }
        };

        let record = match client.fetch_vault().await {
            Ok(VaultLookup::Found(record)) => record,
            other => {
                tracing::debug!(?other, "vault not readable yet, using submitted values");
                submitted_record(&client, &valid, now.timestamp())
            }
        };
        self.commit(ticket.epoch, Phase::Initialized(record))?;
        self.notifier.notify(Notification::success(
            "Vault Initialized",
            format!(
                "Amount: {} SOL, Unlock date: {}",
                format_sol(record.amount),
                format_instant(unlock_instant(&record))
            ),
        ));
        Ok(signature)
    }

    /// Release the vault back to its owner. Only valid from `Initialized`.
    pub async fn release_vault(&self) -> Result<Signature, ControllerError> {
        let ticket = self.begin()?;
        let client = ticket.client.ok_or(ControllerError::NotBound)?;
        let Phase::Initialized(record) = ticket.phase else {
            return Err(ControllerError::InvalidPhase {
                operation: "unlock",
                phase: ticket.phase.name(),
            });
        };

        match client.unlock().await {
            Ok(signature) => {
                self.commit(ticket.epoch, Phase::Uninitialized)?;
                self.notifier.notify(Notification::success(
                    "Success",
                    format!("{} $SOL unlocked to {}", format_sol(record.amount), client.owner()),
                ));
                Ok(signature)
            }
            Err(e) => {
                if !self.is_current(ticket.epoch) {
                    return Err(ControllerError::Detached);
                }
                let notification = if e.is_time_lock_not_reached() {
                    Notification::failure(
                        "Vault still locked",
                        format!("Unlocks at {}", format_instant(unlock_instant(&record))),
                    )
                } else {
                    Notification::failure(
                        "Failed to unlock vault",
                        format!("error: {}", e.category()),
                    )
                };
                self.notifier.notify(notification);
                Err(e.into())
            }
        }
    }
}

/// The record the program writes for these arguments, for when the
/// confirmed account cannot be read back yet.
fn submitted_record(client: &VaultClient, valid: &ValidatedInit, start_clock: i64) -> VaultRecord {
    VaultRecord {
        start_clock,
        end_clock: valid.duration_secs,
        amount: valid.amount_lamports,
        bump: client.vault_address().map(|v| v.bump).unwrap_or_default(),
    }
}
