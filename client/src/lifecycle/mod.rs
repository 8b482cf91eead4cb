//! The vault lifecycle: which phase to show, which input to accept, and
//! which on-chain call to make next.

pub mod controller;
pub mod display;
pub mod phase;
pub mod validation;

pub use controller::{ControllerError, VaultController};
pub use display::{format_instant, format_sol, unlock_instant, VaultView};
pub use phase::Phase;
pub use validation::{
    parse_amount_lamports, Field, InitRequest, ValidatedInit, ValidationError, ValidationErrors,
};
