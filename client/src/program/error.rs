//! Program error table.
//!
//! A failed instruction comes back from the cluster as a bare number
//! (`{"InstructionError":[0,{"Custom":6000}]}`). This table maps the numbers a
//! time-vault client can run into back to a name and message. Custom program
//! errors start at 6000; codes 100-5999 belong to the account-validation framework
//! the program is built on; the small codes are system-program failures raised
//! while creating or funding the vault account.

use serde::{Deserialize, Serialize};
use std::fmt;

/// First code available to program-defined errors.
pub const CUSTOM_ERROR_OFFSET: u32 = 6000;

/// `NotReached`: unlock attempted before `start_clock + end_clock`.
pub const TIME_LOCK_NOT_REACHED: u32 = 6000;

const KNOWN: &[(u32, &str, &str)] = &[
    (0, "AccountAlreadyInUse", "an account with the same address already exists"),
    (1, "ResultWithNegativeLamports", "account does not have enough SOL to perform the operation"),
    (101, "InstructionFallbackNotFound", "Fallback functions are not supported"),
    (2006, "ConstraintSeeds", "A seeds constraint was violated"),
    (3001, "AccountDiscriminatorNotFound", "No discriminator was found on the account"),
    (3002, "AccountDiscriminatorMismatch", "8 byte discriminator did not match what was expected"),
    (3010, "AccountNotSigner", "The given account did not sign"),
    (3012, "AccountNotInitialized", "The program expected this account to be already initialized"),
    (TIME_LOCK_NOT_REACHED, "NotReached", "Time Lock Not Reached"),
];

/// A decoded program failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgramError {
    pub code: u32,
    pub name: String,
    pub message: String,
}

impl ProgramError {
    /// Look `code` up in the table. Unknown codes keep their number and get
    /// the generic name `Custom`.
    pub fn from_code(code: u32) -> Self {
        match KNOWN.iter().find(|(c, _, _)| *c == code) {
            Some((_, name, message)) => Self {
                code,
                name: (*name).to_string(),
                message: (*message).to_string(),
            },
            None => Self {
                code,
                name: "Custom".to_string(),
                message: format!("custom program error: {:#x}", code),
            },
        }
    }

    pub fn time_lock_not_reached() -> Self {
        Self::from_code(TIME_LOCK_NOT_REACHED)
    }

    pub fn is_time_lock_not_reached(&self) -> bool {
        self.code == TIME_LOCK_NOT_REACHED
    }

    /// Whether the code falls in the program-defined range.
    pub fn is_custom(&self) -> bool {
        self.code >= CUSTOM_ERROR_OFFSET
    }
}

impl fmt::Display for ProgramError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.code >= 100 {
            write!(
                f,
                "AnchorError occurred. Error Code: {}. Error Number: {}. Error Message: {}.",
                self.name, self.code, self.message
            )
        } else {
            write!(f, "{} (code {}): {}", self.name, self.code, self.message)
        }
    }
}

impl std::error::Error for ProgramError {}
