use serde::Serialize;
use std::fmt;

use crate::program::VaultRecord;

/// What the front-end should show.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(tag = "phase", content = "record")]
pub enum Phase {
    /// No bound client yet, or the first read has not come back.
    #[default]
    Loading,
    /// Bound, and no vault exists for the owner.
    Uninitialized,
    /// Bound, with the vault as last read or confirmed.
    Initialized(VaultRecord),
}

impl Phase {
    pub fn name(&self) -> &'static str {
        match self {
            Phase::Loading => "Loading",
            Phase::Uninitialized => "Uninitialized",
            Phase::Initialized(_) => "Initialized",
        }
    }

    pub fn record(&self) -> Option<&VaultRecord> {
        match self {
            Phase::Initialized(record) => Some(record),
            _ => None,
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
