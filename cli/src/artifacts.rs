//! # Program Interface Sync
//!
//! After a program deployment the build leaves its interface description in
//! `target/idl/time_vault_lock.json` and its TypeScript types in
//! `target/types/time_vault_lock.ts`. This checks that the IDL still describes
//! the program this client talks to, then copies both into the client tree as
//! `idl.json` and `idl.ts`. A build that fails the check leaves the client
//! tree untouched.

use serde_json::Value;
use std::path::{Path, PathBuf};
use thiserror::Error;

use timevault_client::crypto::keys::Pubkey;
use timevault_client::program::{ProgramError, TIME_LOCK_NOT_REACHED};

const IDL_SOURCE: &str = "idl/time_vault_lock.json";
const TYPES_SOURCE: &str = "types/time_vault_lock.ts";
const IDL_TARGET: &str = "idl.json";
const TYPES_TARGET: &str = "idl.ts";

#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("failed to copy {from} to {to}: {source}")]
    Copy {
        from: PathBuf,
        to: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to create {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to read IDL {path}: {reason}")]
    Read { path: PathBuf, reason: String },

    #[error("IDL declares program {found}, expected {expected}")]
    AddressMismatch { expected: Pubkey, found: String },

    #[error("IDL does not declare error {code} `{name}`")]
    MissingError { code: u32, name: String },
}

/// The files written by a sync.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Synced {
    pub idl: PathBuf,
    pub types: PathBuf,
}

/// Verify the built IDL, then copy the interface files from `build_dir` into
/// `dest`. Nothing in `dest` is touched when verification fails.
pub fn sync_idl(build_dir: &Path, dest: &Path, program_id: &Pubkey) -> Result<Synced, ArtifactError> {
    for (from, to) in [(TYPES_SOURCE, TYPES_TARGET), (IDL_SOURCE, IDL_TARGET)] {
        let from = build_dir.join(from);
        if !from.is_file() {
            return Err(ArtifactError::Copy {
                from,
                to: dest.join(to),
                source: std::io::ErrorKind::NotFound.into(),
            });
        }
    }
    verify_idl(&build_dir.join(IDL_SOURCE), program_id)?;

    std::fs::create_dir_all(dest).map_err(|source| ArtifactError::CreateDir {
        path: dest.to_path_buf(),
        source,
    })?;

    let types = copy(&build_dir.join(TYPES_SOURCE), &dest.join(TYPES_TARGET))?;
    tracing::info!(path = %types.display(), "idl.ts copied");
    let idl = copy(&build_dir.join(IDL_SOURCE), &dest.join(IDL_TARGET))?;
    tracing::info!(path = %idl.display(), "idl.json copied");
    Ok(Synced { idl, types })
}

fn copy(from: &Path, to: &Path) -> Result<PathBuf, ArtifactError> {
    std::fs::copy(from, to).map_err(|source| ArtifactError::Copy {
        from: from.to_path_buf(),
        to: to.to_path_buf(),
        source,
    })?;
    Ok(to.to_path_buf())
}

/// Check the IDL's program address and that it knows the time-lock error.
///
/// Newer IDLs carry the address at the top level, older ones under
/// `metadata.address`.
pub fn verify_idl(path: &Path, program_id: &Pubkey) -> Result<(), ArtifactError> {
    let read_err = |reason: String| ArtifactError::Read {
        path: path.to_path_buf(),
        reason,
    };
    let raw = std::fs::read(path).map_err(|e| read_err(e.to_string()))?;
    let idl: Value = serde_json::from_slice(&raw).map_err(|e| read_err(e.to_string()))?;

    let address = idl
        .get("address")
        .or_else(|| idl.pointer("/metadata/address"))
        .and_then(Value::as_str)
        .unwrap_or_default();
    if address != program_id.to_string() {
        return Err(ArtifactError::AddressMismatch {
            expected: *program_id,
            found: address.to_string(),
        });
    }

    let expected = ProgramError::from_code(TIME_LOCK_NOT_REACHED);
    let declared = idl
        .get("errors")
        .and_then(Value::as_array)
        .is_some_and(|errors| {
            errors.iter().any(|e| {
                e.get("code").and_then(Value::as_u64) == Some(u64::from(expected.code))
                    && e.get("name").and_then(Value::as_str) == Some(expected.name.as_str())
            })
        });
    if !declared {
        return Err(ArtifactError::MissingError {
            code: expected.code,
            name: expected.name,
        });
    }
    Ok(())
}
