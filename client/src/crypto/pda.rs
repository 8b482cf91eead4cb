//! Program-derived addresses.
//!
//! A PDA is a SHA-256 digest of the seeds, a bump byte, the program id and a
//! fixed marker, chosen so that the digest is *not* a valid Ed25519 point.
//! Nobody holds a private key for such an address; only the program can sign
//! for it. The canonical bump is the largest one (searching down from 255 to
//! 1) that lands off the curve.

use curve25519_dalek::edwards::CompressedEdwardsY;
use thiserror::Error;

use super::hash::sha256_concat;
use super::keys::Pubkey;

/// Marker appended to every derivation preimage.
pub const PDA_MARKER: &[u8] = b"ProgramDerivedAddress";

/// Seeds longer than this are rejected by the runtime.
pub const MAX_SEED_LEN: usize = 32;

/// At most this many seeds (bump included).
pub const MAX_SEEDS: usize = 16;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PdaError {
    #[error("seed exceeds {MAX_SEED_LEN} bytes")]
    MaxSeedLengthExceeded,

    #[error("too many seeds (max {MAX_SEEDS})")]
    TooManySeeds,

    #[error("derived address lies on the curve")]
    OnCurve,
}

pub(crate) fn bytes_are_curve_point(bytes: &[u8; 32]) -> bool {
    CompressedEdwardsY(*bytes).decompress().is_some()
}

/// Derive the address for an explicit seed list (bump included).
pub fn create_program_address(seeds: &[&[u8]], program_id: &Pubkey) -> Result<Pubkey, PdaError> {
    if seeds.len() > MAX_SEEDS {
        return Err(PdaError::TooManySeeds);
    }
    if seeds.iter().any(|s| s.len() > MAX_SEED_LEN) {
        return Err(PdaError::MaxSeedLengthExceeded);
    }

    let mut parts: Vec<&[u8]> = Vec::with_capacity(seeds.len() + 2);
    parts.extend_from_slice(seeds);
    parts.push(program_id.as_ref());
    parts.push(PDA_MARKER);

    let digest = sha256_concat(&parts);
    if bytes_are_curve_point(&digest) {
        return Err(PdaError::OnCurve);
    }
    Ok(Pubkey::new_from_array(digest))
}

/// Search bumps from 255 down to 1 and return the first off-curve address.
///
/// Bump 0 is never tried, matching the runtime's own search. `None` only if
/// every bump lands on the curve, which happens with probability around
/// 2^-255.
pub fn try_find_program_address(seeds: &[&[u8]], program_id: &Pubkey) -> Option<(Pubkey, u8)> {
    for bump in (1..=u8::MAX).rev() {
        let bump_seed = [bump];
        let mut with_bump: Vec<&[u8]> = Vec::with_capacity(seeds.len() + 1);
        with_bump.extend_from_slice(seeds);
        with_bump.push(&bump_seed);

        match create_program_address(&with_bump, program_id) {
            Ok(address) => return Some((address, bump)),
            Err(PdaError::OnCurve) => continue,
            Err(_) => return None,
        }
    }
    None
}
