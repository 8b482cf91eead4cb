//! Presentation values derived from a vault record.
//!
//! Nothing here is cached: a view is built from the record and "now" every
//! time it is asked for.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::config::{LAMPORTS_PER_SOL, SOL_DECIMALS};
use crate::program::VaultRecord;

const INSTANT_FORMAT: &str = "%b %-d, %Y, %-I:%M:%S %p UTC";

/// `start_clock + end_clock`, both seconds, as unix milliseconds.
pub fn unlock_instant_ms(record: &VaultRecord) -> i64 {
    record
        .start_clock
        .saturating_mul(1000)
        .saturating_add(record.end_clock.saturating_mul(1000))
}

/// When the vault can be unlocked. Out-of-range records clamp to the
/// latest representable instant.
pub fn unlock_instant(record: &VaultRecord) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(unlock_instant_ms(record)).unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// Lamports as SOL, exactly, without trailing zeros: `1`, `0.5`,
/// `0.000000001`.
pub fn format_sol(lamports: u64) -> String {
    let whole = lamports / LAMPORTS_PER_SOL;
    let frac = lamports % LAMPORTS_PER_SOL;
    if frac == 0 {
        return whole.to_string();
    }
    let digits = format!("{:0width$}", frac, width = SOL_DECIMALS);
    format!("{}.{}", whole, digits.trim_end_matches('0'))
}

pub fn format_instant(instant: DateTime<Utc>) -> String {
    instant.format(INSTANT_FORMAT).to_string()
}

/// Coarse human duration: `2d 3h 4m 5s`, leading zero units omitted.
pub fn format_remaining(remaining: Duration) -> String {
    let total = remaining.num_seconds().max(0);
    let (days, hours, minutes, seconds) = (
        total / 86_400,
        total % 86_400 / 3_600,
        total % 3_600 / 60,
        total % 60,
    );
    let mut parts = Vec::new();
    if days > 0 {
        parts.push(format!("{}d", days));
    }
    if days > 0 || hours > 0 {
        parts.push(format!("{}h", hours));
    }
    if days > 0 || hours > 0 || minutes > 0 {
        parts.push(format!("{}m", minutes));
    }
    parts.push(format!("{}s", seconds));
    parts.join(" ")
}

/// What to show for an initialized vault at a given instant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VaultView {
    pub amount_lamports: u64,
    pub amount: String,
    pub locked_at: Option<DateTime<Utc>>,
    pub unlock_at: DateTime<Utc>,
    pub unlock_at_display: String,
    /// Zero once unlockable.
    #[serde(skip)]
    pub remaining: Duration,
    pub remaining_display: String,
    pub unlockable: bool,
}

impl VaultView {
    pub fn new(record: &VaultRecord, now: DateTime<Utc>) -> Self {
        let unlock_at = unlock_instant(record);
        let remaining = (unlock_at - now).max(Duration::zero());
        Self {
            amount_lamports: record.amount,
            amount: format_sol(record.amount),
            locked_at: DateTime::from_timestamp(record.start_clock, 0),
            unlock_at,
            unlock_at_display: format_instant(unlock_at),
            remaining,
            remaining_display: format_remaining(remaining),
            unlockable: now >= unlock_at,
        }
    }
}
