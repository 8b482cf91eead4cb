//! Input validation for a new vault.
//!
//! Runs before anything touches the network. Every failing field is
//! reported, each tagged with the field it belongs to.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use thiserror::Error;

use crate::config::{LAMPORTS_PER_SOL, SOL_DECIMALS};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Amount,
    UnlockDate,
}

impl Field {
    pub fn as_str(&self) -> &'static str {
        match self {
            Field::Amount => "amount",
            Field::UnlockDate => "unlock_date",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: Field,
    pub message: String,
}

impl ValidationError {
    fn new(field: Field, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// One or more field errors.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("{}", render(.0))]
pub struct ValidationErrors(pub Vec<ValidationError>);

fn render(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl ValidationErrors {
    pub fn fields(&self) -> Vec<Field> {
        self.0.iter().map(|e| e.field).collect()
    }

    pub fn for_field(&self, field: Field) -> Option<&ValidationError> {
        self.0.iter().find(|e| e.field == field)
    }
}

/// Parse a SOL amount into lamports without going through floating point.
///
/// Accepts `12`, `12.5`, `.5` and surrounding whitespace. At most nine
/// fractional digits; the result must be non-zero and fit in a `u64`.
pub fn parse_amount_lamports(input: &str) -> Result<u64, ValidationError> {
    let err = |message: &str| ValidationError::new(Field::Amount, message);
    let s = input.trim();
    if s.is_empty() {
        return Err(err("amount is required"));
    }
    if s.starts_with('-') {
        return Err(err("amount must be positive"));
    }

    let (whole, frac) = s.split_once('.').unwrap_or((s, ""));
    if whole.is_empty() && frac.is_empty() {
        return Err(err("amount is not a number"));
    }
    if !whole.bytes().chain(frac.bytes()).all(|b| b.is_ascii_digit()) {
        return Err(err("amount is not a number"));
    }
    if frac.len() > SOL_DECIMALS {
        return Err(err("amount has more than 9 decimal places"));
    }

    let overflow = || err("amount is too large");
    let whole: u64 = if whole.is_empty() {
        0
    } else {
        whole.parse().map_err(|_| overflow())?
    };
    let frac: u64 = if frac.is_empty() {
        0
    } else {
        let scale = 10u64.pow((SOL_DECIMALS - frac.len()) as u32);
        frac.parse::<u64>().map_err(|_| overflow())? * scale
    };
    let lamports = whole
        .checked_mul(LAMPORTS_PER_SOL)
        .and_then(|l| l.checked_add(frac))
        .ok_or_else(overflow)?;

    if lamports == 0 {
        return Err(err("amount must be greater than zero"));
    }
    Ok(lamports)
}

/// A request to lock funds, as entered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitRequest {
    pub amount: String,
    pub unlock_at: DateTime<Utc>,
}

/// A request that passed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidatedInit {
    pub amount_lamports: u64,
    pub unlock_at: DateTime<Utc>,
    /// Lock length, rounded up to whole seconds.
    pub duration_secs: i64,
}

impl InitRequest {
    pub fn new(amount: impl Into<String>, unlock_at: DateTime<Utc>) -> Self {
        Self {
            amount: amount.into(),
            unlock_at,
        }
    }

    /// Check both fields against `now`. An unlock date equal to `now` is
    /// rejected.
    pub fn validate(&self, now: DateTime<Utc>) -> Result<ValidatedInit, ValidationErrors> {
        let mut errors = Vec::new();

        let amount = parse_amount_lamports(&self.amount)
            .map_err(|e| errors.push(e))
            .ok();
        if self.unlock_at <= now {
            errors.push(ValidationError::new(
                Field::UnlockDate,
                "unlock date must be in the future",
            ));
        }

        match amount {
            Some(amount_lamports) if errors.is_empty() => Ok(ValidatedInit {
                amount_lamports,
                unlock_at: self.unlock_at,
                duration_secs: duration_secs(self.unlock_at, now),
            }),
            _ => Err(ValidationErrors(errors)),
        }
    }
}

/// `|unlock_at - now|` in whole seconds, rounded up.
pub fn duration_secs(unlock_at: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    let ms = (unlock_at - now).num_milliseconds().saturating_abs();
    ms / 1000 + i64::from(ms % 1000 != 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000, 0).unwrap()
    }

    #[test]
    fn amounts_convert_exactly() {
        assert_eq!(parse_amount_lamports("1").unwrap(), 1_000_000_000);
        assert_eq!(parse_amount_lamports(" 0.5 ").unwrap(), 500_000_000);
        assert_eq!(parse_amount_lamports(".000000001").unwrap(), 1);
        assert_eq!(parse_amount_lamports("1.").unwrap(), 1_000_000_000);
        assert_eq!(parse_amount_lamports("0.1").unwrap(), 100_000_000);
        assert_eq!(parse_amount_lamports("18446744073.709551615").unwrap(), u64::MAX);
    }

    #[test]
    fn bad_amounts_name_the_field() {
        for input in ["", "0", "0.000", "-1", "abc", "1.2.3", ".", "1e9", "0.0000000001"] {
            let err = parse_amount_lamports(input).unwrap_err();
            assert_eq!(err.field, Field::Amount, "input {:?}", input);
        }
        assert!(parse_amount_lamports("18446744073.709551616").is_err());
        assert!(parse_amount_lamports("99999999999999999999").is_err());
    }

    #[test]
    fn unlock_date_must_be_strictly_later() {
        let err = InitRequest::new("1", now()).validate(now()).unwrap_err();
        assert_eq!(err.fields(), vec![Field::UnlockDate]);

        let err = InitRequest::new("1", now() - Duration::seconds(1))
            .validate(now())
            .unwrap_err();
        assert!(err.for_field(Field::UnlockDate).is_some());

        let ok = InitRequest::new("1", now() + Duration::milliseconds(1))
            .validate(now())
            .unwrap();
        assert_eq!(ok.duration_secs, 1);
    }

    #[test]
    fn all_failures_are_reported() {
        let err = InitRequest::new("0", now()).validate(now()).unwrap_err();
        assert_eq!(err.fields(), vec![Field::Amount, Field::UnlockDate]);
        assert!(err.to_string().starts_with("amount: "));
    }

    #[test]
    fn duration_rounds_up() {
        let at = now() + Duration::seconds(60);
        assert_eq!(duration_secs(at, now()), 60);
        assert_eq!(duration_secs(at + Duration::milliseconds(1), now()), 61);
        assert_eq!(duration_secs(now(), at), 60);
    }
}
