//! Integer money arithmetic used by the ledger and the loan schedule.
//!
//! All amounts are `i64` **minor units** and all rates are **basis points**
//! (`1% == 100 bps`), so no floating point ever touches a balance.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{EngineError, ResultEngine};

/// Basis points in 100%.
pub const BPS_SCALE: i64 = 10_000;

/// Penalty applied to an installment paid after its due date (1%).
pub const LATE_FEE_BPS: i64 = 100;

/// A flat interest rate expressed in basis points.
///
/// # Examples
///
/// ```rust
/// use engine::FlatRate;
///
/// assert_eq!("12".parse::<FlatRate>().unwrap().bps(), 1200);
/// assert_eq!("1,5".parse::<FlatRate>().unwrap().bps(), 150);
/// assert!("0.125".parse::<FlatRate>().is_err());
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct FlatRate(i64);

impl FlatRate {
    pub const ZERO: FlatRate = FlatRate(0);

    /// Creates a rate from basis points. Negative rates are rejected.
    pub fn from_bps(bps: i64) -> ResultEngine<Self> {
        if bps < 0 {
            return Err(EngineError::InvalidInput(
                "flat_rate_bps must be >= 0".to_string(),
            ));
        }
        Ok(Self(bps))
    }

    #[must_use]
    pub const fn bps(self) -> i64 {
        self.0
    }
}

impl TryFrom<i64> for FlatRate {
    type Error = EngineError;

    fn try_from(bps: i64) -> Result<Self, Self::Error> {
        Self::from_bps(bps)
    }
}

impl From<FlatRate> for i64 {
    fn from(rate: FlatRate) -> Self {
        rate.0
    }
}

impl fmt::Display for FlatRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}%", self.0 / 100, self.0 % 100)
    }
}

impl FromStr for FlatRate {
    type Err = EngineError;

    /// Parses a percentage (`"12"`, `"12.5"`, `"0,75"`, optional trailing
    /// `%`) into basis points. At most 2 fractional digits.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || EngineError::InvalidInput(format!("invalid rate: {s}"));

        let trimmed = s.trim().trim_end_matches('%').trim();
        if trimmed.is_empty() {
            return Err(invalid());
        }

        let normalized = trimmed.replace(',', ".");
        let mut parts = normalized.split('.');
        let whole_str = parts.next().ok_or_else(invalid)?;
        let frac_str = parts.next();
        if parts.next().is_some() {
            return Err(invalid());
        }
        if whole_str.is_empty() || !whole_str.chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid());
        }

        let whole: i64 = whole_str.parse().map_err(|_| invalid())?;
        let frac: i64 = match frac_str {
            None | Some("") => 0,
            Some(frac) if !frac.chars().all(|c| c.is_ascii_digit()) => return Err(invalid()),
            Some(frac) if frac.len() == 1 => frac.parse::<i64>().map_err(|_| invalid())? * 10,
            Some(frac) if frac.len() == 2 => frac.parse::<i64>().map_err(|_| invalid())?,
            Some(_) => {
                return Err(EngineError::InvalidInput(
                    "rate supports at most 2 decimals".to_string(),
                ));
            }
        };

        let bps = whole
            .checked_mul(100)
            .and_then(|v| v.checked_add(frac))
            .ok_or_else(invalid)?;
        FlatRate::from_bps(bps)
    }
}

/// `amount × bps / 10_000`, rounded half up.
pub fn bps_of(amount_minor: i64, bps: i64) -> ResultEngine<i64> {
    let overflow = || EngineError::InvalidInput("amount too large".to_string());
    let scaled = i128::from(amount_minor) * i128::from(bps);
    let scale = i128::from(BPS_SCALE);
    let rounded = (scaled + scale / 2).div_euclid(scale);
    i64::try_from(rounded).map_err(|_| overflow())
}

/// Total payable for a flat-rate loan: principal plus interest computed once.
pub fn flat_total(principal_minor: i64, rate: FlatRate) -> ResultEngine<i64> {
    let interest = bps_of(principal_minor, rate.bps())?;
    principal_minor
        .checked_add(interest)
        .ok_or_else(|| EngineError::InvalidInput("amount too large".to_string()))
}

/// Splits `total` into `parts` equal amounts; the last part absorbs the
/// remainder of the integer division.
pub fn split_evenly(total_minor: i64, parts: u32) -> ResultEngine<Vec<i64>> {
    if parts == 0 {
        return Err(EngineError::InvalidInput(
            "term_months must be > 0".to_string(),
        ));
    }
    let count = i64::from(parts);
    let base = total_minor / count;
    let remainder = total_minor - base * count;

    let mut out = vec![base; parts as usize];
    if let Some(last) = out.last_mut() {
        *last += remainder;
    }
    Ok(out)
}

/// Late fee for an installment amount.
pub fn late_fee(amount_due_minor: i64) -> ResultEngine<i64> {
    bps_of(amount_due_minor, LATE_FEE_BPS)
}
