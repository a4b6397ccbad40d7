//! Token amounts
//!
//! Amounts are integer nanotons (10^-9 TON). Decimal text is parsed as
//! fixed-point so that "1.5" is exactly 1_500_000_000.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Decimal places of the base currency
pub const DECIMALS: u32 = 9;

const NANOS_PER_TON: u64 = 1_000_000_000;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AmountError {
    #[error("Invalid amount: empty")]
    Empty,
    #[error("Invalid amount: must be positive")]
    NotPositive,
    #[error("Invalid amount: {0:?} is not a decimal number")]
    NotNumeric(String),
    #[error("Invalid amount: at most 9 fractional digits allowed")]
    TooPrecise,
    #[error("Invalid amount: too large")]
    Overflow,
}

/// A strictly positive quantity of nanotons
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u64", into = "u64")]
pub struct Amount(u64);

impl TryFrom<u64> for Amount {
    type Error = AmountError;

    fn try_from(nanos: u64) -> Result<Self, Self::Error> {
        Self::from_nano(nanos)
    }
}

impl From<Amount> for u64 {
    fn from(amount: Amount) -> u64 {
        amount.0
    }
}

impl Amount {
    pub fn from_nano(nanos: u64) -> Result<Self, AmountError> {
        if nanos == 0 {
            return Err(AmountError::NotPositive);
        }
        Ok(Self(nanos))
    }

    pub fn as_nano(&self) -> u64 {
        self.0
    }

    /// Parse a decimal string such as `"1.5"` or `"0.000000001"`
    pub fn from_decimal_str(text: &str) -> Result<Self, AmountError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(AmountError::Empty);
        }
        if text.starts_with('-') {
            return Err(AmountError::NotPositive);
        }
        let text = text.strip_prefix('+').unwrap_or(text);

        let (whole, frac) = match text.split_once('.') {
            Some((w, f)) => (w, f),
            None => (text, ""),
        };
        if whole.is_empty() && frac.is_empty() {
            return Err(AmountError::NotNumeric(text.to_string()));
        }
        if !whole.bytes().all(|b| b.is_ascii_digit()) || !frac.bytes().all(|b| b.is_ascii_digit())
        {
            return Err(AmountError::NotNumeric(text.to_string()));
        }

        let frac = frac.trim_end_matches('0');
        if frac.len() > DECIMALS as usize {
            return Err(AmountError::TooPrecise);
        }

        let whole: u64 = if whole.is_empty() {
            0
        } else {
            whole.parse().map_err(|_| AmountError::Overflow)?
        };
        let frac_nanos: u64 = if frac.is_empty() {
            0
        } else {
            // frac has at most 9 digits so this cannot overflow
            frac.parse::<u64>().map_err(|_| AmountError::NotNumeric(text.to_string()))?
                * 10u64.pow(DECIMALS - frac.len() as u32)
        };

        let nanos = whole
            .checked_mul(NANOS_PER_TON)
            .and_then(|n| n.checked_add(frac_nanos))
            .ok_or(AmountError::Overflow)?;
        Self::from_nano(nanos)
    }

    /// Shortest decimal rendering, e.g. `"1.5"`, `"2"`
    pub fn to_decimal_string(&self) -> String {
        let whole = self.0 / NANOS_PER_TON;
        let frac = self.0 % NANOS_PER_TON;
        if frac == 0 {
            return whole.to_string();
        }
        let frac = format!("{:09}", frac);
        format!("{}.{}", whole, frac.trim_end_matches('0'))
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_decimal_string())
    }
}

impl FromStr for Amount {
    type Err = AmountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_decimal_str(s)
    }
}

/// An account balance in nanotons; unlike [`Amount`] it may be zero
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Balance(u64);

impl Balance {
    pub fn from_nano(nanos: u64) -> Self {
        Self(nanos)
    }

    pub fn as_nano(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for Balance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match Amount::from_nano(self.0) {
            Ok(amount) => amount.fmt(f),
            Err(_) => f.write_str("0"),
        }
    }
}
