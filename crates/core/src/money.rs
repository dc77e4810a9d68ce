//! Exact two-decimal monetary amounts.
//!
//! Amounts are compared and summed with `rust_decimal`, never with binary floating point,
//! so boundary values such as `200.00` classify exactly.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::value_object::ValueObject;

/// Number of fractional digits every amount carries.
pub const AMOUNT_SCALE: u32 = 2;

/// Non-negative amount with exactly two fractional digits.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Amount(Decimal);

impl ValueObject for Amount {}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum AmountError {
    #[error("amount should be to two decimal places")]
    Format,

    #[error("amount cannot be negative")]
    Negative,
}

impl Amount {
    pub const ZERO: Amount = Amount(Decimal::from_parts(0, 0, 0, false, AMOUNT_SCALE));

    /// Parse the wire format: digits, one `.`, exactly two fractional digits.
    ///
    /// Format is checked before sign, so `-1.5` reports a format error and `-1.50`
    /// reports a negative amount. `-0.00` is zero and accepted.
    pub fn parse(input: &str) -> Result<Self, AmountError> {
        let (whole, fraction) = input.split_once('.').ok_or(AmountError::Format)?;

        if fraction.len() != AMOUNT_SCALE as usize || !is_ascii_digits(fraction) {
            return Err(AmountError::Format);
        }

        let (negative, whole) = match whole.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, whole),
        };
        if !whole.is_empty() && !is_ascii_digits(whole) {
            return Err(AmountError::Format);
        }

        let mantissa: i128 = format!("{whole}{fraction}")
            .parse()
            .map_err(|_| AmountError::Format)?;
        if negative && mantissa != 0 {
            return Err(AmountError::Negative);
        }

        Decimal::try_from_i128_with_scale(mantissa, AMOUNT_SCALE)
            .map(Self)
            .map_err(|_| AmountError::Format)
    }

    /// Wrap a decimal read back from storage. Rejects negatives and sub-cent precision.
    pub fn new(value: Decimal) -> Result<Self, AmountError> {
        if value.is_sign_negative() && !value.is_zero() {
            return Err(AmountError::Negative);
        }
        let mut value = value.normalize();
        if value.scale() > AMOUNT_SCALE {
            return Err(AmountError::Format);
        }
        value.rescale(AMOUNT_SCALE);
        value.set_sign_positive(true);
        Ok(Self(value))
    }

    pub fn from_cents(cents: u64) -> Self {
        Self(Decimal::from_i128_with_scale(i128::from(cents), AMOUNT_SCALE))
    }

    /// `None` when the sum leaves the representable range.
    pub fn checked_add(self, other: Amount) -> Option<Amount> {
        self.0.checked_add(other.0).map(Self)
    }

    pub fn as_decimal(&self) -> Decimal {
        self.0
    }
}

fn is_ascii_digits(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

impl core::fmt::Display for Amount {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

impl core::str::FromStr for Amount {
    type Err = AmountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Amount {
    type Error = AmountError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Amount> for String {
    fn from(value: Amount) -> Self {
        value.to_string()
    }
}
