use std::{
    fmt::Display,
    iter::Sum,
    ops::{Add, Mul, Neg, Sub, SubAssign},
};

use serde::{Deserialize, Serialize};
use sqlx::Type;
use thiserror::Error;

use crate::op;

//--------------------------------------       Money        ----------------------------------------------------------
/// An amount of money in the *minor units* of its currency (cents for USD, whole francs for zero-decimal XOF).
///
/// Amounts are always integers. Conversions to and from decimal strings are exact, so that amount comparisons during
/// payment reconciliation never go through floating point.
#[derive(Debug, Clone, Copy, Default, Type, Ord, PartialOrd, Serialize, Deserialize)]
#[sqlx(transparent)]
pub struct Money(i64);

op!(binary Money, Add, add);
op!(binary Money, Sub, sub);
op!(inplace Money, SubAssign, sub_assign);
op!(unary Money, Neg, neg);

impl Mul<i64> for Money {
    type Output = Self;

    fn mul(self, rhs: i64) -> Self::Output {
        Self::from(self.value() * rhs)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}

#[derive(Debug, Clone, Error)]
#[error("Value cannot be represented in minor units: {0}")]
pub struct MoneyConversionError(pub String);

impl From<i64> for Money {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl PartialEq for Money {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl Eq for Money {}

impl TryFrom<u64> for Money {
    type Error = MoneyConversionError;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        if value > i64::MAX as u64 {
            Err(MoneyConversionError(format!("Value {value} is too large to convert to Money")))
        } else {
            #[allow(clippy::cast_possible_wrap)]
            Ok(Self(value as i64))
        }
    }
}

impl Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Money {
    pub fn from_minor(value: i64) -> Self {
        Self(value)
    }

    pub fn value(&self) -> i64 {
        self.0
    }

    pub fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Render the amount as a decimal string with the given number of decimal places.
    /// Scale 2: `1234` becomes `"12.34"`. Scale 0: `7000` becomes `"7000"`.
    pub fn to_decimal_string(&self, scale: u32) -> String {
        if scale == 0 {
            return self.0.to_string();
        }
        let factor = 10i64.pow(scale);
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        let units = abs / factor as u64;
        let frac = abs % factor as u64;
        format!("{sign}{units}.{frac:0width$}", width = scale as usize)
    }

    /// Parse a decimal amount string (as payment providers report it) into minor units at the given scale.
    ///
    /// The fractional part may be shorter than the scale (`"70.5"` at scale 2 is 7050). Extra trailing digits are
    /// tolerated only when they are zeros (providers pad zero-decimal currencies: `"7000.00"` at scale 0 is 7000);
    /// a genuine sub-minor-unit amount cannot be represented and is rejected rather than rounded.
    pub fn from_decimal_str(s: &str, scale: u32) -> Result<Self, MoneyConversionError> {
        let s = s.trim();
        let invalid = || MoneyConversionError(format!("'{s}' is not a valid decimal amount"));
        let (sign, digits) = match s.strip_prefix('-') {
            Some(rest) => (-1i64, rest),
            None => (1i64, s),
        };
        let (units, mut frac) = match digits.split_once('.') {
            Some((u, f)) => (u, f),
            None => (digits, ""),
        };
        if units.is_empty() || !units.bytes().all(|b| b.is_ascii_digit()) || !frac.bytes().all(|b| b.is_ascii_digit())
        {
            return Err(invalid());
        }
        if frac.len() > scale as usize {
            let (keep, excess) = frac.split_at(scale as usize);
            if excess.bytes().any(|b| b != b'0') {
                return Err(MoneyConversionError(format!("'{s}' has more than {scale} decimal places")));
            }
            frac = keep;
        }
        let factor = 10i64.pow(scale);
        let units: i64 = units.parse().map_err(|_| invalid())?;
        let mut frac_value = 0i64;
        if !frac.is_empty() {
            frac_value = frac.parse::<i64>().map_err(|_| invalid())?;
            frac_value *= 10i64.pow(scale - frac.len() as u32);
        }
        units
            .checked_mul(factor)
            .and_then(|v| v.checked_add(frac_value))
            .map(|v| Self(sign * v))
            .ok_or_else(|| MoneyConversionError(format!("'{s}' overflows the minor unit range")))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn arithmetic() {
        let a = Money::from(1500);
        let b = Money::from(500);
        assert_eq!(a + b, Money::from(2000));
        assert_eq!(a - b, Money::from(1000));
        assert_eq!(-b, Money::from(-500));
        assert_eq!(b * 3, Money::from(1500));
        let total: Money = [a, b, b].into_iter().sum();
        assert_eq!(total, Money::from(2500));
    }

    #[test]
    fn decimal_round_trips() {
        assert_eq!(Money::from(1234).to_decimal_string(2), "12.34");
        assert_eq!(Money::from(1200).to_decimal_string(2), "12.00");
        assert_eq!(Money::from(7000).to_decimal_string(0), "7000");
        assert_eq!(Money::from(-5).to_decimal_string(2), "-0.05");
        assert_eq!(Money::from_decimal_str("12.34", 2).unwrap(), Money::from(1234));
        assert_eq!(Money::from_decimal_str("7000.00", 2).unwrap(), Money::from(700000));
        assert_eq!(Money::from_decimal_str("7000", 0).unwrap(), Money::from(7000));
        assert_eq!(Money::from_decimal_str("7000.00", 0).unwrap(), Money::from(7000));
        assert_eq!(Money::from_decimal_str("70.5", 2).unwrap(), Money::from(7050));
        assert_eq!(Money::from_decimal_str("-3.10", 2).unwrap(), Money::from(-310));
    }

    #[test]
    fn rejects_malformed_amounts() {
        assert!(Money::from_decimal_str("12.345", 2).is_err());
        assert!(Money::from_decimal_str("7000.5", 0).is_err());
        assert!(Money::from_decimal_str("", 2).is_err());
        assert!(Money::from_decimal_str("12,34", 2).is_err());
        assert!(Money::from_decimal_str(".50", 2).is_err());
        assert!(Money::from_decimal_str("1e3", 2).is_err());
    }
}
