use std::{
    fmt::Display,
    iter::Sum,
    ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign},
};

use serde::{Deserialize, Serialize};
use sqlx::Type;
use thiserror::Error;

use crate::op;

pub const CURRENCY_CODE: &str = "EUR";

//--------------------------------------       Cents         ---------------------------------------------------------
/// An amount of money in minor currency units. All ledger arithmetic happens in this unit; major units only appear at
/// the payment gateway boundary.
#[derive(Debug, Clone, Copy, Default, Type, PartialEq, Eq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[sqlx(transparent)]
pub struct Cents(i64);

op!(binary Cents, Add, add);
op!(binary Cents, Sub, sub);
op!(inplace Cents, AddAssign, add_assign);
op!(inplace Cents, SubAssign, sub_assign);
op!(unary Cents, Neg, neg);

impl Mul<i64> for Cents {
    type Output = Self;

    fn mul(self, rhs: i64) -> Self::Output {
        Self::from(self.value() * rhs)
    }
}

impl Sum for Cents {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}

#[derive(Debug, Clone, Error)]
#[error("Value cannot be represented in cents: {0}")]
pub struct CentsConversionError(String);

impl From<i64> for Cents {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl Display for Cents {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{sign}€{}.{:02}", abs / 100, abs % 100)
    }
}

impl Cents {
    pub fn value(&self) -> i64 {
        self.0
    }

    pub fn from_euros(euros: i64) -> Self {
        Self(euros * 100)
    }

    /// Converts an amount given in major units (as reported by the payment gateway) into cents, rounding to the
    /// nearest cent.
    pub fn try_from_major(major: f64) -> Result<Self, CentsConversionError> {
        let cents = (major * 100.0).round();
        if !cents.is_finite() || cents > i64::MAX as f64 || cents < i64::MIN as f64 {
            return Err(CentsConversionError(format!("{major} is not a valid amount")));
        }
        #[allow(clippy::cast_possible_truncation)]
        Ok(Self(cents as i64))
    }

    /// The amount in major units. Only used when talking to the outside world.
    pub fn to_major(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    pub fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// `self * rhs`, or `None` if the result does not fit.
    pub fn checked_mul(self, rhs: i64) -> Option<Self> {
        self.0.checked_mul(rhs).map(Self)
    }

    pub fn checked_add(self, rhs: Self) -> Option<Self> {
        self.0.checked_add(rhs.0).map(Self)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn display() {
        assert_eq!(Cents::from(314).to_string(), "€3.14");
        assert_eq!(Cents::from(5).to_string(), "€0.05");
        assert_eq!(Cents::from(-100).to_string(), "-€1.00");
        assert_eq!(Cents::from_euros(12).to_string(), "€12.00");
    }

    #[test]
    fn major_unit_conversion_rounds_to_nearest_cent() {
        // 0.1 + 0.2 style float noise must not leak into the ledger
        assert_eq!(Cents::try_from_major(3.14).unwrap(), Cents::from(314));
        assert_eq!(Cents::try_from_major(0.29).unwrap(), Cents::from(29));
        assert_eq!(Cents::try_from_major(19.999).unwrap(), Cents::from(2000));
        assert!(Cents::try_from_major(f64::NAN).is_err());
        assert!(Cents::try_from_major(f64::INFINITY).is_err());
    }

    #[test]
    fn arithmetic() {
        let a = Cents::from(314);
        let b = Cents::from(1);
        assert_eq!(a - b, Cents::from(313));
        assert_eq!(-a, Cents::from(-314));
        assert_eq!(b * 20, Cents::from(20));
        let total: Cents = vec![a, b, b].into_iter().sum();
        assert_eq!(total, Cents::from(316));
        let mut c = a;
        c += b;
        c -= Cents::from(15);
        assert_eq!(c, Cents::from(300));
    }

    #[test]
    fn checked_arithmetic_reports_overflow() {
        assert_eq!(Cents::from(250).checked_mul(4), Some(Cents::from(1000)));
        assert_eq!(Cents::from(i64::MAX / 100 + 1).checked_mul(100), None);
        assert_eq!(Cents::from(i64::MAX).checked_add(Cents::from(1)), None);
        assert_eq!(Cents::from(-5).checked_add(Cents::from(5)), Some(Cents::default()));
    }

    #[test]
    fn serializes_as_plain_integer() {
        let json = serde_json::to_string(&Cents::from(42)).unwrap();
        assert_eq!(json, "42");
    }
}
