use std::{
    fmt::Display,
    iter::Sum,
    ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign},
};

use serde::{Deserialize, Serialize};
use sqlx::Type;
use thiserror::Error;

use crate::op;

pub const RUPEE_CURRENCY_CODE: &str = "Rs";

//--------------------------------------      Rupees       -----------------------------------------------------------
/// A whole-rupee monetary amount. All ledger arithmetic is integer arithmetic; there are no fractional rupees in the
/// mess ledger, so there is no rounding loss anywhere in the settlement path.
#[derive(Debug, Clone, Copy, Default, Type, Ord, PartialOrd, Serialize, Deserialize)]
#[sqlx(transparent)]
pub struct Rupees(i64);

op!(binary Rupees, Add, add);
op!(binary Rupees, Sub, sub);
op!(inplace Rupees, AddAssign, add_assign);
op!(inplace Rupees, SubAssign, sub_assign);
op!(unary Rupees, Neg, neg);

impl Mul<i64> for Rupees {
    type Output = Self;

    fn mul(self, rhs: i64) -> Self::Output {
        Self::from(self.value() * rhs)
    }
}

impl Sum for Rupees {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}

#[derive(Debug, Clone, Error)]
#[error("Value cannot be represented in rupees: {0}")]
pub struct RupeesConversionError(String);

impl From<i64> for Rupees {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl PartialEq for Rupees {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl Eq for Rupees {}

impl TryFrom<u64> for Rupees {
    type Error = RupeesConversionError;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        if value > i64::MAX as u64 {
            Err(RupeesConversionError(format!("Value {} is too large to convert to Rupees", value)))
        } else {
            #[allow(clippy::cast_possible_wrap)]
            Ok(Self(value as i64))
        }
    }
}

impl Display for Rupees {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{RUPEE_CURRENCY_CODE} {}", self.0)
    }
}

impl Rupees {
    pub fn value(&self) -> i64 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// The smaller of `self` and `other`.
    pub fn min(self, other: Self) -> Self {
        if self.0 <= other.0 {
            self
        } else {
            other
        }
    }

    /// Clamps negative amounts to zero. Used as a defensive floor on ledger debits.
    pub fn floor_zero(self) -> Self {
        if self.0 < 0 {
            Self(0)
        } else {
            self
        }
    }

    /// Overflow-aware multiplication. `None` means the product cannot be represented; callers pricing untrusted
    /// input must use this rather than `*`.
    pub fn checked_mul(self, rhs: i64) -> Option<Self> {
        self.0.checked_mul(rhs).map(Self)
    }

    /// Overflow-aware addition. See [`Rupees::checked_mul`].
    pub fn checked_add(self, rhs: Self) -> Option<Self> {
        self.0.checked_add(rhs.0).map(Self)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn arithmetic() {
        let a = Rupees::from(1500);
        let b = Rupees::from(1000);
        assert_eq!(a - b, Rupees::from(500));
        assert_eq!(a + b, Rupees::from(2500));
        assert_eq!(b * 3, Rupees::from(3000));
        assert_eq!(a.min(b), b);
        assert_eq!((b - a).floor_zero(), Rupees::from(0));
    }

    #[test]
    fn checked_arithmetic_reports_overflow() {
        let huge = Rupees::from(i64::MAX / 2);
        assert!(huge.checked_mul(3).is_none());
        assert!(huge.checked_add(huge).is_some());
        assert!(Rupees::from(i64::MAX).checked_add(Rupees::from(1)).is_none());
        assert_eq!(Rupees::from(40).checked_mul(3), Some(Rupees::from(120)));
    }

    #[test]
    fn summing() {
        let total: Rupees = [120, 80, 300].into_iter().map(Rupees::from).sum();
        assert_eq!(total, Rupees::from(500));
    }

    #[test]
    fn display() {
        assert_eq!(Rupees::from(250).to_string(), "Rs 250");
    }
}
