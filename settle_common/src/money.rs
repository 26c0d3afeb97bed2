use std::{
    fmt::Display,
    iter::Sum,
    ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign},
    str::FromStr,
};

use rust_decimal::{prelude::ToPrimitive, Decimal, RoundingStrategy};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sqlx::Type;
use thiserror::Error;

use crate::op;

//--------------------------------------        Money        ---------------------------------------------------------
/// A fiat amount held as a whole number of cents.
///
/// All bill arithmetic happens on cents. Conversions from decimal values (JSON payloads, chain relay strings) round
/// half-up to the nearest cent, and [`Money::pro_rata`] / [`Money::split_even`] round exactly once, at the end.
#[derive(Debug, Clone, Copy, Default, Type, PartialEq, Eq, Ord, PartialOrd, Hash)]
#[sqlx(transparent)]
pub struct Money(i64);

op!(binary Money, Add, add);
op!(binary Money, Sub, sub);
op!(inplace Money, AddAssign, add_assign);
op!(inplace Money, SubAssign, sub_assign);
op!(unary Money, Neg, neg);

impl Mul<i64> for Money {
    type Output = Self;

    fn mul(self, rhs: i64) -> Self::Output {
        Self(self.0 * rhs)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

#[derive(Debug, Clone, Error)]
#[error("Value cannot be represented as a money amount: {0}")]
pub struct MoneyConversionError(String);

impl Money {
    pub const ZERO: Money = Money(0);

    pub const fn from_cents(cents: i64) -> Self {
        Self(cents)
    }

    pub fn from_units(units: i64) -> Self {
        Self(units * 100)
    }

    pub fn cents(&self) -> i64 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn is_negative(&self) -> bool {
        self.0 < 0
    }

    pub fn abs(&self) -> Self {
        Self(self.0.abs())
    }

    /// Addition that returns `None` instead of wrapping or panicking when the result doesn't fit.
    pub fn checked_add(self, rhs: Money) -> Option<Money> {
        self.0.checked_add(rhs.0).map(Self)
    }

    pub fn to_decimal(&self) -> Decimal {
        Decimal::new(self.0, 2)
    }

    /// Converts a decimal value to cents, rounding half-up (away from zero) at the second decimal place.
    pub fn from_decimal(value: Decimal) -> Result<Self, MoneyConversionError> {
        let rounded = value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
        rounded
            .checked_mul(Decimal::ONE_HUNDRED)
            .and_then(|cents| cents.trunc().to_i64())
            .map(Self)
            .ok_or_else(|| MoneyConversionError(format!("{value} is out of range")))
    }

    /// `self * part / whole`, rounded half-up to the cent. The intermediate product is exact.
    ///
    /// Returns zero when `whole` is zero, since there is nothing to apportion.
    pub fn pro_rata(self, part: Money, whole: Money) -> Money {
        if whole.is_zero() {
            return Money::ZERO;
        }
        let numerator = i128::from(self.0) * i128::from(part.0);
        Self(round_half_up(numerator, i128::from(whole.0)))
    }

    /// `self / parts`, rounded half-up to the cent. Returns `None` if `parts` is zero.
    pub fn split_even(self, parts: u32) -> Option<Money> {
        if parts == 0 {
            return None;
        }
        Some(Self(round_half_up(i128::from(self.0), i128::from(parts))))
    }
}

/// Integer division of `numerator / denominator` with ties rounded away from zero.
#[allow(clippy::cast_possible_truncation)]
fn round_half_up(numerator: i128, denominator: i128) -> i64 {
    let negative = (numerator < 0) != (denominator < 0);
    let (n, d) = (numerator.abs(), denominator.abs());
    let mut quotient = n / d;
    if (n % d) * 2 >= d {
        quotient += 1;
    }
    let quotient = if negative { -quotient } else { quotient };
    quotient as i64
}

impl From<i64> for Money {
    fn from(cents: i64) -> Self {
        Self(cents)
    }
}

impl TryFrom<Decimal> for Money {
    type Error = MoneyConversionError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::from_decimal(value)
    }
}

impl FromStr for Money {
    type Err = MoneyConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = Decimal::from_str(s.trim()).map_err(|e| MoneyConversionError(format!("{s}: {e}")))?;
        Self::from_decimal(value)
    }
}

impl Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{sign}{}.{:02}", abs / 100, abs % 100)
    }
}

impl Serialize for Money {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        Serialize::serialize(&self.to_decimal(), serializer)
    }
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = <Decimal as Deserialize>::deserialize(deserializer)?;
        Money::from_decimal(value).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn display() {
        assert_eq!(Money::from_cents(10_000).to_string(), "100.00");
        assert_eq!(Money::from_cents(3334).to_string(), "33.34");
        assert_eq!(Money::from_cents(5).to_string(), "0.05");
        assert_eq!(Money::from_cents(-5).to_string(), "-0.05");
        assert_eq!(Money::from_cents(-1234).to_string(), "-12.34");
    }

    #[test]
    fn parse_rounds_half_up() {
        assert_eq!(Money::from_str("12.345").unwrap(), Money::from_cents(1235));
        assert_eq!(Money::from_str("12.344").unwrap(), Money::from_cents(1234));
        assert_eq!(Money::from_str("60").unwrap(), Money::from_units(60));
        assert_eq!(Money::from_str("-0.005").unwrap(), Money::from_cents(-1));
        assert!(Money::from_str("sixty").is_err());
    }

    #[test]
    fn even_split() {
        let total = Money::from_units(100);
        assert_eq!(total.split_even(3), Some(Money::from_cents(3333)));
        assert_eq!(Money::from_cents(5).split_even(2), Some(Money::from_cents(3)));
        assert_eq!(total.split_even(0), None);
    }

    #[test]
    fn checked_addition() {
        assert_eq!(Money::from_units(1).checked_add(Money::from_cents(1)), Some(Money::from_cents(101)));
        assert_eq!(Money::from_cents(i64::MAX).checked_add(Money::from_cents(1)), None);
        assert!(Money::from_str("79228162514264337593543950335").is_err());
    }

    #[test]
    fn pro_rata_is_exact_until_rounding() {
        // 6.00 tax, paying 40.00 of 60.00 => 4.00
        let tax = Money::from_units(6);
        assert_eq!(tax.pro_rata(Money::from_units(40), Money::from_units(60)), Money::from_units(4));
        // 1.00 * 1/3 = 0.333.. => 0.33
        assert_eq!(Money::from_units(1).pro_rata(Money::from_cents(1), Money::from_cents(3)), Money::from_cents(33));
        // 0.05 * 1/2 = 0.025 => 0.03
        assert_eq!(Money::from_cents(5).pro_rata(Money::from_cents(1), Money::from_cents(2)), Money::from_cents(3));
        assert_eq!(tax.pro_rata(Money::from_units(1), Money::ZERO), Money::ZERO);
    }

    #[test]
    fn serde_round_trip_uses_decimal_strings() {
        let json = serde_json::to_string(&Money::from_cents(5500)).unwrap();
        assert_eq!(json, "\"55.00\"");
        let m: Money = serde_json::from_str("\"65.00\"").unwrap();
        assert_eq!(m, Money::from_units(65));
        let m: Money = serde_json::from_str("12.5").unwrap();
        assert_eq!(m, Money::from_cents(1250));
    }

    #[test]
    fn arithmetic() {
        let mut a = Money::from_units(50);
        a += Money::from_units(5);
        assert_eq!(a, Money::from_units(55));
        a -= Money::from_units(10);
        assert_eq!(a - Money::from_units(45), Money::ZERO);
        let total: Money = [Money::from_cents(3333), Money::from_cents(3333), Money::from_cents(3334)].iter().sum();
        assert_eq!(total, Money::from_units(100));
        assert_eq!(-Money::from_cents(3), Money::from_cents(-3));
    }
}
