use std::{
    fmt::Display,
    iter::Sum,
    ops::{Add, AddAssign, Neg, Sub, SubAssign},
};

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sqlx::Type;
use thiserror::Error;

use crate::op;

const CENTS_PER_POINT: i64 = 100;

//--------------------------------------       Points        ---------------------------------------------------------
/// A loyalty points amount, stored as a whole number of hundredths of a point.
///
/// The accrual system and the HTTP API speak in decimal points (e.g. `729.98`), so the serde representation is a
/// floating point number. Everything else, including the database, works on the exact integer value.
#[derive(Debug, Clone, Copy, Default, Type, Ord, PartialOrd, PartialEq, Eq, Hash)]
#[sqlx(transparent)]
pub struct Points(i64);

op!(binary Points, Add, add);
op!(binary Points, Sub, sub);
op!(inplace Points, AddAssign, add_assign);
op!(inplace Points, SubAssign, sub_assign);
op!(unary Points, Neg, neg);

impl Sum for Points {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}

#[derive(Debug, Clone, Error)]
#[error("Value cannot be represented as points: {0}")]
pub struct PointsConversionError(String);

impl From<i64> for Points {
    fn from(cents: i64) -> Self {
        Self(cents)
    }
}

impl TryFrom<f64> for Points {
    type Error = PointsConversionError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        if !value.is_finite() {
            return Err(PointsConversionError(format!("{value} is not a finite number")));
        }
        let cents = (value * CENTS_PER_POINT as f64).round();
        if cents > i64::MAX as f64 || cents < i64::MIN as f64 {
            return Err(PointsConversionError(format!("{value} is out of range")));
        }
        #[allow(clippy::cast_possible_truncation)]
        Ok(Self(cents as i64))
    }
}

impl Display for Points {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        let per = CENTS_PER_POINT.unsigned_abs();
        write!(f, "{sign}{}.{:02}", abs / per, abs % per)
    }
}

impl Points {
    pub fn from_points(points: i64) -> Self {
        Self(points * CENTS_PER_POINT)
    }

    /// The raw value, in hundredths of a point
    pub fn value(&self) -> i64 {
        self.0
    }

    pub fn as_f64(&self) -> f64 {
        self.0 as f64 / CENTS_PER_POINT as f64
    }

    pub fn is_positive(&self) -> bool {
        self.0 > 0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl Serialize for Points {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.as_f64())
    }
}

impl<'de> Deserialize<'de> for Points {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = f64::deserialize(deserializer)?;
        Points::try_from(value).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn display() {
        assert_eq!(Points::from(72998).to_string(), "729.98");
        assert_eq!(Points::from(5).to_string(), "0.05");
        assert_eq!(Points::from(-150).to_string(), "-1.50");
        assert_eq!(Points::from_points(500).to_string(), "500.00");
    }

    #[test]
    fn from_decimal() {
        assert_eq!(Points::try_from(729.98).unwrap(), Points::from(72998));
        assert_eq!(Points::try_from(0.1 + 0.2).unwrap(), Points::from(30));
        assert!(Points::try_from(f64::NAN).is_err());
        assert!(Points::try_from(f64::INFINITY).is_err());
    }

    #[test]
    fn json() {
        let p: Points = serde_json::from_str("500").unwrap();
        assert_eq!(p, Points::from_points(500));
        let p: Points = serde_json::from_str("42.5").unwrap();
        assert_eq!(p.value(), 4250);
        assert_eq!(serde_json::to_string(&Points::from(4250)).unwrap(), "42.5");
    }

    #[test]
    fn arithmetic() {
        let mut a = Points::from_points(100);
        a -= Points::from_points(60);
        assert_eq!(a, Points::from_points(40));
        let total: Points = [Points::from(1), Points::from(2), Points::from(3)].into_iter().sum();
        assert_eq!(total, Points::from(6));
        assert!(!(-total).is_positive());
    }
}
