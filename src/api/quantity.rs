// Copyright 2024 The Kubernetes Authors.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Exact resource quantities.
//!
//! A [`Quantity`] is parsed from the usual Kubernetes notation (`2`, `500m`,
//! `1.5Gi`, `10G`, `1e3`) and stored as an integer number of milli-units.
//! Quota accounting sums many of these, so all arithmetic stays in integers;
//! fractions below one milli-unit are rounded up, as the apiserver does.

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign};
use std::str::FromStr;
use thiserror::Error;

/// QuantityError is returned for strings that are not valid quantities.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QuantityError {
    #[error("quantity is empty")]
    Empty,
    #[error("quantity {0:?} has an invalid number")]
    InvalidNumber(String),
    #[error("quantity {0:?} has an unknown suffix")]
    UnknownSuffix(String),
    #[error("quantity {0:?} is out of range")]
    OutOfRange(String),
}

/// Quantity is an exact, fixed-point amount of a resource.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Quantity {
    milli: i128,
}

impl Quantity {
    pub const ZERO: Quantity = Quantity { milli: 0 };

    /// A quantity of whole units.
    pub fn from_units(units: i64) -> Self {
        Self {
            milli: i128::from(units) * 1000,
        }
    }

    pub fn milli_value(&self) -> i128 {
        self.milli
    }

    /// Multiplies the quantity by a worker count without leaving integer
    /// arithmetic. Saturates instead of overflowing.
    pub fn times(self, count: i64) -> Self {
        Self {
            milli: self.milli.saturating_mul(i128::from(count)),
        }
    }
}

impl Add for Quantity {
    type Output = Quantity;

    fn add(self, rhs: Quantity) -> Quantity {
        Quantity {
            milli: self.milli.saturating_add(rhs.milli),
        }
    }
}

impl AddAssign for Quantity {
    fn add_assign(&mut self, rhs: Quantity) {
        *self = *self + rhs;
    }
}

impl Sum for Quantity {
    fn sum<I: Iterator<Item = Quantity>>(iter: I) -> Quantity {
        iter.fold(Quantity::ZERO, Add::add)
    }
}

impl<'a> Sum<&'a Quantity> for Quantity {
    fn sum<I: Iterator<Item = &'a Quantity>>(iter: I) -> Quantity {
        iter.copied().sum()
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.milli % 1000 == 0 {
            write!(f, "{}", self.milli / 1000)
        } else {
            write!(f, "{}m", self.milli)
        }
    }
}

/// Returns the multiplier of a suffix as (numerator, denominator).
fn suffix_multiplier(suffix: &str) -> Option<(i128, i128)> {
    let m = match suffix {
        "" => (1, 1),
        "m" => (1, 1000),
        "k" => (1_000, 1),
        "M" => (1_000_000, 1),
        "G" => (1_000_000_000, 1),
        "T" => (1_000_000_000_000, 1),
        "P" => (1_000_000_000_000_000, 1),
        "E" => (1_000_000_000_000_000_000, 1),
        "Ki" => (1 << 10, 1),
        "Mi" => (1 << 20, 1),
        "Gi" => (1 << 30, 1),
        "Ti" => (1 << 40, 1),
        "Pi" => (1 << 50, 1),
        "Ei" => (1 << 60, 1),
        _ => return None,
    };
    Some(m)
}

impl FromStr for Quantity {
    type Err = QuantityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(QuantityError::Empty);
        }
        let out_of_range = || QuantityError::OutOfRange(s.to_string());

        let (negative, rest) = match s.as_bytes()[0] {
            b'-' => (true, &s[1..]),
            b'+' => (false, &s[1..]),
            _ => (false, s),
        };

        let number_end = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(rest.len());
        let (number, suffix) = rest.split_at(number_end);
        if number.is_empty() || number.matches('.').count() > 1 || number == "." {
            return Err(QuantityError::InvalidNumber(s.to_string()));
        }

        let (whole, fraction) = number.split_once('.').unwrap_or((number, ""));
        let digits = format!("{}{}", whole, fraction);
        let mut mantissa: i128 = digits
            .parse()
            .map_err(|_| QuantityError::InvalidNumber(s.to_string()))?;
        let mut denominator: i128 = 10i128
            .checked_pow(fraction.len() as u32)
            .ok_or_else(out_of_range)?;

        // "1e3" style exponents; a bare "E" is the exa suffix.
        let (num, den) = match suffix.strip_prefix(['e', 'E']) {
            Some(exp) if !exp.is_empty() => {
                let exp: i32 = exp
                    .parse()
                    .map_err(|_| QuantityError::UnknownSuffix(s.to_string()))?;
                let pow = 10i128
                    .checked_pow(exp.unsigned_abs())
                    .ok_or_else(out_of_range)?;
                if exp >= 0 {
                    (pow, 1)
                } else {
                    (1, pow)
                }
            }
            _ => suffix_multiplier(suffix)
                .ok_or_else(|| QuantityError::UnknownSuffix(s.to_string()))?,
        };

        mantissa = mantissa
            .checked_mul(num)
            .and_then(|v| v.checked_mul(1000))
            .ok_or_else(out_of_range)?;
        denominator = denominator.checked_mul(den).ok_or_else(out_of_range)?;

        // Round up to the next milli-unit.
        let mut milli = mantissa / denominator;
        if mantissa % denominator != 0 {
            milli += 1;
        }
        if negative {
            milli = -milli;
        }
        Ok(Quantity { milli })
    }
}

impl Serialize for Quantity {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

struct QuantityVisitor;

impl<'de> Visitor<'de> for QuantityVisitor {
    type Value = Quantity;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a quantity string or an integer")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Quantity, E> {
        v.parse().map_err(E::custom)
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Quantity, E> {
        Ok(Quantity::from_units(v))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Quantity, E> {
        i64::try_from(v)
            .map(Quantity::from_units)
            .map_err(|_| E::custom("quantity out of range"))
    }
}

impl<'de> Deserialize<'de> for Quantity {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(QuantityVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn q(s: &str) -> Quantity {
        s.parse().unwrap()
    }

    #[test]
    fn test_parse_plain_and_milli() {
        assert_eq!(q("2").milli_value(), 2000);
        assert_eq!(q("500m").milli_value(), 500);
        assert_eq!(q("0.5").milli_value(), 500);
        assert_eq!(q("-1").milli_value(), -1000);
    }

    #[test]
    fn test_parse_suffixes() {
        assert_eq!(q("1Ki").milli_value(), 1024 * 1000);
        assert_eq!(q("1.5Gi").milli_value(), 3 * (1i128 << 29) * 1000);
        assert_eq!(q("10G").milli_value(), 10_000_000_000_000);
        assert_eq!(q("1e3").milli_value(), 1_000_000);
        assert_eq!(q("1E").milli_value(), 1_000_000_000_000_000_000_000);
    }

    #[test]
    fn test_parse_rounds_up_sub_milli() {
        assert_eq!(q("0.0001").milli_value(), 1);
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!("".parse::<Quantity>(), Err(QuantityError::Empty));
        assert!(matches!(
            "abc".parse::<Quantity>(),
            Err(QuantityError::InvalidNumber(_))
        ));
        assert!(matches!(
            "1Xi".parse::<Quantity>(),
            Err(QuantityError::UnknownSuffix(_))
        ));
        assert!(matches!(
            "1.2.3".parse::<Quantity>(),
            Err(QuantityError::InvalidNumber(_))
        ));
    }

    #[test]
    fn test_exact_sums() {
        let tenth = q("100m");
        let total: Quantity = std::iter::repeat(tenth).take(10).sum();
        assert_eq!(total, q("1"));
        assert_eq!(q("2").times(3), q("6"));
    }

    #[test]
    fn test_display() {
        assert_eq!(q("2").to_string(), "2");
        assert_eq!(q("250m").to_string(), "250m");
    }

    #[test]
    fn test_serde() {
        let parsed: Vec<Quantity> = serde_json::from_str(r#"["1Gi", 4]"#).unwrap();
        assert_eq!(parsed[0], q("1Gi"));
        assert_eq!(parsed[1], q("4"));
        assert_eq!(serde_json::to_string(&q("1500m")).unwrap(), r#""1500m""#);
    }
}
