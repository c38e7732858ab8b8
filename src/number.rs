// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.
#![allow(clippy::arithmetic_side_effects, clippy::as_conversions)]

use core::cmp::Ordering;
use core::fmt::{self, Debug, Display, Formatter};
use core::str::FromStr;

use num_bigint::BigInt;
use num_traits::{Signed, ToPrimitive, Zero};

use serde::ser::Serializer;
use serde::Serialize;

/// An arbitrary-precision decimal number.
///
/// The value is `mantissa * 10^-scale`. Numbers are kept normalized: a
/// non-zero scale never leaves a trailing zero in the mantissa, so two equal
/// numbers are always structurally identical.
///
/// Every protobuf numeric kind fits without loss. Integers are stored exactly
/// and binary floating point values are expanded to their exact decimal form.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Number {
    mantissa: BigInt,
    scale: u32,
}

impl Number {
    fn new(mut mantissa: BigInt, mut scale: u32) -> Self {
        if mantissa.is_zero() {
            return Number::zero();
        }

        let ten = BigInt::from(10u8);
        while scale > 0 && (&mantissa % &ten).is_zero() {
            mantissa /= &ten;
            scale -= 1;
        }

        Number { mantissa, scale }
    }

    pub fn zero() -> Self {
        Number {
            mantissa: BigInt::zero(),
            scale: 0,
        }
    }

    /// Exact decimal expansion of a binary double.
    ///
    /// Returns `None` for NaN and the infinities, which have no decimal form.
    pub fn from_f64(value: f64) -> Option<Number> {
        if !value.is_finite() {
            return None;
        }
        if value == 0.0 {
            return Some(Number::zero());
        }

        let bits = value.to_bits();
        let negative = bits >> 63 != 0;
        let biased_exponent = ((bits >> 52) & 0x7ff) as i32;
        let fraction = bits & 0x000f_ffff_ffff_ffff;

        // Subnormals have no implicit leading bit.
        let (significand, exponent) = if biased_exponent == 0 {
            (fraction, -1074)
        } else {
            (fraction | (1u64 << 52), biased_exponent - 1075)
        };

        let mut mantissa = BigInt::from(significand);
        let scale = if exponent >= 0 {
            mantissa <<= exponent as usize;
            0
        } else {
            // m * 2^-k == m * 5^k * 10^-k
            let k = exponent.unsigned_abs();
            mantissa *= BigInt::from(5u8).pow(k);
            k
        };

        if negative {
            mantissa = -mantissa;
        }

        Some(Number::new(mantissa, scale))
    }

    /// Exact decimal expansion of a binary float.
    pub fn from_f32(value: f32) -> Option<Number> {
        Number::from_f64(f64::from(value))
    }

    pub fn is_integer(&self) -> bool {
        self.scale == 0
    }

    pub fn is_zero(&self) -> bool {
        self.mantissa.is_zero()
    }

    pub fn is_negative(&self) -> bool {
        self.mantissa.is_negative()
    }

    fn as_bigint(&self) -> Option<&BigInt> {
        if self.is_integer() {
            Some(&self.mantissa)
        } else {
            None
        }
    }

    pub fn as_big(&self) -> Option<BigInt> {
        self.as_bigint().cloned()
    }

    pub fn as_i32(&self) -> Option<i32> {
        self.as_bigint()?.to_i32()
    }

    pub fn as_i64(&self) -> Option<i64> {
        self.as_bigint()?.to_i64()
    }

    pub fn as_u32(&self) -> Option<u32> {
        self.as_bigint()?.to_u32()
    }

    pub fn as_u64(&self) -> Option<u64> {
        self.as_bigint()?.to_u64()
    }

    pub fn as_i128(&self) -> Option<i128> {
        self.as_bigint()?.to_i128()
    }

    pub fn as_u128(&self) -> Option<u128> {
        self.as_bigint()?.to_u128()
    }

    /// The nearest double, or `None` if the number lies outside the finite
    /// range of `f64`.
    pub fn as_f64(&self) -> Option<f64> {
        // Parsing the decimal text rounds correctly in a single step.
        self.format_decimal()
            .parse::<f64>()
            .ok()
            .filter(|f| f.is_finite())
    }

    /// The nearest float, or `None` if the number lies outside the finite
    /// range of `f32`.
    pub fn as_f32(&self) -> Option<f32> {
        self.format_decimal()
            .parse::<f32>()
            .ok()
            .filter(|f| f.is_finite())
    }

    pub fn format_decimal(&self) -> String {
        if self.scale == 0 {
            return self.mantissa.to_string();
        }

        let digits = self.mantissa.abs().to_string();
        let scale = self.scale as usize;
        let padded = if digits.len() <= scale {
            format!("{}{}", "0".repeat(scale + 1 - digits.len()), digits)
        } else {
            digits
        };
        let (int_part, frac_part) = padded.split_at(padded.len() - scale);
        let sign = if self.is_negative() { "-" } else { "" };
        format!("{sign}{int_part}.{frac_part}")
    }

    /// Both mantissas brought to the larger of the two scales.
    fn aligned(&self, other: &Number) -> (BigInt, BigInt) {
        match self.scale.cmp(&other.scale) {
            Ordering::Equal => (self.mantissa.clone(), other.mantissa.clone()),
            Ordering::Less => (
                &self.mantissa * pow10(other.scale - self.scale),
                other.mantissa.clone(),
            ),
            Ordering::Greater => (
                self.mantissa.clone(),
                &other.mantissa * pow10(self.scale - other.scale),
            ),
        }
    }
}

impl Debug for Number {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.format_decimal())
    }
}

impl Display for Number {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.format_decimal())
    }
}

impl Serialize for Number {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let s = self.format_decimal();
        let v = serde_json::Number::from_str(&s)
            .map_err(|_| serde::ser::Error::custom("could not serialize number"))?;
        v.serialize(serializer)
    }
}

impl Ord for Number {
    fn cmp(&self, other: &Self) -> Ordering {
        let (a, b) = self.aligned(other);
        a.cmp(&b)
    }
}

impl PartialOrd for Number {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl From<BigInt> for Number {
    fn from(value: BigInt) -> Self {
        Number::new(value, 0)
    }
}

macro_rules! number_from_int {
    ($($t:ty),*) => {
        $(
            impl From<$t> for Number {
                fn from(value: $t) -> Self {
                    Number::new(BigInt::from(value), 0)
                }
            }
        )*
    };
}

number_from_int!(i32, i64, i128, u32, u64, u128, usize);

#[derive(Debug, PartialEq, Eq)]
pub struct ParseNumberError;

impl Display for ParseNumberError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str("invalid decimal number")
    }
}

impl std::error::Error for ParseNumberError {}

impl FromStr for Number {
    type Err = ParseNumberError;

    /// Parses decimal and scientific notation exactly, e.g. `-12`, `0.1`,
    /// `.5`, `1.25e-3`. Numbers whose decimal exponent exceeds 10000 in
    /// magnitude are rejected.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let (negative, unsigned) = if let Some(rest) = trimmed.strip_prefix('-') {
            (true, rest)
        } else if let Some(rest) = trimmed.strip_prefix('+') {
            (false, rest)
        } else {
            (false, trimmed)
        };

        let (mantissa, exponent) = match unsigned.split_once(['e', 'E']) {
            Some((mantissa, exponent)) => (
                mantissa,
                exponent.parse::<i64>().map_err(|_| ParseNumberError)?,
            ),
            None => (unsigned, 0),
        };

        let mut digits = String::with_capacity(mantissa.len());
        let mut fractional_len: i64 = 0;
        let mut seen_dot = false;
        for ch in mantissa.chars() {
            match ch {
                '.' if !seen_dot => seen_dot = true,
                '0'..='9' => {
                    digits.push(ch);
                    if seen_dot {
                        fractional_len += 1;
                    }
                }
                _ => return Err(ParseNumberError),
            }
        }
        if digits.is_empty() {
            return Err(ParseNumberError);
        }

        let mut value = BigInt::parse_bytes(digits.as_bytes(), 10).ok_or(ParseNumberError)?;
        if negative {
            value = -value;
        }

        if value.is_zero() {
            return Ok(Number::zero());
        }

        let scale = fractional_len
            .checked_sub(exponent)
            .ok_or(ParseNumberError)?;
        if scale < 0 {
            let exp = u32::try_from(-scale).map_err(|_| ParseNumberError)?;
            if exp > MAX_SCALE {
                return Err(ParseNumberError);
            }
            Ok(Number::new(value * pow10(exp), 0))
        } else {
            let scale = u32::try_from(scale).map_err(|_| ParseNumberError)?;
            let n = Number::new(value, scale);
            if n.scale > MAX_SCALE {
                return Err(ParseNumberError);
            }
            Ok(n)
        }
    }
}

/// Largest decimal exponent, in either direction, accepted when parsing.
///
/// Exact float expansions stay well below it: the smallest subnormal double
/// has 1074 fractional digits.
const MAX_SCALE: u32 = 10_000;

fn pow10(exp: u32) -> BigInt {
    BigInt::from(10u8).pow(exp)
}
