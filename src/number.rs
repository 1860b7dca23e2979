//! Exact decimal numbers with an optional on-chain scale.
//!
//! A number is `digits / 10^exponent`, normalized so `digits` carries no
//! trailing zeros. `scale` is the power of ten applied by [`Number::encode`];
//! `Exp 0.5` has scale 18 and encodes to `500000000000000000`.

use std::fmt;

use num_bigint::BigInt;
use num_traits::{Signed, ToPrimitive, Zero};

pub const EXP_SCALE: u32 = 18;

/// Largest power of ten a literal may shift by in either direction.
const MAX_EXPONENT: i64 = 256;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Number {
    digits: BigInt,
    exponent: u32,
    scale: Option<u32>,
}

impl Number {
    pub fn from_integer(value: impl Into<BigInt>) -> Self {
        Number::new(value.into(), 0, None)
    }

    /// Reads back an on-chain mantissa at the given scale.
    pub fn from_encoded(mantissa: BigInt, scale: u32) -> Self {
        Number::new(mantissa, scale, Some(scale))
    }

    fn new(digits: BigInt, exponent: u32, scale: Option<u32>) -> Self {
        let mut number = Number {
            digits,
            exponent,
            scale,
        };
        number.normalize();
        number
    }

    fn normalize(&mut self) {
        if self.digits.is_zero() {
            self.exponent = 0;
            return;
        }
        let ten = BigInt::from(10u32);
        while self.exponent > 0 && (&self.digits % &ten).is_zero() {
            self.digits /= &ten;
            self.exponent -= 1;
        }
    }

    /// Parses `12`, `-0.5`, `1.0e18`, `5e-1` and `25%` (a quarter).
    pub fn parse(text: &str) -> Option<Number> {
        let (body, percent) = match text.strip_suffix('%') {
            Some(body) => (body, true),
            None => (text, false),
        };
        let (negative, body) = match body.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, body.strip_prefix('+').unwrap_or(body)),
        };
        let (mantissa, exp) = match body.split_once(['e', 'E']) {
            Some((m, e)) => (m, e.parse::<i64>().ok()?),
            None => (body, 0),
        };
        let (whole, frac) = match mantissa.split_once('.') {
            Some((w, f)) => (w, f),
            None => (mantissa, ""),
        };
        if whole.is_empty() && frac.is_empty() {
            return None;
        }
        if !whole.chars().chain(frac.chars()).all(|c| c.is_ascii_digit()) {
            return None;
        }
        let mut digits: BigInt = format!("{whole}{frac}").parse().ok()?;
        if negative {
            digits = -digits;
        }
        let mut exponent = i64::try_from(frac.len())
            .ok()?
            .checked_sub(exp)?
            .checked_add(if percent { 2 } else { 0 })?;
        if exponent.abs() > MAX_EXPONENT {
            return None;
        }
        if exponent < 0 {
            digits *= pow10(u32::try_from(-exponent).ok()?);
            exponent = 0;
        }
        Some(Number::new(digits, u32::try_from(exponent).ok()?, None))
    }

    pub fn with_scale(mut self, scale: u32) -> Self {
        self.scale = Some(scale);
        self
    }

    pub fn scale(&self) -> Option<u32> {
        self.scale
    }

    /// Divides by one hundred.
    pub fn percent(mut self) -> Self {
        self.exponent += 2;
        self.normalize();
        self
    }

    pub fn is_integer(&self) -> bool {
        self.exponent == 0
    }

    /// The exact integer this number denotes on chain: `floor(value * 10^scale)`.
    pub fn encode(&self) -> BigInt {
        let scaled = &self.digits * pow10(self.scale.unwrap_or(0));
        floor_div(scaled, pow10(self.exponent))
    }

    pub fn to_u64(&self) -> Option<u64> {
        if self.is_integer() {
            self.digits.to_u64()
        } else {
            None
        }
    }

    /// Equality of the denoted quantity, ignoring scale.
    pub fn same_value(&self, other: &Number) -> bool {
        self.digits == other.digits && self.exponent == other.exponent
    }

    /// Human-readable decimal with trailing zeros trimmed.
    pub fn show(&self) -> String {
        let magnitude = self.digits.abs().to_string();
        let sign = if self.digits.is_negative() { "-" } else { "" };
        let places = self.exponent as usize;
        if places == 0 {
            return format!("{sign}{magnitude}");
        }
        let padded = if magnitude.len() <= places {
            format!("{}{magnitude}", "0".repeat(places - magnitude.len() + 1))
        } else {
            magnitude
        };
        let (whole, frac) = padded.split_at(padded.len() - places);
        format!("{sign}{whole}.{frac}")
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.show())
    }
}

pub(crate) fn pow10(exponent: u32) -> BigInt {
    BigInt::from(10u32).pow(exponent)
}

fn floor_div(numerator: BigInt, denominator: BigInt) -> BigInt {
    let quotient = &numerator / &denominator;
    if numerator.is_negative() && !(&numerator % &denominator).is_zero() {
        quotient - 1
    } else {
        quotient
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn num(text: &str) -> Number {
        Number::parse(text).expect("number literal")
    }

    #[test]
    fn half_at_exp_scale_round_trips() {
        let half = num("0.5").with_scale(EXP_SCALE);
        let encoded = half.encode();
        assert_eq!(encoded.to_string(), "500000000000000000");
        assert_eq!(Number::from_encoded(encoded, EXP_SCALE).show(), "0.5");
    }

    #[test]
    fn exponent_and_percent_literals() {
        assert_eq!(num("1.0e18").encode().to_string(), "1000000000000000000");
        assert_eq!(num("5e-1").show(), "0.5");
        assert_eq!(num("25%").show(), "0.25");
        assert_eq!(
            num("25%").with_scale(EXP_SCALE).encode().to_string(),
            "250000000000000000"
        );
        assert_eq!(num("0.1").with_scale(EXP_SCALE).encode().to_string(), "100000000000000000");
    }

    #[test]
    fn out_of_range_exponents_are_not_numbers() {
        assert_eq!(Number::parse("1e4294967306"), None);
        assert_eq!(Number::parse("1e-3000000000"), None);
        assert_eq!(Number::parse("1e9223372036854775807"), None);
        assert_eq!(Number::parse(&format!("0.{}1", "0".repeat(300))), None);
        assert_eq!(num("1e256").encode(), pow10(256));
        assert_eq!(num("1e-256").with_scale(256).encode(), BigInt::from(1));
    }

    #[test]
    fn encode_floors_excess_precision() {
        assert_eq!(num("1.9").encode(), BigInt::from(1));
        assert_eq!(num("-1.5").encode(), BigInt::from(-2));
        assert_eq!(num("0.0000001").with_scale(6).encode(), BigInt::from(0));
    }

    #[test]
    fn show_keeps_sign_and_leading_zeros() {
        assert_eq!(num("-0.05").show(), "-0.05");
        assert_eq!(num("100").show(), "100");
        assert_eq!(num("10.50").show(), "10.5");
        assert_eq!(num("0").show(), "0");
    }

    #[test]
    fn rejects_non_numeric_text() {
        for text in ["ZRX", "", ".", "1.2.3", "0x12", "e5", "1e", "--1"] {
            assert!(Number::parse(text).is_none(), "{text} parsed");
        }
    }

    #[test]
    fn same_value_ignores_scale() {
        assert!(num("0.5").with_scale(18).same_value(&num("50%")));
        assert_eq!(num("18").to_u64(), Some(18));
        assert_eq!(num("1.5").to_u64(), None);
    }
}
