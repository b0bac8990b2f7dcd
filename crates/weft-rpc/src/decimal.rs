//! Exact arbitrary-precision decimal numbers.
//!
//! A [`Decimal`] is a sign, a string of significant digits and a scale, so
//! `12.50` is stored as `1250` with scale `2` and `1.2E+7` as `12` with scale
//! `-6`. Neither the digit count nor the scale is bounded by a machine
//! integer width. Parsing and formatting are exact and keep the scale, which
//! lets a decimal cross the wire as text and come back with the same digits.
//!
//! Formatting follows the usual decimal text convention: plain notation when
//! the scale is non-negative and the value is not tiny, scientific notation
//! (`1.23E+5`, `0E-50`) otherwise.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Smallest adjusted exponent still written in plain notation.
const PLAIN_EXPONENT_FLOOR: i128 = -6;

/// Exact decimal value of any precision.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Decimal {
    negative: bool,
    digits: String,
    scale: i64,
}

/// Errors raised while parsing a [`Decimal`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecimalError {
    /// The input contained no digits.
    #[error("decimal text is empty")]
    Empty,
    /// The input contained a character that is not part of a decimal.
    #[error("unexpected character {0:?} in decimal text")]
    InvalidCharacter(char),
    /// The exponent suffix could not be parsed.
    #[error("invalid exponent '{0}'")]
    InvalidExponent(String),
    /// The exponent and fraction length do not combine into a 64-bit scale.
    #[error("decimal exponent is out of range")]
    ExponentOverflow,
}

impl Decimal {
    /// Builds a decimal from an unscaled integer and a scale.
    #[must_use]
    pub fn new(unscaled: i128, scale: i64) -> Self {
        Self::from_parts(unscaled < 0, unscaled.unsigned_abs().to_string(), scale)
    }

    fn from_parts(negative: bool, digits: String, scale: i64) -> Self {
        let significant = digits.trim_start_matches('0');
        if significant.is_empty() {
            return Self {
                negative: false,
                digits: "0".to_owned(),
                scale,
            };
        }
        let digits = if significant.len() == digits.len() {
            digits
        } else {
            significant.to_owned()
        };
        Self {
            negative,
            digits,
            scale,
        }
    }

    /// Significant digits of the unscaled value, without sign.
    #[must_use]
    pub fn digits(&self) -> &str {
        &self.digits
    }

    /// Number of fractional digits; negative for multiples of powers of ten.
    #[must_use]
    pub const fn scale(&self) -> i64 {
        self.scale
    }

    /// Returns `true` for values below zero. Zero is never negative.
    #[must_use]
    pub const fn is_negative(&self) -> bool {
        self.negative
    }

    /// Number of significant digits in the unscaled value.
    #[must_use]
    pub fn precision(&self) -> usize {
        self.digits.len()
    }

    /// Returns `true` when the value is zero at any scale.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.digits == "0"
    }

    /// Unscaled value when it fits an `i128`.
    #[must_use]
    pub fn unscaled(&self) -> Option<i128> {
        let magnitude: i128 = self.digits.parse().ok()?;
        Some(if self.negative { -magnitude } else { magnitude })
    }

    fn adjusted_exponent(&self) -> i128 {
        let length = i128::try_from(self.digits.len()).unwrap_or(i128::MAX);
        length - 1 - i128::from(self.scale)
    }
}

impl From<i64> for Decimal {
    fn from(value: i64) -> Self {
        Self::new(i128::from(value), 0)
    }
}

impl FromStr for Decimal {
    type Err = DecimalError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let text = input.trim();
        let (negative, body) = match text.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, text.strip_prefix('+').unwrap_or(text)),
        };

        let (mantissa, exponent) = match body.split_once(|c| c == 'e' || c == 'E') {
            Some((mantissa, exponent)) => {
                let parsed = exponent
                    .parse::<i64>()
                    .map_err(|_| DecimalError::InvalidExponent(exponent.to_owned()))?;
                (mantissa, parsed)
            }
            None => (body, 0),
        };

        let (integer, fraction) = mantissa.split_once('.').unwrap_or((mantissa, ""));
        if integer.is_empty() && fraction.is_empty() {
            return Err(DecimalError::Empty);
        }
        if let Some(invalid) = integer
            .chars()
            .chain(fraction.chars())
            .find(|ch| !ch.is_ascii_digit())
        {
            return Err(DecimalError::InvalidCharacter(invalid));
        }

        let scale = i64::try_from(fraction.len())
            .ok()
            .and_then(|length| length.checked_sub(exponent))
            .ok_or(DecimalError::ExponentOverflow)?;
        let mut digits = String::with_capacity(integer.len() + fraction.len());
        digits.push_str(integer);
        digits.push_str(fraction);
        Ok(Self::from_parts(negative, digits, scale))
    }
}

impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.negative {
            f.write_str("-")?;
        }
        let adjusted = self.adjusted_exponent();
        if self.scale < 0 || adjusted < PLAIN_EXPONENT_FLOOR {
            let (lead, rest) = self.digits.split_at(1);
            f.write_str(lead)?;
            if !rest.is_empty() {
                write!(f, ".{rest}")?;
            }
            return write!(f, "E{adjusted:+}");
        }

        let scale = usize::try_from(self.scale).map_err(|_| fmt::Error)?;
        let length = self.digits.len();
        if scale == 0 {
            f.write_str(&self.digits)
        } else if length > scale {
            let (integer, fraction) = self.digits.split_at(length - scale);
            write!(f, "{integer}.{fraction}")
        } else {
            let padding = "0".repeat(scale - length);
            write!(f, "0.{padding}{}", self.digits)
        }
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("0", "0", 0)]
    #[case("12.50", "1250", 2)]
    #[case("-0.001", "1", 3)]
    #[case("+7", "7", 0)]
    #[case(".5", "5", 1)]
    #[case("3.", "3", 0)]
    #[case("007.20", "720", 2)]
    #[case("1.5e2", "15", -1)]
    #[case("1.5E-3", "15", 4)]
    fn parses_exact_representation(
        #[case] input: &str,
        #[case] digits: &str,
        #[case] scale: i64,
    ) {
        let decimal = Decimal::from_str(input).expect("parse");
        assert_eq!(decimal.digits(), digits);
        assert_eq!(decimal.scale(), scale);
    }

    #[rstest]
    #[case(Decimal::new(1250, 2), "12.50")]
    #[case(Decimal::new(-1, 3), "-0.001")]
    #[case(Decimal::new(42, 0), "42")]
    #[case(Decimal::new(5, 1), "0.5")]
    #[case(Decimal::new(123, -3), "1.23E+5")]
    #[case(Decimal::new(1, 8), "1E-8")]
    #[case(Decimal::new(0, 2), "0.00")]
    fn formats_with_scale(#[case] decimal: Decimal, #[case] expected: &str) {
        assert_eq!(decimal.to_string(), expected);
    }

    #[rstest]
    #[case("", DecimalError::Empty)]
    #[case("-", DecimalError::Empty)]
    #[case("1.2.3", DecimalError::InvalidCharacter('.'))]
    #[case("12a", DecimalError::InvalidCharacter('a'))]
    #[case("1e", DecimalError::InvalidExponent(String::new()))]
    #[case("1.5e-9223372036854775808", DecimalError::ExponentOverflow)]
    fn rejects_invalid_text(#[case] input: &str, #[case] expected: DecimalError) {
        assert_eq!(Decimal::from_str(input), Err(expected));
    }

    #[rstest]
    #[case("1234567890123456789012345678901234567890")]
    #[case("-98765432109876543210987654321098765432109876543210.0123456789")]
    #[case("0.000000000000000000000000000000000000000000000000001")]
    #[case("0E+50")]
    #[case("0E-50")]
    #[case("-4.2E+1000")]
    #[case("9.99E-400")]
    fn wide_values_round_trip(#[case] text: &str) {
        let decimal = Decimal::from_str(text).expect("parse");
        let reparsed = Decimal::from_str(&decimal.to_string()).expect("reparse");
        assert_eq!(reparsed, decimal);
    }

    #[test]
    fn zero_with_exponent_keeps_its_scale() {
        let large = Decimal::from_str("0E+50").expect("parse");
        assert!(large.is_zero());
        assert_eq!(large.scale(), -50);
        assert_eq!(large.to_string(), "0E+50");

        let small = Decimal::from_str("-0E-50").expect("parse");
        assert!(!small.is_negative());
        assert_eq!(small.scale(), 50);
        assert_eq!(small.to_string(), "0E-50");
    }

    #[test]
    fn forty_digits_keep_every_digit() {
        let text = "1234567890123456789012345678901234567890";
        let decimal = Decimal::from_str(text).expect("parse");
        assert_eq!(decimal.precision(), 40);
        assert_eq!(decimal.unscaled(), None);
        assert_eq!(decimal.to_string(), text);
    }

    #[test]
    fn unscaled_is_available_within_i128() {
        let decimal = Decimal::from_str("-12345678901234567890123456789.01234567").expect("parse");
        assert_eq!(
            decimal.unscaled(),
            Some(-1_234_567_890_123_456_789_012_345_678_901_234_567)
        );
        assert_eq!(decimal.scale(), 8);
    }

    #[test]
    fn scale_is_significant_for_equality() {
        let one = Decimal::from_str("1.5").expect("parse");
        let padded = Decimal::from_str("1.50").expect("parse");
        assert_ne!(one, padded);
    }

    proptest! {
        #[test]
        fn text_round_trips(
            negative in any::<bool>(),
            digits in "[1-9][0-9]{0,80}",
            scale in -200_i64..=200,
        ) {
            let sign = if negative { "-" } else { "" };
            let decimal = Decimal::from_str(&format!("{sign}{digits}E{}", -scale)).expect("parse");
            prop_assert_eq!(decimal.scale(), scale);
            let parsed = Decimal::from_str(&decimal.to_string()).expect("reparse");
            prop_assert_eq!(parsed, decimal);
        }
    }
}
