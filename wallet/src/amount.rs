//! Token amount conversion
//!
//! Amounts are entered and displayed as decimal token values but handled
//! internally as canonical integers: the token value scaled by 10^10. All
//! fee and total arithmetic happens on the canonical form.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::str::FromStr;
use thiserror::Error;

/// Number of decimal places carried by a canonical amount.
pub const CANONICAL_DECIMALS: u32 = 10;

/// Scale factor between a token value and its canonical integer form.
pub const CANONICAL_SCALE: u64 = 10_000_000_000;

/// Unit label appended by [`format_amount`].
pub const TOKEN_SYMBOL: &str = "FET";

/// Minimum column width of the integer part in [`format_amount`].
const INTEGER_COLUMN_WIDTH: usize = 10;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConversionError {
    #[error("Unable to parse '{0}' as a number")]
    InvalidNumber(String),

    #[error("Unable to convert negative number to canonical")]
    Negative,

    #[error("Value {0} is below the minimum representable amount")]
    BelowMinimum(String),

    #[error("Value {0} has more than 10 decimal places")]
    ExcessPrecision(Decimal),

    #[error("Value is too large to be represented")]
    Overflow,
}

fn scale() -> Decimal {
    Decimal::from(CANONICAL_SCALE)
}

/// Smallest positive amount: one canonical unit.
pub fn minimum_amount() -> Decimal {
    Decimal::new(1, CANONICAL_DECIMALS)
}

/// Parse a user supplied amount. Accepts plain (`1.25`) and scientific
/// (`1e-9`) notation.
pub fn parse_amount(input: &str) -> Result<Decimal, ConversionError> {
    let trimmed = input.trim();
    Decimal::from_str(trimmed)
        .or_else(|_| Decimal::from_scientific(trimmed))
        .map_err(|_| {
            out_of_range(trimmed)
                .unwrap_or_else(|| ConversionError::InvalidNumber(input.to_string()))
        })
}

/// Classify well-formed numeric input that `Decimal` cannot hold, by the
/// order of magnitude of its leading digit. `None` if the input is not a
/// number at all.
fn out_of_range(input: &str) -> Option<ConversionError> {
    let (mantissa, exponent) = match input.find(|c: char| c == 'e' || c == 'E') {
        Some(i) => (&input[..i], input[i + 1..].parse::<i64>().ok()?),
        None => (input, 0),
    };

    let negative = mantissa.starts_with('-');
    let unsigned = mantissa.strip_prefix(|c: char| c == '-' || c == '+').unwrap_or(mantissa);
    let (integral, fraction) = unsigned.split_once('.').unwrap_or((unsigned, ""));
    let mut digits = integral.chars().chain(fraction.chars());
    if integral.len() + fraction.len() == 0 || !digits.all(|c| c.is_ascii_digit()) {
        return None;
    }

    let integral = integral.trim_start_matches('0');
    if !integral.is_empty() {
        if negative {
            return Some(ConversionError::Negative);
        }
        let order = (integral.len() as i64).saturating_add(exponent);
        return Some(if order > 0 {
            ConversionError::Overflow
        } else {
            ConversionError::BelowMinimum(input.to_string())
        });
    }

    let leading_zeros = fraction.len() - fraction.trim_start_matches('0').len();
    if leading_zeros == fraction.len() {
        // zero in any notation
        return Some(ConversionError::BelowMinimum(input.to_string()));
    }
    if negative {
        return Some(ConversionError::Negative);
    }
    let order = exponent.saturating_sub(leading_zeros as i64);
    Some(if order > 0 {
        ConversionError::Overflow
    } else {
        ConversionError::BelowMinimum(input.to_string())
    })
}

/// Convert a token value into canonical units.
pub fn to_canonical(value: Decimal) -> Result<u64, ConversionError> {
    if value.is_sign_negative() && !value.is_zero() {
        return Err(ConversionError::Negative);
    }
    if value < minimum_amount() {
        return Err(ConversionError::BelowMinimum(value.to_string()));
    }

    let scaled = value
        .checked_mul(scale())
        .ok_or(ConversionError::Overflow)?;
    if !scaled.fract().is_zero() {
        return Err(ConversionError::ExcessPrecision(value));
    }

    scaled.to_u64().ok_or(ConversionError::Overflow)
}

/// Convert a canonical amount back into a token value.
pub fn from_canonical(value: i128) -> Result<Decimal, ConversionError> {
    if value < 0 {
        return Err(ConversionError::Negative);
    }

    Decimal::try_from_i128_with_scale(value, CANONICAL_DECIMALS)
        .map(|d| d.normalize())
        .map_err(|_| ConversionError::Overflow)
}

/// Fixed width rendering used in tables and transfer summaries, e.g.
/// `         1.2000000000 FET`.
pub fn format_amount(value: Decimal) -> String {
    let sign = if value.is_sign_negative() && !value.is_zero() {
        "-"
    } else {
        ""
    };

    let magnitude = value.abs().round_dp(CANONICAL_DECIMALS);
    let integral = magnitude.trunc();
    let fraction = ((magnitude - integral) * scale()).to_u64().unwrap_or(0);

    let integral = format!("{}{:.0}", sign, integral);
    format!(
        "{:>width$}.{:010} {}",
        integral,
        fraction,
        TOKEN_SYMBOL,
        width = INTEGER_COLUMN_WIDTH
    )
}

/// Convenience for display paths that start from a canonical integer.
pub fn format_canonical(value: u64) -> String {
    match from_canonical(i128::from(value)) {
        Ok(decimal) => format_amount(decimal),
        Err(_) => format!("{} (canonical)", value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn dec(s: &str) -> Decimal {
        parse_amount(s).unwrap()
    }

    fn assert_convertible(canonical: u64, value: &str) {
        let converted = to_canonical(dec(value)).unwrap();
        assert_eq!(converted, canonical, "to_canonical({})", value);
        assert_eq!(
            from_canonical(i128::from(converted)).unwrap(),
            dec(value),
            "from_canonical({})",
            canonical
        );
    }

    #[test]
    fn test_canonical_conversions() {
        assert_convertible(10_000_000_000, "1");
        assert_convertible(10_000_000_000, "1.0");
        assert_convertible(12_000_000_000, "1.2");
        assert_convertible(10_020_000_000, "1.002");
        assert_convertible(1, "1e-10");
        assert_convertible(100, "1e-8");
        assert_convertible(10_000_000, "1e-3");
        assert_convertible(10_000, "1e-6");
        assert_convertible(10, "1e-9");
        assert_convertible(10_000_000_000_000, "1e3");
        assert_convertible(10_000_000_000_000_000, "1e6");
        assert_convertible(10_000_000_000_000_000_000, "1e9");
    }

    #[test]
    fn test_token_amount_formatting() {
        assert_eq!(format_amount(dec("1")), "         1.0000000000 FET");
        assert_eq!(format_amount(dec("1.0")), "         1.0000000000 FET");
        assert_eq!(format_amount(dec("1.2")), "         1.2000000000 FET");
        assert_eq!(format_amount(dec("1.002")), "         1.0020000000 FET");
        assert_eq!(format_amount(dec("1e-10")), "         0.0000000001 FET");
        assert_eq!(format_amount(dec("1e-8")), "         0.0000000100 FET");
        assert_eq!(format_amount(dec("1e-3")), "         0.0010000000 FET");
        assert_eq!(format_amount(dec("1e-6")), "         0.0000010000 FET");
        assert_eq!(format_amount(dec("1e-9")), "         0.0000000010 FET");
        assert_eq!(format_amount(dec("1e3")), "      1000.0000000000 FET");
        assert_eq!(format_amount(dec("1e6")), "   1000000.0000000000 FET");
        assert_eq!(format_amount(dec("1e9")), "1000000000.0000000000 FET");
    }

    #[test]
    fn test_format_canonical_matches_decimal_path() {
        assert_eq!(format_canonical(12_000_000_000), format_amount(dec("1.2")));
        assert_eq!(format_canonical(0), "         0.0000000000 FET");
    }

    #[test]
    fn test_invalid_negative_to_canonical() {
        assert_eq!(to_canonical(dec("-10")), Err(ConversionError::Negative));
    }

    #[test]
    fn test_invalid_too_small_to_canonical() {
        assert!(matches!(
            to_canonical(dec("1e-20")),
            Err(ConversionError::BelowMinimum(_))
        ));
        assert!(matches!(
            to_canonical(Decimal::ZERO),
            Err(ConversionError::BelowMinimum(_))
        ));
    }

    #[test]
    fn test_excess_precision_rejected() {
        assert!(matches!(
            to_canonical(dec("1.00000000001")),
            Err(ConversionError::ExcessPrecision(_))
        ));
    }

    #[test]
    fn test_overflow_rejected() {
        assert_eq!(to_canonical(dec("1e10")), Err(ConversionError::Overflow));
    }

    #[test]
    fn test_invalid_non_number() {
        assert_eq!(
            parse_amount("foo-bar"),
            Err(ConversionError::InvalidNumber("foo-bar".to_string()))
        );
    }

    #[test]
    fn test_out_of_range_numbers_are_not_parse_errors() {
        assert_eq!(parse_amount("1e30"), Err(ConversionError::Overflow));
        assert_eq!(parse_amount("123456789012345678901234567890"), Err(ConversionError::Overflow));
        assert_eq!(parse_amount("-1e30"), Err(ConversionError::Negative));
        assert_eq!(
            parse_amount("1e-29"),
            Err(ConversionError::BelowMinimum("1e-29".to_string()))
        );
        assert!(matches!(
            parse_amount("0.0001e-40"),
            Err(ConversionError::BelowMinimum(_))
        ));
        assert_eq!(
            parse_amount("1e3x"),
            Err(ConversionError::InvalidNumber("1e3x".to_string()))
        );
        assert_eq!(
            parse_amount("e30"),
            Err(ConversionError::InvalidNumber("e30".to_string()))
        );
    }

    #[test]
    fn test_invalid_negative_from_canonical() {
        assert_eq!(from_canonical(-10), Err(ConversionError::Negative));
    }

    proptest! {
        #[test]
        fn canonical_round_trip(canonical in 1u64..=u64::MAX) {
            let value = from_canonical(i128::from(canonical)).unwrap();
            prop_assert_eq!(to_canonical(value).unwrap(), canonical);
        }

        #[test]
        fn formatting_is_fixed_width(canonical in any::<u64>()) {
            let rendered = format_canonical(canonical);
            prop_assert_eq!(rendered.len(), 10 + 1 + 10 + 1 + TOKEN_SYMBOL.len());
        }
    }
}
