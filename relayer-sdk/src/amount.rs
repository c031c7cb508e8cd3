//! Decimal amount conversion for cUSDT (6 decimals)
//!
//! Amounts cross every boundary as integers scaled by 10^6; floating point
//! is never involved.

use crate::error::SdkError;

/// cUSDT decimal places
pub const DECIMALS: u32 = 6;

/// Parse a decimal string such as `"1250.5"` into base units (`1250500000`).
///
/// Rejects empty input, signs, more than 6 fractional digits and anything
/// that is not a plain decimal number. Values wider than 64 bits fail with
/// [`SdkError::InvalidPlaintext`].
pub fn parse_units(raw: &str) -> Result<u64, SdkError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(SdkError::InvalidAmount("Enter an amount to record".to_string()));
    }

    let (whole, fraction) = match raw.split_once('.') {
        Some((whole, fraction)) => (whole, fraction),
        None => (raw, ""),
    };

    if whole.is_empty() && fraction.is_empty() {
        return Err(SdkError::InvalidAmount(format!("not a number: {raw}")));
    }
    if !whole.bytes().all(|b| b.is_ascii_digit()) || !fraction.bytes().all(|b| b.is_ascii_digit()) {
        return Err(SdkError::InvalidAmount(format!("not a number: {raw}")));
    }
    if fraction.len() > DECIMALS as usize {
        return Err(SdkError::InvalidAmount(format!(
            "at most {DECIMALS} decimal places allowed: {raw}"
        )));
    }

    let scale = 10u128.pow(DECIMALS);
    let whole_units = if whole.is_empty() {
        0
    } else {
        whole
            .parse::<u128>()
            .map_err(|_| SdkError::InvalidPlaintext(raw.to_string()))?
    };
    let fraction_units = if fraction.is_empty() {
        0
    } else {
        let padded = format!("{fraction:0<width$}", width = DECIMALS as usize);
        padded
            .parse::<u128>()
            .map_err(|_| SdkError::InvalidAmount(raw.to_string()))?
    };

    whole_units
        .checked_mul(scale)
        .and_then(|units| units.checked_add(fraction_units))
        .and_then(|units| u64::try_from(units).ok())
        .ok_or_else(|| SdkError::InvalidPlaintext(raw.to_string()))
}

/// Format base units as a decimal string: `750000` -> `"0.75"`, `1000000` -> `"1.0"`
pub fn format_units(value: u64) -> String {
    let scale = 10u64.pow(DECIMALS);
    let whole = value / scale;
    let fraction = value % scale;

    let digits = format!("{fraction:0width$}", width = DECIMALS as usize);
    let trimmed = digits.trim_end_matches('0');
    if trimmed.is_empty() {
        format!("{whole}.0")
    } else {
        format!("{whole}.{trimmed}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_units() {
        assert_eq!(parse_units("1").unwrap(), 1_000_000);
        assert_eq!(parse_units("0.75").unwrap(), 750_000);
        assert_eq!(parse_units(" 1250.5 ").unwrap(), 1_250_500_000);
        assert_eq!(parse_units(".5").unwrap(), 500_000);
        assert_eq!(parse_units("2.").unwrap(), 2_000_000);
        assert_eq!(parse_units("0.000001").unwrap(), 1);
    }

    #[test]
    fn test_parse_units_rejects_bad_input() {
        for raw in ["", "  ", ".", "-1", "+1", "1e6", "1.2.3", "abc", "1,000"] {
            assert!(
                matches!(parse_units(raw), Err(SdkError::InvalidAmount(_))),
                "{raw:?} should be rejected"
            );
        }
        assert!(matches!(
            parse_units("0.0000001"),
            Err(SdkError::InvalidAmount(_))
        ));
    }

    #[test]
    fn test_parse_units_rejects_values_wider_than_u64() {
        // u64::MAX is 18446744073709.551615 in 6-decimal units
        assert_eq!(parse_units("18446744073709.551615").unwrap(), u64::MAX);
        assert!(matches!(
            parse_units("18446744073709.551616"),
            Err(SdkError::InvalidPlaintext(_))
        ));
        assert!(matches!(
            parse_units("99999999999999999999999999999999999999999"),
            Err(SdkError::InvalidPlaintext(_))
        ));
    }

    #[test]
    fn test_format_units() {
        assert_eq!(format_units(0), "0.0");
        assert_eq!(format_units(750_000), "0.75");
        assert_eq!(format_units(1_000_000), "1.0");
        assert_eq!(format_units(1_250_500_000), "1250.5");
        assert_eq!(format_units(1), "0.000001");
    }
}
