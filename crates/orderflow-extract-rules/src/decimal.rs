//! Decimal-format detection by regex voting on numeric cells, and decimal
//! parsing against the detected format (spec §4.2(c)). DACH files default
//! to comma-decimal.

use regex::Regex;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::str::FromStr;
use std::sync::OnceLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecimalFormat {
    /// `1.234,56`
    Comma,
    /// `1,234.56`
    Dot,
}

fn comma_decimal_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^-?\d{1,3}(\.\d{3})*,\d+$|^-?\d+,\d+$").unwrap())
}

fn dot_decimal_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^-?\d{1,3}(,\d{3})*\.\d+$|^-?\d+\.\d+$").unwrap())
}

/// Vote across `cells` (already whitespace-trimmed candidate numeric
/// fields); ties, including the no-votes case, resolve to [`DecimalFormat::Comma`].
pub fn detect_decimal_format(cells: &[&str]) -> DecimalFormat {
    let mut comma_votes = 0u32;
    let mut dot_votes = 0u32;
    for cell in cells {
        let trimmed = cell.trim();
        if comma_decimal_re().is_match(trimmed) {
            comma_votes += 1;
        } else if dot_decimal_re().is_match(trimmed) {
            dot_votes += 1;
        }
    }
    if dot_votes > comma_votes {
        DecimalFormat::Dot
    } else {
        DecimalFormat::Comma
    }
}

/// Parse one numeric cell under the detected format, normalizing thousands
/// separators and the decimal mark before delegating to [`Decimal`].
pub fn parse_decimal(s: &str, format: DecimalFormat) -> Option<f64> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return None;
    }
    let normalized = match format {
        DecimalFormat::Comma => trimmed.replace('.', "").replace(',', "."),
        DecimalFormat::Dot => trimmed.replace(',', ""),
    };
    Decimal::from_str(&normalized).ok()?.to_f64()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn votes_comma_for_dach_cells() {
        let cells = ["12,50", "8,00", "1.234,56"];
        assert_eq!(detect_decimal_format(&cells), DecimalFormat::Comma);
    }

    #[test]
    fn votes_dot_for_us_cells() {
        let cells = ["12.50", "8.00", "1,234.56"];
        assert_eq!(detect_decimal_format(&cells), DecimalFormat::Dot);
    }

    #[test]
    fn ties_default_to_comma() {
        assert_eq!(detect_decimal_format(&[]), DecimalFormat::Comma);
    }

    #[test]
    fn parses_dach_thousands_and_decimal() {
        assert_eq!(parse_decimal("1.234,56", DecimalFormat::Comma), Some(1234.56));
    }

    #[test]
    fn parses_us_thousands_and_decimal() {
        assert_eq!(parse_decimal("1,234.56", DecimalFormat::Dot), Some(1234.56));
    }

    #[test]
    fn empty_cell_is_none() {
        assert_eq!(parse_decimal("", DecimalFormat::Comma), None);
    }

    proptest::proptest! {
        #[test]
        fn dot_decimal_round_trips_through_detection_and_parsing(
            whole in 0u32..100_000u32,
            frac in 0u32..100u32,
        ) {
            let rendered = format!("{whole}.{frac:02}");
            let format = detect_decimal_format(&[&rendered]);
            prop_assert_eq!(format, DecimalFormat::Dot);
            let parsed = parse_decimal(&rendered, format).unwrap();
            let expected = whole as f64 + frac as f64 / 100.0;
            prop_assert!((parsed - expected).abs() < 1e-9);
        }
    }
}
