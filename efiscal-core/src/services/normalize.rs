//! Value normalizers - spreadsheet dates, money and quantities
//!
//! Pure converters used by ingestion. Dates that cannot be resolved return
//! `None` (the row is dropped); numbers that cannot be parsed become zero.

use std::str::FromStr;

use chrono::{Days, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;

use crate::domain::CellValue;

/// Smallest accepted spreadsheet date serial
pub const MIN_DATE_SERIAL: f64 = 1.0;

/// Largest accepted spreadsheet date serial
pub const MAX_DATE_SERIAL: f64 = 100_000.0;

/// Serials above this include the fictitious 1900-02-29
const LEAP_BUG_SERIAL: f64 = 59.0;

/// Leading decimal literal with an optional exponent (`4.5e4`)
static LEADING_NUMBER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[+-]?(?:[0-9]+(?:\.[0-9]*)?|\.[0-9]+)(?:[eE][+-]?[0-9]+)?").expect("static regex")
});

/// Resolve a supply date cell
///
/// Numbers are date serials; text is either `dd/mm/yyyy` or a serial
/// written as text.
pub fn normalize_date(cell: &CellValue) -> Option<NaiveDate> {
    match cell {
        CellValue::Empty => None,
        CellValue::Number(serial) => serial_to_date(*serial),
        CellValue::Text(text) => {
            let text = text.trim();
            if text.is_empty() {
                None
            } else if text.contains('/') {
                parse_day_month_year(text)
            } else {
                leading_literal(text)
                    .and_then(|literal| literal.parse::<f64>().ok())
                    .and_then(serial_to_date)
            }
        }
    }
}

/// Convert a spreadsheet date serial (day 1 = 1900-01-01)
///
/// Serials past 59 are shifted back one day to skip the 1900 leap-year bug.
/// The time-of-day fraction is ignored.
pub fn serial_to_date(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() || !(MIN_DATE_SERIAL..=MAX_DATE_SERIAL).contains(&serial) {
        return None;
    }

    let adjusted = if serial > LEAP_BUG_SERIAL { serial - 1.0 } else { serial };
    let offset = (adjusted.floor() as u64).saturating_sub(1);

    NaiveDate::from_ymd_opt(1900, 1, 1)?.checked_add_days(Days::new(offset))
}

/// Parse `dd/mm/yyyy` into a real calendar date
pub fn parse_day_month_year(text: &str) -> Option<NaiveDate> {
    let parts: Vec<&str> = text.split('/').map(str::trim).collect();
    let [day, month, year] = parts.as_slice() else {
        return None;
    };

    if year.len() != 4 {
        return None;
    }

    let day: u32 = day.parse().ok()?;
    let month: u32 = month.parse().ok()?;
    let year: i32 = year.parse().ok()?;

    NaiveDate::from_ymd_opt(year, month, day)
}

/// Parse a monetary cell such as `R$ 1.234,56`
///
/// `.` is a thousands separator and `,` the decimal separator. Anything
/// unparsable is zero.
pub fn parse_money(cell: &CellValue) -> Decimal {
    match cell {
        CellValue::Empty => Decimal::ZERO,
        CellValue::Number(n) => decimal_from_f64(*n),
        CellValue::Text(text) => {
            let cleaned: String = text
                .chars()
                .filter(|c| !(*c == 'R' || *c == '$' || *c == '.' || c.is_whitespace()))
                .collect();
            leading_decimal(&cleaned.replacen(',', ".", 1)).unwrap_or(Decimal::ZERO)
        }
    }
}

/// Parse a quantity cell; text may use `,` as decimal separator
pub fn parse_quantity(cell: &CellValue) -> Decimal {
    match cell {
        CellValue::Empty => Decimal::ZERO,
        CellValue::Number(n) => decimal_from_f64(*n),
        CellValue::Text(text) => {
            leading_decimal(&text.trim().replacen(',', ".", 1)).unwrap_or(Decimal::ZERO)
        }
    }
}

fn decimal_from_f64(n: f64) -> Decimal {
    Decimal::try_from(n).unwrap_or_default()
}

/// Longest numeric prefix of `text`, e.g. `12.5` in `12.5 kg`
fn leading_literal(text: &str) -> Option<&str> {
    LEADING_NUMBER.find(text).map(|m| m.as_str())
}

fn leading_decimal(text: &str) -> Option<Decimal> {
    let literal = leading_literal(text)?;
    let (mantissa, exponent) = match literal.find(|c| c == 'e' || c == 'E') {
        Some(at) => (&literal[..at], Some(&literal[at + 1..])),
        None => (literal, None),
    };
    let (sign, digits) = match mantissa.as_bytes().first() {
        Some(b'-') => ("-", &mantissa[1..]),
        Some(b'+') => ("", &mantissa[1..]),
        _ => ("", mantissa),
    };
    let digits = digits.trim_end_matches('.');
    let normalized = if digits.starts_with('.') {
        format!("{}0{}", sign, digits)
    } else {
        format!("{}{}", sign, digits)
    };

    match exponent {
        Some(exponent) => {
            let exponent = exponent.trim_start_matches('+');
            Decimal::from_scientific(&format!("{}e{}", normalized, exponent)).ok()
        }
        None => Decimal::from_str(&normalized).ok(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn text(s: &str) -> CellValue {
        CellValue::from(s)
    }

    // ==================== Dates ====================

    #[test]
    fn test_serial_45000() {
        assert_eq!(serial_to_date(45000.0), Some(date(2023, 3, 15)));
    }

    #[test]
    fn test_serial_leap_bug_boundary() {
        assert_eq!(serial_to_date(1.0), Some(date(1900, 1, 1)));
        assert_eq!(serial_to_date(59.0), Some(date(1900, 2, 28)));
        assert_eq!(serial_to_date(60.0), Some(date(1900, 2, 28)));
        assert_eq!(serial_to_date(61.0), Some(date(1900, 3, 1)));
    }

    #[test]
    fn test_serial_range() {
        assert_eq!(serial_to_date(0.0), None);
        assert_eq!(serial_to_date(-5.0), None);
        assert_eq!(serial_to_date(100_001.0), None);
        assert!(serial_to_date(100_000.0).is_some());
        assert_eq!(serial_to_date(f64::NAN), None);
    }

    #[test]
    fn test_serial_fraction_is_time_of_day() {
        assert_eq!(serial_to_date(45000.75), Some(date(2023, 3, 15)));
    }

    #[test]
    fn test_day_month_year_text() {
        assert_eq!(normalize_date(&text("05/03/2024")), Some(date(2024, 3, 5)));
        assert_eq!(normalize_date(&text(" 5/3/2024 ")), Some(date(2024, 3, 5)));
    }

    #[test]
    fn test_invalid_calendar_dates_rejected() {
        assert_eq!(normalize_date(&text("32/13/2024")), None);
        assert_eq!(normalize_date(&text("29/02/2023")), None);
        assert_eq!(normalize_date(&text("05/03")), None);
        assert_eq!(normalize_date(&text("05/03/24")), None);
        assert_eq!(normalize_date(&text("aa/bb/cccc")), None);
    }

    #[test]
    fn test_numeric_text_is_a_serial() {
        assert_eq!(normalize_date(&text("45000")), Some(date(2023, 3, 15)));
        assert_eq!(normalize_date(&text("0")), None);
    }

    #[test]
    fn test_serial_text_with_exponent() {
        assert_eq!(normalize_date(&text("4.5e4")), Some(date(2023, 3, 15)));
        assert_eq!(normalize_date(&text("4.5E+4")), Some(date(2023, 3, 15)));
        assert_eq!(normalize_date(&text("1e6")), None);
    }

    #[test]
    fn test_unresolvable_dates() {
        assert_eq!(normalize_date(&CellValue::Empty), None);
        assert_eq!(normalize_date(&text("")), None);
        assert_eq!(normalize_date(&text("ontem")), None);
        assert_eq!(normalize_date(&CellValue::Number(250_000.0)), None);
    }

    // ==================== Money ====================

    #[test]
    fn test_money_brazilian_format() {
        assert_eq!(parse_money(&text("R$ 1.234,56")), Decimal::new(123456, 2));
        assert_eq!(parse_money(&text("1.234.567,8")), Decimal::new(12345678, 1));
        assert_eq!(parse_money(&text("10")), Decimal::new(10, 0));
    }

    #[test]
    fn test_money_keeps_sign() {
        assert_eq!(parse_money(&text("-12,5")), Decimal::new(-125, 1));
    }

    #[test]
    fn test_money_numbers_pass_through() {
        assert_eq!(parse_money(&CellValue::Number(99.5)), Decimal::new(995, 1));
        assert_eq!(parse_money(&CellValue::Number(0.0)), Decimal::ZERO);
    }

    #[test]
    fn test_money_unparsable_is_zero() {
        assert_eq!(parse_money(&text("abc")), Decimal::ZERO);
        assert_eq!(parse_money(&text("R$")), Decimal::ZERO);
        assert_eq!(parse_money(&CellValue::Empty), Decimal::ZERO);
    }

    // ==================== Quantity ====================

    #[test]
    fn test_quantity() {
        assert_eq!(parse_quantity(&text("12,5")), Decimal::new(125, 1));
        assert_eq!(parse_quantity(&text(" 3 ")), Decimal::new(3, 0));
        assert_eq!(parse_quantity(&text("4 UN")), Decimal::new(4, 0));
        assert_eq!(parse_quantity(&CellValue::Number(7.0)), Decimal::new(7, 0));
        assert_eq!(parse_quantity(&text("x")), Decimal::ZERO);
        assert_eq!(parse_quantity(&CellValue::Empty), Decimal::ZERO);
    }

    #[test]
    fn test_leading_decimal_edge_forms() {
        assert_eq!(leading_decimal(".5"), Some(Decimal::new(5, 1)));
        assert_eq!(leading_decimal("-.5"), Some(Decimal::new(-5, 1)));
        assert_eq!(leading_decimal("12."), Some(Decimal::new(12, 0)));
        assert_eq!(leading_decimal("+8"), Some(Decimal::new(8, 0)));
        assert_eq!(leading_decimal("-"), None);
    }

    #[test]
    fn test_leading_decimal_exponent() {
        assert_eq!(leading_decimal("1.5e3"), Some(Decimal::new(1500, 0)));
        assert_eq!(leading_decimal("-2E-2"), Some(Decimal::new(-2, 2)));
        assert_eq!(leading_decimal("7e+1 kg"), Some(Decimal::new(70, 0)));
        // A dangling exponent marker is not part of the number
        assert_eq!(leading_decimal("12e"), Some(Decimal::new(12, 0)));
        assert_eq!(parse_quantity(&text("2,5e2")), Decimal::new(250, 0));
    }
}
