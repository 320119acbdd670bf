//! Cell-level parsing shared by the normaliser and aggregator.
//!
//! Missing numbers are represented as `f64::NAN` throughout. Records keep the
//! NaN so "missing" stays distinguishable from zero; only summation treats it
//! as zero (see [`finite_or_zero()`]).

use std::sync::OnceLock;

use anyhow::{Result, anyhow};
use chrono::{NaiveDate, NaiveDateTime};
use regex::Regex;

const NUMBER_PREFIX: &str = r"^[+-]?(\d+\.?\d*|\.\d+)([eE][+-]?\d+)?";

static NUMBER_PREFIX_RE: OnceLock<Option<Regex>> = OnceLock::new();

/// Parses a ledger number: grouping commas, `£` and `%` are removed, then the
/// longest leading numeric prefix is read, so `"12 pcs"` is 12. Anything
/// without a numeric prefix, or non-finite, becomes NaN.
pub fn parse_number(value: Option<&str>) -> f64 {
    let Some(raw) = value else {
        return f64::NAN;
    };
    let cleaned = raw
        .chars()
        .filter(|c| !matches!(c, ',' | '£' | '%'))
        .collect::<String>();
    let Some(matcher) = NUMBER_PREFIX_RE
        .get_or_init(|| Regex::new(NUMBER_PREFIX).ok())
        .as_ref()
    else {
        return f64::NAN;
    };
    match matcher
        .find(cleaned.trim())
        .map(|prefix| prefix.as_str().parse::<f64>())
    {
        Some(Ok(parsed)) if parsed.is_finite() => parsed,
        _ => f64::NAN,
    }
}

pub fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() { value } else { 0.0 }
}

/// Sum with NaN treated as zero.
pub fn sum_finite<I>(values: I) -> f64
where
    I: IntoIterator<Item = f64>,
{
    values.into_iter().map(finite_or_zero).sum()
}

/// NaN-propagating product.
pub fn product(left: f64, right: f64) -> f64 {
    if left.is_nan() || right.is_nan() {
        f64::NAN
    } else {
        left * right
    }
}

/// Invoice dates arrive in whatever format the spreadsheet chose; UK day-first
/// forms are tried before ISO and US ones.
pub fn parse_naive_date(value: &str) -> Result<NaiveDate> {
    const DATE_FORMATS: &[&str] = &[
        "%d/%m/%Y", "%d/%m/%y", "%Y-%m-%d", "%d-%m-%Y", "%d %b %Y", "%d-%b-%y", "%Y/%m/%d",
        "%m/%d/%Y",
    ];
    let trimmed = value.trim();
    for fmt in DATE_FORMATS {
        if let Ok(parsed) = NaiveDate::parse_from_str(trimmed, fmt) {
            return Ok(parsed);
        }
    }
    const DATETIME_FORMATS: &[&str] = &["%d/%m/%Y %H:%M:%S", "%d/%m/%Y %H:%M", "%Y-%m-%d %H:%M:%S"];
    for fmt in DATETIME_FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(trimmed, fmt) {
            return Ok(parsed.date());
        }
    }
    Err(anyhow!("Failed to parse '{value}' as date"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_number_strips_currency_grouping_and_percent() {
        assert_eq!(parse_number(Some("£1,234.50")), 1234.5);
        assert_eq!(parse_number(Some(" 15.5% ")), 15.5);
        assert_eq!(parse_number(Some("-3")), -3.0);
    }

    #[test]
    fn parse_number_reads_the_leading_numeric_prefix() {
        assert_eq!(parse_number(Some("12 pcs")), 12.0);
        assert_eq!(parse_number(Some("3.5kg")), 3.5);
        assert_eq!(parse_number(Some("10*")), 10.0);
        assert_eq!(parse_number(Some("£4.99 ea")), 4.99);
        assert_eq!(parse_number(Some(".5")), 0.5);
        assert_eq!(parse_number(Some("2e3 units")), 2000.0);
        assert!(parse_number(Some("pcs 12")).is_nan());
    }

    #[test]
    fn parse_number_yields_nan_for_missing_or_malformed() {
        assert!(parse_number(None).is_nan());
        assert!(parse_number(Some("")).is_nan());
        assert!(parse_number(Some("n/a")).is_nan());
        assert!(parse_number(Some("inf")).is_nan());
    }

    #[test]
    fn product_propagates_nan() {
        assert!(product(5.0, f64::NAN).is_nan());
        assert!(product(f64::NAN, 10.0).is_nan());
        assert_eq!(product(5.0, 10.0), 50.0);
    }

    #[test]
    fn sum_treats_nan_as_zero() {
        assert_eq!(sum_finite([1.0, f64::NAN, 2.0]), 3.0);
        assert_eq!(sum_finite(std::iter::empty()), 0.0);
    }

    #[test]
    fn parse_naive_date_prefers_day_first() {
        let expected = NaiveDate::from_ymd_opt(2024, 5, 6).unwrap();
        assert_eq!(parse_naive_date("06/05/2024").unwrap(), expected);
        assert_eq!(parse_naive_date("2024-05-06").unwrap(), expected);
        assert_eq!(parse_naive_date("06/05/2024 14:30").unwrap(), expected);
        assert!(parse_naive_date("sometime").is_err());
    }
}
