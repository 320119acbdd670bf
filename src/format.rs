//! UK-style display formatting for table output.
//!
//! Non-finite values render as an en dash. Currency is whole pounds.

pub const MISSING: &str = "–";

/// `1234.5` → `£1,235`; negatives keep the sign ahead of the symbol.
pub fn fmt_gbp(value: f64) -> String {
    if !value.is_finite() {
        return MISSING.to_string();
    }
    let rounded = value.round();
    let sign = if rounded < 0.0 { "-" } else { "" };
    format!("{sign}£{}", group_digits(rounded.abs()))
}

/// Rounded integer with thousands separators.
pub fn fmt_int(value: f64) -> String {
    if !value.is_finite() {
        return MISSING.to_string();
    }
    let rounded = value.round();
    let sign = if rounded < 0.0 { "-" } else { "" };
    format!("{sign}{}", group_digits(rounded.abs()))
}

/// One decimal place with a percent sign.
pub fn fmt_pct(value: f64) -> String {
    if !value.is_finite() {
        return MISSING.to_string();
    }
    format!("{value:.1}%")
}

fn group_digits(value: f64) -> String {
    let digits = format!("{value:.0}");
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (idx, ch) in digits.chars().enumerate() {
        if idx > 0 && (digits.len() - idx) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    grouped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn currency_rounds_and_groups() {
        assert_eq!(fmt_gbp(1234.5), "£1,235");
        assert_eq!(fmt_gbp(999.4), "£999");
        assert_eq!(fmt_gbp(1_000_000.0), "£1,000,000");
        assert_eq!(fmt_gbp(-2500.0), "-£2,500");
        assert_eq!(fmt_gbp(f64::NAN), MISSING);
    }

    #[test]
    fn integers_and_percentages() {
        assert_eq!(fmt_int(12345.0), "12,345");
        assert_eq!(fmt_int(0.0), "0");
        assert_eq!(fmt_int(f64::INFINITY), MISSING);
        assert_eq!(fmt_pct(12.345), "12.3%");
        assert_eq!(fmt_pct(-4.0), "-4.0%");
        assert_eq!(fmt_pct(f64::NAN), MISSING);
    }
}
