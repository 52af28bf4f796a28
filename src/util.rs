// Utility helpers for parsing and basic arithmetic.
//
// The CSV export comes from a spreadsheet, so numeric cells may carry
// thousands separators, stray whitespace or float-formatted integers.
use num_format::{Locale, ToFormattedString};

/// Parse a numeric cell.
///
/// - Accepts `Option<&str>` so callers can pass through optional fields.
/// - Trims whitespace and strips `","` thousands separators.
/// - Accepts scientific notation (`1.5e6`) as spreadsheets emit it.
/// - Returns `None` for empty cells, text and NaN.
pub fn parse_f64_safe(s: Option<&str>) -> Option<f64> {
    let s = s?.trim();
    if s.is_empty() {
        return None;
    }
    let s = s.replace(',', "");
    match s.parse::<f64>() {
        Ok(v) if v.is_finite() => Some(v),
        _ => None,
    }
}

/// Parse an integer cell, tolerating a float rendering such as `2030.0`.
pub fn parse_i32_safe(s: Option<&str>) -> Option<i32> {
    let s = s?.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(v) = s.parse::<i32>() {
        return Some(v);
    }
    let f = s.parse::<f64>().ok()?;
    if f.fract() == 0.0 && f.abs() < i32::MAX as f64 {
        Some(f as i32)
    } else {
        None
    }
}

/// Round half away from zero to `decimals` places.
pub fn round_to(v: f64, decimals: i32) -> f64 {
    let p = 10f64.powi(decimals);
    (v * p).round() / p
}

pub fn round2(v: f64) -> f64 {
    round_to(v, 2)
}

pub fn format_int<T>(n: T) -> String
where
    T: ToFormattedString,
{
    n.to_formatted_string(&Locale::en)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_spreadsheet_numbers() {
        assert_eq!(parse_f64_safe(Some(" 1,250.5 ")), Some(1250.5));
        assert_eq!(parse_f64_safe(Some("1.5e6")), Some(1_500_000.0));
        assert_eq!(parse_f64_safe(Some("nan")), None);
        assert_eq!(parse_f64_safe(Some("")), None);
        assert_eq!(parse_f64_safe(None), None);
        assert_eq!(parse_i32_safe(Some("2030.0")), Some(2030));
        assert_eq!(parse_i32_safe(Some("2030.5")), None);
    }

    #[test]
    fn formats_with_separators() {
        assert_eq!(format_int(9855), "9,855");
        assert_eq!(round2(12.345678), 12.35);
    }
}
