// Utility helpers for parsing and rounding.
//
// This module centralizes all the "dirty" cell-value handling so the rest
// of the code can assume clean, typed values.
use num_format::{Locale, ToFormattedString};

/// Parse a raw extract cell into an optional `f64`.
///
/// - Trims whitespace.
/// - Empty cells and the `"-"` no-data sentinel map to `None`, never `0`.
/// - Rejects values that contain alphabetic characters.
/// - Strips thousands separators like `","` before parsing.
pub fn parse_cell(s: &str) -> Option<f64> {
    let s = s.trim();
    if s.is_empty() || s == "-" {
        return None;
    }
    if s.chars().any(|c| c.is_ascii_alphabetic()) {
        return None;
    }
    let s = s.replace(',', "");
    s.parse::<f64>().ok()
}

/// Round to `decimals` decimal places (reference formulas fix each derived
/// metric's precision, e.g. ratios at 2, price-to-rent at 1).
pub fn round_to(v: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (v * factor).round() / factor
}

pub fn format_number(n: f64, decimals: usize) -> String {
    // Fixed decimal places plus locale-aware thousands separators
    // (e.g., `1,234,567.89`) for console reports.
    let neg = n.is_sign_negative();
    let abs_n = n.abs();
    let s = format!("{:.*}", decimals, abs_n);
    let mut parts = s.split('.');
    let int_part = parts.next().unwrap_or("0");
    let frac_part = parts.next();
    let int_val: i64 = int_part.parse().unwrap_or(0);
    let mut res = int_val.to_formatted_string(&Locale::en);
    if let Some(frac) = frac_part {
        if decimals > 0 {
            res.push('.');
            res.push_str(frac);
        }
    } else if decimals > 0 {
        res.push('.');
        res.push_str(&"0".repeat(decimals));
    }
    if neg {
        format!("-{}", res)
    } else {
        res
    }
}

pub fn format_int<T>(n: T) -> String
where
    T: ToFormattedString,
{
    // Thin wrapper around `num-format` for counts in console messages
    // (e.g., `9,855 rows normalized`).
    n.to_formatted_string(&Locale::en)
}

/// Render an optional value for console/CSV reports; nulls print as "-",
/// matching the sentinel the extracts use on the way in.
pub fn format_opt(v: Option<f64>, decimals: usize) -> String {
    match v {
        Some(v) => format_number(v, decimals),
        None => "-".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_cell_handles_sentinels() {
        assert_eq!(parse_cell(""), None);
        assert_eq!(parse_cell("  "), None);
        assert_eq!(parse_cell("-"), None);
        assert_eq!(parse_cell("N/A"), None);
        assert_eq!(parse_cell("1,234.5"), Some(1234.5));
        assert_eq!(parse_cell(" 42 "), Some(42.0));
        assert_eq!(parse_cell("-3.5"), Some(-3.5));
        // Zero parses as zero, never as missing.
        assert_eq!(parse_cell("0"), Some(0.0));
    }

    #[test]
    fn round_to_fixed_places() {
        assert_eq!(round_to(3.14159, 2), 3.14);
        assert_eq!(round_to(10.0 / 3.0, 2), 3.33);
        assert_eq!(round_to(-1.25, 1), -1.3);
    }

    #[test]
    fn format_number_inserts_separators() {
        assert_eq!(format_number(1234567.891, 2), "1,234,567.89");
        assert_eq!(format_number(-12.5, 2), "-12.50");
        assert_eq!(format_number(0.0, 0), "0");
    }
}
