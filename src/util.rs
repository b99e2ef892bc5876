// Utility helpers for parsing and number formatting.
//
// This module centralizes the "dirty" CSV cell handling so the rest of the
// code can assume clean, typed values.
use num_format::{Locale, ToFormattedString};
use std::cmp::Ordering;

/// Parse a string-like value into `f64` while being forgiving about
/// formatting issues that are common in CSV exports (commas, spaces).
///
/// - Accepts `Option<&str>` so callers can pass through optional fields.
/// - Trims whitespace.
/// - Rejects values that contain alphabetic characters.
/// - Strips thousands separators like `","` before parsing.
/// - Returns `None` for anything that cannot be safely parsed.
pub fn parse_f64_safe(s: Option<&str>) -> Option<f64> {
    let s = s?.trim();
    if s.is_empty() {
        return None;
    }
    if s.chars().any(|c| c.is_ascii_alphabetic()) {
        return None;
    }
    let s = s.replace(",", "");
    s.parse::<f64>().ok()
}

pub fn parse_u32_safe(s: Option<&str>) -> Option<u32> {
    // `?` propagates `None` early if the option is missing.
    let s = s?.trim();
    if s.is_empty() {
        return None;
    }
    s.parse::<u32>().ok()
}

/// Coerce a count cell to an integer. `"12"` and `"12.0"` both become 12;
/// anything missing, negative or unparseable becomes 0.
pub fn parse_count_coerce(s: Option<&str>) -> u32 {
    if let Some(n) = parse_u32_safe(s) {
        return n;
    }
    match parse_f64_safe(s) {
        Some(v) if v.is_finite() && v >= 0.0 && v <= u32::MAX as f64 => v as u32,
        _ => 0,
    }
}

/// Remove a trailing unit glyph such as `%`, `점` or `pt` from a numeric
/// cell, leaving the numeric prefix (and any inner text) untouched.
pub fn strip_unit_suffix(s: &str) -> &str {
    s.trim()
        .trim_end_matches(|c: char| !(c.is_ascii_digit() || c == '.'))
        .trim_end()
}

/// Keep only the ASCII digits of `s` (`"1,234 times"` -> `"1234"`).
pub fn digits_only(s: &str) -> String {
    s.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// `part / total * 100`, or 0 when the total is zero.
pub fn percent(part: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    part as f64 / total as f64 * 100.0
}

/// Ordering for user ids: numeric ids compare by value, everything else
/// falls back to plain string order (numeric ids first).
pub fn compare_ids(a: &str, b: &str) -> Ordering {
    match (a.trim().parse::<u64>(), b.trim().parse::<u64>()) {
        (Ok(x), Ok(y)) => x.cmp(&y),
        (Ok(_), Err(_)) => Ordering::Less,
        (Err(_), Ok(_)) => Ordering::Greater,
        (Err(_), Err(_)) => a.cmp(b),
    }
}

pub fn format_number(n: f64, decimals: usize) -> String {
    // Format a floating-point value with:
    // - a fixed number of decimal places, and
    // - locale-aware thousands separators (e.g., `1,234,567.89`).
    let neg = n.is_sign_negative() && n != 0.0;
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
    n.to_formatted_string(&Locale::en)
}
