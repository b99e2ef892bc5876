//! Decoders for the two micro-formats stored inside report cells.
//!
//! - Frequency lists: `label:count;label:count;...`
//! - Range statistics: `평균 12.3, 최소 1, 최대 30일` or
//!   `average 12.3, minimum 1, maximum 30 days`
//!
//! Both decoders are total: malformed input degrades to an empty table or a
//! zero-filled record, never an error.
use crate::types::{FreqEntry, FrequencyTable, RangeStat};
use crate::util::digits_only;
use clap::ValueEnum;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

static AVERAGE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(?:평균|average)\s*:?\s*([0-9]+(?:\.[0-9]+)?)").unwrap());
static MINIMUM_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(?:최소|minimum)\s*:?\s*([0-9]+(?:\.[0-9]+)?)").unwrap());
static MAXIMUM_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(?:최대|maximum)\s*:?\s*([0-9]+(?:\.[0-9]+)?)").unwrap());

/// How a frequency list with a bad clause is handled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ParseMode {
    /// One malformed clause empties the whole table.
    #[default]
    Strict,
    /// Malformed clauses are skipped.
    Lenient,
}

/// Result of decoding one frequency cell, with a flag for diagnostics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedFrequency {
    pub table: FrequencyTable,
    pub malformed: bool,
}

/// `None` and blank cells are the "missing" sentinel.
fn present(cell: Option<&str>) -> Option<&str> {
    cell.filter(|s| !s.trim().is_empty())
}

fn parse_clause(clause: &str) -> Option<FreqEntry> {
    let (label, count) = clause.split_once(':')?;
    let digits = digits_only(count);
    if digits.is_empty() {
        return None;
    }
    let count = digits.parse::<u64>().ok()?;
    Some(FreqEntry::new(label.trim(), count))
}

/// Decode a `label:count;...` cell. Missing cells give an empty table;
/// `malformed` is set when any clause had to be rejected.
pub fn parse_frequency(cell: Option<&str>, mode: ParseMode) -> ParsedFrequency {
    let Some(text) = present(cell) else {
        return ParsedFrequency::default();
    };

    let mut entries = Vec::new();
    let mut malformed = false;
    for clause in text.split(';') {
        match parse_clause(clause) {
            Some(entry) => entries.push(entry),
            None => {
                malformed = true;
                if mode == ParseMode::Strict {
                    return ParsedFrequency { table: FrequencyTable::default(), malformed };
                }
            }
        }
    }
    ParsedFrequency { table: FrequencyTable::new(entries), malformed }
}

fn capture<'a>(re: &Regex, text: &'a str) -> Option<&'a str> {
    re.captures(text).and_then(|c| c.get(1)).map(|m| m.as_str())
}

fn capture_int(re: &Regex, text: &str) -> i64 {
    // Decimal minimum/maximum values are truncated.
    match capture(re, text) {
        Some(s) => s
            .parse::<i64>()
            .ok()
            .or_else(|| s.parse::<f64>().ok().map(|v| v.trunc() as i64))
            .unwrap_or(0),
        None => 0,
    }
}

fn trailing_unit(text: &str) -> String {
    let Some(last) = text.split_whitespace().last() else {
        return String::new();
    };
    last.trim_end_matches(',')
        .trim_start_matches(|c: char| c.is_ascii_digit() || c == '.')
        .to_string()
}

/// Decode an average/minimum/maximum sentence. Absent tokens default to 0
/// and an absent unit to the empty string.
pub fn parse_range_stat(cell: Option<&str>) -> RangeStat {
    let Some(text) = present(cell) else {
        return RangeStat::default();
    };
    RangeStat {
        average: capture(&AVERAGE_RE, text)
            .and_then(|s| s.parse::<f64>().ok())
            .unwrap_or(0.0),
        minimum: capture_int(&MINIMUM_RE, text),
        maximum: capture_int(&MAXIMUM_RE, text),
        unit: trailing_unit(text),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(cell: Option<&str>, mode: ParseMode) -> FrequencyTable {
        parse_frequency(cell, mode).table
    }

    fn pairs(table: &FrequencyTable) -> Vec<(&str, u64)> {
        table.iter().map(|e| (e.label.as_str(), e.count)).collect()
    }

    #[test]
    fn well_formed_list_keeps_order() {
        let t = table(Some("a:3;b:5;c:1"), ParseMode::Strict);
        assert_eq!(pairs(&t), vec![("a", 3), ("b", 5), ("c", 1)]);
    }

    #[test]
    fn labels_are_trimmed_and_counts_stripped() {
        let t = table(Some(" Produce : 1,200 ; dairy eggs:45회"), ParseMode::Strict);
        assert_eq!(pairs(&t), vec![("Produce", 1200), ("dairy eggs", 45)]);
    }

    #[test]
    fn missing_cell_is_empty_table() {
        assert!(table(None, ParseMode::Strict).is_empty());
        assert!(table(Some(""), ParseMode::Strict).is_empty());
        assert!(table(Some("   "), ParseMode::Lenient).is_empty());
        assert!(!parse_frequency(None, ParseMode::Strict).malformed);
    }

    #[test]
    fn digits_are_extracted_from_noisy_counts() {
        let t = table(Some("a:x2x;b:3"), ParseMode::Strict);
        assert_eq!(pairs(&t), vec![("a", 2), ("b", 3)]);
    }

    #[test]
    fn strict_mode_is_all_or_nothing() {
        assert!(table(Some("a:xx;b:yy"), ParseMode::Strict).is_empty());
        let parsed = parse_frequency(Some("a:xx;b:3"), ParseMode::Strict);
        assert!(parsed.table.is_empty());
        assert!(parsed.malformed);
        assert!(table(Some("a:1;b"), ParseMode::Strict).is_empty());
    }

    #[test]
    fn lenient_mode_skips_bad_clauses() {
        let parsed = parse_frequency(Some("a:xx;b:3;c;d:4"), ParseMode::Lenient);
        assert_eq!(pairs(&parsed.table), vec![("b", 3), ("d", 4)]);
        assert!(parsed.malformed);
        assert!(table(Some("a:xx;b:yy"), ParseMode::Lenient).is_empty());
    }

    #[test]
    fn trailing_separator_is_malformed() {
        assert!(table(Some("a:1;"), ParseMode::Strict).is_empty());
        let t = table(Some("a:1;"), ParseMode::Lenient);
        assert_eq!(pairs(&t), vec![("a", 1)]);
    }

    #[test]
    fn english_range_sentence() {
        let s = parse_range_stat(Some("average 12.3, minimum 1, maximum 30 days"));
        assert_eq!(
            s,
            RangeStat { average: 12.3, minimum: 1, maximum: 30, unit: "days".to_string() }
        );
    }

    #[test]
    fn korean_range_sentence() {
        let s = parse_range_stat(Some("평균 12.3, 최소 1, 최대 30일"));
        assert_eq!(s.average, 12.3);
        assert_eq!(s.minimum, 1);
        assert_eq!(s.maximum, 30);
        assert_eq!(s.unit, "일");
    }

    #[test]
    fn missing_minimum_defaults_to_zero() {
        let s = parse_range_stat(Some("average 8.5, maximum 14 items"));
        assert_eq!(s.average, 8.5);
        assert_eq!(s.minimum, 0);
        assert_eq!(s.maximum, 14);
        assert_eq!(s.unit, "items");
    }

    #[test]
    fn decimal_bounds_are_truncated() {
        let s = parse_range_stat(Some("average 2, minimum 1.5, maximum 7.9 days"));
        assert_eq!((s.minimum, s.maximum), (1, 7));
    }

    #[test]
    fn empty_sentence_is_zero_record() {
        assert_eq!(parse_range_stat(None), RangeStat::default());
        assert_eq!(parse_range_stat(Some("")), RangeStat::default());
        let s = parse_range_stat(Some("no numbers here"));
        assert_eq!((s.average, s.minimum, s.maximum), (0.0, 0, 0));
        assert_eq!(s.unit, "here");
    }

    #[test]
    fn parsing_is_repeatable() {
        let cell = Some("a:3;b:5");
        assert_eq!(
            table(cell, ParseMode::Strict),
            table(cell, ParseMode::Strict)
        );
        let sentence = Some("average 1.5, minimum 1, maximum 2 days");
        assert_eq!(parse_range_stat(sentence), parse_range_stat(sentence));
    }
}
