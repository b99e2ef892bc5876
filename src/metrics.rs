// Derived numbers over one user's frequency tables.
//
// Every function here is total: an empty table yields `None`, 0 or the
// "N/A" placeholder instead of an error.
use crate::types::{FreqEntry, FrequencyTable, KpiSet, PeakKpi, ShareKpi, UserProfile};
use crate::util::percent;

pub const NOT_AVAILABLE: &str = "N/A";

/// Canonical Monday-first day order. Each slot lists the labels accepted
/// for that day.
pub const DAY_ORDER: [&[&str]; 7] = [
    &["월", "Mon", "Monday"],
    &["화", "Tue", "Tuesday"],
    &["수", "Wed", "Wednesday"],
    &["목", "Thu", "Thursday"],
    &["금", "Fri", "Friday"],
    &["토", "Sat", "Saturday"],
    &["일", "Sun", "Sunday"],
];

/// The entry with the highest count; ties go to the first in table order.
pub fn peak(table: &FrequencyTable) -> Option<&FreqEntry> {
    let mut best: Option<&FreqEntry> = None;
    for e in table.iter() {
        match best {
            Some(b) if b.count >= e.count => {}
            _ => best = Some(e),
        }
    }
    best
}

/// Share of `label` in the table total, as a percentage.
pub fn category_share(table: &FrequencyTable, label: &str) -> f64 {
    let part: u64 = table.iter().filter(|e| e.label == label).map(|e| e.count).sum();
    percent(part, table.total())
}

/// Share of the peak entry in the table total, as a percentage.
pub fn top_share(table: &FrequencyTable) -> f64 {
    match peak(table) {
        Some(e) => percent(e.count, table.total()),
        None => 0.0,
    }
}

fn day_index(label: &str) -> Option<usize> {
    let label = label.trim();
    DAY_ORDER
        .iter()
        .position(|aliases| aliases.iter().any(|a| a.eq_ignore_ascii_case(label)))
}

/// Reorder a day-of-week table Monday..Sunday. Unknown labels keep their
/// relative order after the known days.
pub fn order_days(table: &FrequencyTable) -> FrequencyTable {
    let mut entries = table.entries.clone();
    entries.sort_by_key(|e| day_index(&e.label).unwrap_or(DAY_ORDER.len()));
    FrequencyTable::new(entries)
}

fn leading_hour(label: &str) -> Option<u32> {
    let digits: String = label
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().ok()
}

/// Sort an hour-of-day table by the first number in each label.
pub fn order_hours(table: &FrequencyTable) -> FrequencyTable {
    let mut entries = table.entries.clone();
    entries.sort_by_key(|e| leading_hour(&e.label).unwrap_or(u32::MAX));
    FrequencyTable::new(entries)
}

/// The `n` highest-count entries, highest first; equal counts keep table order.
pub fn top_n(table: &FrequencyTable, n: usize) -> FrequencyTable {
    let mut entries = table.entries.clone();
    entries.sort_by(|a, b| b.count.cmp(&a.count));
    entries.truncate(n);
    FrequencyTable::new(entries)
}

fn peak_kpi(table: &FrequencyTable) -> PeakKpi {
    match peak(table) {
        Some(e) => PeakKpi { label: e.label.clone(), count: e.count },
        None => PeakKpi { label: NOT_AVAILABLE.to_string(), count: 0 },
    }
}

impl KpiSet {
    /// KPIs for one user. `produce_label` names the department whose share
    /// is reported.
    pub fn compute(profile: &UserProfile, produce_label: &str) -> Self {
        let top_aisle = match peak(&profile.aisle) {
            Some(e) => ShareKpi { label: e.label.clone(), pct: top_share(&profile.aisle) },
            None => ShareKpi { label: NOT_AVAILABLE.to_string(), pct: 0.0 },
        };
        KpiSet {
            peak_day: peak_kpi(&order_days(&profile.dow)),
            peak_hour: peak_kpi(&order_hours(&profile.hour)),
            produce_pct: category_share(&profile.department, produce_label),
            top_aisle,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{parse_frequency, ParseMode};

    fn table(s: &str) -> FrequencyTable {
        parse_frequency(Some(s), ParseMode::Strict).table
    }

    fn labels(t: &FrequencyTable) -> Vec<&str> {
        t.iter().map(|e| e.label.as_str()).collect()
    }

    #[test]
    fn peak_breaks_ties_by_table_order() {
        let t = table("a:1;b:5;c:5;d:2");
        for _ in 0..3 {
            assert_eq!(peak(&t).map(|e| e.label.as_str()), Some("b"));
        }
        assert!(peak(&FrequencyTable::default()).is_none());
    }

    #[test]
    fn shares() {
        let t = table("produce:30;dairy eggs:10;snacks:10");
        assert!((category_share(&t, "produce") - 60.0).abs() < 1e-9);
        assert_eq!(category_share(&t, "bakery"), 0.0);
        assert!((top_share(&t) - 60.0).abs() < 1e-9);
    }

    #[test]
    fn shares_of_empty_or_zero_tables_are_zero() {
        let empty = FrequencyTable::default();
        assert_eq!(category_share(&empty, "produce"), 0.0);
        assert_eq!(top_share(&empty), 0.0);
        let zeros = table("produce:0;dairy:0");
        assert_eq!(category_share(&zeros, "produce"), 0.0);
        assert_eq!(top_share(&zeros), 0.0);
    }

    #[test]
    fn days_follow_canonical_order() {
        let t = table("일:4;수:2;월:7;Holiday:1;토:3");
        assert_eq!(labels(&order_days(&t)), vec!["월", "수", "토", "일", "Holiday"]);
        let t = table("sunday:1;Mon:2;Wed:3");
        assert_eq!(labels(&order_days(&t)), vec!["Mon", "Wed", "sunday"]);
    }

    #[test]
    fn hours_sort_numerically() {
        let t = table("14시:3;9시:5;0시:1;late:2");
        assert_eq!(labels(&order_hours(&t)), vec!["0시", "9시", "14시", "late"]);
    }

    #[test]
    fn top_n_is_stable() {
        let t = table("a:1;b:4;c:4;d:9;e:2");
        assert_eq!(labels(&top_n(&t, 3)), vec!["d", "b", "c"]);
        assert_eq!(top_n(&t, 10).len(), 5);
    }

    #[test]
    fn kpis_for_profile() {
        let profile = UserProfile {
            dow: table("일:9;월:9;화:1"),
            hour: table("10시:4;15시:6"),
            department: table("produce:25;dairy eggs:75"),
            aisle: table("fresh fruits:3;yogurt:1"),
            ..UserProfile::default()
        };
        let kpi = KpiSet::compute(&profile, "produce");
        // Monday comes first once the table is in canonical order.
        assert_eq!(kpi.peak_day, PeakKpi { label: "월".to_string(), count: 9 });
        assert_eq!(kpi.peak_hour, PeakKpi { label: "15시".to_string(), count: 6 });
        assert!((kpi.produce_pct - 25.0).abs() < 1e-9);
        assert_eq!(kpi.top_aisle.label, "fresh fruits");
        assert!((kpi.top_aisle.pct - 75.0).abs() < 1e-9);
    }

    #[test]
    fn peak_hour_tie_goes_to_earliest_hour() {
        let profile = UserProfile { hour: table("15시:6;9시:6;11시:2"), ..UserProfile::default() };
        let kpi = KpiSet::compute(&profile, "produce");
        assert_eq!(kpi.peak_hour, PeakKpi { label: "9시".to_string(), count: 6 });
    }

    #[test]
    fn kpis_for_empty_profile() {
        let kpi = KpiSet::compute(&UserProfile::default(), "produce");
        assert_eq!(kpi.peak_day.label, NOT_AVAILABLE);
        assert_eq!(kpi.peak_hour.count, 0);
        assert_eq!(kpi.produce_pct, 0.0);
        assert_eq!(kpi.top_aisle, ShareKpi { label: NOT_AVAILABLE.to_string(), pct: 0.0 });
    }
}
