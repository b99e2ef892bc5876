use crate::loader::{ReportStore, SegmentFilter, Selection};
use crate::metrics::{order_days, order_hours, top_n};
use crate::types::{
    FrequencyTable, KpiSet, ProfileRow, RangeStat, RecommendationRow, ReportRow, TasteScore,
    UserProfile,
};
use crate::util::{format_int, format_number};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::HashSet;

/// Everything rendered for one selected user.
#[derive(Debug, Clone, Serialize)]
pub struct UserReport {
    pub user_id: String,
    pub generated_at: DateTime<Utc>,
    pub profile: ProfileRow,
    pub order_interval: RangeStat,
    pub basket_size: RangeStat,
    pub basket_constant: bool,
    pub dow: FrequencyTable,
    pub hour: FrequencyTable,
    pub department: FrequencyTable,
    pub aisle: FrequencyTable,
    pub kpi: KpiSet,
    pub recommendations: Vec<RecommendationRow>,
    pub taste_scores: Vec<TasteScore>,
    pub actual_purchases: Vec<String>,
    pub insights: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct ReportOptions {
    pub produce_label: String,
    pub top: usize,
}

impl Default for ReportOptions {
    fn default() -> Self {
        ReportOptions { produce_label: "produce".to_string(), top: 10 }
    }
}

/// Split `"a; b;a"` into trimmed, non-empty names, first occurrence kept.
pub fn purchase_list(cell: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    cell.split(';')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .filter(|s| seen.insert(*s))
        .map(str::to_string)
        .collect()
}

/// `"#staple#fruit"` -> `["#staple", "#fruit"]`.
pub fn reason_tags(cell: &str) -> Vec<String> {
    cell.split('#')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| format!("#{}", s))
        .collect()
}

fn recommendation_rows(rows: &[&ReportRow], purchased: &HashSet<&str>) -> Vec<RecommendationRow> {
    let mut sorted: Vec<&ReportRow> = rows.to_vec();
    sorted.sort_by_key(|r| r.rec_rank.unwrap_or(u32::MAX));
    sorted
        .into_iter()
        .map(|r| RecommendationRow {
            rank: r.rec_rank.map(|n| n.to_string()).unwrap_or_else(|| "-".to_string()),
            product: r.rec_product_name.clone(),
            taste_score: r
                .rec_taste_score
                .map(|v| format_number(v, 1))
                .unwrap_or_else(|| "-".to_string()),
            purchased: purchased.contains(r.rec_product_name.as_str()),
            reasons: reason_tags(&r.rec_reason_tags).join(" "),
        })
        .collect()
}

/// Scored recommendations, highest score first; unscored items are left out.
fn taste_scores(rows: &[&ReportRow], purchased: &HashSet<&str>) -> Vec<TasteScore> {
    let mut scores: Vec<TasteScore> = rows
        .iter()
        .filter_map(|r| {
            r.rec_taste_score.map(|score| TasteScore {
                product: r.rec_product_name.clone(),
                score,
                purchased: purchased.contains(r.rec_product_name.as_str()),
            })
        })
        .collect();
    scores.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
    scores
}

fn profile_row(first: &ReportRow) -> ProfileRow {
    ProfileRow {
        segment: first.segment.clone(),
        total_orders: format_int(first.total_orders),
        reorder_ratio: first
            .reorder_ratio
            .map(|v| format!("{}%", format_number(v, 1)))
            .unwrap_or_else(|| "-".to_string()),
        precision: first
            .precision
            .map(|v| format!("{}%", format_number(v * 100.0, 1)))
            .unwrap_or_else(|| "-".to_string()),
    }
}

fn insights(profile: &UserProfile) -> Vec<String> {
    let oi = &profile.order_interval;
    let bs = &profile.basket_size;
    vec![
        format!(
            "Order interval: reorders every {} {} on average, ranging from {} to {} {}.",
            oi.average, oi.unit, oi.minimum, oi.maximum, oi.unit
        ),
        format!("Basket size: usually {} {} per order.", bs.average, bs.unit),
    ]
}

impl UserReport {
    pub fn from_selection(
        user_id: &str,
        rows: &[&ReportRow],
        profile: &UserProfile,
        opts: &ReportOptions,
    ) -> Option<Self> {
        let first = rows.first()?;
        let actual_purchases = purchase_list(&first.actual_purchases);
        let purchased: HashSet<&str> = actual_purchases.iter().map(String::as_str).collect();
        let recommendations = recommendation_rows(rows, &purchased);
        let taste_scores = taste_scores(rows, &purchased);

        Some(UserReport {
            user_id: user_id.to_string(),
            generated_at: Utc::now(),
            profile: profile_row(first),
            order_interval: profile.order_interval.clone(),
            basket_size: profile.basket_size.clone(),
            basket_constant: profile.basket_size.is_constant(),
            dow: order_days(&profile.dow),
            hour: order_hours(&profile.hour),
            department: top_n(&profile.department, opts.top),
            aisle: top_n(&profile.aisle, opts.top),
            kpi: KpiSet::compute(profile, &opts.produce_label),
            recommendations,
            taste_scores,
            actual_purchases,
            insights: insights(profile),
        })
    }

    /// Build the report for a segment/user selection; `None` when the
    /// selection has no rows.
    pub fn build(
        store: &ReportStore,
        filter: &SegmentFilter,
        user_id: &str,
        opts: &ReportOptions,
    ) -> Option<Self> {
        match store.select(filter, user_id) {
            Selection::Found { rows, profile } => {
                Self::from_selection(user_id, &rows, profile, opts)
            }
            Selection::NoData => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::ParseMode;

    const CSV: &str = "user_id,segment,total_orders,reorder_ratio,precision,days_since_prior_order_stats,basket_size_stats,dow_counts,hour_counts,department_counts,aisle_counts,rec_rank,rec_product_name,rec_taste_score,rec_reason_tags,actual_purchases
7,Loyal,1234,45.2%,0.25,\"average 6.5, minimum 2, maximum 12 days\",\"average 4, minimum 4, maximum 4 items\",일:1;월:2,15시:1;9시:3,produce:3;bakery:1;snacks:4,a:1;b:2;c:3,2,Milk,80점,#dairy,Banana; Milk ;Banana
7,Loyal,1234,45.2%,0.25,\"average 6.5, minimum 2, maximum 12 days\",\"average 4, minimum 4, maximum 4 items\",일:1;월:2,15시:1;9시:3,produce:3;bakery:1;snacks:4,a:1;b:2;c:3,1,Kale,91.5점,#greens#healthy,Banana; Milk ;Banana
8,New,3,10%,,,,,,,,1,Tea,50,,
";

    fn store() -> ReportStore {
        ReportStore::from_reader(CSV.as_bytes(), ParseMode::Strict).unwrap()
    }

    #[test]
    fn builds_user_report() {
        let s = store();
        let opts = ReportOptions { top: 2, ..ReportOptions::default() };
        let r = UserReport::build(&s, &SegmentFilter::All, "7", &opts).unwrap();

        assert_eq!(r.profile.total_orders, "1,234");
        assert_eq!(r.profile.reorder_ratio, "45.2%");
        assert_eq!(r.profile.precision, "25.0%");
        assert!(r.basket_constant);
        assert_eq!(r.dow.entries[0].label, "월");
        assert_eq!(r.hour.entries[0].label, "9시");
        assert_eq!(r.department.len(), 2);
        assert_eq!(r.department.entries[0].label, "snacks");
        assert!((r.kpi.produce_pct - 37.5).abs() < 1e-9);
        assert_eq!(r.actual_purchases, vec!["Banana", "Milk"]);

        assert_eq!(r.recommendations.len(), 2);
        assert_eq!(r.recommendations[0].product, "Kale");
        assert_eq!(r.recommendations[0].reasons, "#greens #healthy");
        assert!(!r.recommendations[0].purchased);
        assert_eq!(r.recommendations[1].taste_score, "80.0");
        assert!(r.recommendations[1].purchased);
        assert_eq!(r.insights.len(), 2);

        let chart: Vec<(&str, bool)> =
            r.taste_scores.iter().map(|t| (t.product.as_str(), t.purchased)).collect();
        assert_eq!(chart, vec![("Kale", false), ("Milk", true)]);
        assert_eq!(r.taste_scores[0].score, 91.5);
    }

    #[test]
    fn sparse_user_still_reports() {
        let s = store();
        let r = UserReport::build(&s, &SegmentFilter::parse("New"), "8", &ReportOptions::default())
            .unwrap();
        assert_eq!(r.profile.precision, "-");
        assert!(r.dow.is_empty());
        assert_eq!(r.kpi.peak_day.label, "N/A");
        assert!(r.actual_purchases.is_empty());
        assert_eq!(r.order_interval, RangeStat::default());
    }

    #[test]
    fn miss_is_none() {
        let s = store();
        let opts = ReportOptions::default();
        assert!(UserReport::build(&s, &SegmentFilter::parse("New"), "7", &opts).is_none());
        assert!(UserReport::build(&s, &SegmentFilter::All, "99", &opts).is_none());
    }

    #[test]
    fn tag_and_purchase_splitting() {
        assert_eq!(reason_tags("#a# b#"), vec!["#a", "#b"]);
        assert!(reason_tags("").is_empty());
        assert_eq!(purchase_list(" x ;y;;x"), vec!["x", "y"]);
    }

    #[test]
    fn report_serializes() {
        let s = store();
        let r = UserReport::build(&s, &SegmentFilter::All, "7", &ReportOptions::default()).unwrap();
        let json = serde_json::to_value(&r).unwrap();
        assert_eq!(json["user_id"], "7");
        assert_eq!(json["dow"][0]["label"], "월");
        assert_eq!(json["kpi"]["peak_hour"]["count"], 3);
    }
}
