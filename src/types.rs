use serde::{Deserialize, Serialize};
use tabled::Tabled;

/// One CSV record exactly as it appears in the report file. Every cell is
/// optional text; normalization happens in the loader.
#[derive(Debug, Deserialize)]
pub struct RawRow {
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub segment: Option<String>,
    #[serde(default)]
    pub total_orders: Option<String>,
    #[serde(default)]
    pub reorder_ratio: Option<String>,
    #[serde(default)]
    pub precision: Option<String>,
    #[serde(default)]
    pub days_since_prior_order_stats: Option<String>,
    #[serde(default)]
    pub basket_size_stats: Option<String>,
    #[serde(default)]
    pub dow_counts: Option<String>,
    #[serde(default)]
    pub hour_counts: Option<String>,
    #[serde(default)]
    pub department_counts: Option<String>,
    #[serde(default)]
    pub aisle_counts: Option<String>,
    #[serde(default)]
    pub rec_rank: Option<String>,
    #[serde(default)]
    pub rec_product_name: Option<String>,
    #[serde(default)]
    pub rec_taste_score: Option<String>,
    #[serde(default)]
    pub rec_reason_tags: Option<String>,
    #[serde(default)]
    pub actual_purchases: Option<String>,
}

/// A normalized report row: one recommended item for one user.
#[derive(Debug, Clone, Serialize)]
pub struct ReportRow {
    pub user_id: String,
    pub segment: String,
    pub total_orders: u32,
    pub reorder_ratio: Option<f64>,
    pub precision: Option<f64>,
    pub order_interval_stats: Option<String>,
    pub basket_size_stats: Option<String>,
    pub dow_counts: Option<String>,
    pub hour_counts: Option<String>,
    pub department_counts: Option<String>,
    pub aisle_counts: Option<String>,
    pub rec_rank: Option<u32>,
    pub rec_product_name: String,
    pub rec_taste_score: Option<f64>,
    pub rec_reason_tags: String,
    pub actual_purchases: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FreqEntry {
    pub label: String,
    pub count: u64,
}

impl FreqEntry {
    pub fn new(label: impl Into<String>, count: u64) -> Self {
        Self { label: label.into(), count }
    }
}

/// Ordered label/count pairs decoded from a `label:count;...` cell.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FrequencyTable {
    pub entries: Vec<FreqEntry>,
}

impl FrequencyTable {
    pub fn new(entries: Vec<FreqEntry>) -> Self {
        Self { entries }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, FreqEntry> {
        self.entries.iter()
    }

    pub fn total(&self) -> u64 {
        self.entries.iter().map(|e| e.count).sum()
    }

    #[cfg(test)]
    pub fn get(&self, label: &str) -> Option<u64> {
        self.entries.iter().find(|e| e.label == label).map(|e| e.count)
    }
}

/// `{average, minimum, maximum, unit}` decoded from a stats sentence.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RangeStat {
    pub average: f64,
    pub minimum: i64,
    pub maximum: i64,
    pub unit: String,
}

impl RangeStat {
    pub fn is_constant(&self) -> bool {
        self.minimum == self.maximum
    }
}

/// Parsed user-level cells, built once per user at load time.
#[derive(Debug, Clone, Default, Serialize)]
pub struct UserProfile {
    pub order_interval: RangeStat,
    pub basket_size: RangeStat,
    pub dow: FrequencyTable,
    pub hour: FrequencyTable,
    pub department: FrequencyTable,
    pub aisle: FrequencyTable,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeakKpi {
    pub label: String,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShareKpi {
    pub label: String,
    pub pct: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KpiSet {
    pub peak_day: PeakKpi,
    pub peak_hour: PeakKpi,
    pub produce_pct: f64,
    pub top_aisle: ShareKpi,
}

#[derive(Debug, Clone, Serialize, Tabled)]
pub struct RecommendationRow {
    #[serde(rename = "Rank")]
    #[tabled(rename = "Rank")]
    pub rank: String,
    #[serde(rename = "Product")]
    #[tabled(rename = "Product")]
    pub product: String,
    #[serde(rename = "TasteScore")]
    #[tabled(rename = "TasteScore")]
    pub taste_score: String,
    #[serde(rename = "Purchased")]
    #[tabled(rename = "Purchased")]
    pub purchased: bool,
    #[serde(rename = "Reasons")]
    #[tabled(rename = "Reasons")]
    pub reasons: String,
}

/// One bar of the taste-score chart.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TasteScore {
    pub product: String,
    pub score: f64,
    pub purchased: bool,
}

#[derive(Debug, Clone, Serialize, Tabled)]
pub struct ProfileRow {
    #[serde(rename = "Segment")]
    #[tabled(rename = "Segment")]
    pub segment: String,
    #[serde(rename = "TotalOrders")]
    #[tabled(rename = "TotalOrders")]
    pub total_orders: String,
    #[serde(rename = "ReorderRatio")]
    #[tabled(rename = "ReorderRatio")]
    pub reorder_ratio: String,
    #[serde(rename = "Precision")]
    #[tabled(rename = "Precision")]
    pub precision: String,
}

#[derive(Debug, Clone, Serialize, Tabled)]
pub struct StatRow {
    #[tabled(rename = "Statistic")]
    pub name: String,
    #[tabled(rename = "Average")]
    pub average: String,
    #[tabled(rename = "Min")]
    pub minimum: String,
    #[tabled(rename = "Max")]
    pub maximum: String,
}

#[derive(Debug, Clone, Serialize, Tabled)]
pub struct KpiRow {
    #[tabled(rename = "KPI")]
    pub name: String,
    #[tabled(rename = "Value")]
    pub value: String,
}
