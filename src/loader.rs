use crate::parser::{parse_frequency, parse_range_stat, ParseMode};
use crate::types::{RawRow, ReportRow, UserProfile};
use crate::util::{compare_ids, parse_count_coerce, parse_f64_safe, parse_u32_safe, strip_unit_suffix};
use csv::{ReaderBuilder, StringRecord};
use std::collections::{BTreeSet, HashMap};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

const BOM: char = '\u{feff}';

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("report file not found: {}", .0.display())]
    NotFound(PathBuf),
    #[error("failed to read report: {0}")]
    Io(#[from] io::Error),
    #[error("malformed CSV: {0}")]
    Csv(#[from] csv::Error),
    #[error("line {line}: column `{column}` has unparseable value {value:?}")]
    InvalidField { line: usize, column: &'static str, value: String },
}

#[derive(Debug, Clone, Default)]
pub struct LoadReport {
    pub total_rows: usize,
    pub users: usize,
    pub segments: usize,
    pub malformed_cells: usize,
}

/// Segment filter applied before user selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SegmentFilter {
    All,
    Only(String),
}

impl SegmentFilter {
    /// `"all"` (any case) or `"전체"` means no filter.
    pub fn parse(s: &str) -> Self {
        let s = s.trim();
        if s.is_empty() || s.eq_ignore_ascii_case("all") || s == "전체" {
            SegmentFilter::All
        } else {
            SegmentFilter::Only(s.to_string())
        }
    }

    fn matches(&self, segment: &str) -> bool {
        match self {
            SegmentFilter::All => true,
            SegmentFilter::Only(s) => s == segment,
        }
    }
}

/// Outcome of a segment/user selection.
#[derive(Debug)]
pub enum Selection<'a> {
    Found { rows: Vec<&'a ReportRow>, profile: &'a UserProfile },
    NoData,
}

/// Read-only handle over a loaded report. Reloading a changed file means
/// opening a new store.
#[derive(Debug)]
pub struct ReportStore {
    rows: Vec<ReportRow>,
    profiles: HashMap<String, UserProfile>,
    report: LoadReport,
}

fn cell(s: &Option<String>) -> Option<&str> {
    s.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

fn parse_unit_number(
    raw: &Option<String>,
    line: usize,
    column: &'static str,
) -> Result<Option<f64>, LoadError> {
    let Some(text) = cell(raw) else {
        return Ok(None);
    };
    match parse_f64_safe(Some(strip_unit_suffix(text))) {
        Some(v) => Ok(Some(v)),
        None => Err(LoadError::InvalidField { line, column, value: text.to_string() }),
    }
}

fn normalize(row: RawRow, line: usize) -> Result<ReportRow, LoadError> {
    let reorder_ratio = parse_unit_number(&row.reorder_ratio, line, "reorder_ratio")?;
    let rec_taste_score = parse_unit_number(&row.rec_taste_score, line, "rec_taste_score")?;
    let total_orders = parse_count_coerce(cell(&row.total_orders));
    let precision = parse_f64_safe(cell(&row.precision));
    let rec_rank = parse_u32_safe(cell(&row.rec_rank)).filter(|r| *r > 0);

    Ok(ReportRow {
        user_id: cell(&row.user_id).unwrap_or_default().to_string(),
        segment: cell(&row.segment).unwrap_or_default().to_string(),
        total_orders,
        reorder_ratio,
        precision,
        order_interval_stats: row.days_since_prior_order_stats,
        basket_size_stats: row.basket_size_stats,
        dow_counts: row.dow_counts,
        hour_counts: row.hour_counts,
        department_counts: row.department_counts,
        aisle_counts: row.aisle_counts,
        rec_rank,
        rec_product_name: cell(&row.rec_product_name).unwrap_or_default().to_string(),
        rec_taste_score,
        rec_reason_tags: row.rec_reason_tags.unwrap_or_default(),
        actual_purchases: row.actual_purchases.unwrap_or_default(),
    })
}

/// Parse the user-level cells of a user's first row.
fn build_profile(row: &ReportRow, mode: ParseMode, malformed: &mut usize) -> UserProfile {
    let mut freq = |name: &str, raw: &Option<String>| {
        let parsed = parse_frequency(raw.as_deref(), mode);
        if parsed.malformed {
            *malformed += 1;
            warn!(user = %row.user_id, field = name, "malformed frequency cell");
        }
        parsed.table
    };
    let dow = freq("dow_counts", &row.dow_counts);
    let hour = freq("hour_counts", &row.hour_counts);
    let department = freq("department_counts", &row.department_counts);
    let aisle = freq("aisle_counts", &row.aisle_counts);

    UserProfile {
        order_interval: parse_range_stat(row.order_interval_stats.as_deref()),
        basket_size: parse_range_stat(row.basket_size_stats.as_deref()),
        dow,
        hour,
        department,
        aisle,
    }
}

impl ReportStore {
    pub fn open(path: impl AsRef<Path>, mode: ParseMode) -> Result<Self, LoadError> {
        let path = path.as_ref();
        let file = std::fs::File::open(path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => LoadError::NotFound(path.to_path_buf()),
            _ => LoadError::Io(e),
        })?;
        info!(path = %path.display(), "loading report");
        Self::from_reader(file, mode)
    }

    pub fn from_reader<R: Read>(mut reader: R, mode: ParseMode) -> Result<Self, LoadError> {
        let mut text = String::new();
        reader.read_to_string(&mut text)?;
        let body = text.strip_prefix(BOM).unwrap_or(&text);

        let mut rdr = ReaderBuilder::new().flexible(true).from_reader(body.as_bytes());
        let headers = rdr.headers()?.clone();
        let mut record = StringRecord::new();
        let mut rows = Vec::new();
        while rdr.read_record(&mut record)? {
            // Quoted cells may span lines, so take the line the record starts on.
            let line = record.position().map_or(0, |p| p.line() as usize);
            let raw: RawRow = record.deserialize(Some(&headers))?;
            rows.push(normalize(raw, line)?);
        }

        let mut profiles: HashMap<String, UserProfile> = HashMap::new();
        let mut malformed_cells = 0usize;
        for row in &rows {
            if !profiles.contains_key(&row.user_id) {
                let profile = build_profile(row, mode, &mut malformed_cells);
                profiles.insert(row.user_id.clone(), profile);
            }
        }

        let segments: BTreeSet<&str> = rows.iter().map(|r| r.segment.as_str()).collect();
        let report = LoadReport {
            total_rows: rows.len(),
            users: profiles.len(),
            segments: segments.len(),
            malformed_cells,
        };
        debug!(?report, "report loaded");
        Ok(ReportStore { rows, profiles, report })
    }

    pub fn load_report(&self) -> &LoadReport {
        &self.report
    }

    #[cfg(test)]
    pub fn rows(&self) -> &[ReportRow] {
        &self.rows
    }

    /// Distinct segment labels, sorted.
    pub fn segments(&self) -> Vec<String> {
        let set: BTreeSet<&str> = self.rows.iter().map(|r| r.segment.as_str()).collect();
        set.into_iter().map(str::to_string).collect()
    }

    /// Distinct user ids in the filtered segment; numeric ids sort by value.
    pub fn users(&self, filter: &SegmentFilter) -> Vec<String> {
        let mut ids: Vec<String> = Vec::new();
        for r in self.rows.iter().filter(|r| filter.matches(&r.segment)) {
            if !ids.contains(&r.user_id) {
                ids.push(r.user_id.clone());
            }
        }
        ids.sort_by(|a, b| compare_ids(a, b));
        ids
    }

    pub fn rows_for(&self, user_id: &str) -> Vec<&ReportRow> {
        self.rows.iter().filter(|r| r.user_id == user_id).collect()
    }

    pub fn profile(&self, user_id: &str) -> Option<&UserProfile> {
        self.profiles.get(user_id)
    }

    /// Rows and parsed profile for `user_id`, provided the user belongs to
    /// the filtered segment.
    pub fn select(&self, filter: &SegmentFilter, user_id: &str) -> Selection<'_> {
        let rows: Vec<&ReportRow> = self
            .rows_for(user_id)
            .into_iter()
            .filter(|r| filter.matches(&r.segment))
            .collect();
        match (rows.is_empty(), self.profile(user_id)) {
            (false, Some(profile)) => Selection::Found { rows, profile },
            _ => Selection::NoData,
        }
    }
}
