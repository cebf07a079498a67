//! Data Availability Validation
//!
//! Answers "is there data for the month the user asked about?" and, when the
//! answer is no, always proposes the nearest month that does have data.
//! The set of known months is derived once from the backing dataset and
//! never changes afterwards, so one validator can be shared across threads.

use std::collections::BTreeSet;
use std::fmt;
use std::io::Read;
use std::path::Path;

use chrono::{Datelike, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::error::QaError;

/// How many alternatives to offer when a period is missing or unparsable.
const MAX_ALTERNATIVES: usize = 3;

// ============================================================================
// Year-month period
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct YearMonth {
    pub year: i32,
    pub month: u32,
}

impl YearMonth {
    pub fn new(year: i32, month: u32) -> Option<Self> {
        (1..=12).contains(&month).then_some(Self { year, month })
    }

    fn index(self) -> i64 {
        self.year as i64 * 12 + (self.month as i64 - 1)
    }

    /// Absolute distance in months.
    pub fn months_between(self, other: YearMonth) -> u64 {
        (self.index() - other.index()).unsigned_abs()
    }
}

impl From<NaiveDate> for YearMonth {
    fn from(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

/// Parse a user-supplied period.
///
/// Accepts `YYYY-MM`, `YYYY/MM`, `YYYY-MM-DD`, `MM/YYYY`, `Month YYYY` and
/// `Mon YYYY`.
pub fn parse_period(input: &str) -> Option<YearMonth> {
    let s = input.trim();
    if s.is_empty() {
        return None;
    }

    let candidates = [
        (s.to_string(), "%Y-%m-%d"),
        (format!("{}-01", s), "%Y-%m-%d"),
        (format!("{}/01", s), "%Y/%m/%d"),
        (format!("01/{}", s), "%d/%m/%Y"),
        (format!("1 {}", s), "%d %B %Y"),
        (format!("1 {}", s), "%d %b %Y"),
    ];

    candidates
        .iter()
        .find_map(|(text, fmt)| NaiveDate::parse_from_str(text, fmt).ok())
        .map(YearMonth::from)
}

/// Parse a date cell from the backing dataset.
fn parse_dataset_date(cell: &str) -> Option<YearMonth> {
    let s = cell.trim();
    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt.date().into());
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(s, "%d/%m/%Y") {
        return Some(date.into());
    }
    parse_period(s)
}

// ============================================================================
// Validator
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AvailabilityResult {
    pub available: bool,
    pub message: String,
    /// Period strings, nearest or earliest first
    pub alternatives: Vec<String>,
    pub suggestion: String,
}

#[derive(Debug, Clone)]
pub struct DataAvailabilityValidator {
    periods: BTreeSet<YearMonth>,
}

impl DataAvailabilityValidator {
    pub fn from_periods<I: IntoIterator<Item = YearMonth>>(periods: I) -> Self {
        let periods: BTreeSet<YearMonth> = periods.into_iter().collect();
        tracing::debug!(periods = periods.len(), "[Availability] Validator ready");
        Self { periods }
    }

    pub fn from_dates<I: IntoIterator<Item = NaiveDate>>(dates: I) -> Self {
        Self::from_periods(dates.into_iter().map(YearMonth::from))
    }

    /// Build from CSV data, reading the header-named `date_column`.
    /// Rows whose date does not parse are skipped.
    pub fn from_csv_reader<R: Read>(reader: R, date_column: &str) -> Result<Self, QaError> {
        let mut rdr = csv::Reader::from_reader(reader);
        let headers = rdr.headers()?.clone();
        let column = headers
            .iter()
            .position(|h| h.trim().eq_ignore_ascii_case(date_column))
            .ok_or_else(|| {
                QaError::Dataset(format!("date column '{}' not found in header", date_column))
            })?;

        let mut periods = BTreeSet::new();
        let mut skipped = 0usize;
        for record in rdr.records() {
            let record = record?;
            match record.get(column).and_then(parse_dataset_date) {
                Some(period) => {
                    periods.insert(period);
                }
                None => skipped += 1,
            }
        }

        if skipped > 0 {
            tracing::debug!(skipped, column = date_column, "[Availability] Skipped unparsable dates");
        }
        Ok(Self::from_periods(periods))
    }

    pub fn from_csv_path(path: &Path, date_column: &str) -> Result<Self, QaError> {
        let file = std::fs::File::open(path)?;
        Self::from_csv_reader(file, date_column)
    }

    pub fn periods(&self) -> impl Iterator<Item = YearMonth> + '_ {
        self.periods.iter().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.periods.is_empty()
    }

    pub fn validate(&self, period: Option<&str>) -> AvailabilityResult {
        let (first, last) = match (self.periods.first(), self.periods.last()) {
            (Some(first), Some(last)) => (*first, *last),
            _ => {
                return AvailabilityResult {
                    available: false,
                    message: "No data has been loaded, so no period can be answered.".into(),
                    alternatives: Vec::new(),
                    suggestion: String::new(),
                }
            }
        };

        let Some(raw) = period else {
            return AvailabilityResult {
                available: true,
                message: format!(
                    "No period specified; all available data ({} to {}) will be used.",
                    first, last
                ),
                alternatives: self.periods.iter().map(|p| p.to_string()).collect(),
                suggestion: String::new(),
            };
        };

        let Some(requested) = parse_period(raw) else {
            let alternatives: Vec<String> = self
                .periods
                .iter()
                .take(MAX_ALTERNATIVES)
                .map(|p| p.to_string())
                .collect();
            tracing::debug!(period = raw, "[Availability] Unparsable period");
            return AvailabilityResult {
                available: false,
                message: format!("Could not understand the period '{}'.", raw),
                suggestion: format!("Try a period like: {}", alternatives.join(", ")),
                alternatives,
            };
        };

        if self.periods.contains(&requested) {
            return AvailabilityResult {
                available: true,
                message: format!("Data is available for {}.", requested),
                alternatives: Vec::new(),
                suggestion: String::new(),
            };
        }

        let nearest = self.nearest(requested);
        let alternatives: Vec<String> = nearest.iter().map(|p| p.to_string()).collect();
        let closest = alternatives.first().cloned().unwrap_or_default();

        AvailabilityResult {
            available: false,
            message: format!(
                "No data for {}. Data covers {} to {}.",
                requested, first, last
            ),
            suggestion: format!("Did you mean {}? It is the closest period with data.", closest),
            alternatives,
        }
    }

    /// Known periods ordered by distance to `target`; ties go to the more
    /// recent period.
    fn nearest(&self, target: YearMonth) -> Vec<YearMonth> {
        let mut ranked: Vec<YearMonth> = self.periods.iter().copied().collect();
        ranked.sort_by(|a, b| {
            a.months_between(target)
                .cmp(&b.months_between(target))
                .then_with(|| b.cmp(a))
        });
        ranked.truncate(MAX_ALTERNATIVES);
        ranked
    }
}
