//! Typed model-year and fail-date parsing for raw complaint fields.
//!
//! The flat file stores dates as `YYYYMMDD` digits, but older rows carry
//! truncated `YYMMDD`/`YYMDD` forms, swapped month/day pairs, float
//! renderings such as `20210115.0`, and occasional free text. Every parse here
//! degrades to `None` instead of failing.

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, Utc};
use tracing::{debug, info, instrument};

use crate::cohort::CohortKeys;
use crate::record::{NormalizedComplaint, RawComplaint};
use crate::schema::Schema;
use crate::stats::IngestStats;

/// Earliest model year and fail year accepted.
pub const MIN_YEAR: i64 = 1970;

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%Y.%m.%d",
    "%Y%m%d",
    "%m/%d/%Y",
    "%m-%d-%Y",
    "%d %B %Y",
    "%d %b %Y",
    "%B %d, %Y",
    "%b %d, %Y",
    "%B %d %Y",
    "%b %d %Y",
];

/// Outcome of the fixed-width digit interpretation.
enum Compact {
    Date(NaiveDateTime),
    Missing,
    /// The digits could not be read as a calendar date; try free text.
    Fallback,
}

/// Parses raw year and date fields against a reference "current year".
#[derive(Debug, Clone, Copy)]
pub struct RecordNormalizer {
    current_year: i32,
}

impl Default for RecordNormalizer {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordNormalizer {
    pub fn new() -> Self {
        Self::with_current_year(Utc::now().year())
    }

    pub fn with_current_year(current_year: i32) -> Self {
        Self { current_year }
    }

    pub fn current_year(&self) -> i32 {
        self.current_year
    }

    /// Converts a raw model year to an integer in `[1970, current_year + 1]`.
    pub fn parse_model_year(&self, raw: &str) -> Option<i32> {
        let year = truncate_numeric(raw)?;
        let upper = i64::from(self.current_year) + 1;
        (MIN_YEAR..=upper)
            .contains(&year)
            .then_some(year as i32)
    }

    /// Parses a raw fail date.
    ///
    /// Numeric input is truncated to its integer digits and read by length:
    /// `YYYYMMDD` (falling back to `YYYYDDMM` when the month is out of range),
    /// `YYMMDD` and `YYMDD` in the 2000s. Anything else goes through the
    /// free-text parser.
    pub fn parse_fail_date(&self, raw: &str) -> Option<NaiveDateTime> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }

        let Some(value) = truncate_numeric(trimmed) else {
            return parse_free_text(trimmed);
        };

        let digits = value.to_string();
        match self.parse_compact(&digits) {
            Compact::Date(dt) => Some(dt),
            Compact::Missing => None,
            Compact::Fallback => parse_free_text(&digits),
        }
    }

    fn parse_compact(&self, digits: &str) -> Compact {
        let (year, month, day) = match digits.len() {
            8 => {
                let (Some(year), Some(first), Some(second)) = (
                    slice_int(digits, 0, 4),
                    slice_int(digits, 4, 6),
                    slice_int(digits, 6, 8),
                ) else {
                    return Compact::Fallback;
                };
                if !self.is_fail_year(year) {
                    return Compact::Missing;
                }
                if is_month(first) && is_day(second) {
                    (year, first, second)
                } else if is_day(first) && is_month(second) {
                    (year, second, first)
                } else {
                    return Compact::Missing;
                }
            }
            6 | 5 => {
                let month_end = if digits.len() == 6 { 4 } else { 3 };
                let (Some(year), Some(month), Some(day)) = (
                    slice_int(&format!("20{}", &digits[..2]), 0, 4),
                    slice_int(digits, 2, month_end),
                    slice_int(digits, month_end, digits.len()),
                ) else {
                    return Compact::Fallback;
                };
                if !self.is_fail_year(year) || !is_month(month) || !is_day(day) {
                    return Compact::Missing;
                }
                (year, month, day)
            }
            _ => return Compact::Fallback,
        };

        // Range checks pass for dates like Feb 30; those fall through to free text.
        match ymd(year, month, day) {
            Some(dt) => Compact::Date(dt),
            None => Compact::Fallback,
        }
    }

    fn is_fail_year(&self, year: i64) -> bool {
        (MIN_YEAR..=i64::from(self.current_year)).contains(&year)
    }

    /// Derives typed fields and cohort keys for one raw row.
    pub fn normalize(&self, raw: RawComplaint, schema: &Schema) -> NormalizedComplaint {
        let make = raw.field(schema.make_index()).to_string();
        let model = raw.field(schema.model_index()).to_string();
        let year_text = raw.field(schema.year_index());

        let model_year = self.parse_model_year(year_text);
        let fail_date = self.parse_fail_date(raw.field(schema.fail_date_index()));
        let fail_epoch = to_epoch(fail_date);
        let keys = CohortKeys::build(&make, &model, year_text);

        NormalizedComplaint {
            raw,
            make,
            model,
            model_year,
            fail_date,
            fail_epoch,
            keys,
            count: 1,
        }
    }

    /// Normalizes every row, tallying missing fields into `stats`.
    #[instrument(skip_all, fields(rows = rows.len(), current_year = self.current_year))]
    pub fn normalize_all(
        &self,
        rows: Vec<RawComplaint>,
        schema: &Schema,
        stats: &mut IngestStats,
    ) -> Vec<NormalizedComplaint> {
        let records: Vec<NormalizedComplaint> = rows
            .into_iter()
            .map(|raw| self.normalize(raw, schema))
            .collect();

        for record in &records {
            if record.model_year.is_none() {
                stats.missing_model_year += 1;
            }
            if record.fail_date.is_none() {
                stats.missing_fail_date += 1;
            }
        }

        info!(
            normalized = records.len(),
            missing_model_year = stats.missing_model_year,
            missing_fail_date = stats.missing_fail_date,
            "Records normalized"
        );
        records
    }
}

/// Converts a fail date to Unix seconds, reading naive values as UTC.
pub fn to_epoch(dt: Option<NaiveDateTime>) -> Option<i64> {
    dt.map(|dt| dt.and_utc().timestamp())
}

/// Free-text date parsing for values the digit rules cannot read.
pub fn parse_free_text(raw: &str) -> Option<NaiveDateTime> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_utc());
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return Some(dt.naive_utc());
    }

    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt);
        }
    }
    for fmt in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(s, fmt) {
            return Some(date.and_time(chrono::NaiveTime::MIN));
        }
    }

    debug!(value = s, "Unparseable date");
    None
}

/// Reads a number (integer or float text) and truncates it toward zero.
fn truncate_numeric(raw: &str) -> Option<i64> {
    let value: f64 = raw.trim().parse().ok()?;
    if !value.is_finite() {
        return None;
    }
    let truncated = value.trunc();
    if truncated < i64::MIN as f64 || truncated >= i64::MAX as f64 {
        return None;
    }
    Some(truncated as i64)
}

fn slice_int(s: &str, start: usize, end: usize) -> Option<i64> {
    s.get(start..end)?.parse().ok()
}

fn is_month(v: i64) -> bool {
    (1..=12).contains(&v)
}

fn is_day(v: i64) -> bool {
    (1..=31).contains(&v)
}

fn ymd(year: i64, month: i64, day: i64) -> Option<NaiveDateTime> {
    NaiveDate::from_ymd_opt(year as i32, month as u32, day as u32)
        .map(|d| d.and_time(chrono::NaiveTime::MIN))
}
