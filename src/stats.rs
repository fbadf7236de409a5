use chrono::{DateTime, Utc};
use serde::Serialize;

/// Row counters for one pipeline run.
#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct IngestStats {
    pub timestamp: DateTime<Utc>,
    pub source: Option<String>,

    // ingestion
    pub rows_read: usize,
    pub rows_skipped: usize,

    // normalization
    pub missing_model_year: usize,
    pub missing_fail_date: usize,

    // velocity stage
    pub filtered_out: usize,
    pub annotated: usize,
}

impl IngestStats {
    pub fn new() -> Self {
        IngestStats {
            timestamp: Utc::now(),
            ..Default::default()
        }
    }

    /// Set the source the rows were read from
    pub fn with_source(mut self, source: &str) -> Self {
        self.source = Some(source.to_string());
        self
    }

    pub fn pct(part: usize, total: usize) -> f64 {
        if total == 0 {
            0.0
        } else {
            (part as f64 / total as f64) * 100.0
        }
    }

    pub fn missing_fail_date_pct(&self) -> f64 {
        Self::pct(self.missing_fail_date, self.rows_read)
    }

    pub fn missing_model_year_pct(&self) -> f64 {
        Self::pct(self.missing_model_year, self.rows_read)
    }

    pub fn annotated_pct(&self) -> f64 {
        Self::pct(self.annotated, self.rows_read)
    }
}
