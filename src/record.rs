//! Complaint records at each stage of the pipeline.

use chrono::NaiveDateTime;
use serde::Serialize;

use crate::cohort::CohortKeys;

/// One row of the flat file, fields kept verbatim in schema order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawComplaint {
    pub fields: Vec<String>,
}

impl RawComplaint {
    pub fn new(fields: Vec<String>) -> Self {
        Self { fields }
    }

    /// Returns the field at `index`, or `""` when the row is short.
    pub fn field(&self, index: usize) -> &str {
        self.fields.get(index).map(String::as_str).unwrap_or("")
    }
}

/// A complaint with its typed fields and cohort keys derived.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedComplaint {
    pub raw: RawComplaint,
    pub make: String,
    pub model: String,
    pub model_year: Option<i32>,
    pub fail_date: Option<NaiveDateTime>,
    /// Present exactly when `fail_date` is.
    pub fail_epoch: Option<i64>,
    pub keys: CohortKeys,
    pub count: u32,
}

/// Cumulative cohort statistics as of one complaint's own timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CohortObservation {
    pub make_model_cum: u64,
    /// Complaints per year since the make/model's first complaint.
    pub make_model_rate: f64,
    pub make_model_year_cum: u64,
    /// Complaints per year since January 1 of the year before the model year.
    pub make_model_year_rate: Option<f64>,
}

/// A complaint annotated by the velocity engine.
///
/// Only complaints with a fail date reach this stage, so the epoch is
/// unwrapped here.
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotatedComplaint {
    pub record: NormalizedComplaint,
    pub fail_epoch: i64,
    pub observation: CohortObservation,
}

impl AsRef<NormalizedComplaint> for NormalizedComplaint {
    fn as_ref(&self) -> &NormalizedComplaint {
        self
    }
}

impl AsRef<NormalizedComplaint> for AnnotatedComplaint {
    fn as_ref(&self) -> &NormalizedComplaint {
        &self.record
    }
}
