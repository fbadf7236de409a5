//! Serializable summaries produced from annotated complaints.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Velocity summary for one make/model/year cohort.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CohortRanking {
    pub make_model_year: String,
    pub make: String,
    pub model: String,
    pub model_year: Option<i32>,
    /// `make_model_year_cum` at the cohort's latest complaint.
    pub total_complaints: u64,
    /// `make_model_year_rate` at the cohort's latest complaint.
    pub latest_rate: Option<f64>,
    pub mean_rate: Option<f64>,
    pub last_complaint: DateTime<Utc>,
}

/// Complaint total for one make.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MakeShare {
    pub make: String,
    pub complaints: u64,
}

/// Top-level ranking report written as JSON.
#[derive(Debug, Serialize)]
pub struct RankingReport {
    pub schema_version: u8,
    pub generated_at: DateTime<Utc>,
    pub window_days: Option<i64>,
    pub cohorts: Vec<CohortRanking>,
}
