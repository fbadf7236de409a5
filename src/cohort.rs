//! Group identity keys for complaint cohorts.

use serde::Serialize;

/// Opaque identity strings for the two cohort levels a complaint belongs to.
///
/// Keys are compared by exact string equality and never split back into
/// make, model and year.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct CohortKeys {
    pub make_model: String,
    pub make_model_year: String,
}

impl CohortKeys {
    /// Joins the raw make, model and model-year text with single spaces.
    ///
    /// The year component is the raw year text, not the parsed model year, so
    /// unparseable years such as `9999` still form their own cohort.
    pub fn build(make: &str, model: &str, raw_year: &str) -> Self {
        let make_model = format!("{make} {model}");
        let make_model_year = format!("{make_model} {raw_year}");
        Self {
            make_model,
            make_model_year,
        }
    }
}
