use anyhow::Result;
use serde::Deserialize;

use crate::analyzers::filter::CohortFilter;

/// Pipeline defaults loaded from a JSON file.
///
/// ```json
/// {
///   "filter": { "min_model_year": 2014, "max_model_year": 2021, "min_complaints": 75 },
///   "parallel": true
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub filter: CohortFilter,
    pub parallel: bool,
    pub has_headers: bool,
    pub window_days: Option<i64>,
}

impl PipelineConfig {
    /// Loads the config from a JSON file at `path`.
    pub fn load(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Loads `path` when given, otherwise returns the defaults.
    pub fn load_or_default(path: Option<&str>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }
}
