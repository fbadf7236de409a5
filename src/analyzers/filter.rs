use std::collections::{HashMap, HashSet};

use serde::Deserialize;
use tracing::{debug, info};

use crate::record::NormalizedComplaint;

/// Narrows the complaint set for reporting.
///
/// Runs on the annotated stream, after velocities are computed, so removing
/// a model year never changes the make/model counts of the records that
/// remain. Stages run in order: model-year range, minimum complaints per
/// make/model/year cohort, then the make and model allow-lists. An unset
/// field disables its stage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CohortFilter {
    pub min_model_year: Option<i32>,
    pub max_model_year: Option<i32>,
    pub min_complaints: Option<u64>,
    pub makes: Option<HashSet<String>>,
    pub models: Option<HashSet<String>>,
}

impl CohortFilter {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Keeps the records that pass every stage, in their original order.
    pub fn apply<T: AsRef<NormalizedComplaint>>(&self, records: Vec<T>) -> Vec<T> {
        let before = records.len();

        let mut kept: Vec<T> = records
            .into_iter()
            .filter(|r| self.in_year_range(r.as_ref().model_year))
            .collect();
        debug!(kept = kept.len(), "Model-year range applied");

        if let Some(min) = self.min_complaints {
            let mut totals: HashMap<&str, u64> = HashMap::new();
            for r in &kept {
                let r = r.as_ref();
                *totals.entry(r.keys.make_model_year.as_str()).or_default() += u64::from(r.count);
            }
            let qualifying: HashSet<String> = totals
                .into_iter()
                .filter(|(_, total)| *total >= min)
                .map(|(key, _)| key.to_string())
                .collect();
            debug!(cohorts = qualifying.len(), min, "Cohort threshold applied");
            kept.retain(|r| qualifying.contains(&r.as_ref().keys.make_model_year));
        }

        kept.retain(|r| {
            let r = r.as_ref();
            allowed(self.makes.as_ref(), &r.make) && allowed(self.models.as_ref(), &r.model)
        });

        info!(before, after = kept.len(), "Cohort filter applied");
        kept
    }

    fn in_year_range(&self, model_year: Option<i32>) -> bool {
        if self.min_model_year.is_none() && self.max_model_year.is_none() {
            return true;
        }
        let Some(year) = model_year else {
            return false;
        };
        self.min_model_year.is_none_or(|min| year >= min)
            && self.max_model_year.is_none_or(|max| year <= max)
    }
}

fn allowed(list: Option<&HashSet<String>>, value: &str) -> bool {
    list.is_none_or(|list| list.contains(value))
}
