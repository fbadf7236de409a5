//! Raw table to annotated complaints: normalize, score, filter.

use tracing::{info, instrument};

use crate::analyzers::filter::CohortFilter;
use crate::normalize::RecordNormalizer;
use crate::parser::ComplaintTable;
use crate::record::{AnnotatedComplaint, NormalizedComplaint};
use crate::schema::Schema;
use crate::stats::IngestStats;
use crate::velocity::VelocityEngine;

#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    pub normalizer: RecordNormalizer,
    pub filter: CohortFilter,
    pub engine: VelocityEngine,
}

/// Dated complaints ready for scoring or aggregation.
#[derive(Debug, Clone)]
pub struct Prepared {
    pub schema: Schema,
    pub records: Vec<NormalizedComplaint>,
}

/// Annotated complaints in ascending fail-time order.
#[derive(Debug, Clone)]
pub struct Annotated {
    pub schema: Schema,
    pub records: Vec<AnnotatedComplaint>,
}

impl Pipeline {
    pub fn new(filter: CohortFilter, parallel: bool) -> Self {
        Self {
            normalizer: RecordNormalizer::new(),
            filter,
            engine: VelocityEngine::new().parallel(parallel),
        }
    }

    /// Normalizes the table and drops complaints without a fail date.
    #[instrument(skip_all, fields(rows = table.rows.len()))]
    pub fn prepare(&self, table: ComplaintTable, stats: &mut IngestStats) -> Prepared {
        stats.rows_read += table.rows.len();
        stats.rows_skipped += table.skipped;

        let schema = table.schema;
        let normalized = self.normalizer.normalize_all(table.rows, &schema, stats);

        let records = normalized
            .into_iter()
            .filter(|r| r.fail_epoch.is_some())
            .collect();

        Prepared { schema, records }
    }

    /// Prepares the table and applies the cohort filter, for aggregations
    /// that do not need velocities.
    pub fn select(&self, table: ComplaintTable, stats: &mut IngestStats) -> Prepared {
        let Prepared { schema, records } = self.prepare(table, stats);
        let records = self.filter_counted(records, stats);
        Prepared { schema, records }
    }

    /// Runs the whole pipeline and records the annotated count in `stats`.
    ///
    /// Velocities are computed over every dated complaint; the cohort filter
    /// only decides which annotated records are returned.
    pub fn run(&self, table: ComplaintTable, stats: &mut IngestStats) -> Annotated {
        let Prepared { schema, records } = self.prepare(table, stats);
        let records = self.engine.annotate(records);
        let records = self.filter_counted(records, stats);
        stats.annotated += records.len();

        info!(
            rows_read = stats.rows_read,
            rows_skipped = stats.rows_skipped,
            filtered_out = stats.filtered_out,
            annotated = stats.annotated,
            annotated_pct = stats.annotated_pct(),
            "Pipeline complete"
        );
        Annotated { schema, records }
    }

    fn filter_counted<T: AsRef<NormalizedComplaint>>(
        &self,
        records: Vec<T>,
        stats: &mut IngestStats,
    ) -> Vec<T> {
        let before = records.len();
        let records = self.filter.apply(records);
        stats.filtered_out += before - records.len();
        records
    }
}
