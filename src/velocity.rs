//! Complaint velocity: cumulative cohort counts and annualized rates.
//!
//! Every complaint is scored as of its own fail timestamp. A complaint's
//! make/model count includes every complaint of the same make/model failing at
//! or before that instant, ties included, and its model-year count narrows that
//! set to the same make/model/year key. Rates divide those counts by the years
//! elapsed since a cohort origin, plus one second so the first observation has
//! a finite rate.
//!
//! Records are sorted once by timestamp and partitioned by make/model. Each
//! partition is walked in one forward pass that advances over blocks of equal
//! timestamps, so tied complaints see each other. Partitions are independent
//! and can be scored on the rayon pool.

use std::collections::HashMap;

use chrono::NaiveDate;
use rayon::prelude::*;
use tracing::{debug, info, instrument};

use crate::record::{AnnotatedComplaint, CohortObservation, NormalizedComplaint};

pub const SECONDS_PER_YEAR: f64 = 86_400.0 * 365.0;

/// Years between two epochs with the one-second offset applied.
///
/// Returns `None` when `to` precedes `from`, where no finite positive
/// duration exists.
pub fn elapsed_years(from: i64, to: i64) -> Option<f64> {
    let seconds = to - from + 1;
    (seconds > 0).then(|| seconds as f64 / SECONDS_PER_YEAR)
}

/// Synthetic start of a model-year cohort: January 1 of the preceding year.
pub fn model_year_origin(model_year: i32) -> Option<i64> {
    NaiveDate::from_ymd_opt(model_year - 1, 1, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc().timestamp())
}

/// A dated record borrowed for scoring.
struct Entry<'a> {
    epoch: i64,
    record: &'a NormalizedComplaint,
}

/// Running state for one make/model partition.
#[derive(Debug, Default)]
struct GroupState {
    count: u64,
    first_epoch: Option<i64>,
}

/// Running counts for the model-year cohorts inside one partition, stored in
/// an arena indexed by key.
#[derive(Debug, Default)]
struct CohortArena<'a> {
    slots: HashMap<&'a str, usize>,
    counts: Vec<u64>,
}

impl<'a> CohortArena<'a> {
    fn slot(&mut self, key: &'a str) -> usize {
        if let Some(&slot) = self.slots.get(key) {
            return slot;
        }
        let slot = self.counts.len();
        self.counts.push(0);
        self.slots.insert(key, slot);
        slot
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct VelocityEngine {
    parallel: bool,
}

impl VelocityEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Score make/model partitions on the rayon thread pool.
    pub fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Annotates every record that has a fail epoch.
    ///
    /// Records without one are dropped. The result is ordered by ascending
    /// `fail_epoch`, with equal timestamps kept in input order, and is the
    /// same whether or not partitions run in parallel.
    #[instrument(skip_all, fields(records = records.len(), parallel = self.parallel))]
    pub fn annotate(&self, records: Vec<NormalizedComplaint>) -> Vec<AnnotatedComplaint> {
        let total = records.len();
        let mut dated: Vec<(i64, NormalizedComplaint)> = records
            .into_iter()
            .filter_map(|r| r.fail_epoch.map(|epoch| (epoch, r)))
            .collect();
        let excluded = total - dated.len();
        if excluded > 0 {
            debug!(excluded, "Records without a fail date left out of velocity");
        }

        dated.sort_by_key(|(epoch, _)| *epoch);

        let observations = {
            let entries: Vec<Entry<'_>> = dated
                .iter()
                .map(|(epoch, record)| Entry {
                    epoch: *epoch,
                    record,
                })
                .collect();
            self.observe(&entries)
        };

        // `observations` is index-aligned with `dated`.
        let annotated: Vec<AnnotatedComplaint> = dated
            .into_iter()
            .zip(observations)
            .filter_map(|((fail_epoch, record), observation)| {
                Some(AnnotatedComplaint {
                    record,
                    fail_epoch,
                    observation: observation?,
                })
            })
            .collect();

        info!(annotated = annotated.len(), excluded, "Complaint velocities computed");
        annotated
    }

    /// Scores entries already sorted by epoch, returning one slot per entry in
    /// the same order.
    fn observe(&self, entries: &[Entry<'_>]) -> Vec<Option<CohortObservation>> {
        let mut partitions: HashMap<&str, Vec<usize>> = HashMap::new();
        for (position, entry) in entries.iter().enumerate() {
            partitions
                .entry(entry.record.keys.make_model.as_str())
                .or_default()
                .push(position);
        }
        debug!(partitions = partitions.len(), "Partitioned by make/model");

        let partitions: Vec<Vec<usize>> = partitions.into_values().collect();
        let scored: Vec<Vec<(usize, CohortObservation)>> = if self.parallel {
            partitions
                .par_iter()
                .map(|positions| observe_partition(entries, positions))
                .collect()
        } else {
            partitions
                .iter()
                .map(|positions| observe_partition(entries, positions))
                .collect()
        };

        let mut slots: Vec<Option<CohortObservation>> = vec![None; entries.len()];
        for (position, observation) in scored.into_iter().flatten() {
            slots[position] = Some(observation);
        }
        debug_assert!(
            slots.iter().all(Option::is_some),
            "every position belongs to exactly one partition"
        );
        slots
    }
}

/// One forward pass over a make/model partition. `positions` are ascending
/// indices into `entries`, so epochs are non-decreasing along them.
fn observe_partition(
    entries: &[Entry<'_>],
    positions: &[usize],
) -> Vec<(usize, CohortObservation)> {
    let mut group = GroupState::default();
    let mut cohorts = CohortArena::default();
    let mut out = Vec::with_capacity(positions.len());

    let mut start = 0;
    while start < positions.len() {
        let epoch = entries[positions[start]].epoch;
        let mut end = start;
        while end < positions.len() && entries[positions[end]].epoch == epoch {
            end += 1;
        }
        let block = &positions[start..end];

        // Count the whole tie block before scoring any of it.
        let mut block_slots = Vec::with_capacity(block.len());
        for &position in block {
            let record = entries[position].record;
            group.count += 1;
            group.first_epoch.get_or_insert(epoch);
            let slot = cohorts.slot(record.keys.make_model_year.as_str());
            cohorts.counts[slot] += 1;
            block_slots.push(slot);
        }

        let first_epoch = group.first_epoch.unwrap_or(epoch);
        let years = elapsed_years(first_epoch, epoch).unwrap_or(1.0 / SECONDS_PER_YEAR);
        let make_model_rate = group.count as f64 / years;

        for (&position, slot) in block.iter().zip(block_slots) {
            let record = entries[position].record;
            let make_model_year_cum = cohorts.counts[slot];
            let make_model_year_rate = record
                .model_year
                .and_then(model_year_origin)
                .and_then(|origin| elapsed_years(origin, epoch))
                .map(|years| make_model_year_cum as f64 / years);

            out.push((
                position,
                CohortObservation {
                    make_model_cum: group.count,
                    make_model_rate,
                    make_model_year_cum,
                    make_model_year_rate,
                },
            ));
        }

        start = end;
    }

    out
}
